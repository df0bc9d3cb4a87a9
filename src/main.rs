mod debug_report;

use keylog::{DerivativeComposer, DerivativeRequest, Encoder, IntegralComposer, IntegralRequest, MappingStore};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

const DEFAULT_MODE: u8 = 3;

fn main() {
    env_logger::init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let store = if config.mappings.is_empty() { MappingStore::bundled() } else { MappingStore::load(&config.mappings) };
    let encoder = Encoder::new(store);

    let composed = match config.domain {
        Domain::Expr => None,
        Domain::Integral => Some(
            IntegralComposer::new(&encoder)
                .encode(&IntegralRequest { expression: config.input.clone(), mode: config.mode })
                .map(|out| out.keylog),
        ),
        Domain::Derivative => Some(
            DerivativeComposer::new(&encoder)
                .encode(&DerivativeRequest { expression: config.input.clone(), mode: config.mode })
                .map(|out| out.keylog),
        ),
    };

    let composed = match composed.transpose() {
        Ok(composed) => composed,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if config.trace {
        let details = encoder.encode_verbose(&config.input);
        debug_report::print_run(&details, encoder.skipped_rules(), composed.as_deref(), config.color);
    } else {
        println!("{}", composed.unwrap_or_else(|| encoder.encode(&config.input)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Expr,
    Integral,
    Derivative,
}

struct CliConfig {
    input: String,
    domain: Domain,
    mode: u8,
    mappings: Vec<PathBuf>,
    trace: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut domain = Domain::Expr;
    let mut mode = DEFAULT_MODE;
    let mut mappings = Vec::new();
    let mut trace = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("keylog {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--trace" => trace = true,
            "--domain" => {
                let value = args.next().ok_or_else(|| "error: --domain expects a value".to_string())?;
                domain = parse_domain(&value)?;
            }
            "--mode" => {
                let value = args.next().ok_or_else(|| "error: --mode expects a value".to_string())?;
                mode = parse_mode(&value)?;
            }
            "--mappings" => {
                let value = args.next().ok_or_else(|| "error: --mappings expects a path".to_string())?;
                mappings.push(PathBuf::from(value));
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    input = Some(rest);
                }
                break;
            }
            _ if arg.starts_with("--domain=") => domain = parse_domain(arg.trim_start_matches("--domain="))?,
            _ if arg.starts_with("--mode=") => mode = parse_mode(arg.trim_start_matches("--mode="))?,
            _ if arg.starts_with("--mappings=") => mappings.push(PathBuf::from(arg.trim_start_matches("--mappings="))),
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                input = Some(std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" "));
                break;
            }
        }
    }

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if input.trim().is_empty() {
        return Err(format!("error: no expression provided\n\n{}", help_text()));
    }

    Ok(CliConfig { input: input.trim().to_string(), domain, mode, mappings, trace, color })
}

fn parse_domain(value: &str) -> Result<Domain, String> {
    match value {
        "expr" => Ok(Domain::Expr),
        "integral" => Ok(Domain::Integral),
        "derivative" => Ok(Domain::Derivative),
        _ => Err(format!("error: invalid --domain '{value}' (expected expr, integral or derivative)")),
    }
}

fn parse_mode(value: &str) -> Result<u8, String> {
    match value.parse::<u8>() {
        Ok(mode @ 1..=4) => Ok(mode),
        _ => Err(format!("error: invalid --mode '{value}' (expected 1, 2, 3 or 4)")),
    }
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "keylog {version}

Translate LaTeX math into calculator keystroke sequences.

Usage:
  keylog [OPTIONS] [--] <expression...>

The expression is read from the remaining arguments, or from stdin when none
are given.

Options:
  --domain <name>        expr, integral or derivative. Default: expr
  --mode <1-4>           Display mode for integral/derivative. Default: {default_mode}
  --mappings <path>      Mapping file candidate; repeat to give fallbacks.
                         Default: the bundled mapping.
  --trace                Print the per-phase report.
  --color                Force ANSI color output.
  --no-color             Disable ANSI color output.
  -h, --help             Show this help message.
  -V, --version          Print version information.

Environment:
  RUST_LOG               Log filter, e.g. RUST_LOG=keylog=debug

Exit codes:
  0  Success.
  1  The expression does not fit the requested domain.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        default_mode = DEFAULT_MODE
    )
}
