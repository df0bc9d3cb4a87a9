use keylog::{EncodeDetails, SkippedRule};

const RESET: &str = "\x1b[0m";

/// ANSI styling keyed by what is being shown rather than by colour.
struct Palette {
    enabled: bool,
}

impl Palette {
    fn new(enabled: bool) -> Self {
        Palette { enabled }
    }

    fn wrap(&self, code: &str, s: impl AsRef<str>) -> String {
        if self.enabled { format!("{code}{}{RESET}", s.as_ref()) } else { s.as_ref().to_string() }
    }

    fn title(&self, s: impl AsRef<str>) -> String {
        self.wrap("\x1b[1;36m", s)
    }

    fn rule(&self, s: impl AsRef<str>) -> String {
        self.wrap("\x1b[90m", s)
    }

    fn phase(&self, s: impl AsRef<str>) -> String {
        self.wrap("\x1b[34m", s)
    }

    fn changed(&self, s: impl AsRef<str>) -> String {
        self.wrap("\x1b[33m", s)
    }

    fn good(&self, s: impl AsRef<str>) -> String {
        self.wrap("\x1b[32m", s)
    }

    fn keylog(&self, s: impl AsRef<str>) -> String {
        self.wrap("\x1b[1;32m", s)
    }

    fn pattern(&self, s: impl AsRef<str>) -> String {
        self.wrap("\x1b[36m", s)
    }

    fn muted(&self, s: impl AsRef<str>) -> String {
        self.wrap("\x1b[2m", s)
    }
}

/// Print the phase trace of one encoder run. `composed` is the framed keylog
/// when a composer wrapped the encoder output.
pub fn print_run(details: &EncodeDetails, skipped: &[SkippedRule], composed: Option<&str>, color: bool) {
    let palette = Palette::new(color);
    println!("\n{}", palette.title(format!("⚙  Encoding: \"{}\"", details.input)));

    println!("\n{}", palette.rule("━━━ Phases ━━━"));
    if details.phases.is_empty() {
        println!("{}", palette.muted("  Empty input, no phase ran"));
    }
    for metrics in &details.phases {
        let (mark, output) = if metrics.changed {
            (palette.good("✓"), palette.changed(&metrics.output))
        } else {
            (palette.muted("·"), palette.muted(&metrics.output))
        };
        println!(
            "  {} {:<20} {}  {}",
            mark,
            palette.phase(metrics.phase.label()),
            output,
            palette.muted(format!("{:?}", metrics.duration))
        );
    }

    println!("\n{}", palette.rule("━━━ Mapping rules ━━━"));
    println!(
        "  Active: {}  │  Skipped: {}",
        palette.good(details.active_rules.to_string()),
        palette.changed(details.skipped_rules.to_string())
    );
    print_skipped(skipped, &palette);

    println!("\n{}", palette.rule("━━━ Result ━━━"));
    println!("  {} {}", palette.muted("keylog:"), palette.keylog(&details.keylog));
    if let Some(composed) = composed {
        println!("  {} {}", palette.muted("framed:"), palette.keylog(composed));
    }

    println!("\n{}", palette.rule("━━━ Timing ━━━"));
    println!("  Total: {}", palette.good(format!("{:?}", details.total)));
    println!();
}

fn print_skipped(skipped: &[SkippedRule], palette: &Palette) {
    for rule in skipped.iter().take(10) {
        println!(
            "    {} {} {} {}",
            palette.rule(format!("#{}", rule.index)),
            palette.pattern(&rule.pattern),
            palette.muted("│"),
            palette.muted(format!("{:?}", rule.reason))
        );
    }
    if skipped.len() > 10 {
        println!("    {}", palette.muted(format!("... +{} more", skipped.len() - 10)));
    }
}
