//! Structural phases.
//!
//! Each phase is a plain `&str -> String` rewrite with a fixed pattern. They are
//! the authoritative lowering for the LaTeX constructs they cover; the generic
//! sweep runs after them and skips any mapping rule that targets the same
//! constructs.
//!
//! ```text
//! \int_{0}^{1} \frac{1}{x^{2}} dx
//!   A  \int_{0}^{1}\frac{1}{x^{2}}dx
//!   D  y(1)a(x^2))),0,1)          body and bounds re-encoded as fragments (A, C-G)
//! ```
//!
//! ## Iteration caps
//!
//! Integrals and fractions iterate towards a fixed point. Both loops are capped
//! (20 and 15 iterations); on reaching the cap the partially rewritten string is
//! returned as-is, and any residual `\int`/`\frac` in the output is the caller's
//! signal that the input nested too deeply.
//!
//! ## The separator sentinel
//!
//! Logarithms with a numeric base need a literal argument separator that the
//! sweep must not touch. Phase B emits [`SEPARATOR_SENTINEL`] (an ASCII control
//! character stripped from user input before Phase A) and Phase I turns it into
//! the `q)` token.
//!
//! ## Lowered integrals
//!
//! Phase D encodes integral bodies and bounds itself, through phases A and
//! C–G. Its output must not be lowered a second time by E–G, so each rewritten
//! integral is parked in a stash and the working string only carries a
//! placeholder (`U+001E <index> U+001F`). The encoder expands placeholders once
//! Phase G has run.

use regex::Captures;

pub(crate) const SEPARATOR_SENTINEL: char = '\u{1d}';
pub(crate) const SEPARATOR_TOKEN: &str = "q)";
pub(crate) const INTEGRAL_ITERATION_CAP: usize = 20;
pub(crate) const FRACTION_ITERATION_CAP: usize = 15;
pub(crate) const EXPONENT_ITERATION_CAP: usize = 15;

const PLACEHOLDER_OPEN: char = '\u{1e}';
const PLACEHOLDER_CLOSE: char = '\u{1f}';

bitflags::bitflags! {
    /// A set of pipeline phases.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Phases: u16 {
        const PRE_CLEAN       = 1 << 0;
        const LOG_BASE        = 1 << 1;
        const NAMED_FUNCTIONS = 1 << 2;
        const INTEGRALS       = 1 << 3;
        const EXPONENTS       = 1 << 4;
        const FRACTIONS       = 1 << 5;
        const BRACES          = 1 << 6;
        const SWEEP           = 1 << 7;
        const RESTORE         = 1 << 8;

        /// Phases applied to integral bodies and bounds.
        const FRAGMENT = Self::PRE_CLEAN.bits()
            | Self::NAMED_FUNCTIONS.bits()
            | Self::INTEGRALS.bits()
            | Self::EXPONENTS.bits()
            | Self::FRACTIONS.bits()
            | Self::BRACES.bits();
    }
}

/// One step of the encoder pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreClean,
    LogBase,
    NamedFunctions,
    Integrals,
    Exponents,
    Fractions,
    Braces,
    Sweep,
    Restore,
}

impl Phase {
    /// Fixed execution order.
    pub const PIPELINE: [Phase; 9] = [
        Phase::PreClean,
        Phase::LogBase,
        Phase::NamedFunctions,
        Phase::Integrals,
        Phase::Exponents,
        Phase::Fractions,
        Phase::Braces,
        Phase::Sweep,
        Phase::Restore,
    ];

    pub fn flag(self) -> Phases {
        match self {
            Phase::PreClean => Phases::PRE_CLEAN,
            Phase::LogBase => Phases::LOG_BASE,
            Phase::NamedFunctions => Phases::NAMED_FUNCTIONS,
            Phase::Integrals => Phases::INTEGRALS,
            Phase::Exponents => Phases::EXPONENTS,
            Phase::Fractions => Phases::FRACTIONS,
            Phase::Braces => Phases::BRACES,
            Phase::Sweep => Phases::SWEEP,
            Phase::Restore => Phases::RESTORE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::PreClean => "A pre-clean",
            Phase::LogBase => "B log-with-base",
            Phase::NamedFunctions => "C named functions",
            Phase::Integrals => "D integrals",
            Phase::Exponents => "E exponents",
            Phase::Fractions => "F fractions",
            Phase::Braces => "G braces",
            Phase::Sweep => "H generic sweep",
            Phase::Restore => "I restore separators",
        }
    }
}

// --- A: pre-clean --------------------------------------------------------------

/// Drop whitespace and `\left`/`\right` sizing hints.
pub(crate) fn pre_clean(input: &str) -> String {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    compact.replace("\\left", "").replace("\\right", "")
}

/// Remove separator sentinels and placeholder delimiters from raw user input.
/// Fragments produced inside the pipeline keep theirs.
pub(crate) fn strip_sentinels(input: &str) -> String {
    input.replace([SEPARATOR_SENTINEL, PLACEHOLDER_OPEN, PLACEHOLDER_CLOSE], "")
}

// --- B: logarithm with explicit base -------------------------------------------

/// Flatten `\log_{base} arg` shapes into `i(arg,base)` style sequences.
///
/// Shapes are tried in order, each over the whole string.
pub(crate) fn log_base(input: &str) -> String {
    let shapes = [
        (regex!(r"\\log_(\d+)\{\(([^{}]*)\)\}"), "i((${2}),${1}))"),
        (regex!(r"\\log_(\d+)\{([^{}]*)\}"), "i(${2},${1})"),
        (regex!(r"\\log_\{([^{}]*)\}\{([^{}]*)\}"), "i(${2},${1})"),
        (regex!(r"\\log_\{([^{}]*)\}\(([^()]*)\)"), "i(${2},${1})"),
        (regex!(r"\\log_\{([^{}]*)\}([A-Za-z0-9])"), "i(${2},${1})"),
        (regex!(r"\\log_(\d+)\(([^()]*)\)"), "i(${2}\u{1d}${1})"),
        (regex!(r"\\log_(\d+)([A-Za-z0-9])"), "i(${2}\u{1d}${1})"),
    ];

    shapes.iter().fold(input.to_string(), |text, (re, template)| re.replace_all(&text, *template).into_owned())
}

// --- C: named functions --------------------------------------------------------

/// Replace named functions with their single-key glyphs in one pass.
pub(crate) fn named_functions(input: &str) -> String {
    regex!(r"\\(sqrt|sin|cos|tan|ln|log|cdot|times|div)")
        .replace_all(input, |caps: &Captures| {
            let glyph = match &caps[1] {
                "sqrt" => "s",
                "sin" => "j",
                "cos" => "k",
                "tan" => "l",
                "ln" => "h",
                "log" => "i",
                "div" => "/",
                _ => "*",
            };
            glyph.to_string()
        })
        .into_owned()
}

// --- D: integrals --------------------------------------------------------------

/// A `\int_{lower}^{upper}` head located in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IntegralHead<'s> {
    /// Byte offset of the backslash.
    pub start: usize,
    /// Byte offset just past the upper bound.
    pub end: usize,
    pub lower: &'s str,
    pub upper: &'s str,
}

/// Parse an integral head starting exactly at `start`.
///
/// Bounds may be braced groups (nested braces allowed) or a single character,
/// and may appear in either order.
pub(crate) fn parse_integral_head(s: &str, start: usize) -> Option<IntegralHead<'_>> {
    s.get(start..)?.strip_prefix("\\int")?;
    let mut pos = start + "\\int".len();
    let mut lower = None;
    let mut upper = None;

    for _ in 0..2 {
        let marker = s[pos..].chars().next()?;
        let (group, next) = parse_group(s, pos + 1)?;
        match marker {
            '_' if lower.is_none() => lower = Some(group),
            '^' if upper.is_none() => upper = Some(group),
            _ => return None,
        }
        pos = next;
    }

    Some(IntegralHead { start, end: pos, lower: lower?, upper: upper? })
}

/// Every well-formed integral head in `s`, left to right.
pub(crate) fn integral_heads(s: &str) -> Vec<IntegralHead<'_>> {
    s.match_indices("\\int").filter_map(|(idx, _)| parse_integral_head(s, idx)).collect()
}

/// A braced group or a single plain character at `at`. Returns the content and
/// the offset just past it.
fn parse_group(s: &str, at: usize) -> Option<(&str, usize)> {
    let rest = s.get(at..)?;
    let mut chars = rest.char_indices();
    let (_, first) = chars.next()?;

    match first {
        '{' => {
            let mut depth = 1usize;
            for (idx, c) in chars {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some((&rest[1..idx], at + idx + 1));
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        '}' | '\\' | '^' | '_' => None,
        c => Some((&rest[..c.len_utf8()], at + c.len_utf8())),
    }
}

/// Rewrite `\int_{a}^{b} body d<v>` into `y<body>),<a>,<b>)`, innermost first.
///
/// `fragment` lowers the body and both bounds. The rewritten integral is pushed
/// onto `stash` and replaced by a placeholder; see [`expand_placeholders`].
/// A head with no differential after it is left as-is and the previous head is
/// tried instead.
pub(crate) fn integrals(input: &str, fragment: impl Fn(&str) -> String, stash: &mut Vec<String>) -> String {
    let mut text = input.to_string();

    for _ in 0..INTEGRAL_ITERATION_CAP {
        let next = integral_heads(&text).into_iter().rev().find_map(|head| {
            let differential = regex!(r"d[a-z]").find(&text[head.end..])?;
            let body = &text[head.end..head.end + differential.start()];
            let rewritten = format!("y{}),{},{})", fragment(body), fragment(head.lower), fragment(head.upper));
            Some((head.start..head.end + differential.end(), rewritten))
        });
        let Some((span, rewritten)) = next else { break };

        // Earlier entries are final; inline them so every entry is self-contained.
        let entry = expand_placeholders(&rewritten, stash);
        stash.push(entry);
        text.replace_range(span, &format!("{PLACEHOLDER_OPEN}{}{PLACEHOLDER_CLOSE}", stash.len() - 1));
    }

    text
}

/// Replace placeholders with their stashed integrals. Unknown indices are kept.
pub(crate) fn expand_placeholders(input: &str, stash: &[String]) -> String {
    if stash.is_empty() {
        return input.to_string();
    }
    regex!(r"\x1e(\d+)\x1f")
        .replace_all(input, |caps: &Captures| {
            caps[1].parse::<usize>().ok().and_then(|idx| stash.get(idx)).cloned().unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// --- E: exponents --------------------------------------------------------------

/// A bare single-character exponent not followed by a digit or `)` becomes
/// `^c)`; then `^{expr}` becomes `^expr)`, innermost first.
///
/// Bare exponents go first so that `x^{y^2}` closes both levels.
pub(crate) fn exponents(input: &str) -> String {
    let bare = fixed_point(input, EXPONENT_ITERATION_CAP, |text| {
        regex!(r"\^([A-Za-z0-9])([^0-9)]|$)").replace_all(text, "^${1})${2}").into_owned()
    });

    fixed_point(&bare, EXPONENT_ITERATION_CAP, |text| {
        regex!(r"\^\{([^{}]*)\}").replace_all(text, "^${1})").into_owned()
    })
}

// --- F: fractions --------------------------------------------------------------

/// Rewrite innermost `\frac{num}{den}` into `(num)a(den)` until none remain.
pub(crate) fn fractions(input: &str) -> String {
    fixed_point(input, FRACTION_ITERATION_CAP, |text| {
        regex!(r"\\frac\{([^{}]*)\}\{([^{}]*)\}").replace_all(text, "(${1})a(${2})").into_owned()
    })
}

// --- G / I ---------------------------------------------------------------------

pub(crate) fn braces(input: &str) -> String {
    input.replace('{', "(").replace('}', ")")
}

pub(crate) fn restore_separators(input: &str) -> String {
    input.replace(SEPARATOR_SENTINEL, SEPARATOR_TOKEN)
}

/// Apply `step` until the text stops changing or `cap` iterations ran.
fn fixed_point(input: &str, cap: usize, step: impl Fn(&str) -> String) -> String {
    let mut text = input.to_string();
    for _ in 0..cap {
        let next = step(&text);
        if next == text {
            break;
        }
        text = next;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_clean_strips_sizing_hints_and_whitespace() {
        assert_eq!(pre_clean("  \\left( x + 1 \\right) "), "(x+1)");
        assert_eq!(pre_clean("i(x\u{1d}2)"), "i(x\u{1d}2)");
        assert_eq!(strip_sentinels("a\u{1d}b"), "ab");
    }

    #[test]
    fn log_base_shapes() {
        let cases = vec![
            ("\\log_7{(3x)}", "i((3x),7))"),
            ("\\log_{2}{x+1}", "i(x+1,2)"),
            ("\\log_{10}(x)", "i(x,10)"),
            ("\\log_{b}x", "i(x,b)"),
            ("\\log_2(x)", "i(x\u{1d}2)"),
            ("\\log_3x", "i(x\u{1d}3)"),
            ("\\log_5{y}", "i(y,5)"),
        ];
        for (input, expected) in cases {
            assert_eq!(log_base(input), expected, "log shape for {input}");
        }
    }

    #[test]
    fn named_functions_single_pass() {
        assert_eq!(named_functions("\\sqrt{\\sin(x)+\\cos(x)\\cdot\\tan(x)}"), "s{j(x)+k(x)*l(x)}");
        assert_eq!(named_functions("\\ln(x)-\\log(x)\\div2\\times3"), "h(x)-i(x)/2*3");
        assert_eq!(named_functions("\\int_{0}^{1}"), "\\int_{0}^{1}");
    }

    #[test]
    fn integral_head_parsing() {
        let s = "2\\int_{-1}^{x^{2}}t";
        let head = parse_integral_head(s, 1).unwrap();
        assert_eq!((head.lower, head.upper), ("-1", "x^{2}"));
        assert_eq!(&s[head.end..], "t");

        let swapped = parse_integral_head("\\int^b_a", 0).unwrap();
        assert_eq!((swapped.lower, swapped.upper), ("a", "b"));

        assert!(parse_integral_head("\\int_{0", 0).is_none());
        assert!(parse_integral_head("\\intercal", 0).is_none());
    }

    fn lower_integrals(input: &str) -> String {
        let mut stash = Vec::new();
        let out = integrals(input, |s| s.to_string(), &mut stash);
        expand_placeholders(&out, &stash)
    }

    #[test]
    fn integrals_rewrite_innermost_first() {
        let mut stash = Vec::new();
        let out = integrals("\\int_{0}^{1}\\int_{0}^{2}xydydx", |s| s.to_string(), &mut stash);
        assert_eq!(out, "\u{1e}1\u{1f}");
        assert_eq!(stash, vec!["yxy),0,2)".to_string(), "yyxy),0,2)),0,1)".to_string()]);
        assert_eq!(expand_placeholders(&out, &stash), "yyxy),0,2)),0,1)");
    }

    #[test]
    fn integral_without_differential_is_left_alone() {
        let input = "\\int_{0}^{1}x^2";
        assert_eq!(lower_integrals(input), input);
    }

    #[test]
    fn malformed_trailing_integral_does_not_block_earlier_ones() {
        let cases = vec![
            ("\\int_{0}^{1}xdx+\\int_{0}^{1}y", "yx),0,1)+\\int_{0}^{1}y"),
            ("\\int_{0}^{1}xdx+\\int_{0}^{2}tdt+\\int_{1}^{2}", "yx),0,1)+yt),0,2)+\\int_{1}^{2}"),
        ];
        for (input, expected) in cases {
            assert_eq!(lower_integrals(input), expected, "integral lowering for {input}");
        }
    }

    #[test]
    fn integral_cap_leaves_one_residual_head() {
        let siblings = vec!["\\int_{0}^{1}xdx"; INTEGRAL_ITERATION_CAP + 1].join("+");
        let out = lower_integrals(&siblings);
        assert_eq!(out.matches("\\int").count(), 1);
        assert!(out.starts_with("\\int_{0}^{1}xdx+yx),0,1)"));
    }

    #[test]
    fn placeholders_are_opaque_to_later_phases() {
        let mut stash = Vec::new();
        let out = integrals("\\int_{0}^{1}e^x+1)dx^{2}", |s| s.to_string(), &mut stash);
        let lowered = braces(&fractions(&exponents(&out)));
        assert_eq!(expand_placeholders(&lowered, &stash), "ye^x+1)),0,1)^2)");
        assert_eq!(strip_sentinels("a\u{1e}0\u{1f}b"), "a0b");
    }

    #[test]
    fn exponent_rules() {
        let cases = vec![
            ("x^{10}", "x^10)"),
            ("x^2", "x^2)"),
            ("x^2+1", "x^2)+1"),
            ("x^10", "x^10"),
            ("x^{2^{3}}", "x^2^3))"),
            ("x^{y^2}", "x^y^2))"),
            ("x^a^b", "x^a)^b)"),
            ("e^{x}}", "e^x)}"),
        ];
        for (input, expected) in cases {
            assert_eq!(exponents(input), expected, "exponent lowering for {input}");
        }
    }

    #[test]
    fn fractions_nest_inside_out() {
        assert_eq!(fractions("\\frac{1}{x^2)}"), "(1)a(x^2))");
        assert_eq!(fractions("\\frac{\\frac{1}{2}}{3}"), "((1)a(2))a(3)");
    }

    #[test]
    fn fraction_cap_bounds_nesting_depth_not_count() {
        let siblings = vec!["\\frac{1}{2}"; 20].join("+");
        assert!(!fractions(&siblings).contains("\\frac"));

        let mut nested = "1".to_string();
        for _ in 0..FRACTION_ITERATION_CAP + 1 {
            nested = format!("\\frac{{{nested}}}{{2}}");
        }
        assert!(fractions(&nested).contains("\\frac"));
    }

    #[test]
    fn phases_fragment_excludes_log_sweep_and_restore() {
        assert!(!Phases::FRAGMENT.contains(Phases::LOG_BASE));
        assert!(!Phases::FRAGMENT.contains(Phases::SWEEP));
        assert!(!Phases::FRAGMENT.contains(Phases::RESTORE));
        assert!(Phases::FRAGMENT.contains(Phases::INTEGRALS));
    }
}
