//! The phase pipeline.
//!
//! [`Encoder`] owns a [`MappingStore`] and its compiled form. Encoding is a pure
//! function of the input and the store: no state survives a call, so one
//! encoder can be shared by reference across threads.

use super::compiled_rules::{CompiledRules, SkippedRule};
use super::metrics::{EncodeDetails, PhaseMetrics};
use super::phases::{self, Phase, Phases};
use crate::MappingStore;
use std::time::Instant;

/// Keylog produced for empty input.
const EMPTY_KEYLOG: &str = "0";

/// LaTeX-to-keylog translator.
///
/// # Example
/// ```
/// use keylog::{Encoder, MappingRule, MappingStore};
///
/// let encoder = Encoder::new(MappingStore::from_rules(vec![MappingRule::literal("x", "[")]));
/// assert_eq!(encoder.encode("\\frac{1}{x^2}"), "(1)a([^2))");
/// ```
#[derive(Debug, Clone)]
pub struct Encoder {
    store: MappingStore,
    compiled: CompiledRules,
}

impl Encoder {
    pub fn new(store: MappingStore) -> Self {
        let compiled = CompiledRules::new(store.rules());
        Encoder { store, compiled }
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    /// Number of mapping rules the sweep applies.
    pub fn active_rule_count(&self) -> usize {
        self.compiled.active.len()
    }

    /// Mapping rules the sweep ignores, with the reason.
    pub fn skipped_rules(&self) -> &[SkippedRule] {
        &self.compiled.skipped
    }

    /// Translate `expression` into a keylog. Empty input yields `"0"`.
    pub fn encode(&self, expression: &str) -> String {
        self.run(&phases::strip_sentinels(expression), Phases::all(), None)
    }

    /// Lower a sub-expression the way integral bodies and bounds are lowered:
    /// no log-with-base rewrite, no sweep, no separator restoration.
    pub fn encode_fragment(&self, expression: &str) -> String {
        self.run(expression, Phases::FRAGMENT, None)
    }

    pub fn encode_batch<S: AsRef<str>>(&self, expressions: &[S]) -> Vec<String> {
        expressions.iter().map(|e| self.encode(e.as_ref())).collect()
    }

    /// Like [`encode`](Self::encode), also returning the output of every phase.
    pub fn encode_verbose(&self, expression: &str) -> EncodeDetails {
        let started = Instant::now();
        let mut trace = Vec::with_capacity(Phase::PIPELINE.len());
        let keylog = self.run(&phases::strip_sentinels(expression), Phases::all(), Some(&mut trace));

        EncodeDetails {
            input: expression.to_string(),
            keylog,
            phases: trace,
            total: started.elapsed(),
            active_rules: self.compiled.active.len(),
            skipped_rules: self.compiled.skipped.len(),
        }
    }

    fn run(&self, expression: &str, enabled: Phases, mut trace: Option<&mut Vec<PhaseMetrics>>) -> String {
        if expression.trim().is_empty() {
            return EMPTY_KEYLOG.to_string();
        }

        let mut text = expression.to_string();
        // Integrals lowered by Phase D, held back until Phase G has run.
        let mut stash = Vec::new();
        for phase in Phase::PIPELINE {
            if !enabled.contains(phase.flag()) {
                continue;
            }

            let started = Instant::now();
            let next = self.apply(phase, &text, &mut stash);
            log::trace!("[{}] {:?}", phase.label(), next);

            if let Some(trace) = trace.as_deref_mut() {
                trace.push(PhaseMetrics {
                    phase,
                    changed: next != text,
                    output: next.clone(),
                    duration: started.elapsed(),
                });
            }

            text = next;
            // Only sizing hints: nothing left to encode.
            if phase == Phase::PreClean && text.is_empty() {
                return EMPTY_KEYLOG.to_string();
            }
        }

        text
    }

    fn apply(&self, phase: Phase, text: &str, stash: &mut Vec<String>) -> String {
        match phase {
            Phase::PreClean => phases::pre_clean(text),
            Phase::LogBase => phases::log_base(text),
            Phase::NamedFunctions => phases::named_functions(text),
            Phase::Integrals => phases::integrals(text, |fragment| self.encode_fragment(fragment), stash),
            Phase::Exponents => phases::exponents(text),
            Phase::Fractions => phases::fractions(text),
            Phase::Braces => phases::expand_placeholders(&phases::braces(text), stash),
            Phase::Sweep => self.sweep(text),
            Phase::Restore => phases::restore_separators(text),
        }
    }

    /// Phase H: every active rule, in store order, over all current occurrences.
    fn sweep(&self, text: &str) -> String {
        self.compiled.active.iter().fold(text.to_string(), |acc, rule| match rule.apply(&acc) {
            Some(next) => {
                log::trace!("mapping rule #{} fired", rule.index);
                next
            }
            None => acc,
        })
    }
}

/// Surface defects reported by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("expression is empty")]
    Empty,

    #[error("unbalanced braces: {open} opening vs {close} closing")]
    UnbalancedBraces { open: usize, close: usize },
}

/// Advisory syntax check: non-empty and matching brace counts.
///
/// [`Encoder::encode`] never calls this; malformed input is encoded best-effort.
pub fn validate(expression: &str) -> Result<(), ValidationError> {
    if expression.trim().is_empty() {
        return Err(ValidationError::Empty);
    }

    let open = expression.matches('{').count();
    let close = expression.matches('}').count();
    if open != close {
        return Err(ValidationError::UnbalancedBraces { open, close });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MappingRule;

    fn encoder() -> Encoder {
        Encoder::new(MappingStore::from_rules(vec![
            MappingRule::literal("*", "O").with_description("Multiplication sign"),
            MappingRule::literal("x", "[").with_description("Variable x"),
        ]))
    }

    #[test]
    fn empty_input_is_zero() {
        let enc = encoder();
        for input in ["", "   ", "\t\n", "\\left\\right", " \\left \\right "] {
            assert_eq!(enc.encode(input), "0", "empty handling for {input:?}");
        }
    }

    #[test]
    fn end_to_end_scenarios() {
        let cases = vec![
            ("x^{10}", "[^10)"),
            ("\\frac{1}{x^2}", "(1)a([^2))"),
            ("\\int_{0}^{1} x^2 dx", "y[^2)),0,1)"),
            ("\\int_{1}^{e} \\log_2(x) dx", "yi([q)2)),1,e)"),
            ("\\log_7{(3x)}", "i((3[),7))"),
            ("\\sqrt{x^2}", "s([^2))"),
            ("\\sin(x)\\cdot\\cos(x)", "j([)Ok([)"),
            ("\\left(x+1\\right)^{2}", "([+1)^2)"),
        ];

        let enc = encoder();
        for (input, expected) in cases {
            assert_eq!(enc.encode(input), expected, "encoding {input}");
        }
    }

    #[test]
    fn log_with_base_leaves_single_log_key() {
        let out = encoder().encode("\\log_2(x)");
        assert_eq!(out.matches('i').count(), 1);
        assert!(!out.contains("\\log"));
        assert_eq!(out, "i([q)2)");
    }

    #[test]
    fn sqrt_leaves_no_braces() {
        let out = encoder().encode("\\sqrt{x^2}");
        assert_eq!(out.matches('s').count(), 1);
        assert!(!out.contains("\\sqrt") && !out.contains('{') && !out.contains('}'));
    }

    #[test]
    fn determinism_and_batch_distributivity() {
        let enc = encoder();
        let inputs = ["\\frac{x}{2}", "\\int_{0}^{\\pi} \\sin(x) dx", "x^{2}+3x-1", ""];

        let batch = enc.encode_batch(&inputs);
        let single: Vec<String> = inputs.iter().map(|i| enc.encode(i)).collect();
        assert_eq!(batch, single);
        assert_eq!(enc.encode_batch(&inputs), batch);
    }

    #[test]
    fn whitespace_and_sizing_hints_are_transparent() {
        let enc = encoder();
        let cases = vec![
            ("\\frac { 1 } { x ^ 2 }", "\\frac{1}{x^2}"),
            ("\\left( x + 1 \\right) ^ { 2 }", "(x+1)^{2}"),
            ("\\int_{0}^{1} \\left( x \\right) dx", "\\int_{0}^{1}(x)dx"),
            ("\\log_2 \\left( x \\right)", "\\log_2(x)"),
        ];
        for (spaced, compact) in cases {
            assert_eq!(enc.encode(spaced), enc.encode(compact), "transparency for {spaced}");
        }
    }

    #[test]
    fn balanced_input_leaves_no_braces() {
        let enc = encoder();
        for input in ["\\frac{\\frac{1}{x}}{x^{2}}", "\\sqrt{\\frac{x}{2}}", "{x}^{{2}}", "\\log_{2}{x}"] {
            let out = enc.encode(input);
            assert!(!out.contains('{') && !out.contains('}'), "braces left in {out} for {input}");
        }
    }

    #[test]
    fn empty_store_only_lowers_structure() {
        let enc = Encoder::new(MappingStore::empty());
        assert_eq!(enc.encode("x^{10}"), "x^10)");
        assert_eq!(enc.encode("\\frac{1}{x^2}"), "(1)a(x^2))");
    }

    #[test]
    fn sweep_respects_rule_order() {
        let forward = Encoder::new(MappingStore::from_rules(vec![
            MappingRule::literal("m", "n"),
            MappingRule::literal("n", "o"),
        ]));
        let backward = Encoder::new(MappingStore::from_rules(vec![
            MappingRule::literal("n", "o"),
            MappingRule::literal("m", "n"),
        ]));

        assert_eq!(forward.encode("m"), "o");
        assert_eq!(backward.encode("m"), "n");
    }

    #[test]
    fn structural_rules_do_not_refire() {
        let enc = Encoder::new(MappingStore::from_rules(vec![
            MappingRule::literal("(", "<").with_description("Mở ngoặc"),
            MappingRule::regex(r"\\frac", "F"),
            MappingRule::literal("x", "["),
        ]));

        assert_eq!(enc.active_rule_count(), 1);
        assert_eq!(enc.skipped_rules().len(), 2);
        assert_eq!(enc.encode("\\frac{1}{x}"), "(1)a([)");
    }

    #[test]
    fn separator_is_hidden_from_sweep() {
        let enc = Encoder::new(MappingStore::from_rules(vec![
            MappingRule::literal(",", "Q"),
            MappingRule::literal("q", "W"),
            MappingRule::literal("x", "["),
        ]));
        assert_eq!(enc.encode("\\log_2(x)"), "i([q)2)");
        assert_eq!(enc.encode("\\log_{2}(x)"), "i([Q2)");
    }

    #[test]
    fn user_supplied_sentinel_is_dropped() {
        assert_eq!(encoder().encode("x\u{1d}2"), "[2");
    }

    #[test]
    fn integral_parts_are_lowered_once() {
        let enc = Encoder::new(MappingStore::empty());
        let cases = vec![
            ("\\int_{0}^{1} e^{x+1} dx", format!("y{}),0,1)", enc.encode_fragment("e^{x+1}"))),
            ("\\int_{0}^{a^{n+1}} t dt", format!("yt),0,{})", enc.encode_fragment("a^{n+1}"))),
            ("\\int_{0}^{1} e^{x+1} dx", "ye^x+1)),0,1)".to_string()),
            ("\\int_{0}^{a^{n+1}} t dt", "yt),0,a^n+1))".to_string()),
            ("\\int_{0}^{1} x dx + \\int_{0}^{1} y", "yx),0,1)+\\int_(0)^1)y".to_string()),
        ];
        for (input, expected) in cases {
            assert_eq!(enc.encode(input), expected, "encoding {input}");
        }
    }

    #[test]
    fn nested_integrals_emerge_outer_ward() {
        let out = encoder().encode("\\int_{0}^{1} \\int_{0}^{x} x*y dy dx");
        assert_eq!(out, "yy[Oy),0,[)),0,1)");
    }

    #[test]
    fn verbose_trace_matches_encode() {
        let enc = encoder();
        let details = enc.encode_verbose("\\frac{1}{x^2}");

        assert_eq!(details.keylog, enc.encode("\\frac{1}{x^2}"));
        assert_eq!(details.phases.len(), Phase::PIPELINE.len());
        assert_eq!(details.active_rules, 2);

        let effective: Vec<Phase> = details.effective_phases().collect();
        assert_eq!(effective, vec![Phase::Exponents, Phase::Fractions, Phase::Sweep]);
    }

    #[test]
    fn fragments_skip_sweep() {
        assert_eq!(encoder().encode_fragment("x^2"), "x^2)");
        assert_eq!(encoder().encode_fragment(""), "0");
    }

    #[test]
    fn malformed_input_is_encoded_best_effort() {
        let out = encoder().encode("\\frac{1}{x");
        assert!(out.contains("\\frac"));
        assert!(validate("\\frac{1}{x").is_err());
    }

    #[test]
    fn validation_reasons() {
        assert_eq!(validate("  "), Err(ValidationError::Empty));
        assert_eq!(validate("\\frac{1}{2"), Err(ValidationError::UnbalancedBraces { open: 2, close: 1 }));
        assert_eq!(validate("\\frac{1}{2}"), Ok(()));
        assert_eq!(
            ValidationError::UnbalancedBraces { open: 2, close: 1 }.to_string(),
            "unbalanced braces: 2 opening vs 1 closing"
        );
    }
}
