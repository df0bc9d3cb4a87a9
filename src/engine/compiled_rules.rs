//! Mapping rule compilation.
//!
//! The generic sweep (Phase H) applies the Mapping Store rule by rule. Before a
//! store can be swept it is compiled once, here:
//!
//! 1. **Classify** each rule: rules that would re-fire on a construct owned by a
//!    structural phase (fractions, roots, trig functions, braces, anything with
//!    a backslash) are skipped.
//! 2. **Compile** the matcher: literal rules keep their pattern, regex rules get
//!    a compiled `Regex` and a replacement template with `\N` group references
//!    rewritten to the `${N}` syntax of the `regex` crate.
//!
//! ## Skip classification
//!
//! A rule carrying an explicit `structural` tag is classified by the tag alone.
//! Untagged rules go through the marker heuristic: a rule is skipped when its
//! description (case-insensitively) or its find pattern contains one of
//! [`SKIP_MARKERS`]. The heuristic has false positives (a description that
//! happens to say "constant" contains "tan"); tag the rule to opt out.
//!
//! ## Invariants
//!
//! - `CompiledRules::active` preserves store order.
//! - A rule appears in exactly one of `active` or `skipped`.

use crate::MappingRule;
use crate::RuleKind;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// Substrings that mark a rule as belonging to a structural phase.
pub const SKIP_MARKERS: &[&str] = &["frac", "tích phân", "ngoặc", "{", "}", "sqrt", "sin", "cos", "tan", "ln", "\\"];

bitflags::bitflags! {
    /// Why the sweep ignores a rule. Several reasons can apply at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SkipReason: u8 {
        const DESCRIPTION_MARKER = 1 << 0;
        const PATTERN_MARKER     = 1 << 1;
        const TAGGED_STRUCTURAL  = 1 << 2;
        const INVALID_REGEX      = 1 << 3;
        const EMPTY_PATTERN      = 1 << 4;
    }
}

/// A rule the sweep will not apply, kept for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    /// Position in the Mapping Store.
    pub index: usize,
    pub pattern: String,
    pub description: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Regex(Regex),
}

/// An active rule, ready to be applied to a working string.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub index: usize,
    matcher: Matcher,
    replacement: String,
}

impl CompiledRule {
    /// Apply the rule to every occurrence in `text`. Returns `None` when nothing matched.
    pub fn apply(&self, text: &str) -> Option<String> {
        match &self.matcher {
            Matcher::Literal(pattern) => {
                text.contains(pattern.as_str()).then(|| text.replace(pattern.as_str(), &self.replacement))
            }
            Matcher::Regex(re) => match re.replace_all(text, self.replacement.as_str()) {
                Cow::Borrowed(_) => None,
                Cow::Owned(out) => Some(out),
            },
        }
    }
}

/// A Mapping Store split into the rules the sweep applies and the ones it skips.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledRules {
    pub active: Vec<CompiledRule>,
    pub skipped: Vec<SkippedRule>,
}

impl CompiledRules {
    pub fn new(rules: &[MappingRule]) -> Self {
        let mut compiled = CompiledRules::default();

        for (index, rule) in rules.iter().enumerate() {
            let mut reason = classify(rule);

            let matcher = match rule.kind {
                RuleKind::Literal => Some(Matcher::Literal(rule.pattern.clone())),
                RuleKind::Regex => match Regex::new(&rule.pattern) {
                    Ok(re) => Some(Matcher::Regex(re)),
                    Err(err) => {
                        log::warn!("dropping mapping rule #{index} ({:?}): invalid regex: {err}", rule.pattern);
                        reason |= SkipReason::INVALID_REGEX;
                        None
                    }
                },
            };

            match matcher {
                Some(matcher) if reason.is_empty() => {
                    let replacement = match rule.kind {
                        RuleKind::Literal => rule.replacement.clone(),
                        RuleKind::Regex => translate_group_refs(&rule.replacement),
                    };
                    compiled.active.push(CompiledRule { index, matcher, replacement });
                }
                _ => compiled.skipped.push(SkippedRule {
                    index,
                    pattern: rule.pattern.clone(),
                    description: rule.description.clone(),
                    reason,
                }),
            }
        }

        log::debug!("compiled mapping rules: {} active, {} skipped", compiled.active.len(), compiled.skipped.len());
        compiled
    }
}

fn classify(rule: &MappingRule) -> SkipReason {
    let mut reason = SkipReason::empty();

    if rule.pattern.is_empty() {
        reason |= SkipReason::EMPTY_PATTERN;
    }

    match rule.structural {
        Some(true) => reason |= SkipReason::TAGGED_STRUCTURAL,
        Some(false) => {}
        None => {
            let description = rule.description.to_lowercase();
            if SKIP_MARKERS.iter().any(|m| description.contains(m)) {
                reason |= SkipReason::DESCRIPTION_MARKER;
            }
            if SKIP_MARKERS.iter().any(|m| rule.pattern.contains(m)) {
                reason |= SkipReason::PATTERN_MARKER;
            }
        }
    }

    reason
}

/// Rewrite `\1`-style group references into `${1}`.
fn translate_group_refs(template: &str) -> String {
    regex!(r"\\(\d+)").replace_all(template, |caps: &Captures| format!("${{{}}}", &caps[1])).into_owned()
}
