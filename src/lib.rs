extern crate self as keylog;

#[macro_use]
mod macros;
mod api;
mod compose;
mod engine;
mod framing;
mod mapping;

pub use api::{default_encoder, encode, encode_batch, encode_verbose, validate};
pub use compose::{
    ComposeError, DerivativeComposer, DerivativeKeylog, DerivativeRequest, EquationComposer, EquationKeylog,
    EquationRequest, GeometryComposer, GeometryKeylog, GeometryRequest, IntegralComposer, IntegralKeylog,
    IntegralRequest, Mode, Operation, PolynomialComposer, PolynomialKeylog, PolynomialRequest, Shape, ShapeInput,
};
pub use engine::{EncodeDetails, Encoder, Phase, PhaseMetrics, Phases, SkipReason, SkippedRule, ValidationError};
pub use framing::{Domain, Frame, FramingError, FramingTable};
pub use mapping::{MappingError, MappingStore};

// --- Mapping rules ------------------------------------------------------------

/// How a [`MappingRule`] matches the working string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RuleKind {
    /// Plain substring replacement of every occurrence.
    #[default]
    Literal,
    /// Regex replacement of every match, with capture-group interpolation.
    Regex,
}

impl RuleKind {
    /// Parse the `type` field of a mapping file entry. Anything other than
    /// `regex` is treated as literal.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("regex") { RuleKind::Regex } else { RuleKind::Literal }
    }
}

/// One entry of the ordered rewrite list applied by the generic sweep.
///
/// Rules are immutable once loaded; their position in the store decides the
/// order in which they fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    pub pattern: String,
    pub replacement: String,
    pub kind: RuleKind,
    pub description: String,
    /// Explicit structural tag. When present it replaces the marker heuristic
    /// that decides whether the sweep skips this rule.
    pub structural: Option<bool>,
}

impl MappingRule {
    pub fn literal(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        MappingRule {
            pattern: pattern.into(),
            replacement: replacement.into(),
            kind: RuleKind::Literal,
            description: String::new(),
            structural: None,
        }
    }

    pub fn regex(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        MappingRule { kind: RuleKind::Regex, ..MappingRule::literal(pattern, replacement) }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_structural(mut self, structural: bool) -> Self {
        self.structural = Some(structural);
        self
    }
}
