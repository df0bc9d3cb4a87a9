//! Domain composition layer.
//!
//! Each composer is a thin front-end over [`Encoder`]:
//!
//! ```text
//! request ──▶ parse domain shape ──▶ encode each sub-expression ──▶ frame ──▶ mode post-processing
//!             (coefficients,          (Encoder::encode)              (prefix,     (q) -> $ for
//!              bounds, shapes)                                        separators,  modes 1 and 2)
//!                                                                     suffix)
//! ```
//!
//! Composers borrow the encoder (and, where the domain needs one, a
//! [`FramingTable`](crate::FramingTable)) and hold no other state. Prefixes and
//! suffixes are never passed through the encoder; empty sub-expressions are
//! encoded as `"0"`.
//!
//! ## Modules
//!
//! - `equation.rs`: simultaneous linear equations, `v·(v+1)` coefficients.
//! - `polynomial.rs`: polynomial roots, `d+1` coefficients.
//! - `integral.rs`: single and nested definite integrals.
//! - `derivative.rs`: Leibniz, Lagrange and prime notation derivatives.
//! - `geometry.rs`: points, lines, planes, circles and spheres.

#[path = "compose/derivative.rs"]
mod derivative;
#[path = "compose/equation.rs"]
mod equation;
#[path = "compose/geometry.rs"]
mod geometry;
#[path = "compose/integral.rs"]
mod integral;
#[path = "compose/polynomial.rs"]
mod polynomial;

pub use derivative::{DerivativeComposer, DerivativeKeylog, DerivativeRequest};
pub use equation::{EquationComposer, EquationKeylog, EquationRequest};
pub use geometry::{GeometryComposer, GeometryKeylog, GeometryRequest, Operation, Shape, ShapeInput};
pub use integral::{IntegralComposer, IntegralKeylog, IntegralRequest};
pub use polynomial::{PolynomialComposer, PolynomialKeylog, PolynomialRequest};

use crate::Encoder;
use crate::engine::phases::SEPARATOR_TOKEN;

/// Token that replaces the argument separator in display modes 1 and 2.
const DOLLAR_SEPARATOR: &str = "$";

/// Surface errors reported by the composers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("coefficient list is empty")]
    EmptyCoefficients,

    #[error("unsupported variable count {0} (expected 2, 3 or 4)")]
    UnsupportedVariableCount(usize),

    #[error("unsupported polynomial degree {0} (expected 2, 3 or 4)")]
    UnsupportedDegree(usize),

    #[error("no framing for version '{version}' and key '{key}'")]
    UnknownVersion { version: String, key: String },

    #[error("invalid mode {0} (expected 1, 2, 3 or 4)")]
    InvalidMode(u8),

    #[error("expression is empty")]
    EmptyExpression,

    #[error("no integral sign in '{0}'")]
    NotAnIntegral(String),

    #[error("malformed integral '{0}': missing differential")]
    MissingDifferential(String),

    #[error("unrecognized derivative shape '{0}'")]
    NotADerivative(String),

    #[error("unknown geometry operation '{0}'")]
    UnknownOperation(String),

    #[error("unknown geometry shape '{0}'")]
    UnknownShape(String),

    #[error("{0} needs a second shape")]
    MissingSecondaryShape(Operation),

    #[error("unsupported dimension {0} (expected 2 or 3)")]
    UnsupportedDimension(u8),

    #[error("{shape} expects {expected} parameter groups, got {actual}")]
    ShapeParameters { shape: Shape, expected: usize, actual: usize },
}

/// Calculator display mode for integral and derivative entry.
///
/// The only effect on the keylog is the argument separator: modes 1 and 2 type
/// it as `$`, modes 3 and 4 keep `q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    One,
    Two,
    Three,
    Four,
}

impl Mode {
    pub fn number(self) -> u8 {
        match self {
            Mode::One => 1,
            Mode::Two => 2,
            Mode::Three => 3,
            Mode::Four => 4,
        }
    }

    pub fn uses_dollar_separator(self) -> bool {
        matches!(self, Mode::One | Mode::Two)
    }

    /// Mode post-processing applied to a finished keylog.
    pub(crate) fn finish(self, keylog: String) -> String {
        if self.uses_dollar_separator() { keylog.replace(SEPARATOR_TOKEN, DOLLAR_SEPARATOR) } else { keylog }
    }
}

impl TryFrom<u8> for Mode {
    type Error = ComposeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Mode::One),
            2 => Ok(Mode::Two),
            3 => Ok(Mode::Three),
            4 => Ok(Mode::Four),
            other => Err(ComposeError::InvalidMode(other)),
        }
    }
}

/// Encode coefficients for a bundle of `required` entries.
///
/// Extra coefficients are dropped. Returns `true` as the second element when
/// the list was short and the caller must use fallback framing.
pub(crate) fn encode_coefficients(encoder: &Encoder, coefficients: &[String], required: usize) -> (Vec<String>, bool) {
    let encoded: Vec<String> = coefficients.iter().take(required).map(|c| encoder.encode(or_zero(c))).collect();
    let short = encoded.len() < required;
    (encoded, short)
}

/// Empty sub-expressions stand for zero.
pub(crate) fn or_zero(expression: &str) -> &str {
    if expression.trim().is_empty() { "0" } else { expression }
}
