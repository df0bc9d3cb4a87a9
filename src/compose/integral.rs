//! Definite-integral composer.
//!
//! A single integral goes straight through the encoder, whose integral phase
//! already produces `y<body>),<lower>,<upper>)`. A chain of two or more heads
//! (`\int_{a}^{b}\int_{c}^{d} body dydx`) is assembled here instead so the
//! calculator receives one `y` with every bound pair typed after the body:
//!
//! ```text
//! \int_{0}^{1}\int_{0}^{2} xy dydx
//!   heads   (0,1) (0,2)     body  xy     differentials  dydx
//!   y<xy> )q)0q)1 )q)0q)2 )
//! ```

use super::{ComposeError, Mode};
use crate::Encoder;
use crate::engine::phases::{self, SEPARATOR_TOKEN};

const INTEGRAL_SIGN: &str = "\\int";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegralRequest {
    pub expression: String,
    /// Display mode, 1 to 4.
    pub mode: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegralKeylog {
    pub keylog: String,
    /// Number of `\int` signs in the input.
    pub integrals: usize,
    /// Whether the nested-chain assembly was used.
    pub nested: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct IntegralComposer<'a> {
    encoder: &'a Encoder,
}

/// Bounds, outer to inner, and the innermost body with its differentials removed.
struct IntegralChain<'s> {
    bounds: Vec<(&'s str, &'s str)>,
    body: &'s str,
}

impl<'a> IntegralComposer<'a> {
    pub fn new(encoder: &'a Encoder) -> Self {
        IntegralComposer { encoder }
    }

    pub fn encode(&self, request: &IntegralRequest) -> Result<IntegralKeylog, ComposeError> {
        let mode = Mode::try_from(request.mode)?;
        let cleaned = phases::pre_clean(&request.expression);
        if cleaned.is_empty() {
            return Err(ComposeError::EmptyExpression);
        }

        let integrals = cleaned.matches(INTEGRAL_SIGN).count();
        if integrals == 0 {
            return Err(ComposeError::NotAnIntegral(request.expression.clone()));
        }

        let chain = if integrals >= 2 { parse_chain(&cleaned, &request.expression)? } else { None };

        let (keylog, nested) = match chain {
            Some(chain) => {
                log::debug!("nested integral: {} bound pairs", chain.bounds.len());
                (self.assemble(&chain), true)
            }
            None => (self.encoder.encode(&request.expression), false),
        };

        Ok(IntegralKeylog { keylog: mode.finish(keylog), integrals, nested })
    }

    /// `y<body>` then one `)q)<lower>q)<upper>` group per bound pair, outer to
    /// inner, then `)`. A chain of `n` integrals carries `2·n` separators.
    fn assemble(&self, chain: &IntegralChain<'_>) -> String {
        let mut keylog = format!("y{}", self.encoder.encode(chain.body));
        for (lower, upper) in &chain.bounds {
            keylog.push(')');
            keylog.push_str(SEPARATOR_TOKEN);
            keylog.push_str(&self.encoder.encode(lower));
            keylog.push_str(SEPARATOR_TOKEN);
            keylog.push_str(&self.encoder.encode(upper));
        }
        keylog.push(')');
        keylog
    }
}

/// Parse a chain of integral heads that opens the expression.
///
/// Returns `Ok(None)` when fewer than two heads are adjacent at the start; the
/// caller then treats the input as an ordinary expression.
fn parse_chain<'s>(cleaned: &'s str, original: &str) -> Result<Option<IntegralChain<'s>>, ComposeError> {
    let mut bounds = Vec::new();
    let mut pos = 0;
    while let Some(head) = phases::parse_integral_head(cleaned, pos) {
        bounds.push((head.lower, head.upper));
        pos = head.end;
    }
    if bounds.len() < 2 {
        return Ok(None);
    }

    let rest = &cleaned[pos..];
    let Some(differentials) = regex!(r"(?:d[a-z])+$").find(rest) else {
        return Err(ComposeError::MissingDifferential(original.to_string()));
    };

    Ok(Some(IntegralChain { bounds, body: &rest[..differentials.start()] }))
}
