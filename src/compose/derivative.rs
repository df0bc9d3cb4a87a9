//! Derivative composer.
//!
//! Lagrange (`f''(x)`) and prime (`y'`) notations are rewritten into the
//! Leibniz fraction before encoding, so the encoder only ever sees
//! `\frac{d^n f}{dx^n}`. The keylog opens with the mode-keyed `qw2<mode>`
//! sequence.

use super::{ComposeError, Mode};
use crate::Encoder;
use crate::engine::phases;

const DERIVATIVE_PREFIX: &str = "qw2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeRequest {
    pub expression: String,
    pub mode: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeKeylog {
    pub keylog: String,
    pub order: u32,
    pub variable: char,
    /// The Leibniz form that was encoded.
    pub normalized: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DerivativeComposer<'a> {
    encoder: &'a Encoder,
}

impl<'a> DerivativeComposer<'a> {
    pub fn new(encoder: &'a Encoder) -> Self {
        DerivativeComposer { encoder }
    }

    pub fn encode(&self, request: &DerivativeRequest) -> Result<DerivativeKeylog, ComposeError> {
        let mode = Mode::try_from(request.mode)?;
        let cleaned = phases::pre_clean(&request.expression);
        if cleaned.is_empty() {
            return Err(ComposeError::EmptyExpression);
        }

        let normalized = normalize(&cleaned);
        let not_a_derivative = || ComposeError::NotADerivative(request.expression.clone());

        let order_caps = regex!(r"\\frac\{d(?:\^\{?(\d+)\}?)?").captures(&normalized).ok_or_else(not_a_derivative)?;
        let order = match order_caps.get(1) {
            Some(digits) => digits.as_str().parse::<u32>().map_err(|_| not_a_derivative())?,
            None => 1,
        };
        let variable = regex!(r"\}\{d([a-z])")
            .captures(&normalized)
            .and_then(|caps| caps[1].chars().next())
            .ok_or_else(not_a_derivative)?;

        log::debug!("derivative of order {order} in {variable}: {normalized}");

        let keylog = format!("{DERIVATIVE_PREFIX}{}{}", mode.number(), self.encoder.encode(&normalized));
        Ok(DerivativeKeylog { keylog: mode.finish(keylog), order, variable, normalized })
    }
}

/// Rewrite Lagrange and prime notation into Leibniz fractions.
fn normalize(cleaned: &str) -> String {
    let shapes = [
        (regex!(r"([A-Za-z])'''\(([a-z])\)"), r"\frac{d^3${1}}{d${2}^3}"),
        (regex!(r"([A-Za-z])''\(([a-z])\)"), r"\frac{d^2${1}}{d${2}^2}"),
        (regex!(r"([A-Za-z])'\(([a-z])\)"), r"\frac{d${1}}{d${2}}"),
        (regex!(r"([A-Za-z])'''"), r"\frac{d^3${1}}{dx^3}"),
        (regex!(r"([A-Za-z])''"), r"\frac{d^2${1}}{dx^2}"),
        (regex!(r"([A-Za-z])'"), r"\frac{d${1}}{dx}"),
    ];

    shapes.iter().fold(cleaned.to_string(), |text, (re, template)| re.replace_all(&text, *template).into_owned())
}
