//! Polynomial-root composer.
//!
//! A degree-`d` polynomial is entered as `d + 1` coefficients, highest power
//! first, then committed with the frame's suffix (`==` in the bundled tables).

use super::{ComposeError, encode_coefficients};
use crate::{Encoder, FramingTable};

const DEFAULT_SUFFIX: &str = "==";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolynomialRequest {
    /// Coefficients from the leading term down to the constant.
    pub coefficients: Vec<String>,
    pub version: String,
    pub degree: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolynomialKeylog {
    pub keylog: String,
    pub coefficients: Vec<String>,
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PolynomialComposer<'a> {
    encoder: &'a Encoder,
    framing: &'a FramingTable,
}

impl<'a> PolynomialComposer<'a> {
    pub fn new(encoder: &'a Encoder, framing: &'a FramingTable) -> Self {
        PolynomialComposer { encoder, framing }
    }

    pub fn encode(&self, request: &PolynomialRequest) -> Result<PolynomialKeylog, ComposeError> {
        let degree = request.degree;
        if !(2..=4).contains(&degree) {
            return Err(ComposeError::UnsupportedDegree(degree));
        }
        if request.coefficients.is_empty() {
            return Err(ComposeError::EmptyCoefficients);
        }

        let key = format!("degree_{degree}");
        let frame = self
            .framing
            .frame(&request.version, &key)
            .ok_or_else(|| ComposeError::UnknownVersion { version: request.version.clone(), key })?;

        let (coefficients, fallback) = encode_coefficients(self.encoder, &request.coefficients, degree + 1);
        let body = coefficients.join("=");

        let keylog = if fallback {
            log::debug!("polynomial: {} of {} coefficients, using fallback framing", coefficients.len(), degree + 1);
            format!("{}{body}=", frame.prefix)
        } else {
            format!("{}{body}{}", frame.prefix, frame.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX))
        };

        Ok(PolynomialKeylog { keylog, coefficients, fallback })
    }
}
