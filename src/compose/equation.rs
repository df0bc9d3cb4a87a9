//! Equation-system composer.
//!
//! A system of `v` linear equations in `v` unknowns is entered row by row:
//! `v + 1` coefficients per equation, each committed with `=`.
//!
//! ```text
//! fx799, v = 2, [1, 2, 3, 4, 5, 6]
//!   w912 1=2=3=4=5=6 == =
//!   │    │           └─ suffix: "==" then one " =" per extra equation
//!   │    └─ encoded coefficients joined with "="
//!   └─ prefix from the "2_var" framing entry
//! ```

use super::{ComposeError, encode_coefficients};
use crate::{Encoder, FramingTable};

/// Input for [`EquationComposer::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationRequest {
    /// Row-major coefficients, `variables * (variables + 1)` of them.
    pub coefficients: Vec<String>,
    /// Calculator version used to pick the prefix.
    pub version: String,
    pub variables: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationKeylog {
    pub keylog: String,
    /// Encoded coefficients, after truncation.
    pub coefficients: Vec<String>,
    /// Whether the list was short and the plain `join + "="` framing was used.
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct EquationComposer<'a> {
    encoder: &'a Encoder,
    framing: &'a FramingTable,
}

impl<'a> EquationComposer<'a> {
    pub fn new(encoder: &'a Encoder, framing: &'a FramingTable) -> Self {
        EquationComposer { encoder, framing }
    }

    pub fn encode(&self, request: &EquationRequest) -> Result<EquationKeylog, ComposeError> {
        let variables = request.variables;
        if !(2..=4).contains(&variables) {
            return Err(ComposeError::UnsupportedVariableCount(variables));
        }
        if request.coefficients.is_empty() {
            return Err(ComposeError::EmptyCoefficients);
        }

        let key = format!("{variables}_var");
        let frame = self
            .framing
            .frame(&request.version, &key)
            .ok_or_else(|| ComposeError::UnknownVersion { version: request.version.clone(), key })?;

        let required = variables * (variables + 1);
        let (coefficients, fallback) = encode_coefficients(self.encoder, &request.coefficients, required);
        let body = coefficients.join("=");

        let keylog = if fallback {
            log::debug!("equation system: {} of {required} coefficients, using fallback framing", coefficients.len());
            format!("{}{body}=", frame.prefix)
        } else {
            let suffix = frame.suffix.clone().unwrap_or_else(|| equation_suffix(variables));
            format!("{}{body}{suffix}", frame.prefix)
        };

        Ok(EquationKeylog { keylog, coefficients, fallback })
    }
}

/// `"=="` plus one `" ="` per equation beyond the first.
pub fn equation_suffix(variables: usize) -> String {
    let mut suffix = String::from("==");
    for _ in 1..variables {
        suffix.push_str(" =");
    }
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Domain, MappingStore};

    fn request(coefficients: &[&str], version: &str, variables: usize) -> EquationRequest {
        EquationRequest {
            coefficients: coefficients.iter().map(|c| c.to_string()).collect(),
            version: version.to_string(),
            variables,
        }
    }

    #[test]
    fn suffix_grows_with_variables() {
        assert_eq!(equation_suffix(2), "== =");
        assert_eq!(equation_suffix(3), "== = =");
        assert_eq!(equation_suffix(4), "== = = =");
    }

    #[test]
    fn two_variable_system() {
        let encoder = Encoder::new(MappingStore::bundled());
        let framing = FramingTable::bundled(Domain::Equation);
        let composer = EquationComposer::new(&encoder, &framing);

        let out = composer.encode(&request(&["1", "2", "3", "4", "5", "6"], "fx799", 2)).unwrap();
        assert_eq!(out.keylog, "w9121=2=3=4=5=6== =");
        assert!(!out.fallback);
    }

    #[test]
    fn coefficients_appear_encoded_in_order() {
        let encoder = Encoder::new(MappingStore::bundled());
        let framing = FramingTable::bundled(Domain::Equation);
        let composer = EquationComposer::new(&encoder, &framing);

        let coefficients = ["\\frac{1}{2}", "x^{2}", "-3", "\\sqrt{2}", "", "4", "1", "1", "1", "0", "2", "7"];
        let out = composer.encode(&request(&coefficients, "fx880", 3)).unwrap();

        let expected: Vec<String> = coefficients.iter().map(|c| encoder.encode(c)).collect();
        assert_eq!(out.coefficients, expected);
        assert_eq!(out.keylog, format!("w9113{}== = =", expected.join("=")));
        assert_eq!(out.coefficients[4], "0");
    }

    #[test]
    fn long_lists_are_truncated_and_short_lists_fall_back() {
        let encoder = Encoder::new(MappingStore::empty());
        let framing = FramingTable::bundled(Domain::Equation);
        let composer = EquationComposer::new(&encoder, &framing);

        let long = composer.encode(&request(&["1", "2", "3", "4", "5", "6", "7", "8"], "fx799", 2)).unwrap();
        assert_eq!(long.keylog, "w9121=2=3=4=5=6== =");

        let short = composer.encode(&request(&["1", "2", "3", "4"], "fx799", 2)).unwrap();
        assert_eq!(short.keylog, "w9121=2=3=4=");
        assert!(short.fallback);
    }

    #[test]
    fn surface_errors() {
        let encoder = Encoder::new(MappingStore::empty());
        let framing = FramingTable::bundled(Domain::Equation);
        let composer = EquationComposer::new(&encoder, &framing);

        assert_eq!(composer.encode(&request(&["1"], "fx799", 5)), Err(ComposeError::UnsupportedVariableCount(5)));
        assert_eq!(composer.encode(&request(&[], "fx799", 2)), Err(ComposeError::EmptyCoefficients));
        assert_eq!(
            composer.encode(&request(&["1"], "fx580", 4)),
            Err(ComposeError::UnknownVersion { version: "fx580".into(), key: "4_var".into() })
        );
    }
}
