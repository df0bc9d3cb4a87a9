use crate::engine::{self, EncodeDetails, ValidationError};
use crate::{Encoder, MappingStore};
use once_cell::sync::Lazy;

static DEFAULT_ENCODER: Lazy<Encoder> = Lazy::new(|| Encoder::new(MappingStore::bundled()));

/// Shared encoder built from the bundled mapping file.
pub fn default_encoder() -> &'static Encoder {
    &DEFAULT_ENCODER
}

/// Encode `expression` with the bundled mapping.
///
/// # Example
/// ```
/// use keylog::encode;
///
/// assert_eq!(encode("x^{10}"), "[^10)");
/// ```
pub fn encode(expression: &str) -> String {
    DEFAULT_ENCODER.encode(expression)
}

/// Encode each expression independently, preserving order.
pub fn encode_batch<S: AsRef<str>>(expressions: &[S]) -> Vec<String> {
    DEFAULT_ENCODER.encode_batch(expressions)
}

/// Encode with the bundled mapping and return the per-phase trace.
///
/// The default [`encode`] path does not allocate these traces.
pub fn encode_verbose(expression: &str) -> EncodeDetails {
    DEFAULT_ENCODER.encode_verbose(expression)
}

/// Advisory syntax check; see [`engine::validate`].
pub fn validate(expression: &str) -> Result<(), ValidationError> {
    engine::validate(expression)
}
