//! Expression encoder.
//!
//! This module is the translation core: it turns a LaTeX-like expression into
//! a keylog, the flat token string a calculator replays as keystrokes.
//!
//! ## How the parts work together
//!
//! ```text
//! MappingStore ──┐
//!                │  CompiledRules::new          (compiled_rules.rs)
//!                └──────────────┬─────────────
//!                               │  active rules, skipped rules
//!                               v
//! input ──▶ Encoder::run (encoder.rs)
//!             A  pre-clean             ┐
//!             B  log-with-base         │
//!             C  named functions       │ structural phases
//!             D  integrals (recursive) │ (phases.rs)
//!             E  exponents             │
//!             F  fractions             │
//!             G  brace normalization   ┘
//!             H  generic sweep          ── compiled mapping rules, in order
//!             I  sentinel restoration
//!                               │
//!                               v
//!                            keylog
//! ```
//!
//! Every phase runs on every call and sees the output of the previous one.
//! Integral bodies and bounds are re-encoded through the *fragment* subset of
//! the pipeline (A, C–G): the log rewrite has already been applied to the
//! outer string, and the sweep must fire only once over the final text.
//!
//! ## Responsibilities by module
//!
//! - `compiled_rules.rs`: compiles mapping rules into matchers and decides
//!   which ones the sweep skips because a structural phase owns the construct.
//! - `phases.rs`: the hard-coded structural rewrites and the [`Phases`] set.
//! - `encoder.rs`: [`Encoder`], the fixed phase order, the sweep, validation.
//! - `metrics.rs`: per-phase trace for [`Encoder::encode_verbose`].
//!
//! ## Debugging
//!
//! Run with `RUST_LOG=keylog=trace` to log the output of every phase.

#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/encoder.rs"]
mod encoder;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/phases.rs"]
pub(crate) mod phases;

pub use compiled_rules::{SkipReason, SkippedRule};
pub use encoder::{Encoder, ValidationError, validate};
pub use metrics::{EncodeDetails, PhaseMetrics};
pub use phases::{Phase, Phases};
