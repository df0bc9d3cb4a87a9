//! Encoder run trace.
//!
//! [`Encoder::encode_verbose`](super::Encoder::encode_verbose) records the output
//! of every phase so a rule author can see which step produced a token. The
//! plain `encode` path never allocates these snapshots.

use super::phases::Phase;
use std::time::Duration;

/// Output of a single phase.
#[derive(Debug, Clone)]
pub struct PhaseMetrics {
    pub phase: Phase,
    /// Working string after the phase ran.
    pub output: String,
    /// Whether the phase changed the working string.
    pub changed: bool,
    pub duration: Duration,
}

/// Keylog plus the per-phase trace that produced it.
#[derive(Debug, Clone)]
pub struct EncodeDetails {
    pub input: String,
    pub keylog: String,
    pub phases: Vec<PhaseMetrics>,
    pub total: Duration,
    /// Mapping rules applied by the sweep.
    pub active_rules: usize,
    /// Mapping rules the sweep ignored.
    pub skipped_rules: usize,
}

impl EncodeDetails {
    /// Phases that changed the working string, in pipeline order.
    pub fn effective_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.phases.iter().filter(|m| m.changed).map(|m| m.phase)
    }
}
