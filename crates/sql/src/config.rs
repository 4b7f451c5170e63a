//! Dialect configuration

use crate::planner::MutationBudget;
use crate::staleness::StalenessBound;
use chrono::{FixedOffset, Offset, Utc};
use spanql_value::CodecConfig;

/// Settings shared by the grammar, planner and schema synthesizer.
///
/// Built once and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DialectConfig {
    /// Per-commit mutation ceiling for non-partitioned writes
    pub mutation_budget: MutationBudget,

    /// Data boost for reads that do not set their own flag
    pub data_boost: bool,

    /// Staleness for reads that do not set their own bound
    pub default_staleness: Option<StalenessBound>,

    /// Offset for date-times that carry none (default: UTC)
    pub timezone: FixedOffset,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            mutation_budget: MutationBudget::default(),
            data_boost: false,
            default_staleness: None,
            timezone: Utc.fix(),
        }
    }
}

impl DialectConfig {
    pub fn with_mutation_budget(mut self, budget: u64) -> Self {
        self.mutation_budget = MutationBudget(budget);
        self
    }

    pub fn with_data_boost(mut self, enabled: bool) -> Self {
        self.data_boost = enabled;
        self
    }

    pub fn with_default_staleness(mut self, staleness: StalenessBound) -> Self {
        self.default_staleness = Some(staleness);
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    /// The codec settings derived from this configuration
    pub fn codec(&self) -> CodecConfig {
        CodecConfig {
            timezone: self.timezone,
        }
    }
}
