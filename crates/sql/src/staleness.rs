//! Read staleness bounds and the out-of-band transaction options they produce

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How stale the snapshot of a read may be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StalenessBound {
    /// Read the latest committed data
    Strong,
    /// Read at exactly this far in the past
    ExactStaleness(Duration),
    /// Read at any timestamp at or after this one
    MinReadTimestamp(DateTime<Utc>),
    /// Read at any timestamp no staler than this
    MaxStaleness(Duration),
    /// Read at exactly this timestamp
    ReadTimestamp(DateTime<Utc>),
}

impl StalenessBound {
    /// Bounded staleness lets the backend pick the timestamp, which it only
    /// allows for single-use read-only transactions.
    pub fn is_bounded(&self) -> bool {
        matches!(
            self,
            StalenessBound::MinReadTimestamp(_) | StalenessBound::MaxStaleness(_)
        )
    }

    pub fn to_read_only(&self) -> ReadOnlyOptions {
        let mut options = ReadOnlyOptions::default();
        match self {
            StalenessBound::Strong => options.strong = Some(true),
            StalenessBound::ExactStaleness(d) => options.exact_staleness = Some(format_duration(d)),
            StalenessBound::MinReadTimestamp(ts) => {
                options.min_read_timestamp = Some(format_timestamp(ts))
            }
            StalenessBound::MaxStaleness(d) => options.max_staleness = Some(format_duration(d)),
            StalenessBound::ReadTimestamp(ts) => options.read_timestamp = Some(format_timestamp(ts)),
        }
        options.return_read_timestamp = self.is_bounded();
        options
    }
}

/// Read-only transaction settings in the backend's JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOnlyOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strong: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_read_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_staleness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_staleness: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub return_read_timestamp: bool,
}

/// Options the executor applies when opening the transaction for a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<ReadOnlyOptions>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub data_boost_enabled: bool,
}

impl TransactionOptions {
    /// Options for a read with the given bound and data boost flag
    pub fn read(staleness: Option<&StalenessBound>, data_boost: bool) -> Self {
        Self {
            read_only: staleness.map(StalenessBound::to_read_only),
            data_boost_enabled: data_boost,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.read_only.is_none() && !self.data_boost_enabled
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Protobuf JSON duration: seconds with up to nine fractional digits.
fn format_duration(d: &Duration) -> String {
    let nanos = d.subsec_nanos();
    if nanos == 0 {
        return format!("{}s", d.as_secs());
    }
    let frac = format!("{:09}", nanos);
    format!("{}.{}s", d.as_secs(), frac.trim_end_matches('0'))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
