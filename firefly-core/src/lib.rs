use ordered_float::NotNan;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

type BoxStr = Box<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub Ulid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedState {
    On,
    Off,
    Unknown,
}

impl LedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedState::On => "ON",
            LedState::Off => "OFF",
            LedState::Unknown => "UNKNOWN",
        }
    }
}

/// One status report from a reporter. Field names on the wire follow the
/// ingest payload: `status`, `count`, `board`, `ip_address`, `timestamp`.
///
/// `sequence` is advisory only: the relay never rejects out-of-order or
/// duplicate records, it just overwrites the latest slot with whatever
/// arrived most recently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(rename = "status")]
    pub state: LedState,
    #[serde(rename = "count")]
    pub sequence: u64,
    #[serde(rename = "board")]
    pub device_label: BoxStr,
    #[serde(rename = "ip_address")]
    pub reporter_address: BoxStr,
    /// Seconds since epoch, reporter-assigned. NaN is rejected at
    /// deserialization.
    #[serde(rename = "timestamp")]
    pub observed_at: NotNan<f64>,
}

impl StatusRecord {
    /// The record every relay starts with, before any report has arrived.
    pub fn sentinel() -> Self {
        Self {
            state: LedState::Unknown,
            sequence: 0,
            device_label: "unknown".into(),
            reporter_address: "unknown".into(),
            observed_at: NotNan::default(),
        }
    }
}
