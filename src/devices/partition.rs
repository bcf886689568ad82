// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

use std::fmt;

/// Arming state of a partition as reported in `partitionsStatus48IP.xml`.
///
/// The panel's value set is open: anything not recognised is kept verbatim
/// in `Other` so it can still be displayed and compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartitionStatus {
    Armed,
    ArmedImmediate,
    Disarmed,
    Other(String),
}

impl PartitionStatus {
    /// Parse the raw element text. Surrounding whitespace is ignored.
    pub fn from_raw(s: &str) -> Self {
        match s.trim() {
            "ARMED" => Self::Armed,
            "ARMED_IMMEDIATE" => Self::ArmedImmediate,
            "DISARMED" => Self::Disarmed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Armed => "ARMED",
            Self::ArmedImmediate => "ARMED_IMMEDIATE",
            Self::Disarmed => "DISARMED",
            Self::Other(s) => s,
        }
    }

    /// Armed with or without entry delay.
    ///
    /// `ARMED_IMMEDIATE` counts as armed too, so a partition armed without
    /// delay reads `ON` in Home Assistant rather than `OFF`.
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed | Self::ArmedImmediate)
    }
}

impl fmt::Display for PartitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partition status paired with its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub index: usize,
    pub label: String,
    pub status: PartitionStatus,
}

impl Partition {
    pub fn is_armed(&self) -> bool {
        self.status.is_armed()
    }
}
