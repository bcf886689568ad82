// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

/// Zone `status` value while the zone is in alarm.
pub const ZONE_STATUS_ALARM: &str = "ALARM";
/// Zone `status` value for a healthy, idle zone.
pub const ZONE_STATUS_NORMAL: &str = "NORMAL";
/// Zone `status` value for a zone that is not wired/configured.
pub const ZONE_STATUS_NOT_USED: &str = "NOT_USED";
/// Zone `bypass` value while the zone is bypassed.
pub const ZONE_BYPASS_ON: &str = "BYP";

/// One `<zone>` element of `zonesStatus48IP.xml`.
///
/// The values are passed through as the panel reports them. The zone's
/// identity is its position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatus {
    pub status: String,
    pub bypass: String,
    pub alarm: String,
}

impl ZoneStatus {
    pub fn new(
        status: impl Into<String>,
        bypass: impl Into<String>,
        alarm: impl Into<String>,
    ) -> Self {
        Self {
            status: status.into(),
            bypass: bypass.into(),
            alarm: alarm.into(),
        }
    }

    pub fn is_alarm(&self) -> bool {
        self.status == ZONE_STATUS_ALARM
    }

    pub fn is_not_used(&self) -> bool {
        self.status == ZONE_STATUS_NOT_USED
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass == ZONE_BYPASS_ON
    }
}

/// A zone status paired with its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Zero-based position in the panel's zone lists.
    pub index: usize,
    pub label: String,
    pub status: ZoneStatus,
}

impl Zone {
    pub fn is_alarm(&self) -> bool {
        self.status.is_alarm()
    }

    pub fn is_not_used(&self) -> bool {
        self.status.is_not_used()
    }

    pub fn is_bypassed(&self) -> bool {
        self.status.is_bypassed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_alarm() {
        let z = ZoneStatus::new("ALARM", "UN_BYPASS", "ON");
        assert!(z.is_alarm());
        assert!(!z.is_not_used());
        assert!(!z.is_bypassed());
    }

    #[test]
    fn test_zone_not_used() {
        let z = ZoneStatus::new("NOT_USED", "UN_BYPASS", "OFF");
        assert!(z.is_not_used());
        assert!(!z.is_alarm());
    }

    #[test]
    fn test_zone_bypassed() {
        let z = ZoneStatus::new("NORMAL", "BYP", "OFF");
        assert!(z.is_bypassed());
        assert!(!z.is_alarm());
    }

    #[test]
    fn test_status_values_are_case_sensitive() {
        let z = ZoneStatus::new("alarm", "byp", "OFF");
        assert!(!z.is_alarm());
        assert!(!z.is_bypassed());
    }
}
