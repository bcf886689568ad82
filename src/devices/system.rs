// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

/// Panel identification from `generalInfo.xml`. Fetched at startup and
/// retried before each poll until it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// `productName`, e.g. `Lares4.0`
    pub name: String,
    /// `info1`, usually the firmware string
    pub info: String,
}
