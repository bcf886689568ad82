// MIT License - Copyright (c) 2026 lares2mqtt contributors
// Lares HTTP/XML bridge

/// Output `type` value for an unconfigured output.
pub const OUTPUT_TYPE_NOT_USED: &str = "NOT_USED";
/// Output `value` of an active output.
pub const OUTPUT_VALUE_ON: &str = "1";

/// One `<output>` element of `outputsStatus48IP.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStatus {
    pub status: String,
    pub value: String,
    pub output_type: String,
}

impl OutputStatus {
    pub fn new(
        status: impl Into<String>,
        value: impl Into<String>,
        output_type: impl Into<String>,
    ) -> Self {
        Self {
            status: status.into(),
            value: value.into(),
            output_type: output_type.into(),
        }
    }

    pub fn is_on(&self) -> bool {
        self.value.trim() == OUTPUT_VALUE_ON
    }

    pub fn is_not_used(&self) -> bool {
        self.output_type == OUTPUT_TYPE_NOT_USED
    }
}

/// An output status paired with its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub index: usize,
    pub label: String,
    pub status: OutputStatus,
}

impl Output {
    pub fn is_on(&self) -> bool {
        self.status.is_on()
    }

    pub fn is_not_used(&self) -> bool {
        self.status.is_not_used()
    }
}
