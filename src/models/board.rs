use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Scanning,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SetPositionStatus {
    Success,
    InProgress,
    Failed,
    Cancelled,
}

impl SetPositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetPositionStatus::Success => "Success",
            SetPositionStatus::InProgress => "InProgress",
            SetPositionStatus::Failed => "Failed",
            SetPositionStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetPositionResult {
    pub status: SetPositionStatus,
    pub message: Option<String>,
    pub estimated_time_ms: Option<u64>,
}

impl SetPositionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: SetPositionStatus::Success,
            message: Some(message.into()),
            estimated_time_ms: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: SetPositionStatus::Failed,
            message: Some(message.into()),
            estimated_time_ms: None,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            status: SetPositionStatus::Cancelled,
            message: Some(message.into()),
            estimated_time_ms: None,
        }
    }

    pub fn with_estimated_time(mut self, estimated_time_ms: u64) -> Self {
        self.estimated_time_ms = Some(estimated_time_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == SetPositionStatus::Success
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub model: String,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub bluetooth_address: Option<String>,
}
