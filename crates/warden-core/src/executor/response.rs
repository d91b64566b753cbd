//! JSON-RPC 2.0 response envelopes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::flags::ExecutionMode;
use crate::sandbox::ExecutionStatus;

pub const JSONRPC_VERSION: &str = "2.0";

/// Error codes carried in error envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    TokenLimit,
    PolicyViolation,
    SandboxUnavailable,
    Timeout,
    Internal,
}

impl ErrorCode {
    pub fn code(&self) -> u16 {
        match self {
            Self::TokenLimit => 429,
            Self::PolicyViolation => 403,
            Self::SandboxUnavailable => 503,
            Self::Timeout => 408,
            Self::Internal => 500,
        }
    }

    /// Code for a non-success execution status
    pub fn for_status(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::PolicyViolation => Self::PolicyViolation,
            ExecutionStatus::SandboxUnavailable => Self::SandboxUnavailable,
            ExecutionStatus::Timeout => Self::Timeout,
            ExecutionStatus::Success | ExecutionStatus::Error => Self::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub tokens_used: u64,
    pub execution_time_ms: u64,
    pub cache_hit: bool,
    pub mode: ExecutionMode,
    pub execution_id: Option<String>,
    pub sandbox_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessBody {
    pub status: String,
    pub data: Value,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub mode: ExecutionMode,
    pub sandbox_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    pub data: ErrorData,
}

/// Either a `result` or an `error`, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SuccessBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Envelope {
    pub fn success(data: Value, metadata: ResponseMetadata) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(SuccessBody {
                status: "success".to_string(),
                data,
                metadata,
            }),
            error: None,
        }
    }

    pub fn error(
        code: ErrorCode,
        message: impl Into<String>,
        mode: ExecutionMode,
        sandbox_enabled: bool,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(ErrorBody {
                code: code.code(),
                message: message.into(),
                data: ErrorData {
                    mode,
                    sandbox_enabled,
                },
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }

    pub fn error_code(&self) -> Option<u16> {
        self.error.as_ref().map(|e| e.code)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
