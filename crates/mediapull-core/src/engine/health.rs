use serde::{Deserialize, Serialize};

/// Coarse launch state of an engine binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchState {
    Retrying,
    Ready,
    Error,
}

/// Launch-health event for the presentation layer. Nothing in the supervisor
/// depends on these being received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchHealth {
    pub status: LaunchState,
    pub binary: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl LaunchHealth {
    pub fn retrying(binary: &str, message: impl Into<String>, attempt: u32, max: Option<u32>) -> Self {
        Self {
            status: LaunchState::Retrying,
            binary: binary.to_string(),
            message: message.into(),
            attempt: Some(attempt),
            max,
        }
    }

    pub fn ready(binary: &str) -> Self {
        Self {
            status: LaunchState::Ready,
            binary: binary.to_string(),
            message: format!("{binary} is ready"),
            attempt: None,
            max: None,
        }
    }

    pub fn error(binary: &str, message: impl Into<String>) -> Self {
        Self {
            status: LaunchState::Error,
            binary: binary.to_string(),
            message: message.into(),
            attempt: None,
            max: None,
        }
    }
}
