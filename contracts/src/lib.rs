#![allow(clippy::new_without_default)]

pub use task::*;
pub use user::*;

mod task;
mod user;

/// Body of every failed response.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new<T>(error: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            error: error.into(),
        }
    }
}

/// Body of a successful response that carries no data, only a confirmation.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            message: message.into(),
        }
    }
}

fn invalid_params_serde_message(err: &serde_json::Error) -> String {
    format!("invalid format of params object: '{}'", err)
}
