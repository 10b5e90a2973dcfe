use serde_json::Value;
use std::{convert::TryFrom, error::Error, fmt::Display};

/// Titles are deliberately unvalidated: empty and arbitrary strings are accepted,
/// and a missing title is stored as an empty one.
#[derive(Clone, Debug, serde::Serialize)]
#[non_exhaustive]
pub struct AddTaskParams {
    pub title: String,
}

impl AddTaskParams {
    pub fn new(title: String) -> Self {
        Self { title }
    }
}

impl TryFrom<Value> for AddTaskParams {
    type Error = InvalidAddTaskParams;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let builder: AddTaskParamsBuilder =
            serde_json::from_value(value).map_err(InvalidAddTaskParams::InvalidFormat)?;
        Ok(AddTaskParams::new(builder.title.unwrap_or_default()))
    }
}

#[derive(serde::Deserialize)]
struct AddTaskParamsBuilder {
    title: Option<String>,
}

#[derive(Debug)]
pub enum InvalidAddTaskParams {
    InvalidFormat(serde_json::Error),
}

impl Error for InvalidAddTaskParams {}

impl Display for InvalidAddTaskParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidAddTaskParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
        };
        write!(f, "{}", output)
    }
}
