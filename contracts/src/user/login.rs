use crate::normalize_username;
use serde_json::Value;
use std::{convert::TryFrom, error::Error, fmt::Display};

#[derive(Clone, Debug, serde::Serialize)]
#[non_exhaustive]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}

impl LoginParams {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    pub fn normalized_username(&self) -> String {
        normalize_username(&self.username)
    }
}

impl TryFrom<Value> for LoginParams {
    type Error = InvalidLoginParams;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let builder: LoginParamsBuilder =
            serde_json::from_value(value).map_err(InvalidLoginParams::InvalidFormat)?;
        builder.build()
    }
}

#[derive(serde::Deserialize)]
struct LoginParamsBuilder {
    username: Option<String>,
    password: Option<String>,
}

impl LoginParamsBuilder {
    fn build(self) -> Result<LoginParams, InvalidLoginParams> {
        match (self.username, self.password) {
            (Some(username), Some(password)) => Ok(LoginParams::new(username, password)),
            _ => Err(InvalidLoginParams::MissingCredentials),
        }
    }
}

/// Never shown to clients: a failed login always answers with the same message.
#[derive(Debug)]
pub enum InvalidLoginParams {
    InvalidFormat(serde_json::Error),
    MissingCredentials,
}

impl Error for InvalidLoginParams {}

impl Display for InvalidLoginParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidLoginParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidLoginParams::MissingCredentials => "missing username or password".to_owned(),
        };
        write!(f, "{}", output)
    }
}
