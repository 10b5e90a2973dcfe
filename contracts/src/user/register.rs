use crate::normalize_username;
use serde_json::Value;
use std::{convert::TryFrom, error::Error, fmt::Display};

pub const MISSING_CREDENTIALS_MESSAGE: &str = "Username and password are required";

#[derive(Clone, Debug, serde::Serialize)]
#[non_exhaustive]
pub struct RegisterParams {
    pub username: String,
    pub password: String,
}

impl RegisterParams {
    pub fn new(username: String, password: String) -> Result<Self, InvalidRegisterParams> {
        if username.is_empty() || password.is_empty() {
            return Err(InvalidRegisterParams::MissingCredentials);
        }
        if normalize_username(&username).is_empty() {
            return Err(InvalidRegisterParams::EmptyUsername);
        }
        // bcrypt cannot hash passwords containing NUL bytes
        if password.contains('\0') {
            return Err(InvalidRegisterParams::NulInPassword);
        }

        Ok(Self { username, password })
    }

    pub fn normalized_username(&self) -> String {
        normalize_username(&self.username)
    }
}

impl TryFrom<Value> for RegisterParams {
    type Error = InvalidRegisterParams;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let builder: RegisterParamsBuilder =
            serde_json::from_value(value).map_err(InvalidRegisterParams::InvalidFormat)?;
        builder.build()
    }
}

#[derive(serde::Deserialize)]
struct RegisterParamsBuilder {
    username: Option<String>,
    password: Option<String>,
}

impl RegisterParamsBuilder {
    fn build(self) -> Result<RegisterParams, InvalidRegisterParams> {
        match (self.username, self.password) {
            (Some(username), Some(password)) => RegisterParams::new(username, password),
            _ => Err(InvalidRegisterParams::MissingCredentials),
        }
    }
}

#[derive(Debug)]
pub enum InvalidRegisterParams {
    InvalidFormat(serde_json::Error),
    MissingCredentials,
    EmptyUsername,
    NulInPassword,
}

impl Error for InvalidRegisterParams {}

impl Display for InvalidRegisterParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidRegisterParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidRegisterParams::MissingCredentials => MISSING_CREDENTIALS_MESSAGE.to_owned(),
            InvalidRegisterParams::EmptyUsername => {
                "Username must contain at least one letter or digit".to_owned()
            }
            InvalidRegisterParams::NulInPassword => {
                "Password must not contain NUL characters".to_owned()
            }
        };
        write!(f, "{}", output)
    }
}
