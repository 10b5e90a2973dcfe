use crate::{
    app::{AppError, AppResult, ParamsError},
    auth::TokenHandler,
};
use contracts::{
    InvalidRegisterParams, LoginParams, MessageResponse, RegisterParams, TokenResponse,
};
use database::{DatabaseError, InsertionResult, UserDatabase};
use serde_json::Value as JsonValue;
use std::{convert::TryFrom, sync::Arc};

pub struct UserController {
    user_db: Arc<UserDatabase>,
    token_handler: TokenHandler,
}

impl UserController {
    pub fn new(user_db: Arc<UserDatabase>, token_handler: TokenHandler) -> Self {
        Self {
            user_db,
            token_handler,
        }
    }

    pub async fn register(&self, body: JsonValue) -> AppResult<MessageResponse> {
        let params = RegisterParams::try_from(body)?;
        let username = params.normalized_username();

        let result = self
            .user_db
            .insert_user(&username, &params.password)
            .await
            .map_err(|e| AppError::from(e).with_message("Server error during registration"))?;

        match result {
            InsertionResult::Inserted => Ok(MessageResponse::new("User registered successfully")),
            InsertionResult::AlreadyExists => {
                info!("rejected registration of existing user '{}'", username);
                Err(AppError::conflict().with_message("User already exists"))
            }
        }
    }

    /// Every failure is reported as the same "Invalid credentials" error, whether
    /// the user is missing, the password is wrong or the profile is unreadable.
    pub async fn login(&self, body: JsonValue) -> AppResult<TokenResponse> {
        let params = LoginParams::try_from(body)
            .map_err(|e| AppError::invalid_credentials().with_context(&e))?;
        let username = params.normalized_username();

        let profile = self
            .user_db
            .validate_user(&username, &params.password)
            .await
            .map_err(|e| {
                match e {
                    DatabaseError::Hash(_) => {
                        warn!("unverifiable password for '{}': '{}'", username, e)
                    }
                    _ => error!("failed to read profile of '{}': '{}'", username, e),
                }
                AppError::invalid_credentials().with_context(&e)
            })?;

        match profile {
            Some(profile) => {
                info!("{} successfully logged in", profile.username);
                let token = self.token_handler.generate_token(&profile.username)?;
                Ok(TokenResponse::new(token))
            }
            None => {
                info!("failed login attempt for '{}'", username);
                Err(AppError::invalid_credentials())
            }
        }
    }
}

impl ParamsError for InvalidRegisterParams {}
