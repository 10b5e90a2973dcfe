use crate::{
    auth::TokenHandler,
    controller::{TaskController, UserController},
    AppSettings,
};
use contracts::ErrorResponse;
use database::{DatabaseError, TaskDatabase, UserDatabase};
use hyper::StatusCode;
use std::{
    error::Error,
    fmt::{Debug, Display},
    sync::Arc,
};

pub type AppResult<T> = Result<T, AppError>;

pub struct App {
    user_controller: UserController,
    task_controller: TaskController,
}

impl App {
    pub async fn new(
        settings: &AppSettings,
        token_handler: TokenHandler,
    ) -> Result<Self, DatabaseError> {
        let user_db = Arc::new(UserDatabase::open(&settings.data_dir).await?);
        let task_db: Arc<TaskDatabase> = Arc::new(user_db.share());

        info!("storing user data in '{}'", settings.data_dir.display());

        Ok(Self {
            user_controller: UserController::new(user_db, token_handler),
            task_controller: TaskController::new(task_db),
        })
    }

    pub fn users(&self) -> &UserController {
        &self.user_controller
    }

    pub fn tasks(&self) -> &TaskController {
        &self.task_controller
    }
}

/// A failed request: the status and message the client sees, plus
/// server-side context that only ever reaches the log.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub context: Option<String>,
}

impl AppError {
    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_owned(),
            context: None,
        }
    }

    pub fn with_context<T>(mut self, value: &T) -> Self
    where
        T: Debug,
    {
        self.context = Some(format!("{:?}", value));
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_owned();
        self
    }

    pub fn validation() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request")
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn invalid_token() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Invalid token")
    }

    pub fn invalid_credentials() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Invalid credentials")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }

    pub fn conflict() -> Self {
        Self::new(StatusCode::CONFLICT, "Conflict")
    }

    pub fn storage() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage error")
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn body(&self) -> ErrorResponse {
        ErrorResponse::new(self.message.as_str())
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for AppError {}

impl From<DatabaseError> for AppError {
    fn from(db_error: DatabaseError) -> Self {
        AppError::storage().with_context(&db_error)
    }
}

impl From<hyper::Error> for AppError {
    fn from(e: hyper::Error) -> Self {
        AppError::validation().with_context(&e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::validation()
            .with_message(&format!("Malformed JSON body: {}", e))
            .with_context(&e)
    }
}

/// Marker for parameter parsing errors. Their `Display` output is shown to the client.
pub trait ParamsError: Error {}

impl<T> From<T> for AppError
where
    T: ParamsError,
{
    fn from(err: T) -> Self {
        AppError::validation()
            .with_message(&err.to_string())
            .with_context(&err)
    }
}
