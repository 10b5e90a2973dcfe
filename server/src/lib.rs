#![allow(clippy::new_without_default)]

use app::AppResult;
use assets::StaticAssets;
use auth::{Claims, TokenHandler};
use database::DatabaseError;
use hyper::{
    body::Buf,
    header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Body, Method, Request, Response, StatusCode,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::{path::PathBuf, sync::Arc, time::Instant};

pub use app::{App, AppError};

pub mod app;
pub mod assets;
pub mod auth;
pub mod controller;

#[macro_use]
extern crate log;

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub port: u16,
    pub data_dir: PathBuf,
    pub asset_root: PathBuf,
    pub jwt_secret: String,
}

pub async fn entry_point(
    webserver: Arc<Webserver>,
    request: Request<Body>,
) -> Result<Response<Body>, hyper::Error> {
    Ok(webserver.handle_request(request).await)
}

pub struct Webserver {
    app: Arc<App>,
    tokens: TokenHandler,
    assets: StaticAssets,
}

impl Webserver {
    pub fn new(app: Arc<App>, tokens: TokenHandler, assets: StaticAssets) -> Self {
        Self {
            app,
            tokens,
            assets,
        }
    }

    /// Opens the stores under `settings.data_dir` and wires everything together.
    pub async fn from_settings(settings: &AppSettings) -> Result<Self, DatabaseError> {
        let tokens = TokenHandler::new(settings.jwt_secret.clone());
        let app = Arc::new(App::new(settings, tokens.clone()).await?);
        let assets = StaticAssets::new(settings.asset_root.clone());
        Ok(Self::new(app, tokens, assets))
    }

    pub async fn handle_request(&self, request: Request<Body>) -> Response<Body> {
        let timer = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        let response = self.route(request).await;

        info!(
            "{} '{}' -> {} in {:?}",
            method,
            path,
            response.status().as_u16(),
            timer.elapsed()
        );
        response
    }

    async fn route(&self, request: Request<Body>) -> Response<Body> {
        let method = request.method().clone();
        // route without trailing slash for easier matching
        let path = request.uri().path().trim_end_matches('/').to_owned();
        let segments: Vec<&str> = path.split('/').skip(1).collect();
        trace!("matching {} {:?}", method, segments);

        match (&method, segments.as_slice()) {
            (_, ["api", "ping"]) => ping_pong_response(),
            (&Method::POST, ["api", "auth", "register"]) => {
                let result = match Self::get_body_as_json(request).await {
                    Ok(body) => self.app.users().register(body).await,
                    Err(e) => Err(e),
                };
                result_response(result, StatusCode::CREATED)
            }
            (&Method::POST, ["api", "auth", "login"]) => {
                let result = match Self::get_body_as_json(request).await {
                    Ok(body) => self.app.users().login(body).await,
                    Err(e) => Err(AppError::invalid_credentials().with_context(&e)),
                };
                result_response(result, StatusCode::OK)
            }
            (_, ["api", "tasks", rest @ ..]) => self.tasks_route(request, &method, rest).await,
            (_, ["api", ..]) => error_response(&AppError::not_found()),
            (&Method::GET, _) | (&Method::HEAD, _) => self.assets.serve(&path).await,
            _invalid => {
                warn!("invalid http method or route request: {} '{}'", method, path);
                error_response(&AppError::not_found())
            }
        }
    }

    /// Every route under `/api/tasks` requires a valid bearer token, checked
    /// before the body is looked at or the route is matched.
    async fn tasks_route(
        &self,
        request: Request<Body>,
        method: &Method,
        rest: &[&str],
    ) -> Response<Body> {
        let claims = match self.authenticate(&request) {
            Ok(claims) => claims,
            Err(auth_error) => return error_response(&auth_error),
        };
        let tasks = self.app.tasks();

        match (method, rest) {
            (&Method::GET, []) => result_response(tasks.get_tasks(&claims).await, StatusCode::OK),
            (&Method::POST, []) => {
                let result = match Self::get_body_as_json(request).await {
                    Ok(body) => tasks.add_task(&claims, body).await,
                    Err(e) => Err(e),
                };
                result_response(result, StatusCode::CREATED)
            }
            (&Method::PATCH, [id, "toggle"]) => {
                let result = match decode_segment(id) {
                    Ok(id) => tasks.toggle_task(&claims, &id).await,
                    Err(e) => Err(e),
                };
                result_response(result, StatusCode::OK)
            }
            (&Method::DELETE, [id]) => {
                let result = match decode_segment(id) {
                    Ok(id) => tasks.delete_task(&claims, &id).await,
                    Err(e) => Err(e),
                };
                result_response(result, StatusCode::OK)
            }
            _invalid => error_response(&AppError::not_found()),
        }
    }

    fn authenticate(&self, request: &Request<Body>) -> AppResult<Claims> {
        let token = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(AppError::unauthorized)?;

        self.tokens
            .verify_token(token)
            .map_err(|e| AppError::invalid_token().with_context(&e))
    }

    /// Attempts to parse the body of a request as json
    async fn get_body_as_json(request: Request<Body>) -> AppResult<JsonValue> {
        let buf = hyper::body::aggregate(request).await?;
        let json: JsonValue = serde_json::from_reader(buf.reader())?;

        Ok(json)
    }
}

/// An id that does not decode to UTF-8 can never name a stored task.
fn decode_segment(segment: &str) -> AppResult<String> {
    urlencoding::decode(segment)
        .map(|decoded| decoded.to_string())
        .map_err(|e| {
            AppError::not_found()
                .with_message("Task not found")
                .with_context(&e)
        })
}

fn result_response<T>(result: AppResult<T>, status: StatusCode) -> Response<Body>
where
    T: Serialize,
{
    match result {
        Ok(body) => generic_json_response(&body, status),
        Err(error) => error_response(&error),
    }
}

pub(crate) fn error_response(error: &AppError) -> Response<Body> {
    match &error.context {
        Some(context) if error.status.is_server_error() => {
            error!("{}: '{}'", error.message, context)
        }
        Some(context) => debug!("{}: '{}'", error.message, context),
        None => (),
    }
    generic_json_response(&error.body(), error.status)
}

fn generic_json_response<T>(body: &T, status: StatusCode) -> Response<Body>
where
    T: Serialize,
{
    match serde_json::to_vec(body) {
        Ok(bytes) => build_response(status, "application/json", Body::from(bytes)),
        Err(e) => {
            error!("failed to serialize response body: '{}'", e);
            internal_server_error()
        }
    }
}

pub(crate) fn build_response(status: StatusCode, content_type: &str, body: Body) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .unwrap_or_else(|e| {
            error!("failed to build response: '{}'", e);
            internal_server_error()
        })
}

fn internal_server_error() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

fn ping_pong_response() -> Response<Body> {
    let mut response = Response::new(Body::from("pong"));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
