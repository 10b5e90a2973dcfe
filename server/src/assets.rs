use hyper::{Body, Response, StatusCode};
use std::path::{Component, Path, PathBuf};

const INDEX_FILE: &str = "index.html";

/// Serves the single-page UI from a fixed directory.
pub struct StaticAssets {
    root: PathBuf,
}

impl StaticAssets {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// `path` is the request path with any trailing slash removed.
    pub async fn serve(&self, path: &str) -> Response<Body> {
        let relative = match self.resolve(path) {
            Some(relative) => relative,
            None => {
                warn!("rejected asset path '{}'", path);
                return crate::error_response(&crate::AppError::not_found());
            }
        };

        let file = self.root.join(&relative);
        match tokio::fs::read(&file).await {
            Ok(bytes) => {
                trace!("serving '{}' ({} bytes)", file.display(), bytes.len());
                crate::build_response(StatusCode::OK, content_type(&relative), Body::from(bytes))
            }
            Err(e) => {
                trace!("no asset at '{}': '{}'", file.display(), e);
                crate::error_response(&crate::AppError::not_found())
            }
        }
    }

    /// Maps a request path to a path relative to the asset root. `None` for
    /// anything that could escape the root.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(path).ok()?.to_string();
        let trimmed = decoded.trim_start_matches('/');
        if trimmed.is_empty() || trimmed == "app" {
            return Some(PathBuf::from(INDEX_FILE));
        }

        let relative = PathBuf::from(trimmed);
        if relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            Some(relative)
        } else {
            None
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
