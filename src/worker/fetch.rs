use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
        }
    }

    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status,
            content_type: None,
            body,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Status in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Origin unreachable: {0}")]
    Offline(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait(?Send)]
pub trait Network {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Serves an origin out of a local directory.
///
/// A missing root behaves like being offline; a missing file is a 404 like
/// any web server would answer.
#[derive(Debug, Clone)]
pub struct LocalOrigin {
    root: PathBuf,
}

impl LocalOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL path to a file below the root. `None` for paths that try to
    /// leave it.
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let relative = path.trim_start_matches('/');
        let relative = if relative.is_empty() { "index.txt" } else { relative };

        let mut resolved = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[async_trait(?Send)]
impl Network for LocalOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        if !matches!(request.method, Method::Get | Method::Head) {
            return Ok(Response::new(&request.url, 405, Vec::new()));
        }

        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(FetchError::Offline(self.root.display().to_string())),
        }

        let Some(path) = self.resolve(&request.url) else {
            return Ok(Response::new(&request.url, 404, Vec::new()));
        };

        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                trace!(url = %request.url, "not found at origin");
                return Ok(Response::new(&request.url, 404, Vec::new()));
            }
            Err(err) => return Err(err.into()),
        };

        let body = if request.method == Method::Head { Vec::new() } else { body };
        Ok(Response::new(&request.url, 200, body).with_content_type(content_type_for(&path)))
    }
}
