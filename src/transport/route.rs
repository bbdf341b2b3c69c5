use thiserror::Error;
use tungstenite::http::StatusCode;

/// Header carrying the identity established by an upstream authenticator.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Query parameter alternative to [`USER_ID_HEADER`].
pub const USER_ID_PARAM: &str = "user_id";

/// Endpoint a WebSocket handshake asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/ws/echo`
    Echo,
    /// `/ws/document/{document_id}`
    Document {
        document_id: String,
        user_id: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no such endpoint: {0}")]
    NotFound(String),
    #[error("missing user identity")]
    Unauthorized,
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::NotFound(_) => StatusCode::NOT_FOUND,
            RouteError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl Route {
    /// Resolve a request target (`path?query`) and an optional identity
    /// header. The query parameter wins over the header.
    pub fn parse(target: &str, user_header: Option<&str>) -> Result<Route, RouteError> {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let path = path.trim_end_matches('/');

        if path == "/ws/echo" {
            return Ok(Route::Echo);
        }

        let document_id = path
            .strip_prefix("/ws/document/")
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .ok_or_else(|| RouteError::NotFound(path.to_string()))?;

        let user_id = query_param(query, USER_ID_PARAM)
            .or(user_header)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(RouteError::Unauthorized)?;

        Ok(Route::Document {
            document_id: document_id.to_string(),
            user_id: user_id.to_string(),
        })
    }
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
