use std::io;
use std::path::PathBuf;

use warp::http::StatusCode;
use warp::Reply;
use warp::reply::Response;

/// Failures surfaced to a single API request. Each variant maps to one HTTP
/// status and a short plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    /// A required parameter is missing, empty, or absolute.
    #[error("{0}")]
    InvalidInput(&'static str),

    /// The resolved path falls outside the notes folder.
    #[error("Access denied")]
    AccessDenied { path: PathBuf },

    #[error("Note not found.")]
    NotFound { path: PathBuf },

    /// The OS refused a read, write, or directory creation.
    #[error("{context}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// The request body could not be decoded.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl NoteError {
    pub fn io(context: &'static str, source: io::Error) -> Self {
        NoteError::Io { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            NoteError::InvalidInput(_) | NoteError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            NoteError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            NoteError::NotFound { .. } => StatusCode::NOT_FOUND,
            NoteError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Reply for NoteError {
    fn into_response(self) -> Response {
        match &self {
            NoteError::Io { source, .. } => log::error!("{self}: {source}"),
            NoteError::AccessDenied { path } => {
                log::warn!("Rejected path outside notes folder: {}", path.display())
            }
            NoteError::NotFound { path } => log::debug!("Note not found: {}", path.display()),
            _ => log::debug!("Request failed: {self}"),
        }
        let status = self.status();
        warp::reply::with_status(self.to_string(), status).into_response()
    }
}
