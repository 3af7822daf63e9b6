//! Unified application error model and mapping helpers.
//! One error enum is shared by storage, theme resolution, template loading and the
//! HTTP frontend; `http_status` maps each kind onto the response the router sends.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    UserInput { code: String, message: String },
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    /// Stored rows contradict each other (e.g. a detail row without a template).
    #[error("{code}: {message}")]
    Integrity { code: String, message: String },
    #[error("{code}: {message}")]
    Template { code: String, message: String },
    #[error("{code}: {message}")]
    Io { code: String, message: String },
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Integrity { code, .. }
            | AppError::Template { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Integrity { message, .. }
            | AppError::Template { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn integrity<S: Into<String>>(code: S, msg: S) -> Self { AppError::Integrity { code: code.into(), message: msg.into() } }
    pub fn template<S: Into<String>>(code: S, msg: S) -> Self { AppError::Template { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn is_not_found(&self) -> bool { matches!(self, AppError::NotFound { .. }) }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Integrity { .. } => 500,
            AppError::Template { .. } => 500,
            AppError::Io { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { code: "io_error".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal { code: "json_error".into(), message: err.to_string() }
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::Template { code: format!("template_{:?}", err.kind()).to_lowercase(), message: err.to_string() }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}
