use rankings_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error in {context}: missing {field}")]
    Parse { context: String, field: &'static str },

    #[error("failed to read input {path}: {message}")]
    Input { path: String, message: String },
}
