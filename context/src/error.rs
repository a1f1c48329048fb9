use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Invalid boilerplate pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid context configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
