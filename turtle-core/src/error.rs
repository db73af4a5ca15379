use thiserror::Error;

#[derive(Error, Debug)]
pub enum TurtleError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Invalid callback payload: {0}")]
    InvalidPayload(String),

    #[error("State error: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, TurtleError>;
