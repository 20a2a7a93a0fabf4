pub type ParseResult<T> = core::result::Result<T, FrameError>;

/// Structural problems with a response line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame has {available} fields, expected at least {needed}")]
    MissingFields { needed: usize, available: usize },

    #[error("field {index} ({name}) is not a valid number: {value:?}")]
    InvalidField {
        index: usize,
        name: &'static str,
        value: String,
    },

    #[error("pressure line is not a number: {0:?}")]
    InvalidPressure(String),

    #[error("unknown command token: {0:?}")]
    UnknownCommand(String),
}
