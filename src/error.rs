use thiserror::Error;

/// Failure reported by the native driver.
///
/// The adapter never rewrites these; they surface through
/// [`AdapterError::Driver`] exactly as the driver produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    /// Vendor error code, when the driver exposes one.
    pub code: Option<i32>,
}

impl DriverError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl From<bb8::RunError<DriverError>> for AdapterError {
    fn from(err: bb8::RunError<DriverError>) -> Self {
        AdapterError::ConnectionError(format!("H2 pool error: {err}"))
    }
}
