use thiserror::Error;

/// ComTerm unified error type
#[derive(Error, Debug)]
pub enum ComTermError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value: {message}")]
    Validation { message: String },

    #[error("Device error: {message}")]
    Device { message: String },

    #[error("Malformed hex input at position {index}")]
    Decode { index: usize },

    #[error("Settings error: {message}")]
    Settings { message: String },
}

pub type ComTermResult<T> = Result<T, ComTermError>;

impl ComTermError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn device(message: impl Into<String>) -> Self {
        Self::Device {
            message: message.into(),
        }
    }

    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }
}
