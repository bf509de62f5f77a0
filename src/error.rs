use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// The Bluetooth hardware is not in a state the peripheral can run on.
    Precondition,
    InvalidCatalog,
    UnknownCharacteristic,
    Registration,
    Advertising,
    Notification,
    CoreBluetooth,
    Channel,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorType::Precondition => "precondition failed",
            ErrorType::InvalidCatalog => "invalid catalog",
            ErrorType::UnknownCharacteristic => "unknown characteristic",
            ErrorType::Registration => "service registration failed",
            ErrorType::Advertising => "advertising failed",
            ErrorType::Notification => "notification failed",
            ErrorType::CoreBluetooth => "CoreBluetooth",
            ErrorType::Channel => "channel closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorType,
    message: String,
}

impl Error {
    pub fn from_string(message: String, kind: ErrorType) -> Self {
        Self { kind, message }
    }

    pub fn kind(&self) -> ErrorType {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Fatal errors leave the peripheral unable to operate and end the run loop.
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorType::Precondition
    }
}

pub type Result<T> = std::result::Result<T, Error>;
