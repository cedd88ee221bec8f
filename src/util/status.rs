use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Ok,
    NotFound,
    Corruption,
    NotSupported,
    InvalidArgument,
    IOError,
    Busy,
    /// A mutation was attempted through a handle opened read-only.
    ReadOnlyViolation,
    /// A column family name is not present in the persisted registry.
    UnknownColumnFamily,
}

#[derive(Debug, Clone)]
pub struct Status {
    code: Code,
    message: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            code: Code::Ok,
            message: None,
        }
    }

    fn with_code(code: Code, msg: impl Into<String>) -> Self {
        Status {
            code,
            message: Some(msg.into()),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_code(Code::NotFound, msg)
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::with_code(Code::Corruption, msg)
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::with_code(Code::NotSupported, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::with_code(Code::InvalidArgument, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::with_code(Code::IOError, msg)
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::with_code(Code::Busy, msg)
    }

    /// Rejection of `operation` by a read-only handle.
    pub fn read_only_violation(operation: &str) -> Self {
        Self::with_code(
            Code::ReadOnlyViolation,
            format!("{operation} is not supported in read-only mode"),
        )
    }

    pub fn unknown_column_family(name: &str) -> Self {
        Self::with_code(
            Code::UnknownColumnFamily,
            format!("Column family '{name}' does not exist"),
        )
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Code::NotFound
    }

    pub fn is_corruption(&self) -> bool {
        self.code == Code::Corruption
    }

    pub fn is_io_error(&self) -> bool {
        self.code == Code::IOError
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.code == Code::InvalidArgument
    }

    pub fn is_busy(&self) -> bool {
        self.code == Code::Busy
    }

    pub fn is_read_only_violation(&self) -> bool {
        self.code == Code::ReadOnlyViolation
    }

    pub fn is_unknown_column_family(&self) -> bool {
        self.code == Code::UnknownColumnFamily
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{:?}: {}", self.code, msg),
            None => write!(f, "{:?}", self.code),
        }
    }
}

impl std::error::Error for Status {}

impl From<std::io::Error> for Status {
    fn from(err: std::io::Error) -> Self {
        Status::io_error(err.to_string())
    }
}

impl From<serde_json::Error> for Status {
    fn from(err: serde_json::Error) -> Self {
        Status::corruption(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Status>;
