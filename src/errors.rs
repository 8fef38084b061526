use thiserror::Error;

/// Numeric error code reported by the document store.
pub type HResult = i32;

pub const RPC_E_CALL_REJECTED: HResult = 0x8001_0001_u32 as HResult;
pub const RPC_E_SERVERCALL_RETRYLATER: HResult = 0x8001_010A_u32 as HResult;
pub const E_NOTIMPL: HResult = 0x8000_4001_u32 as HResult;
pub const E_FAIL: HResult = 0x8000_4005_u32 as HResult;
pub const HR_XML_NOT_WELL_FORMED: HResult = 0x8004_2000_u32 as HResult;
pub const HR_XML_INVALID: HResult = 0x8004_2001_u32 as HResult;
pub const HR_FILE_DOES_NOT_EXIST: HResult = 0x8004_2006_u32 as HResult;
pub const HR_LAST_MODIFIED_DATE_DID_NOT_MATCH: HResult = 0x8004_2010_u32 as HResult;
pub const HR_OBJECT_DOES_NOT_EXIST: HResult = 0x8004_2014_u32 as HResult;
pub const HR_INVALID_NAME: HResult = 0x8004_2017_u32 as HResult;
pub const HR_NOT_YET_SYNCHRONIZED: HResult = 0x8004_201D_u32 as HResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Fatal,
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("STORE_FAILURE: {message} (HRESULT: 0x{code:08X})")]
    Store { code: HResult, message: String },
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("NOT_SYNCHRONIZED: content of {0} is not yet synchronized")]
    NotSynchronized(String),
    #[error("CONCURRENCY_CONFLICT: page {page_id} was modified since it was read")]
    ConcurrencyConflict { page_id: String },
    #[error("MISSING_ELEMENT: {operation}: one:{element} element not found")]
    MissingElement {
        operation: &'static str,
        element: &'static str,
    },
    #[error("UNSUPPORTED: {0} is not implemented")]
    Unsupported(&'static str),
    #[error("MALFORMED: {0}")]
    Malformed(String),
    #[error("INVALID_NAME: {0}")]
    InvalidName(String),
    #[error("QUEUE_FULL: mutation queue capacity exceeded (max {capacity})")]
    QueueFull { capacity: usize },
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl JournalError {
    /// The store error code this failure is reported under.
    pub fn hresult(&self) -> HResult {
        match self {
            Self::Store { code, .. } => *code,
            Self::NotFound(_) => HR_OBJECT_DOES_NOT_EXIST,
            Self::NotSynchronized(_) => HR_NOT_YET_SYNCHRONIZED,
            Self::ConcurrencyConflict { .. } => HR_LAST_MODIFIED_DATE_DID_NOT_MATCH,
            Self::MissingElement { .. } => HR_XML_INVALID,
            Self::Unsupported(_) => E_NOTIMPL,
            Self::Malformed(_) => HR_XML_NOT_WELL_FORMED,
            Self::InvalidName(_) => HR_INVALID_NAME,
            Self::QueueFull { .. } => RPC_E_SERVERCALL_RETRYLATER,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => E_FAIL,
        }
    }

    pub fn class(&self) -> ErrorClass {
        classify(self)
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Busy servers and unsynchronized hierarchy content resolve themselves;
/// everything else, timestamp mismatches included, does not.
pub fn classify(error: &JournalError) -> ErrorClass {
    match error {
        JournalError::NotSynchronized(_) => ErrorClass::Transient,
        JournalError::Store { code, .. } if is_transient_code(*code) => ErrorClass::Transient,
        _ => ErrorClass::Fatal,
    }
}

pub fn is_transient_code(code: HResult) -> bool {
    matches!(
        code,
        RPC_E_CALL_REJECTED | RPC_E_SERVERCALL_RETRYLATER | HR_NOT_YET_SYNCHRONIZED
    )
}

pub fn format_hresult(code: HResult) -> String {
    format!("HRESULT: 0x{:08X}", code as u32)
}

impl From<std::io::Error> for JournalError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<serde_yaml::Error> for JournalError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<anyhow::Error> for JournalError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", value))
    }
}

impl From<tokio::task::JoinError> for JournalError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking store task failed: {}", value))
    }
}

pub type AppResult<T> = Result<T, JournalError>;
