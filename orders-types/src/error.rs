//! Error types for the order & ledger engine.

/// A decimal amount string that cannot be read as cents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid amount {input:?}: {reason}")]
pub struct MoneyParseError {
    pub input: String,
    pub reason: &'static str,
}

impl MoneyParseError {
    pub fn new(input: impl Into<String>, reason: &'static str) -> Self {
        Self {
            input: input.into(),
            reason,
        }
    }
}

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Forbidden")]
    Forbidden,

    #[error("Amount mismatch: order total {expected} cents, claimed {claimed} cents")]
    AmountMismatch { expected: i64, claimed: i64 },

    #[error("Insufficient contact vouchers: available {available}, requested {requested}")]
    InsufficientVoucher { available: i32, requested: i32 },

    #[error("Invalid voucher number")]
    InvalidVoucherNum,

    #[error(transparent)]
    InvalidMoney(#[from] MoneyParseError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Top window extends past the latest representable time")]
    TopWindowOverflow,
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Deadline exceeded")]
    Timeout,
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Amount mismatch: order total {expected} cents, claimed {claimed} cents")]
    AmountMismatch { expected: i64, claimed: i64 },

    #[error("Insufficient contact vouchers: available {available}, requested {requested}")]
    InsufficientVoucher { available: i32, requested: i32 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Forbidden => AppError::Forbidden,
            DomainError::AmountMismatch { expected, claimed } => {
                AppError::AmountMismatch { expected, claimed }
            }
            DomainError::InsufficientVoucher {
                available,
                requested,
            } => AppError::InsufficientVoucher {
                available,
                requested,
            },
            // Stored data is broken; nothing the caller can fix.
            DomainError::InvalidVoucherNum => AppError::Internal("Invalid voucher number".into()),
            DomainError::InvalidMoney(e) => AppError::BadRequest(e.to_string()),
            DomainError::ValidationError(msg) => AppError::BadRequest(msg),
            DomainError::TopWindowOverflow => {
                AppError::BadRequest("Top window out of range".into())
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Internal(e),
            RepoError::Timeout => AppError::Internal("Deadline exceeded".into()),
        }
    }
}
