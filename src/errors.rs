use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Unified error type for every service operation in the engine.
///
/// All variants are recoverable at the calling boundary: each maps to a
/// rejected operation with a descriptive reason. The engine never retries
/// internally; retry policy belongs to the caller.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error("Unsupported discount kind: {0}")]
    UnsupportedDiscountKind(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Gateway signature mismatch")]
    SignatureMismatch,

    #[error("Payment {0} already settled")]
    AlreadySettled(Uuid),

    #[error("Payment method disabled: {0}")]
    PaymentMethodDisabled(String),

    #[error("Invalid status transition: {0}")]
    InvalidStatus(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the message suitable for surfacing to an end user.
    /// Storage failures return a generic message to avoid leaking
    /// implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::StorageError(_) => "Internal storage error".to_string(),
            _ => self.to_string(),
        }
    }
}
