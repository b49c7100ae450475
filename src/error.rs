//! Error types for the packing engine.

use thiserror::Error;

/// Result type alias for packing operations.
pub type Result<T> = std::result::Result<T, PackError>;

/// Fatal errors raised before or instead of a packing run.
///
/// Items that simply do not fit are never errors; they end up in the
/// unpacked set of the returned ledger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PackError {
    /// Container dimensions, weight limit or shelf interval are unusable.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    /// An item descriptor failed validation.
    #[error("Invalid item '{id}': {reason}")]
    InvalidItem { id: String, reason: String },

    /// Two items share the same identifier.
    #[error("Duplicate item id: {0}")]
    DuplicateItemId(String),

    /// The run was cancelled before any strategy finished.
    #[error("Packing cancelled")]
    Cancelled,

    /// The time limit elapsed before any strategy finished.
    #[error("Time limit exceeded after {0}ms")]
    Timeout(u64),
}

impl PackError {
    /// Short machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            PackError::InvalidContainer(_) => "invalid_container",
            PackError::InvalidItem { .. } => "invalid_item",
            PackError::DuplicateItemId(_) => "duplicate_item_id",
            PackError::Cancelled => "cancelled",
            PackError::Timeout(_) => "timeout",
        }
    }

    pub(crate) fn invalid_item(id: &str, reason: impl Into<String>) -> Self {
        PackError::InvalidItem {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
