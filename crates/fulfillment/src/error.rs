//! Fulfillment allocation errors.
//!
//! `AllocationUnderflow` and `QuantityMismatch` both mean the order graph is
//! corrupt. They are never retried; the enclosing cart operation must abort.

use thiserror::Error;

use allotment_core::{DomainError, LineItemId};

use crate::group_service::GroupServiceError;

/// Result type used by the allocator, verifier and strategy.
pub type FulfillmentResult<T> = Result<T, FulfillmentError>;

/// Why a line item's allocations disagree with its quantity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MismatchReason {
    /// Allocations sum to less than the line item quantity.
    #[error("under-allocated by {0}")]
    UnderAllocated(i64),

    /// Allocations sum to more than the line item quantity.
    #[error("over-allocated by {0}")]
    OverAllocated(i64),

    /// An allocation references a line item that is not on the order.
    #[error("allocation references a line item that is not on the order")]
    UnknownLineItem,

    /// A positive delta arrived for a line item with no allocation to absorb it.
    #[error("no allocation found to absorb the increment")]
    NoAllocationToIncrement,

    /// Quantities for the line item do not fit in an `i64`.
    #[error("quantity totals overflow")]
    QuantityOverflow,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FulfillmentError {
    /// A decrement asked for more than is allocated across all groups.
    #[error(
        "cannot decrement line item {line_item_id} by {requested}: only {allocated} allocated"
    )]
    AllocationUnderflow {
        line_item_id: LineItemId,
        requested: i64,
        allocated: i64,
    },

    /// Allocations and line item quantities are out of sync.
    #[error("allocations out of sync for line item {line_item_id}: {reason}")]
    QuantityMismatch {
        line_item_id: LineItemId,
        reason: MismatchReason,
    },

    #[error(transparent)]
    Group(#[from] GroupServiceError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl FulfillmentError {
    pub fn mismatch(line_item_id: LineItemId, reason: MismatchReason) -> Self {
        Self::QuantityMismatch {
            line_item_id,
            reason,
        }
    }

    /// Whether this error signals a corrupted allocation graph.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            FulfillmentError::AllocationUnderflow { .. } | FulfillmentError::QuantityMismatch { .. }
        )
    }
}
