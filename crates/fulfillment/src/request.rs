//! The mutation request passed through every allocation step.

use allotment_core::AllocationId;

use crate::model::{LineItem, Order};

/// A single cart mutation: the order, the affected line item and, for updates,
/// the signed quantity delta already applied to that line item.
///
/// Steps write the allocations they want gone into `allocations_to_delete`.
/// Deleting them is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartOperationRequest {
    pub order: Order,
    pub line_item: LineItem,
    pub quantity_delta: Option<i64>,
    pub allocations_to_delete: Vec<AllocationId>,
}

impl CartOperationRequest {
    pub fn new(order: Order, line_item: LineItem) -> Self {
        Self {
            order,
            line_item,
            quantity_delta: None,
            allocations_to_delete: Vec::new(),
        }
    }

    pub fn with_quantity_delta(mut self, delta: i64) -> Self {
        self.quantity_delta = Some(delta);
        self
    }

    /// The delta, with "not provided" meaning no change.
    pub fn quantity_delta(&self) -> i64 {
        self.quantity_delta.unwrap_or(0)
    }

    /// Hand back the deletion list, leaving it empty.
    pub fn take_allocations_to_delete(&mut self) -> Vec<AllocationId> {
        std::mem::take(&mut self.allocations_to_delete)
    }

    pub fn into_order(self) -> Order {
        self.order
    }
}
