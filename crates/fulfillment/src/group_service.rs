//! Group collaborator: creates, fills and deletes fulfillment groups.
//!
//! The allocator only decides what should exist. Creating groups, attaching
//! allocations and persisting deletions is handed to a [`GroupService`].

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::debug;

use allotment_core::{AllocationId, DomainError, FulfillmentGroupId, LineItemId};

use crate::model::{FulfillmentGroup, GroupAllocation, LineItem, Order};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupServiceError {
    #[error("fulfillment group not found: {0}")]
    GroupNotFound(FulfillmentGroupId),

    #[error("invalid allocation quantity: {0}")]
    InvalidQuantity(i64),

    #[error("group backend failure: {0}")]
    Backend(String),
}

impl From<DomainError> for GroupServiceError {
    fn from(value: DomainError) -> Self {
        GroupServiceError::Backend(value.to_string())
    }
}

/// Group management collaborator.
///
/// Implementations are synchronous and atomic from the allocator's point of
/// view. They may mutate the order graph passed in, and nothing else of it.
pub trait GroupService: Send + Sync {
    /// A fresh, untyped group that is not attached to any order yet.
    fn create_empty_group(&self) -> FulfillmentGroup;

    /// Allocate `quantity` of `line_item` to the group. Returns the allocation
    /// that now holds the quantity.
    fn add_allocation(
        &self,
        order: &mut Order,
        line_item: &LineItem,
        quantity: i64,
        group_id: FulfillmentGroupId,
    ) -> Result<AllocationId, GroupServiceError>;

    /// Delete a group. Called while the group is still on its order; the caller
    /// detaches it only once this succeeds.
    fn delete_group(&self, group: &FulfillmentGroup) -> Result<(), GroupServiceError>;

    /// Every allocation referencing the line item, across all groups, in scan order.
    fn allocations_for_line_item(
        &self,
        order: &Order,
        line_item_id: LineItemId,
    ) -> Vec<AllocationId>;

    /// Delete allocations previously designated for deletion.
    fn remove_allocations(
        &self,
        order: &mut Order,
        ids: &[AllocationId],
    ) -> Result<usize, GroupServiceError>;
}

impl<T> GroupService for Arc<T>
where
    T: GroupService + ?Sized,
{
    fn create_empty_group(&self) -> FulfillmentGroup {
        (**self).create_empty_group()
    }

    fn add_allocation(
        &self,
        order: &mut Order,
        line_item: &LineItem,
        quantity: i64,
        group_id: FulfillmentGroupId,
    ) -> Result<AllocationId, GroupServiceError> {
        (**self).add_allocation(order, line_item, quantity, group_id)
    }

    fn delete_group(&self, group: &FulfillmentGroup) -> Result<(), GroupServiceError> {
        (**self).delete_group(group)
    }

    fn allocations_for_line_item(
        &self,
        order: &Order,
        line_item_id: LineItemId,
    ) -> Vec<AllocationId> {
        (**self).allocations_for_line_item(order, line_item_id)
    }

    fn remove_allocations(
        &self,
        order: &mut Order,
        ids: &[AllocationId],
    ) -> Result<usize, GroupServiceError> {
        (**self).remove_allocations(order, ids)
    }
}

/// In-memory group collaborator.
///
/// Intended for tests/dev. Keeps a log of deleted groups so callers can assert
/// on what would have been deleted from storage.
#[derive(Debug, Default)]
pub struct InMemoryGroupService {
    deleted_groups: RwLock<Vec<FulfillmentGroupId>>,
}

impl InMemoryGroupService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups passed to `delete_group`, in call order.
    pub fn deleted_groups(&self) -> Vec<FulfillmentGroupId> {
        self.deleted_groups
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl GroupService for InMemoryGroupService {
    fn create_empty_group(&self) -> FulfillmentGroup {
        FulfillmentGroup::new(FulfillmentGroupId::new())
    }

    fn add_allocation(
        &self,
        order: &mut Order,
        line_item: &LineItem,
        quantity: i64,
        group_id: FulfillmentGroupId,
    ) -> Result<AllocationId, GroupServiceError> {
        if quantity <= 0 {
            return Err(GroupServiceError::InvalidQuantity(quantity));
        }
        let group = order
            .group(group_id)
            .ok_or(GroupServiceError::GroupNotFound(group_id))?;

        // Same line item already in this group: grow it rather than split it.
        if let Some(existing) = group.allocation_for(line_item.id_typed()) {
            let id = existing.id_typed();
            let merged = existing
                .quantity()
                .checked_add(quantity)
                .ok_or(GroupServiceError::InvalidQuantity(quantity))?;
            order.resize_allocation(id, merged)?;
            debug!(
                group_id = %group_id,
                allocation_id = %id,
                quantity = merged,
                "merged into existing allocation"
            );
            return Ok(id);
        }

        let allocation = GroupAllocation::new(AllocationId::new(), line_item.id_typed(), quantity)?;
        let id = allocation.id_typed();
        order.push_allocation(group_id, allocation)?;
        debug!(group_id = %group_id, allocation_id = %id, quantity, "allocation created");
        Ok(id)
    }

    fn delete_group(&self, group: &FulfillmentGroup) -> Result<(), GroupServiceError> {
        let mut deleted = self
            .deleted_groups
            .write()
            .map_err(|_| GroupServiceError::Backend("deleted group log poisoned".to_string()))?;
        deleted.push(group.id_typed());
        Ok(())
    }

    fn allocations_for_line_item(
        &self,
        order: &Order,
        line_item_id: LineItemId,
    ) -> Vec<AllocationId> {
        order
            .allocations_for(line_item_id)
            .map(|(_, a)| a.id_typed())
            .collect()
    }

    fn remove_allocations(
        &self,
        order: &mut Order,
        ids: &[AllocationId],
    ) -> Result<usize, GroupServiceError> {
        Ok(order.remove_allocations(ids))
    }
}
