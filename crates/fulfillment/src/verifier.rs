//! Closing consistency gate for a batch of allocation changes.
//!
//! Runs once after all steps of a cart operation: optionally prunes empty
//! groups, then checks that every line item is allocated exactly once over.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use allotment_core::{FulfillmentGroupId, LineItemId};

use crate::config::FulfillmentConfig;
use crate::error::{FulfillmentError, FulfillmentResult, MismatchReason};
use crate::group_service::GroupService;
use crate::model::Order;

/// Prune (if configured) and reconcile.
pub fn verify<G>(order: &mut Order, groups: &G, config: &FulfillmentConfig) -> FulfillmentResult<()>
where
    G: GroupService + ?Sized,
{
    if config.remove_empty_groups() {
        prune_empty_groups(order, groups)?;
    }
    reconcile(order)
}

/// Detach every group without allocations and hand it to the collaborator for deletion.
pub fn prune_empty_groups<G>(
    order: &mut Order,
    groups: &G,
) -> FulfillmentResult<Vec<FulfillmentGroupId>>
where
    G: GroupService + ?Sized,
{
    let empty: Vec<FulfillmentGroupId> = order
        .groups()
        .iter()
        .filter(|g| g.is_empty())
        .map(|g| g.id_typed())
        .collect();

    // Delete first: a group only leaves the graph once the collaborator has accepted it.
    for group_id in &empty {
        if let Some(group) = order.group(*group_id) {
            groups.delete_group(group)?;
            order.remove_group(*group_id);
            info!(order_id = %order.id_typed(), group_id = %group_id, "pruned empty fulfillment group");
        }
    }
    Ok(empty)
}

/// Check that allocations sum to each line item's quantity.
///
/// Line items listed more than once under the same id have their quantities
/// summed. Residuals are checked in line item id order.
pub fn reconcile(order: &Order) -> FulfillmentResult<()> {
    let mut outstanding: BTreeMap<LineItemId, i64> = BTreeMap::new();
    for item in order.line_items() {
        let total = outstanding.entry(item.id_typed()).or_insert(0);
        *total = total
            .checked_add(item.quantity())
            .ok_or_else(|| overflow(order, item.id_typed()))?;
    }

    for (group_id, allocation) in order.allocations() {
        let line_item_id = allocation.line_item_id();
        let Some(residual) = outstanding.get_mut(&line_item_id) else {
            warn!(
                order_id = %order.id_typed(),
                group_id = %group_id,
                line_item_id = %line_item_id,
                "allocation references unknown line item"
            );
            return Err(FulfillmentError::mismatch(
                line_item_id,
                MismatchReason::UnknownLineItem,
            ));
        };
        *residual = residual
            .checked_sub(allocation.quantity())
            .ok_or_else(|| overflow(order, line_item_id))?;
    }

    for (line_item_id, residual) in outstanding {
        let reason = match residual {
            0 => continue,
            r if r > 0 => MismatchReason::UnderAllocated(r),
            r => r
                .checked_neg()
                .map_or(MismatchReason::QuantityOverflow, MismatchReason::OverAllocated),
        };
        warn!(order_id = %order.id_typed(), line_item_id = %line_item_id, %reason, "quantity mismatch");
        return Err(FulfillmentError::mismatch(line_item_id, reason));
    }

    debug!(order_id = %order.id_typed(), "allocations reconciled");
    Ok(())
}

fn overflow(order: &Order, line_item_id: LineItemId) -> FulfillmentError {
    warn!(order_id = %order.id_typed(), line_item_id = %line_item_id, "quantity totals overflow");
    FulfillmentError::mismatch(line_item_id, MismatchReason::QuantityOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_service::{GroupServiceError, InMemoryGroupService};
    use crate::model::{FulfillmentGroup, GroupAllocation, LineItem};
    use allotment_core::{AllocationId, OrderId};

    fn allocate(order: &mut Order, group_id: FulfillmentGroupId, item: LineItemId, qty: i64) {
        order
            .push_allocation(
                group_id,
                GroupAllocation::new(AllocationId::new(), item, qty).unwrap(),
            )
            .unwrap();
    }

    fn order_with_item(quantity: i64) -> (Order, LineItemId, FulfillmentGroupId) {
        let item = LineItem::new(LineItemId::new(), quantity).unwrap();
        let item_id = item.id_typed();
        let group_id = FulfillmentGroupId::new();
        let mut order = Order::new(OrderId::new());
        order.add_line_item(item);
        order.push_group(FulfillmentGroup::new(group_id));
        (order, item_id, group_id)
    }

    #[test]
    fn balanced_order_passes() {
        let (mut order, item, group) = order_with_item(5);
        allocate(&mut order, group, item, 2);
        allocate(&mut order, group, item, 3);

        reconcile(&order).unwrap();
    }

    #[test]
    fn empty_order_passes() {
        reconcile(&Order::new(OrderId::new())).unwrap();
    }

    #[test]
    fn under_allocation_is_reported() {
        let (mut order, item, group) = order_with_item(5);
        allocate(&mut order, group, item, 3);

        let err = reconcile(&order).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::mismatch(item, MismatchReason::UnderAllocated(2))
        );
    }

    #[test]
    fn over_allocation_is_reported() {
        let (mut order, item, group) = order_with_item(2);
        allocate(&mut order, group, item, 3);

        let err = reconcile(&order).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::mismatch(item, MismatchReason::OverAllocated(1))
        );
    }

    #[test]
    fn unallocated_line_item_is_reported() {
        let (order, item, _) = order_with_item(1);
        let err = reconcile(&order).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::mismatch(item, MismatchReason::UnderAllocated(1))
        );
    }

    #[test]
    fn allocation_for_unknown_line_item_is_reported() {
        let (mut order, _, group) = order_with_item(1);
        let stray = LineItemId::new();
        allocate(&mut order, group, stray, 1);

        let err = reconcile(&order).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::mismatch(stray, MismatchReason::UnknownLineItem)
        );
    }

    #[test]
    fn duplicate_line_item_ids_are_summed() {
        let (mut order, item, group) = order_with_item(2);
        order.add_line_item(LineItem::new(item, 3).unwrap());
        allocate(&mut order, group, item, 5);

        reconcile(&order).unwrap();
    }

    #[test]
    fn duplicate_line_items_overflowing_i64_are_a_mismatch() {
        let (mut order, item, group) = order_with_item(i64::MAX);
        order.add_line_item(LineItem::new(item, 1).unwrap());
        allocate(&mut order, group, item, 1);

        let err = reconcile(&order).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::mismatch(item, MismatchReason::QuantityOverflow)
        );
    }

    #[test]
    fn over_allocation_past_i64_min_is_a_mismatch() {
        let (mut order, item, group) = order_with_item(1);
        allocate(&mut order, group, item, i64::MAX);
        allocate(&mut order, group, item, 2);

        let err = reconcile(&order).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::mismatch(item, MismatchReason::QuantityOverflow)
        );
    }

    /// Collaborator whose storage refuses every group deletion.
    struct RejectingDeletes(InMemoryGroupService);

    impl GroupService for RejectingDeletes {
        fn create_empty_group(&self) -> FulfillmentGroup {
            self.0.create_empty_group()
        }

        fn add_allocation(
            &self,
            order: &mut Order,
            line_item: &LineItem,
            quantity: i64,
            group_id: FulfillmentGroupId,
        ) -> Result<AllocationId, GroupServiceError> {
            self.0.add_allocation(order, line_item, quantity, group_id)
        }

        fn delete_group(&self, _group: &FulfillmentGroup) -> Result<(), GroupServiceError> {
            Err(GroupServiceError::Backend("storage offline".to_string()))
        }

        fn allocations_for_line_item(
            &self,
            order: &Order,
            line_item_id: LineItemId,
        ) -> Vec<AllocationId> {
            self.0.allocations_for_line_item(order, line_item_id)
        }

        fn remove_allocations(
            &self,
            order: &mut Order,
            ids: &[AllocationId],
        ) -> Result<usize, GroupServiceError> {
            self.0.remove_allocations(order, ids)
        }
    }

    #[test]
    fn failed_group_deletion_keeps_group_on_order() {
        let (mut order, item, group) = order_with_item(1);
        allocate(&mut order, group, item, 1);
        let first = FulfillmentGroupId::new();
        let second = FulfillmentGroupId::new();
        order.push_group(FulfillmentGroup::new(first));
        order.push_group(FulfillmentGroup::new(second));
        let service = RejectingDeletes(InMemoryGroupService::new());

        let err = prune_empty_groups(&mut order, &service).unwrap_err();

        assert_eq!(
            err,
            FulfillmentError::Group(GroupServiceError::Backend("storage offline".to_string()))
        );
        assert!(order.group(first).is_some());
        assert!(order.group(second).is_some());
        assert_eq!(order.groups().len(), 3);
    }

    #[test]
    fn verify_prunes_empty_groups_when_enabled() {
        let (mut order, item, group) = order_with_item(1);
        allocate(&mut order, group, item, 1);
        let empty = FulfillmentGroupId::new();
        order.push_group(FulfillmentGroup::new(empty));
        let service = InMemoryGroupService::new();

        verify(&mut order, &service, &FulfillmentConfig::default()).unwrap();

        assert!(order.group(empty).is_none());
        assert!(order.group(group).is_some());
        assert_eq!(service.deleted_groups(), vec![empty]);
    }

    #[test]
    fn verify_keeps_empty_groups_when_disabled() {
        let (mut order, item, group) = order_with_item(1);
        allocate(&mut order, group, item, 1);
        let empty = FulfillmentGroupId::new();
        order.push_group(FulfillmentGroup::new(empty));
        let service = InMemoryGroupService::new();
        let config = FulfillmentConfig::default().with_remove_empty_groups(false);

        verify(&mut order, &service, &config).unwrap();

        assert!(order.group(empty).is_some());
        assert!(service.deleted_groups().is_empty());
    }

    #[test]
    fn verify_prunes_before_failing_on_mismatch() {
        let (mut order, _, group) = order_with_item(1);
        let service = InMemoryGroupService::new();

        let err = verify(&mut order, &service, &FulfillmentConfig::default()).unwrap_err();

        assert!(err.is_invariant_violation());
        assert!(order.group(group).is_none());
    }
}
