//! Quantity allocation: keeps allocations in step with line item quantities.
//!
//! Every scan walks groups in listed order, then allocations within a group in
//! listed order. Increments land on the first matching allocation. Decrements
//! drain the earliest-listed allocations first.

use tracing::{debug, warn};

use allotment_core::{AllocationId, DomainError, LineItemId};

use crate::error::{FulfillmentError, FulfillmentResult, MismatchReason};
use crate::group_service::GroupService;
use crate::model::{LineItem, Order};
use crate::resolver::FulfillmentTypeResolver;
use crate::selector::select_group;

/// What a decrement will do, computed before anything is touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecrementPlan {
    /// Allocations that shrink, with their new quantity.
    pub resized: Vec<(AllocationId, i64)>,
    /// Allocations that are drained completely.
    pub to_delete: Vec<AllocationId>,
}

/// Allocate the full quantity of a newly added line item.
pub fn allocate_new_item<G, R>(
    order: &mut Order,
    line_item: &LineItem,
    resolver: &R,
    groups: &G,
) -> FulfillmentResult<AllocationId>
where
    G: GroupService + ?Sized,
    R: FulfillmentTypeResolver + ?Sized,
{
    let fulfillment_type = resolver.resolve(line_item);
    let group_id = select_group(order, fulfillment_type, groups);
    let allocation_id =
        groups.add_allocation(order, line_item, line_item.quantity(), group_id)?;
    debug!(
        line_item_id = %line_item.id_typed(),
        group_id = %group_id,
        quantity = line_item.quantity(),
        "allocated new line item"
    );
    Ok(allocation_id)
}

/// React to a signed quantity change already applied to the line item.
///
/// Returns the allocations the caller must delete. A zero delta is a no-op.
pub fn apply_delta(
    order: &mut Order,
    line_item_id: LineItemId,
    delta: i64,
) -> FulfillmentResult<Vec<AllocationId>> {
    match delta.signum() {
        0 => Ok(Vec::new()),
        1 => {
            increment(order, line_item_id, delta)?;
            Ok(Vec::new())
        }
        _ => {
            let amount = delta
                .checked_neg()
                .ok_or_else(|| DomainError::validation("quantity delta out of range"))?;
            decrement(order, line_item_id, amount)
        }
    }
}

/// Add `amount` to the first allocation of the line item.
pub fn increment(
    order: &mut Order,
    line_item_id: LineItemId,
    amount: i64,
) -> FulfillmentResult<AllocationId> {
    let Some((group_id, target, current)) = order
        .allocations_for(line_item_id)
        .next()
        .map(|(g, a)| (g, a.id_typed(), a.quantity()))
    else {
        warn!(line_item_id = %line_item_id, amount, "no allocation to absorb increment");
        return Err(FulfillmentError::mismatch(
            line_item_id,
            MismatchReason::NoAllocationToIncrement,
        ));
    };

    let quantity = current
        .checked_add(amount)
        .ok_or_else(|| DomainError::validation("allocated quantity overflows"))?;
    order.resize_allocation(target, quantity)?;
    debug!(
        line_item_id = %line_item_id,
        group_id = %group_id,
        allocation_id = %target,
        quantity,
        "incremented allocation"
    );
    Ok(target)
}

/// Work out which allocations absorb a decrement of `amount` without touching the order.
pub fn plan_decrement(
    order: &Order,
    line_item_id: LineItemId,
    amount: i64,
) -> FulfillmentResult<DecrementPlan> {
    if amount <= 0 {
        return Err(DomainError::validation("decrement amount must be positive").into());
    }
    let mut plan = DecrementPlan::default();
    let mut remaining = amount;

    for (_, allocation) in order.allocations_for(line_item_id) {
        let quantity = allocation.quantity();
        if quantity > remaining {
            plan.resized
                .push((allocation.id_typed(), quantity - remaining));
            return Ok(plan);
        }
        plan.to_delete.push(allocation.id_typed());
        remaining -= quantity;
        if remaining == 0 {
            return Ok(plan);
        }
    }

    let allocated = order.allocated_quantity(line_item_id);
    warn!(
        line_item_id = %line_item_id,
        requested = amount,
        allocated,
        "decrement exceeds allocated quantity"
    );
    Err(FulfillmentError::AllocationUnderflow {
        line_item_id,
        requested: amount,
        allocated,
    })
}

/// Take `amount` off the line item's allocations.
///
/// Shrinks in place where an allocation has quantity to spare and returns the
/// allocations that were drained to zero; those are still on the order. On
/// underflow the order is left untouched.
pub fn decrement(
    order: &mut Order,
    line_item_id: LineItemId,
    amount: i64,
) -> FulfillmentResult<Vec<AllocationId>> {
    let plan = plan_decrement(order, line_item_id, amount)?;
    for (allocation_id, quantity) in &plan.resized {
        order.resize_allocation(*allocation_id, *quantity)?;
    }
    debug!(
        line_item_id = %line_item_id,
        amount,
        resized = plan.resized.len(),
        to_delete = plan.to_delete.len(),
        "decremented allocations"
    );
    Ok(plan.to_delete)
}

/// Every allocation of the line item, for unconditional deletion.
pub fn collect_for_removal<G>(order: &Order, line_item_id: LineItemId, groups: &G) -> Vec<AllocationId>
where
    G: GroupService + ?Sized,
{
    groups.allocations_for_line_item(order, line_item_id)
}
