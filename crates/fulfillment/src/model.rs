//! Order graph: orders, fulfillment groups, allocations and line items.
//!
//! The order is an arena. It owns its groups and line items by value, groups own
//! their allocations, and an allocation refers to its line item by
//! [`LineItemId`] only.

use serde::{Deserialize, Serialize};

use allotment_core::{
    AggregateRoot, AllocationId, DomainError, DomainResult, Entity, FulfillmentGroupId,
    LineItemId, OrderId, ValueObject,
};

/// How a quantity of goods leaves the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentType {
    Digital,
    PhysicalShip,
    PhysicalPickup,
    /// The item may be picked up or shipped. Never used to tag a group.
    PhysicalPickupOrShip,
    GiftCard,
}

impl FulfillmentType {
    /// Whether a group can be created with this type.
    pub fn is_concrete(self) -> bool {
        !matches!(self, FulfillmentType::PhysicalPickupOrShip)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FulfillmentType::Digital => "DIGITAL",
            FulfillmentType::PhysicalShip => "PHYSICAL_SHIP",
            FulfillmentType::PhysicalPickup => "PHYSICAL_PICKUP",
            FulfillmentType::PhysicalPickupOrShip => "PHYSICAL_PICKUP_OR_SHIP",
            FulfillmentType::GiftCard => "GIFT_CARD",
        }
    }
}

impl core::fmt::Display for FulfillmentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValueObject for FulfillmentType {}

/// Extra attributes attached to a line item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDetail {
    pub fulfillment_type: Option<FulfillmentType>,
}

/// A quantity of one purchasable unit within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    id: LineItemId,
    quantity: i64,
    detail: Option<LineItemDetail>,
}

impl LineItem {
    pub fn new(id: LineItemId, quantity: i64) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self {
            id,
            quantity,
            detail: None,
        })
    }

    /// Attach a detail record carrying the given fulfillment type hint.
    pub fn with_fulfillment_type(mut self, fulfillment_type: FulfillmentType) -> Self {
        self.detail = Some(LineItemDetail {
            fulfillment_type: Some(fulfillment_type),
        });
        self
    }

    pub fn with_detail(mut self, detail: LineItemDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn id_typed(&self) -> LineItemId {
        self.id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn detail(&self) -> Option<&LineItemDetail> {
        self.detail.as_ref()
    }

    /// Sets a new quantity and returns the signed delta (`new - old`).
    pub fn set_quantity(&mut self, quantity: i64) -> DomainResult<i64> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let delta = quantity - self.quantity;
        self.quantity = quantity;
        Ok(delta)
    }
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A quantity of one line item assigned to one fulfillment group.
///
/// The quantity is always positive. An allocation that would drop to zero is
/// deleted instead of being kept around empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAllocation {
    id: AllocationId,
    line_item_id: LineItemId,
    quantity: i64,
}

impl GroupAllocation {
    pub fn new(id: AllocationId, line_item_id: LineItemId, quantity: i64) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(
                "allocated quantity must be positive",
            ));
        }
        Ok(Self {
            id,
            line_item_id,
            quantity,
        })
    }

    pub fn id_typed(&self) -> AllocationId {
        self.id
    }

    pub fn line_item_id(&self) -> LineItemId {
        self.line_item_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn references(&self, line_item_id: LineItemId) -> bool {
        self.line_item_id == line_item_id
    }
}

impl Entity for GroupAllocation {
    type Id = AllocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A shipment/pickup destination holding allocations.
///
/// Untyped groups are allowed and act as a single catch-all bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentGroup {
    id: FulfillmentGroupId,
    fulfillment_type: Option<FulfillmentType>,
    allocations: Vec<GroupAllocation>,
}

impl FulfillmentGroup {
    /// An empty, untyped group.
    pub fn new(id: FulfillmentGroupId) -> Self {
        Self {
            id,
            fulfillment_type: None,
            allocations: Vec::new(),
        }
    }

    pub fn with_type(mut self, fulfillment_type: FulfillmentType) -> Self {
        self.fulfillment_type = Some(fulfillment_type);
        self
    }

    pub fn id_typed(&self) -> FulfillmentGroupId {
        self.id
    }

    pub fn fulfillment_type(&self) -> Option<FulfillmentType> {
        self.fulfillment_type
    }

    pub fn set_fulfillment_type(&mut self, fulfillment_type: Option<FulfillmentType>) {
        self.fulfillment_type = fulfillment_type;
    }

    pub fn allocations(&self) -> &[GroupAllocation] {
        &self.allocations
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// First allocation in this group for the given line item.
    pub fn allocation_for(&self, line_item_id: LineItemId) -> Option<&GroupAllocation> {
        self.allocations.iter().find(|a| a.references(line_item_id))
    }
}

impl Entity for FulfillmentGroup {
    type Id = FulfillmentGroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: Order.
///
/// Invariant (checked by the verifier, not enforced on every edit): for every
/// line item, the quantities of all allocations referencing it sum to the line
/// item's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    groups: Vec<FulfillmentGroup>,
    line_items: Vec<LineItem>,
    version: u64,
}

impl Order {
    pub fn new(id: OrderId) -> Self {
        Self {
            id,
            groups: Vec::new(),
            line_items: Vec::new(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    /// Groups in their listed order.
    pub fn groups(&self) -> &[FulfillmentGroup] {
        &self.groups
    }

    pub fn group(&self, id: FulfillmentGroupId) -> Option<&FulfillmentGroup> {
        position_of(&self.groups, &id).map(|idx| &self.groups[idx])
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn line_item(&self, id: LineItemId) -> Option<&LineItem> {
        position_of(&self.line_items, &id).map(|idx| &self.line_items[idx])
    }

    /// Every allocation with its owning group, groups first, then allocations
    /// within a group, both in listed order.
    pub fn allocations(&self) -> impl Iterator<Item = (FulfillmentGroupId, &GroupAllocation)> + '_ {
        self.groups
            .iter()
            .flat_map(|g| g.allocations.iter().map(move |a| (g.id, a)))
    }

    /// Allocations referencing one line item, in scan order.
    pub fn allocations_for(
        &self,
        line_item_id: LineItemId,
    ) -> impl Iterator<Item = (FulfillmentGroupId, &GroupAllocation)> + '_ {
        self.allocations()
            .filter(move |(_, a)| a.references(line_item_id))
    }

    /// Total quantity allocated to a line item across all groups, saturating at `i64::MAX`.
    pub fn allocated_quantity(&self, line_item_id: LineItemId) -> i64 {
        self.allocations_for(line_item_id)
            .fold(0i64, |total, (_, a)| total.saturating_add(a.quantity))
    }

    pub fn add_line_item(&mut self, line_item: LineItem) {
        self.line_items.push(line_item);
        self.bump();
    }

    /// Removes the first line item with this id.
    pub fn remove_line_item(&mut self, id: LineItemId) -> Option<LineItem> {
        let idx = position_of(&self.line_items, &id)?;
        self.bump();
        Some(self.line_items.remove(idx))
    }

    /// Changes a line item's quantity and returns the delta to feed the allocator.
    pub fn set_line_item_quantity(&mut self, id: LineItemId, quantity: i64) -> DomainResult<i64> {
        let idx = position_of(&self.line_items, &id)
            .ok_or_else(|| DomainError::invariant(format!("line item {id} is not on the order")))?;
        let delta = self.line_items[idx].set_quantity(quantity)?;
        if delta != 0 {
            self.bump();
        }
        Ok(delta)
    }

    /// Appends a group after all existing groups.
    pub fn push_group(&mut self, group: FulfillmentGroup) {
        self.groups.push(group);
        self.bump();
    }

    pub fn remove_group(&mut self, id: FulfillmentGroupId) -> Option<FulfillmentGroup> {
        let idx = position_of(&self.groups, &id)?;
        self.bump();
        Some(self.groups.remove(idx))
    }

    /// Appends an allocation to a group's allocation list.
    pub fn push_allocation(
        &mut self,
        group_id: FulfillmentGroupId,
        allocation: GroupAllocation,
    ) -> DomainResult<()> {
        let idx = position_of(&self.groups, &group_id).ok_or_else(|| {
            DomainError::invariant(format!("fulfillment group {group_id} is not on the order"))
        })?;
        self.groups[idx].allocations.push(allocation);
        self.bump();
        Ok(())
    }

    /// Sets an allocation's quantity. Zero is rejected: delete the allocation instead.
    pub fn resize_allocation(&mut self, id: AllocationId, quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation(
                "allocated quantity must be positive",
            ));
        }
        let (group_idx, allocation_idx) = self
            .groups
            .iter()
            .enumerate()
            .find_map(|(g, group)| position_of(&group.allocations, &id).map(|a| (g, a)))
            .ok_or_else(|| DomainError::invariant(format!("allocation {id} is not on the order")))?;
        self.groups[group_idx].allocations[allocation_idx].quantity = quantity;
        self.bump();
        Ok(())
    }

    /// Removes the given allocations wherever they live. Returns how many were removed.
    pub fn remove_allocations(&mut self, ids: &[AllocationId]) -> usize {
        let mut removed = 0;
        for group in &mut self.groups {
            let before = group.allocations.len();
            group.allocations.retain(|a| !ids.contains(&a.id));
            removed += before - group.allocations.len();
        }
        if removed > 0 {
            self.bump();
        }
        removed
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

/// Index of the first entity with the given id.
fn position_of<E: Entity>(entities: &[E], id: &E::Id) -> Option<usize> {
    entities.iter().position(|e| e.id() == id)
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(line_item_id: LineItemId, quantity: i64) -> GroupAllocation {
        GroupAllocation::new(AllocationId::new(), line_item_id, quantity).unwrap()
    }

    #[test]
    fn line_item_rejects_non_positive_quantity() {
        assert!(matches!(
            LineItem::new(LineItemId::new(), 0),
            Err(DomainError::Validation(_))
        ));
        assert!(LineItem::new(LineItemId::new(), -3).is_err());
    }

    #[test]
    fn set_quantity_returns_signed_delta() {
        let mut item = LineItem::new(LineItemId::new(), 5).unwrap();
        assert_eq!(item.set_quantity(8).unwrap(), 3);
        assert_eq!(item.set_quantity(2).unwrap(), -6);
        assert_eq!(item.quantity(), 2);
    }

    #[test]
    fn allocation_rejects_zero() {
        assert!(GroupAllocation::new(AllocationId::new(), LineItemId::new(), 0).is_err());
    }

    #[test]
    fn allocations_iterate_groups_then_allocations_in_listed_order() {
        let item = LineItemId::new();
        let other = LineItemId::new();
        let first = FulfillmentGroupId::new();
        let second = FulfillmentGroupId::new();

        let mut order = Order::new(OrderId::new());
        order.push_group(FulfillmentGroup::new(first));
        order.push_group(FulfillmentGroup::new(second));
        order.push_allocation(second, allocation(item, 1)).unwrap();
        order.push_allocation(first, allocation(other, 2)).unwrap();
        order.push_allocation(first, allocation(item, 3)).unwrap();

        let seen: Vec<_> = order
            .allocations()
            .map(|(g, a)| (g, a.quantity()))
            .collect();
        assert_eq!(seen, vec![(first, 2), (first, 3), (second, 1)]);
        assert_eq!(order.allocated_quantity(item), 4);
    }

    #[test]
    fn resize_rejects_zero_and_unknown_allocation() {
        let item = LineItemId::new();
        let group = FulfillmentGroupId::new();
        let alloc = allocation(item, 2);
        let alloc_id = alloc.id_typed();

        let mut order = Order::new(OrderId::new());
        order.push_group(FulfillmentGroup::new(group));
        order.push_allocation(group, alloc).unwrap();

        assert!(order.resize_allocation(alloc_id, 0).is_err());
        assert!(order.resize_allocation(AllocationId::new(), 1).is_err());
        order.resize_allocation(alloc_id, 7).unwrap();
        assert_eq!(order.allocated_quantity(item), 7);
    }

    #[test]
    fn push_allocation_to_unknown_group_fails() {
        let mut order = Order::new(OrderId::new());
        let err = order
            .push_allocation(FulfillmentGroupId::new(), allocation(LineItemId::new(), 1))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn version_tracks_structural_mutations_only() {
        let item = LineItem::new(LineItemId::new(), 3).unwrap();
        let item_id = item.id_typed();
        let mut order = Order::new(OrderId::new());
        assert_eq!(order.version(), 0);

        order.add_line_item(item);
        assert_eq!(order.version(), 1);

        assert_eq!(order.set_line_item_quantity(item_id, 3).unwrap(), 0);
        assert_eq!(order.version(), 1);

        assert_eq!(order.remove_allocations(&[AllocationId::new()]), 0);
        assert_eq!(order.version(), 1);

        order.set_line_item_quantity(item_id, 4).unwrap();
        assert_eq!(order.version(), 2);
    }

    #[test]
    fn fulfillment_type_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&FulfillmentType::PhysicalPickupOrShip).unwrap();
        assert_eq!(json, "\"PHYSICAL_PICKUP_OR_SHIP\"");
        assert!(!FulfillmentType::PhysicalPickupOrShip.is_concrete());
        assert!(FulfillmentType::PhysicalShip.is_concrete());
    }
}
