//! Maps a fulfillment type to the group new allocations go into.

use std::collections::HashMap;

use tracing::{debug, info};

use allotment_core::FulfillmentGroupId;

use crate::group_service::GroupService;
use crate::model::{FulfillmentType, Order};
use crate::resolver::normalize;

/// Pick the group for `fulfillment_type`, creating and appending one if needed.
///
/// The first group of each type in listed order wins; later groups of the same
/// type are left alone. `None` selects the first untyped group.
pub fn select_group<G>(
    order: &mut Order,
    fulfillment_type: Option<FulfillmentType>,
    groups: &G,
) -> FulfillmentGroupId
where
    G: GroupService + ?Sized,
{
    let fulfillment_type = fulfillment_type.map(normalize);

    let mut by_type: HashMap<FulfillmentType, FulfillmentGroupId> = HashMap::new();
    let mut untyped: Option<FulfillmentGroupId> = None;
    for group in order.groups() {
        match group.fulfillment_type() {
            Some(t) => {
                by_type.entry(t).or_insert(group.id_typed());
            }
            None => {
                untyped.get_or_insert(group.id_typed());
            }
        }
    }

    let existing = match fulfillment_type {
        Some(t) => by_type.get(&t).copied(),
        None => untyped,
    };
    if let Some(group_id) = existing {
        debug!(group_id = %group_id, fulfillment_type = ?fulfillment_type, "reusing fulfillment group");
        return group_id;
    }

    let mut group = groups.create_empty_group();
    group.set_fulfillment_type(fulfillment_type);
    let group_id = group.id_typed();
    order.push_group(group);
    info!(
        order_id = %order.id_typed(),
        group_id = %group_id,
        fulfillment_type = ?fulfillment_type,
        "created fulfillment group"
    );
    group_id
}
