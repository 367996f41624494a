//! Fulfillment type resolution for line items.

use crate::model::{FulfillmentType, LineItem};

/// Something that can carry a fulfillment type hint.
pub trait FulfillmentTypeHint {
    fn fulfillment_type_hint(&self) -> Option<FulfillmentType>;
}

impl FulfillmentTypeHint for LineItem {
    fn fulfillment_type_hint(&self) -> Option<FulfillmentType> {
        self.detail().and_then(|d| d.fulfillment_type)
    }
}

/// Derives the fulfillment type used to pick a group for a line item.
///
/// Implementations must return a concrete type (see [`FulfillmentType::is_concrete`])
/// or `None` for "no preference".
pub trait FulfillmentTypeResolver: Send + Sync {
    fn resolve(&self, item: &dyn FulfillmentTypeHint) -> Option<FulfillmentType>;
}

/// Reads the hint from the line item's detail record.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetailTypeResolver;

impl FulfillmentTypeResolver for DetailTypeResolver {
    fn resolve(&self, item: &dyn FulfillmentTypeHint) -> Option<FulfillmentType> {
        item.fulfillment_type_hint().map(normalize)
    }
}

/// Maps the ambiguous pickup-or-ship type onto shipping.
///
/// A group can't be created with an ambiguous type, so "either" means "ship".
pub fn normalize(fulfillment_type: FulfillmentType) -> FulfillmentType {
    match fulfillment_type {
        FulfillmentType::PhysicalPickupOrShip => FulfillmentType::PhysicalShip,
        other => other,
    }
}
