//! Cart-operation hooks wiring the resolver, selector, allocator and verifier.

use tracing::debug;

use crate::allocator::{allocate_new_item, apply_delta, collect_for_removal};
use crate::config::FulfillmentConfig;
use crate::error::FulfillmentResult;
use crate::group_service::GroupService;
use crate::request::CartOperationRequest;
use crate::resolver::{DetailTypeResolver, FulfillmentTypeResolver};
use crate::verifier;

/// Hooks invoked by the cart-operation pipeline.
///
/// Each hook mutates `request.order` in place and may fill
/// `request.allocations_to_delete`. `verify` runs once after all steps of a
/// compound operation.
pub trait FulfillmentStrategy {
    /// Allocate a newly added line item's full quantity.
    fn on_item_added(&self, request: &mut CartOperationRequest) -> FulfillmentResult<()>;

    /// Follow a quantity change. Replaces `allocations_to_delete` with the
    /// allocations the change drained.
    fn on_item_updated(&self, request: &mut CartOperationRequest) -> FulfillmentResult<()>;

    /// Designate every allocation of a removed line item for deletion.
    fn on_item_removed(&self, request: &mut CartOperationRequest) -> FulfillmentResult<()>;

    /// Closing consistency gate.
    fn verify(&self, request: &mut CartOperationRequest) -> FulfillmentResult<()>;
}

/// Default strategy: one group per fulfillment type, first-listed allocation
/// absorbs increments, earliest-listed allocations drain first.
#[derive(Debug, Clone)]
pub struct FulfillmentGroupItemStrategy<G, R = DetailTypeResolver> {
    groups: G,
    resolver: R,
    config: FulfillmentConfig,
}

impl<G> FulfillmentGroupItemStrategy<G, DetailTypeResolver>
where
    G: GroupService,
{
    pub fn new(groups: G) -> Self {
        Self::with_resolver(groups, DetailTypeResolver, FulfillmentConfig::default())
    }
}

impl<G, R> FulfillmentGroupItemStrategy<G, R>
where
    G: GroupService,
    R: FulfillmentTypeResolver,
{
    pub fn with_resolver(groups: G, resolver: R, config: FulfillmentConfig) -> Self {
        Self {
            groups,
            resolver,
            config,
        }
    }

    pub fn with_config(mut self, config: FulfillmentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn groups(&self) -> &G {
        &self.groups
    }

    pub fn config(&self) -> &FulfillmentConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FulfillmentConfig {
        &mut self.config
    }
}

impl<G, R> FulfillmentStrategy for FulfillmentGroupItemStrategy<G, R>
where
    G: GroupService,
    R: FulfillmentTypeResolver,
{
    fn on_item_added(&self, request: &mut CartOperationRequest) -> FulfillmentResult<()> {
        allocate_new_item(
            &mut request.order,
            &request.line_item,
            &self.resolver,
            &self.groups,
        )?;
        Ok(())
    }

    fn on_item_updated(&self, request: &mut CartOperationRequest) -> FulfillmentResult<()> {
        let delta = request.quantity_delta();
        let line_item_id = request.line_item.id_typed();
        if delta == 0 {
            debug!(line_item_id = %line_item_id, "quantity unchanged; nothing to reallocate");
            return Ok(());
        }
        request.allocations_to_delete = apply_delta(&mut request.order, line_item_id, delta)?;
        Ok(())
    }

    fn on_item_removed(&self, request: &mut CartOperationRequest) -> FulfillmentResult<()> {
        let line_item_id = request.line_item.id_typed();
        let doomed = collect_for_removal(&request.order, line_item_id, &self.groups);
        debug!(
            line_item_id = %line_item_id,
            allocations = doomed.len(),
            "line item removed; allocations designated for deletion"
        );
        request.allocations_to_delete.extend(doomed);
        Ok(())
    }

    fn verify(&self, request: &mut CartOperationRequest) -> FulfillmentResult<()> {
        verifier::verify(&mut request.order, &self.groups, &self.config)
    }
}
