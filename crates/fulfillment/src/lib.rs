//! Fulfillment group allocation for order line items.
//!
//! Keeps "how much of a line item exists" and "how much of it is allocated to
//! fulfillment groups" arithmetically consistent as items are added, their
//! quantities change, or they are removed. Pure in-memory graph edits; anything
//! that persists groups or allocations sits behind [`GroupService`].

pub mod allocator;
pub mod config;
pub mod error;
pub mod group_service;
pub mod model;
pub mod request;
pub mod resolver;
pub mod selector;
pub mod strategy;
pub mod verifier;

pub use config::FulfillmentConfig;
pub use error::{FulfillmentError, FulfillmentResult, MismatchReason};
pub use group_service::{GroupService, GroupServiceError, InMemoryGroupService};
pub use model::{
    FulfillmentGroup, FulfillmentType, GroupAllocation, LineItem, LineItemDetail, Order,
};
pub use request::CartOperationRequest;
pub use resolver::{DetailTypeResolver, FulfillmentTypeHint, FulfillmentTypeResolver};
pub use selector::select_group;
pub use strategy::{FulfillmentGroupItemStrategy, FulfillmentStrategy};
