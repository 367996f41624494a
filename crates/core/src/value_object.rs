//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. A fulfillment
/// type is a value object; a fulfillment group tagged with that type is an
/// entity.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Carrier { Ground, Air }
///
/// impl ValueObject for Carrier {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
