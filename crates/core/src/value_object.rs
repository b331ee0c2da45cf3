//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values:
/// two `Money` values of 10.00 are interchangeable, whereas two
/// labs with the same name are still different labs.
///
/// To "modify" a value object, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
