//! Delegate-source descriptors (data) and the registry contract (behavior).
//!
//! `descriptor` turns raw broker configuration into the ordered, validated [`BrokerConfig`]
//! offered to requesters. `registry` defines [`DelegateSource`], the hook every underlying
//! authentication mechanism implements, and [`SourceRegistry`], which resolves identifiers to
//! those mechanisms.

pub mod descriptor;
pub mod registry;

pub use descriptor::*;
pub use registry::*;
