//! Broker-domain identifiers shared by configuration, stores, and flows.

pub mod id;

pub use id::*;
