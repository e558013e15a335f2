//! Remote Store Gateway - contract and test double
//!
//! The sync engines never talk to the backend directly; they go through
//! the [`StoreGateway`] trait defined here. The module also carries the
//! typed filter builder and the in-memory gateway used throughout the
//! test suites.

pub mod errors;
pub mod filter;
pub mod gateway;
pub mod memory;
pub mod types;

pub use errors::{GatewayError, GatewayResult};
pub use filter::Filter;
pub use gateway::StoreGateway;
pub use memory::InMemoryGateway;
pub use types::{
    tables, ChangeEvent, ChangeKind, Ordering, SubscribeSpec, Subscription, SubscriptionHandle,
};
