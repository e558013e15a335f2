//! StoreGateway trait - the remote store contract
//!
//! Everything the sync engines need from the hosted backend: record CRUD
//! with filter predicates, change-notification subscriptions, and named
//! server-side functions. The trait keeps the engines testable against
//! the in-memory implementation and leaves transport concerns (HTTP,
//! websockets, auth headers) to whichever adapter implements it.

use super::errors::GatewayResult;
use super::filter::Filter;
use super::types::{Ordering, SubscribeSpec, Subscription, SubscriptionHandle};
use async_trait::async_trait;
use serde_json::Value;

/// Abstraction over the remote record store
///
/// Rows cross this boundary as JSON values; the model layer owns the
/// typed decoding. Implementations must be cheap to share behind an
/// `Arc` and safe to call concurrently.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Fetch rows matching `filter`, optionally ordered and capped
    async fn query(
        &self,
        table: &str,
        filter: Filter,
        order: Option<Ordering>,
        limit: Option<usize>,
    ) -> GatewayResult<Vec<Value>>;

    /// Insert one record, returning the stored row (with assigned id)
    async fn insert(&self, table: &str, record: Value) -> GatewayResult<Value>;

    /// Patch all rows matching `filter`, returning the updated rows
    async fn update(&self, table: &str, filter: Filter, patch: Value) -> GatewayResult<Vec<Value>>;

    /// Insert, or replace the row whose `key_columns` all match `record`
    async fn upsert(
        &self,
        table: &str,
        record: Value,
        key_columns: &[&str],
    ) -> GatewayResult<Value>;

    /// Delete all rows matching `filter`, returning the removed rows
    async fn delete(&self, table: &str, filter: Filter) -> GatewayResult<Vec<Value>>;

    /// Register for change notifications on (table, kinds, filter)
    async fn subscribe(&self, spec: SubscribeSpec) -> GatewayResult<Subscription>;

    /// Tear down a previously registered subscription
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> GatewayResult<()>;

    /// Invoke a named server-side function
    async fn rpc(&self, function: &str, params: Value) -> GatewayResult<Value>;
}
