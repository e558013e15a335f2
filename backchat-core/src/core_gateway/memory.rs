//! In-memory StoreGateway for tests
//!
//! A complete in-process stand-in for the hosted store: JSON rows in
//! per-table vectors, local filter evaluation, and synchronous fan-out
//! of change events to matching subscribers. It also counts operations
//! per table so tests can assert that an engine made (or skipped) a
//! remote call.

use super::errors::{GatewayError, GatewayResult};
use super::filter::Filter;
use super::gateway::StoreGateway;
use super::types::{
    ChangeEvent, ChangeKind, Ordering, SubscribeSpec, Subscription, SubscriptionHandle,
};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

struct Subscriber {
    handle: SubscriptionHandle,
    spec: SubscribeSpec,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

/// In-memory remote store with change-notification fan-out
#[derive(Default)]
pub struct InMemoryGateway {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    subscribers: Mutex<Vec<Subscriber>>,
    rpcs: Mutex<HashMap<String, Value>>,
    calls: Mutex<HashMap<(String, String), usize>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a table with rows (ids must already be set)
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Register a canned response for a named server-side function
    pub fn register_rpc(&self, function: &str, response: Value) {
        self.rpcs
            .lock()
            .unwrap()
            .insert(function.to_string(), response);
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// How many times `op` was called against `table`
    pub fn call_count(&self, op: &str, table: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(op.to_string(), table.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn record_call(&self, op: &str, table: &str) {
        *self
            .calls
            .lock()
            .unwrap()
            .entry((op.to_string(), table.to_string()))
            .or_insert(0) += 1;
    }

    fn dispatch(&self, event: ChangeEvent) {
        let subscribers = self.subscribers.lock().unwrap();
        for sub in subscribers.iter() {
            if sub.spec.table != event.table || !sub.spec.kinds.contains(&event.kind) {
                continue;
            }
            let matched = event
                .row()
                .map(|row| sub.spec.filter.matches(row))
                .unwrap_or(false);
            if matched {
                // Receiver may already be gone; that subscription is inert
                let _ = sub.tx.send(event.clone());
            }
        }
    }

    fn ensure_id(record: &mut Value) {
        if record.get("id").map(Value::is_null).unwrap_or(true) {
            record["id"] = Value::String(uuid::Uuid::new_v4().to_string());
        }
    }

    fn merge(target: &mut Value, patch: &Value) {
        if let (Some(target_map), Some(patch_map)) = (target.as_object_mut(), patch.as_object()) {
            for (key, value) in patch_map {
                target_map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[async_trait]
impl StoreGateway for InMemoryGateway {
    async fn query(
        &self,
        table: &str,
        filter: Filter,
        order: Option<Ordering>,
        limit: Option<usize>,
    ) -> GatewayResult<Vec<Value>> {
        self.record_call("query", table);
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let cmp = compare_cells(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending {
                    cmp
                } else {
                    cmp.reverse()
                }
            });
        }

        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, mut record: Value) -> GatewayResult<Value> {
        self.record_call("insert", table);
        if !record.is_object() {
            return Err(GatewayError::Remote("record must be a JSON object".to_string()));
        }
        Self::ensure_id(&mut record);

        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(record.clone());

        self.dispatch(ChangeEvent {
            kind: ChangeKind::Insert,
            table: table.to_string(),
            new: Some(record.clone()),
            old: None,
        });

        Ok(record)
    }

    async fn update(&self, table: &str, filter: Filter, patch: Value) -> GatewayResult<Vec<Value>> {
        self.record_call("update", table);
        let mut updated = Vec::new();
        {
            let mut tables = self.tables.lock().unwrap();
            if let Some(rows) = tables.get_mut(table) {
                for row in rows.iter_mut() {
                    if filter.matches(row) {
                        let old = row.clone();
                        Self::merge(row, &patch);
                        updated.push((old, row.clone()));
                    }
                }
            }
        }

        let mut result = Vec::with_capacity(updated.len());
        for (old, new) in updated {
            self.dispatch(ChangeEvent {
                kind: ChangeKind::Update,
                table: table.to_string(),
                new: Some(new.clone()),
                old: Some(old),
            });
            result.push(new);
        }
        Ok(result)
    }

    async fn upsert(
        &self,
        table: &str,
        mut record: Value,
        key_columns: &[&str],
    ) -> GatewayResult<Value> {
        self.record_call("upsert", table);
        if !record.is_object() {
            return Err(GatewayError::Remote("record must be a JSON object".to_string()));
        }

        let existing = {
            let mut tables = self.tables.lock().unwrap();
            let rows = tables.entry(table.to_string()).or_default();
            let position = rows.iter().position(|row| {
                key_columns.iter().all(|column| {
                    row.get(*column).unwrap_or(&Value::Null)
                        == record.get(*column).unwrap_or(&Value::Null)
                })
            });
            match position {
                Some(index) => {
                    let old = rows[index].clone();
                    // Keep the stored id on replacement
                    record["id"] = old["id"].clone();
                    Self::merge(&mut rows[index], &record);
                    Some((old, rows[index].clone()))
                }
                None => {
                    Self::ensure_id(&mut record);
                    rows.push(record.clone());
                    None
                }
            }
        };

        match existing {
            Some((old, new)) => {
                self.dispatch(ChangeEvent {
                    kind: ChangeKind::Update,
                    table: table.to_string(),
                    new: Some(new.clone()),
                    old: Some(old),
                });
                Ok(new)
            }
            None => {
                self.dispatch(ChangeEvent {
                    kind: ChangeKind::Insert,
                    table: table.to_string(),
                    new: Some(record.clone()),
                    old: None,
                });
                Ok(record)
            }
        }
    }

    async fn delete(&self, table: &str, filter: Filter) -> GatewayResult<Vec<Value>> {
        self.record_call("delete", table);
        let removed: Vec<Value> = {
            let mut tables = self.tables.lock().unwrap();
            match tables.get_mut(table) {
                Some(rows) => {
                    let (gone, kept): (Vec<Value>, Vec<Value>) =
                        rows.drain(..).partition(|row| filter.matches(row));
                    *rows = kept;
                    gone
                }
                None => Vec::new(),
            }
        };

        for row in &removed {
            self.dispatch(ChangeEvent {
                kind: ChangeKind::Delete,
                table: table.to_string(),
                new: None,
                old: Some(row.clone()),
            });
        }
        Ok(removed)
    }

    async fn subscribe(&self, spec: SubscribeSpec) -> GatewayResult<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SubscriptionHandle::generate();
        self.subscribers.lock().unwrap().push(Subscriber {
            handle: handle.clone(),
            spec,
            tx,
        });
        Ok(Subscription { handle, events: rx })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> GatewayResult<()> {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|sub| sub.handle != handle);
        if subscribers.len() == before {
            return Err(GatewayError::Subscription(format!(
                "unknown subscription handle: {}",
                handle
            )));
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, _params: Value) -> GatewayResult<Value> {
        self.record_call("rpc", function);
        self.rpcs
            .lock()
            .unwrap()
            .get(function)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("rpc function: {}", function)))
    }
}

/// Total order over JSON cells for sorting: null < bool < number < string
fn compare_cells(a: &Value, b: &Value) -> CmpOrdering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(f64::NAN)
            .partial_cmp(&y.as_f64().unwrap_or(f64::NAN))
            .unwrap_or(CmpOrdering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
