//! Observable state container
//!
//! The reactive "store with subscribe/update" idiom the UI layer
//! consumes: internal state behind a `watch` channel, mutated only
//! through [`ObservableState::update`], which notifies every watcher
//! atomically. Handlers run to completion without awaits around the
//! mutation, so each update is atomic with respect to other handlers
//! on the same runtime.

use tokio::sync::watch;

/// Shared, observable snapshot of an engine's state
#[derive(Debug)]
pub struct ObservableState<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> ObservableState<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        ObservableState { tx }
    }

    /// Clone of the current snapshot
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Mutate the state in place and notify watchers
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.tx.send_modify(f);
    }

    /// Replace the whole snapshot and notify watchers
    pub fn replace(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Register a watcher; the receiver yields on every change
    pub fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: u64,
    }

    #[tokio::test]
    async fn test_update_notifies_watchers() {
        let state = ObservableState::new(Counter::default());
        let mut watcher = state.watch();

        state.update(|s| s.value += 1);
        watcher.changed().await.unwrap();
        assert_eq!(watcher.borrow().value, 1);
        assert_eq!(state.get().value, 1);
    }

    #[tokio::test]
    async fn test_update_without_watchers_does_not_fail() {
        let state = ObservableState::new(Counter::default());
        state.update(|s| s.value = 42);
        assert_eq!(state.get().value, 42);
    }

    #[tokio::test]
    async fn test_replace() {
        let state = ObservableState::new(Counter { value: 1 });
        state.replace(Counter { value: 9 });
        assert_eq!(state.get(), Counter { value: 9 });
    }
}
