//! Shared plumbing for the sync engines: the error taxonomy and the
//! observable state container both engines expose to the UI layer.

pub mod errors;
pub mod observable;

pub use errors::{SyncError, SyncResult};
pub use observable::ObservableState;
