pub mod memory;
mod provider;

pub use memory::{MemoryRemoteStore, MemoryStoreError};
pub use provider::{RemoteStore, Snapshot, StoreError, Subscription};
