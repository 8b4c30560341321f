//! Lyra State Management
//!
//! Persists the resources Lyra manages together with the composite
//! identifier each one was created under.
//!
//! - **StateFile**: all managed resources of one manifest
//! - **StateBackend**: storage for the state file plus its lock
//! - **LockInfo**: who holds the lock and until when
//!
//! # Example
//!
//! ```ignore
//! use lyra_state::{create_backend, BackendConfig, StateFile};
//!
//! let backend = create_backend(&BackendConfig::local("lyra.state.json"))?;
//! let lock = backend.acquire_lock("apply").await?;
//!
//! let mut state = backend.read_state().await?.unwrap_or_default();
//! // ... record provider results ...
//! state.increment_serial();
//! backend.write_state(&state).await?;
//!
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
