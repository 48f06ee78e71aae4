//! Core types and shared functionality for fadebin.
//!
//! This crate provides:
//! - Identifier allocation and expiry parsing
//! - Entry store with SQLite and in-memory backends
//! - Background eviction sweeper
//! - Per-client admission control
//! - Publication service tying the above together
//! - Configuration structures and wire types

pub mod clock;
pub mod config;
pub mod error;
pub mod expiry;
pub mod id;
pub mod ratelimit;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod wire;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::{Error, StoreError};
pub use expiry::{ExpiryError, Lifetime};
pub use id::{IdAllocator, RandomIds};
pub use ratelimit::{Admission, OperationClass, RateLimitConfig, RateLimiter};
pub use service::{PublishPolicy, Published, Publisher};
pub use store::{Entry, EntryStore, MemoryStore, SqliteStore};
pub use sweeper::{Sweeper, SweeperHandle, SweeperState};
