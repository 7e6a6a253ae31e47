//! nskv - namespaced key-value access over a swappable backend.
//!
//! nskv layers three things on top of a minimal ordered key-value backend:
//! hierarchical scopes so unrelated subsystems can share one physical store,
//! translation of logical range scans into the backend's prefixed key space,
//! and atomic transactions whose writes may span several scopes.
//!
//! # Architecture
//!
//! A [`Kv`] facade owns a [`Prefixer`] and a [`Writer`] and shares an
//! `Arc<dyn Backend>` with every facade derived from it. Logical keys are
//! prefixed on the way in and stripped on the way out:
//!
//! ```text
//! absolute key: | scope (divisor scope)* | delimiter | logical key |
//! ```
//!
//! Values are encoded by a [`Codec`], JSON by default. All writes go through
//! a writer and reach the backend as one atomic batch per transaction.
//!
//! # Key Concepts
//!
//! - **Kv**: the facade, scoped with [`Kv::scope`] and widened to include
//!   descendant scopes with [`Kv::flatten`].
//! - **Writer**: builds put/delete ops without applying them, so writes from
//!   several scopes can be combined in one [`Kv::transaction`].
//! - **Store**: a facade bound to a single key.
//! - **Scan**: a logical, inclusive key range with an optional limit.
//!
//! # Example
//!
//! ```ignore
//! use nskv::{Config, Kv, Scan};
//!
//! let kv: Kv<String> = Kv::open(config).await?;
//! let users = kv.scope("users");
//!
//! users.set("alice", "admin".to_string()).await?;
//! users.set("bob", None).await?; // deletes
//!
//! let mut keys = users.keys(&Scan::new().start("a").limit(10)).await?;
//! while let Some(key) = keys.next().await? {
//!     println!("{}", key);
//! }
//!
//! users.clear(&Scan::new()).await?;
//! ```

mod chunks;
mod codec;
mod config;
mod error;
mod keyvalue;
mod model;
mod prefixer;
mod store;
mod stream;
mod writer;

pub use chunks::chunks;
pub use codec::{Codec, JsonCodec};
pub use common::{Backend, BackendConfig, BackendError, WriteOp};
pub use config::{Config, DEFAULT_CHUNK_SIZE, KvOptions};
pub use error::{Error, Result};
pub use keyvalue::Kv;
pub use model::{Entry, Scan};
pub use prefixer::{Prefixer, SCAN_END};
pub use store::Store;
pub use stream::{EntryStream, KeyStream, ValueStream};
pub use writer::Writer;
