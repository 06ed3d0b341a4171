//! # triad-alignment
//!
//! Durable per-user alignment profiles.
//!
//! - **AlignmentStore**: `get_or_create` / `apply_accepted` / `peek` /
//!   `set_preference` / `snapshot`, behind an async trait so the backing
//!   store can be swapped without touching callers
//! - **ProfileStore**: per-user locking over a copy-on-read map, with
//!   write-through persistence of the full profile set on every mutation
//! - **ProfilePersistence**: JSON Lines file (atomic temp-then-rename) and
//!   in-memory backends
//!
//! Updates for the same user are serialised; different users proceed
//! independently. `snapshot` holds its read lock only long enough to
//! clone, so consolidation never stalls request handling.

#![deny(unsafe_code)]

pub mod error;
pub mod persistence;
pub mod store;

pub use error::{AlignmentError, AlignmentResult};
pub use persistence::{InMemoryProfiles, JsonLinesProfileFile, ProfilePersistence};
pub use store::{AlignmentStore, InMemoryProfileStore, JsonProfileStore, ProfileStore};
