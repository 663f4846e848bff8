//! Shared leaf utilities for the labkit research toolkit: structured
//! errors, canonical serialization, deterministic hashing, slice helpers,
//! and a small event scheduler.

#![deny(missing_docs)]

pub mod errors;
pub mod events;
pub mod hash;
pub mod iter;
pub mod serde;

pub use errors::{ErrorInfo, LabError};
pub use events::{listener_pair, EventSchedule, Listener, Trigger};
pub use hash::dict_hash;
pub use serde::{from_json_slice, to_canonical_json_bytes};
