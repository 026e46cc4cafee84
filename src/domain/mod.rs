pub mod entities;
pub mod value_objects;

pub use entities::{EntityRow, MutationOutcome, SyncQueueEntry, SyncReport};
pub use value_objects::{EntityId, EntityKind, SyncOperation};
