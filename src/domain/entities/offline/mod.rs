pub mod entity_row;
pub mod mutation_outcome;
pub mod sync_queue_item;
pub mod sync_result;

pub use entity_row::{EntityRow, StoreRow, TOMBSTONE_STATUS};
pub use mutation_outcome::MutationOutcome;
pub use sync_queue_item::{SyncQueueDraft, SyncQueueEntry};
pub use sync_result::{SyncReport, SYNC_IN_PROGRESS_MESSAGE};
