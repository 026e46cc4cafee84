pub mod offline;

pub use offline::{
    EntityRow, MutationOutcome, StoreRow, SyncQueueDraft, SyncQueueEntry, SyncReport,
    SYNC_IN_PROGRESS_MESSAGE, TOMBSTONE_STATUS,
};
