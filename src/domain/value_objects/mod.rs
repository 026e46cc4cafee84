pub mod approval_decision;
pub mod offline;

pub use approval_decision::{ApprovalDecision, ApprovalStatus};
pub use offline::{is_temp_id, EntityId, EntityKind, SyncOperation};
