pub mod entity_id;
pub mod entity_type;
pub mod sync_operation;

pub use entity_id::{is_temp_id, EntityId};
pub use entity_type::EntityKind;
pub use sync_operation::SyncOperation;
