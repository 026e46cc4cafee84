pub mod approval_service;
pub mod asset_service;
pub mod entity_sync_service;
pub mod risk_assessment_service;
pub mod sync_lock;
pub mod sync_service;
pub mod task_hazard_service;
pub mod user_service;

pub use approval_service::ApprovalService;
pub use asset_service::AssetService;
pub use entity_sync_service::{EntitySyncService, SyncContext, SyncPolicy};
pub use risk_assessment_service::RiskAssessmentService;
pub use sync_lock::{SyncGuard, SyncLock};
pub use sync_service::{AutoSyncHandle, AutoSyncScheduler, SyncParticipant, SyncService, SyncStatus};
pub use task_hazard_service::TaskHazardService;
pub use user_service::UserService;
