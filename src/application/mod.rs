pub mod mappers;
pub mod ports;
pub mod services;

pub use services::{
    ApprovalService, AssetService, RiskAssessmentService, SyncService, TaskHazardService,
    UserService,
};
