pub mod client;
pub mod gateways;

pub use client::ApiClient;
pub use gateways::{HttpApprovalGateway, HttpEntityGateway};
