pub mod database;
pub mod http;
pub mod network;
pub mod session;

pub use database::{ConnectionPool, SqliteLocalStore};
pub use http::{ApiClient, HttpApprovalGateway, HttpEntityGateway};
pub use network::{NetworkStatus, ReachabilityProbe};
pub use session::{InMemorySession, KeyringSession};
