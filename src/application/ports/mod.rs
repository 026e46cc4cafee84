pub mod connectivity;
pub mod local_store;
pub mod remote_gateway;
pub mod session;

pub use connectivity::ConnectivityMonitor;
pub use local_store::{LocalStore, StoreFilter, SyncQueueStore, Table};
pub use remote_gateway::{ApprovalGateway, EntityGateway, ListParams};
pub use session::SessionProvider;
