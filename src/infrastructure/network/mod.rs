pub mod connectivity;

pub use connectivity::{NetworkStatus, ReachabilityProbe};
