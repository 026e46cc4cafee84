pub mod keyring_store;
pub mod memory;

pub use keyring_store::KeyringSession;
pub use memory::InMemorySession;
