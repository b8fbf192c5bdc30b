mod expiring_store;
mod mutex_provider;

pub use expiring_store::*;
pub use mutex_provider::*;
