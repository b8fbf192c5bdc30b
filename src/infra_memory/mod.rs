mod memory_mutex;
mod memory_store;

pub use memory_mutex::*;
pub use memory_store::*;
