mod redis_mutex;
mod redis_store;

pub use redis_mutex::*;
pub use redis_store::*;
