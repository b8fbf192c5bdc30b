mod account_service;
mod id_allocator;
mod token_codec;
mod token_lifecycle;

pub use account_service::*;
pub use id_allocator::*;
pub use token_codec::*;
pub use token_lifecycle::*;
