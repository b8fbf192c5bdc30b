mod account_service_impl;
mod sequence_allocator;
mod token_codec_fake;
mod token_lifecycle_store;

pub use account_service_impl::*;
pub use sequence_allocator::*;
pub use token_codec_fake::*;
pub use token_lifecycle_store::*;
