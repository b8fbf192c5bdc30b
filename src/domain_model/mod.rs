mod context;
mod sequence;
mod subject;
mod token;

pub use context::*;
pub use sequence::*;
pub use subject::*;
pub use token::*;
