mod base;
mod splitter;
mod vocabulary;

pub use base::*;
pub use splitter::*;
pub use vocabulary::*;
