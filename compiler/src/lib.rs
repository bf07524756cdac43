pub mod lexer;
pub mod assembler;
pub mod listing;
pub mod logging;
pub mod cli;

pub use lexer::*;
pub use assembler::*;
pub use listing::*;
pub use cli::*;
