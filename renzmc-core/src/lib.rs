mod error;
mod format;
mod scanner;
mod token;

pub use error::*;
pub use format::*;
pub use scanner::*;
pub use token::*;
