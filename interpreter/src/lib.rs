pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod value;

mod builtins;
mod callable;
pub(crate) mod env;
mod error;
mod generator;
mod limits;
mod ops;
mod types;

pub use callable::{Callable, KwArgs, Native, NativeFunction};
pub use interpreter::{Config, Interpreter, InterruptHandle, JitCompiler};
pub use parser::parse;
pub use renzmc_core::{format_error, Diagnostic, ErrorKind};
pub use resolver::{DirectoryResolver, ModuleResolver};
pub use value::Value;
