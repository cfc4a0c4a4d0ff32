/*!
  The assembler front end: source text in, resolved instructions out.
*/

pub mod ast;
mod compile;
pub mod lexer;
mod parser;
pub mod symboltable;

pub use compile::{assemble, compile, Compilation};
pub use parser::parse;
pub use lexer::tokenize;
