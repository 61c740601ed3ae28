// Predicate language - tokens, lexer and parser producing expression trees

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::{ParseError, ParseResult};
pub use lexer::Lexer;
pub use parser::{parse_predicate, Parser};
pub use token::Token;
