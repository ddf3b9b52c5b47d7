//! Configuration file parsing

pub mod directive;
pub mod tokenizer;

pub use directive::{ConfigParser, Diagnostic, ParseOutcome};
pub use tokenizer::{tokenize, MAX_FIELDS};
