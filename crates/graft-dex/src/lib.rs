//! Dex reference tables and method signatures.
//!
//! This crate models the parts of a dex file the instrumentation core needs:
//! the type and method reference tables used to emit calls, and the
//! descriptor grammar used to name methods and their prototypes.

mod compilation_unit;
mod dex_file;
mod signature;
mod types;

pub use compilation_unit::*;
pub use dex_file::*;
pub use signature::*;
pub use types::*;

use thiserror::Error;

/// Descriptor and signature parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Empty type descriptor")]
    EmptyDescriptor,
    #[error("Invalid type descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Unterminated class descriptor: {0}")]
    UnterminatedClass(String),
    #[error("Prototype must start with '(': {0}")]
    MissingOpenParen(String),
    #[error("Prototype is missing ')': {0}")]
    MissingCloseParen(String),
    #[error("Trailing characters after descriptor: {0}")]
    TrailingCharacters(String),
    #[error("Method reference must have the form Lcls;->name(proto)ret: {0}")]
    InvalidMethodReference(String),
    #[error("Class descriptor expected, got {0}")]
    NotAClass(String),
}

pub type Result<T> = std::result::Result<T, SignatureError>;
