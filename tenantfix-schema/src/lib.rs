//! Block-level view of a Prisma-style schema document.
//!
//! The parser only understands what tenantfix needs to edit: top-level
//! `<keyword> <Name> { ... }` blocks and a classification of each body line.
//! Everything else is carried through as opaque text, so serializing an
//! unedited [`Document`] reproduces the input byte-for-byte.

mod document;
mod error;
mod parse;

pub use document::{Block, Document, FieldDecl, Line, LineKind};
pub use error::ParseError;
