//! Weft Pattern
//!
//! Data model for compiled patterns. The grammar compiler is an external
//! collaborator; this crate defines what it emits (a flat instruction
//! stream with source spans) plus the [`PatternBuilder`] hosts and tests
//! use to construct well-formed streams programmatically.

pub mod builder;
pub mod instruction;
pub mod query;
pub mod span;

pub use builder::PatternBuilder;
pub use instruction::{InstrSlice, Instruction, InstructionKind, Pattern};
pub use query::{ClassFilter, QueryDescriptor, RegexFilter};
pub use span::Span;

pub use regex::Regex;
