//! Compiled instruction streams.
//!
//! A pattern compiles to a single flat `Vec<Instruction>`. Nested constructs
//! (block alternatives, tag arguments) are not nested vectors; they are
//! index ranges ([`InstrSlice`]) into the same flat stream, so the engine
//! can run any sub-construct by pointing a frame cursor at its range.
//!
//! The instruction set is closed and known ahead of time; the engine
//! dispatches with a `match` over [`InstructionKind`].

use crate::query::QueryDescriptor;
use crate::span::Span;

/// Half-open index range `[start, end)` into a pattern's instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrSlice {
    pub start: usize,
    pub end: usize,
}

impl InstrSlice {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of instructions covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One unit of compiled work.
#[derive(Debug, Clone)]
pub enum InstructionKind {
    /// Literal text.
    Text(String),
    /// Escape sequence, already expanded by the compiler.
    Escape(String),
    /// Quoted literal; written verbatim, bypassing capitalization.
    Quoted(String),
    /// Start of a block of pipe-separated alternatives.
    ///
    /// Each alternative is a slice of the enclosing stream, laid out between
    /// this instruction and the matching [`BlockClose`](Self::BlockClose) at
    /// `end`. Optional constant weights bias unsynchronized selection.
    BlockOpen {
        alternatives: Vec<InstrSlice>,
        weights: Option<Vec<f64>>,
        end: usize,
    },
    /// End of a block.
    BlockClose,
    /// Start of a tag (function or subroutine call) with semicolon-separated
    /// argument slices. `end` is the index of the matching
    /// [`TagClose`](Self::TagClose).
    TagOpen {
        name: String,
        args: Vec<InstrSlice>,
        end: usize,
    },
    /// End of a tag.
    TagClose,
    /// Start of a dictionary query; the descriptor is fully compiled.
    QueryOpen { query: QueryDescriptor },
    /// End of a dictionary query.
    QueryClose,
    /// Math-expression span; evaluated and the result written as text.
    Math { expr: String },
}

/// A compiled instruction with its source position.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub span: Span,
}

impl Instruction {
    pub fn new(kind: InstructionKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// A compiled pattern: the unit of execution.
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    /// Optional name, used in diagnostics.
    pub name: Option<String>,
    /// The flat instruction stream.
    pub instructions: Vec<Instruction>,
}

impl Pattern {
    pub fn new(name: Option<String>, instructions: Vec<Instruction>) -> Self {
        Self { name, instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Get an instruction by index.
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Slice covering the whole stream.
    pub fn full_slice(&self) -> InstrSlice {
        InstrSlice::new(0, self.instructions.len())
    }
}
