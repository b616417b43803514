//! Programmatic pattern construction.
//!
//! The grammar compiler is an external collaborator; hosts and tests build
//! instruction streams through this builder instead. It keeps the flat-stream
//! invariants (alternative/argument slices, matching close indices) so the
//! engine never sees a malformed stream.
//!
//! Nested constructs emit into the same flat vector; open instructions are
//! emitted with placeholder ranges and patched once their contents are laid
//! out, the same emit-then-patch idiom a jump-target compiler uses.

use crate::instruction::{InstrSlice, Instruction, InstructionKind, Pattern};
use crate::query::QueryDescriptor;
use crate::span::Span;

/// Builder for compiled patterns.
#[derive(Debug, Default)]
pub struct PatternBuilder {
    name: Option<String>,
    instructions: Vec<Instruction>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder for a named pattern (name shows up in diagnostics).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            instructions: Vec::new(),
        }
    }

    /// Synthesized span for builder-constructed instructions. Real spans
    /// come from the external compiler; hosts that have them use
    /// [`push`](Self::push).
    fn auto_span(&self, len: u32) -> Span {
        let idx = self.instructions.len() as u32;
        Span::new(1, idx + 1, idx, len)
    }

    /// Append an instruction with an explicit source span.
    pub fn push(&mut self, kind: InstructionKind, span: Span) -> &mut Self {
        self.instructions.push(Instruction::new(kind, span));
        self
    }

    /// Append literal text.
    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        let span = self.auto_span(text.len() as u32);
        self.push(InstructionKind::Text(text), span)
    }

    /// Append an expanded escape sequence.
    pub fn escape(&mut self, expansion: impl Into<String>) -> &mut Self {
        let expansion = expansion.into();
        let span = self.auto_span(expansion.len() as u32);
        self.push(InstructionKind::Escape(expansion), span)
    }

    /// Append a quoted literal (bypasses capitalization at run time).
    pub fn quoted(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        let span = self.auto_span(text.len() as u32);
        self.push(InstructionKind::Quoted(text), span)
    }

    /// Append a math-expression span.
    pub fn math(&mut self, expr: impl Into<String>) -> &mut Self {
        let expr = expr.into();
        let span = self.auto_span(expr.len() as u32);
        self.push(InstructionKind::Math { expr }, span)
    }

    /// Append a dictionary query.
    pub fn query(&mut self, query: QueryDescriptor) -> &mut Self {
        let span = self.auto_span(0);
        self.push(InstructionKind::QueryOpen { query }, span);
        let span = self.auto_span(0);
        self.push(InstructionKind::QueryClose, span)
    }

    /// Append a block; alternatives are laid out through the closure.
    pub fn block(&mut self, f: impl FnOnce(&mut BlockBuilder)) -> &mut Self {
        let open_idx = self.instructions.len();
        let span = self.auto_span(0);
        self.push(
            InstructionKind::BlockOpen {
                alternatives: Vec::new(),
                weights: None,
                end: 0,
            },
            span,
        );

        let mut alts = BlockBuilder {
            builder: self,
            alternatives: Vec::new(),
            weights: Vec::new(),
            any_weighted: false,
        };
        f(&mut alts);
        let alternatives = alts.alternatives;
        let weights = if alts.any_weighted {
            Some(alts.weights)
        } else {
            None
        };

        let close_idx = self.instructions.len();
        let span = self.auto_span(0);
        self.push(InstructionKind::BlockClose, span);

        if let InstructionKind::BlockOpen {
            alternatives: slot,
            weights: weight_slot,
            end,
        } = &mut self.instructions[open_idx].kind
        {
            *slot = alternatives;
            *weight_slot = weights;
            *end = close_idx;
        }
        self
    }

    /// Append a tag call; arguments are laid out through the closure.
    pub fn tag(&mut self, name: impl Into<String>, f: impl FnOnce(&mut TagBuilder)) -> &mut Self {
        let open_idx = self.instructions.len();
        let span = self.auto_span(0);
        self.push(
            InstructionKind::TagOpen {
                name: name.into(),
                args: Vec::new(),
                end: 0,
            },
            span,
        );

        let mut tag_args = TagBuilder {
            builder: self,
            args: Vec::new(),
        };
        f(&mut tag_args);
        let args = tag_args.args;

        let close_idx = self.instructions.len();
        let span = self.auto_span(0);
        self.push(InstructionKind::TagClose, span);

        if let InstructionKind::TagOpen {
            args: slot, end, ..
        } = &mut self.instructions[open_idx].kind
        {
            *slot = args;
            *end = close_idx;
        }
        self
    }

    /// Append an argument-less tag call.
    pub fn tag0(&mut self, name: impl Into<String>) -> &mut Self {
        self.tag(name, |_| {})
    }

    /// Finish building, leaving the builder empty.
    pub fn build(&mut self) -> Pattern {
        Pattern::new(self.name.take(), std::mem::take(&mut self.instructions))
    }
}

/// Lays out the alternatives of one block.
pub struct BlockBuilder<'a> {
    builder: &'a mut PatternBuilder,
    alternatives: Vec<InstrSlice>,
    weights: Vec<f64>,
    any_weighted: bool,
}

impl BlockBuilder<'_> {
    /// Add an alternative with default weight.
    pub fn alternative(&mut self, f: impl FnOnce(&mut PatternBuilder)) -> &mut Self {
        self.lay_out(1.0, f);
        self
    }

    /// Add an alternative with an explicit selection weight.
    pub fn weighted(&mut self, weight: f64, f: impl FnOnce(&mut PatternBuilder)) -> &mut Self {
        self.any_weighted = true;
        self.lay_out(weight, f);
        self
    }

    /// Convenience: a plain-text alternative.
    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        self.alternative(|b| {
            b.text(text);
        })
    }

    fn lay_out(&mut self, weight: f64, f: impl FnOnce(&mut PatternBuilder)) {
        let start = self.builder.instructions.len();
        f(self.builder);
        let end = self.builder.instructions.len();
        self.alternatives.push(InstrSlice::new(start, end));
        self.weights.push(weight);
    }
}

/// Lays out the arguments of one tag call.
pub struct TagBuilder<'a> {
    builder: &'a mut PatternBuilder,
    args: Vec<InstrSlice>,
}

impl TagBuilder<'_> {
    /// Add an argument laid out through the closure.
    pub fn arg(&mut self, f: impl FnOnce(&mut PatternBuilder)) -> &mut Self {
        let start = self.builder.instructions.len();
        f(self.builder);
        let end = self.builder.instructions.len();
        self.args.push(InstrSlice::new(start, end));
        self
    }

    /// Convenience: a plain-text argument.
    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        self.arg(|b| {
            b.text(text);
        })
    }
}
