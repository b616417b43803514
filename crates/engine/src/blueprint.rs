//! Deferred interpreter work.
//!
//! The interpreter never recurses; anything that must happen "after this
//! frame" or "before resuming this frame" is recorded as a blueprint on the
//! frame and invoked by the trampoline in the main loop.

use weft_pattern::{InstrSlice, Span};

/// A unit of deferred work attached to a frame.
#[derive(Debug)]
pub enum Blueprint {
    /// Ask the innermost repeater for its next iteration.
    Repeat,
    /// Collect eager argument results and run a tag handler.
    FinishTag {
        name: String,
        span: Span,
        /// Number of eager results to collect off the results stack.
        eager: usize,
        /// Lazy argument slices, passed to the handler unevaluated.
        lazy: Vec<InstrSlice>,
    },
    /// Collect eager argument results and enter a subroutine body.
    CallSubroutine {
        name: String,
        span: Span,
        arity: usize,
    },
    /// Drop the innermost local-bindings frame.
    PopLocals,
    /// Deactivate a channel when its scope frame finishes.
    PopChannel(String),
    /// Toggle positional-stat visibility on the innermost repeater.
    SetStats(bool),
}
