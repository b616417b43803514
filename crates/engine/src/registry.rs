//! Tag and subroutine registries.
//!
//! Tag handlers are boxed closures keyed by name, with a per-parameter
//! evaluation mode: eager parameters are expanded to strings before the
//! handler runs, lazy ones are handed over as unevaluated instruction
//! slices. Registries are immutable once built and injected into the
//! interpreter, so hosts can extend the tag set without touching the
//! engine.

use indexmap::IndexMap;
use std::rc::Rc;

use weft_pattern::{InstrSlice, Pattern, Span};

use crate::error::Result;
use crate::interpreter::Interpreter;

/// Evaluation mode of one tag parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    /// Expanded to a string before the handler runs.
    Eager,
    /// Passed to the handler as an unevaluated slice.
    Lazy,
}

/// A tag call with its arguments sorted by mode, ready for the handler.
#[derive(Debug)]
pub struct TagInvocation {
    pub span: Span,
    /// Expanded eager arguments, in declaration order.
    pub eager: Vec<String>,
    /// Unevaluated lazy arguments, in declaration order.
    pub lazy: Vec<InstrSlice>,
}

/// Handler signature. Handlers run with full interpreter access so they
/// can write output, push frames, and touch synchronizers.
pub type TagHandlerFn = Box<dyn Fn(&mut Interpreter, TagInvocation) -> Result<()> + Send + Sync>;

/// One registered tag: its parameter modes and handler.
pub struct TagDef {
    pub params: Vec<ParamMode>,
    pub handler: TagHandlerFn,
}

impl std::fmt::Debug for TagDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagDef")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Immutable name→tag map.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tags: IndexMap<String, TagDef>,
}

impl TagRegistry {
    /// Empty registry, for hosts that want full control over the tag set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in tags.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        crate::tags::install(&mut registry);
        registry
    }

    /// Add or replace a tag. Consuming-builder style so hosts can chain
    /// onto [`builtin`](Self::builtin).
    pub fn with_tag(
        mut self,
        name: impl Into<String>,
        params: Vec<ParamMode>,
        handler: TagHandlerFn,
    ) -> Self {
        self.register(name, params, handler);
        self
    }

    pub(crate) fn register(
        &mut self,
        name: impl Into<String>,
        params: Vec<ParamMode>,
        handler: TagHandlerFn,
    ) {
        self.tags.insert(name.into(), TagDef { params, handler });
    }

    pub fn get(&self, name: &str) -> Option<&TagDef> {
        self.tags.get(name)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// A named, parameterized pattern callable through tag syntax.
#[derive(Debug, Clone)]
pub struct Subroutine {
    pub params: Vec<String>,
    pub body: Rc<Pattern>,
}

/// Subroutines keyed by name and arity, so `greet` with one argument and
/// `greet` with two can coexist.
#[derive(Debug, Default)]
pub struct SubroutineSet {
    subs: IndexMap<(String, usize), Subroutine>,
}

impl SubroutineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, params: Vec<String>, body: Pattern) {
        self.subs.insert(
            (name.into(), params.len()),
            Subroutine {
                params,
                body: Rc::new(body),
            },
        );
    }

    pub fn get(&self, name: &str, arity: usize) -> Option<&Subroutine> {
        self.subs.get(&(name.to_string(), arity))
    }

    /// Whether any arity of `name` is defined.
    pub fn contains_name(&self, name: &str) -> bool {
        self.subs.keys().any(|(n, _)| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}
