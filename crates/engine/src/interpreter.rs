//! The blueprint machine.
//!
//! Execution is an explicit frame stack plus deferred-work blueprints; the
//! interpreter never recurses, so pattern nesting depth is bounded by
//! configuration rather than the thread stack. Each loop turn either
//! invokes the top frame's pending blueprint, retires the frame, or
//! executes one instruction.
//!
//! Frames come in two flavors distinguished by their output handle: body
//! frames share their parent's channel stack and write straight through;
//! argument frames get a private stack whose `main` text is pushed onto
//! the results stack when the frame retires, where a `FinishTag` or
//! `CallSubroutine` blueprint collects it.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use weft_foundation::{PatternRng, fnv1a64_str};
use weft_pattern::{InstrSlice, Instruction, InstructionKind, Pattern, QueryDescriptor, Span};

use crate::blueprint::Blueprint;
use crate::channel::ChannelStack;
use crate::config::EngineConfig;
use crate::dict::{Dictionary, missing_sentinel};
use crate::error::{EngineError, Result};
use crate::math;
use crate::output::RunOutput;
use crate::registry::{ParamMode, SubroutineSet, TagInvocation, TagRegistry};
use crate::repeater::{BlockAttributes, Repeater};
use crate::state::State;
use crate::sync::{SyncType, Synchronizer};

/// Executes one compiled pattern.
pub struct Interpreter {
    pattern: Rc<Pattern>,
    config: EngineConfig,
    registry: Arc<TagRegistry>,
    subroutines: Rc<SubroutineSet>,
    dictionary: Option<Rc<dyn Dictionary>>,
    rng: PatternRng,
    base_seed: i64,

    states: Vec<State>,
    /// Main-channel texts of retired argument frames, awaiting collection.
    results: Vec<String>,
    /// One entry per active block, innermost last.
    repeaters: Vec<Repeater>,
    syncs: IndexMap<String, Synchronizer>,
    /// Decorations accumulated by tags ahead of the next block.
    pending: BlockAttributes,
    /// Subroutine argument bindings, innermost frame last.
    locals: Vec<Vec<(String, String)>>,
}

impl Interpreter {
    pub fn new(pattern: Pattern, config: EngineConfig) -> Self {
        let base_seed = config.resolve_seed();
        Self {
            pattern: Rc::new(pattern),
            config,
            registry: Arc::new(TagRegistry::builtin()),
            subroutines: Rc::new(SubroutineSet::new()),
            dictionary: None,
            rng: PatternRng::new(base_seed),
            base_seed,
            states: Vec::new(),
            results: Vec::new(),
            repeaters: Vec::new(),
            syncs: IndexMap::new(),
            pending: BlockAttributes::default(),
            locals: Vec::new(),
        }
    }

    /// Replace the tag registry (default: [`TagRegistry::builtin`]).
    pub fn with_registry(mut self, registry: Arc<TagRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_subroutines(mut self, subroutines: SubroutineSet) -> Self {
        self.subroutines = Rc::new(subroutines);
        self
    }

    pub fn with_dictionary(mut self, dictionary: Rc<dyn Dictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// The seed this interpreter runs with.
    pub fn seed(&self) -> i64 {
        self.base_seed
    }

    /// Run the pattern to completion. Re-running yields the same output:
    /// all per-run state is rebuilt and the RNG rewinds to generation zero.
    pub fn run(&mut self) -> Result<RunOutput> {
        debug!(
            seed = self.base_seed,
            pattern = self.pattern.name.as_deref().unwrap_or("<anonymous>"),
            instructions = self.pattern.len(),
            "run started"
        );
        self.states.clear();
        self.results.clear();
        self.repeaters.clear();
        self.syncs.clear();
        self.locals.clear();
        self.pending = BlockAttributes::default();
        self.rng = PatternRng::new(self.base_seed);

        let root_output = Rc::new(RefCell::new(ChannelStack::new(self.config.char_limit)));
        let pattern = Rc::clone(&self.pattern);
        let slice = pattern.full_slice();
        self.push_state(State::new(pattern, slice, Rc::clone(&root_output)))?;

        loop {
            let Some(top) = self.states.last_mut() else {
                break;
            };
            if let Some(blueprint) = top.take_pre() {
                self.invoke(blueprint)?;
                continue;
            }
            if top.finished() {
                if let Some(blueprint) = top.pop_post() {
                    self.invoke(blueprint)?;
                    continue;
                }
                let state = self.states.pop().expect("state stack non-empty");
                if let Some(parent) = self.states.last()
                    && !Rc::ptr_eq(&state.output, &parent.output)
                {
                    let text = state.output.borrow().main_text();
                    trace!(result = %text, "argument frame retired");
                    self.results.push(text);
                }
                continue;
            }
            let ip = top.ip;
            top.ip += 1;
            let pattern = Rc::clone(&top.pattern);
            let instruction = pattern.get(ip).expect("ip within frame slice");
            self.execute(instruction)?;
        }

        let output = root_output.borrow().finalize();
        debug!(main_len = output.main().len(), "run finished");
        Ok(output)
    }

    /// Expand a pattern in an isolated nested run sharing this
    /// interpreter's registry, subroutines and dictionary. The nested RNG
    /// is forked off this one, so the call perturbs the outer sequence
    /// exactly one draw.
    pub fn run_nested(&mut self, pattern: Pattern) -> Result<String> {
        let forked = self.rng.fork();
        let mut nested = Interpreter {
            pattern: Rc::new(pattern),
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            subroutines: Rc::clone(&self.subroutines),
            dictionary: self.dictionary.clone(),
            base_seed: forked.seed(),
            rng: forked,
            states: Vec::new(),
            results: Vec::new(),
            repeaters: Vec::new(),
            syncs: IndexMap::new(),
            pending: BlockAttributes::default(),
            locals: Vec::new(),
        };
        Ok(nested.run()?.main().to_string())
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<()> {
        let span = instruction.span;
        match &instruction.kind {
            InstructionKind::Text(text) | InstructionKind::Escape(text) => self.write(text),
            InstructionKind::Quoted(text) => self.write_raw(text),
            InstructionKind::Math { expr } => {
                let value = math::eval(expr).map_err(|message| EngineError::MalformedPattern {
                    message,
                    span,
                })?;
                self.write(&math::format_number(value))
            }
            InstructionKind::BlockOpen {
                alternatives,
                weights,
                end,
            } => self.begin_block(alternatives.clone(), weights.clone(), *end),
            InstructionKind::TagOpen { name, args, end } => {
                self.begin_tag(name.clone(), args.clone(), *end, span)
            }
            InstructionKind::QueryOpen { query } => self.run_query(query),
            InstructionKind::BlockClose
            | InstructionKind::TagClose
            | InstructionKind::QueryClose => Ok(()),
        }
    }

    /// Open a block: jump past it, consume pending decorations into a new
    /// repeater, and schedule the first iteration.
    fn begin_block(
        &mut self,
        alternatives: Vec<InstrSlice>,
        weights: Option<Vec<f64>>,
        end: usize,
    ) -> Result<()> {
        let top = self.states.last_mut().expect("state stack non-empty");
        top.ip = end + 1;
        let attrs = std::mem::take(&mut self.pending);
        let repeater = Repeater::new(Rc::clone(&top.pattern), alternatives, weights, attrs);
        trace!(iterations = repeater.count(), "block opened");
        self.repeaters.push(repeater);
        self.drive_repeater()
    }

    /// One repeater turn: select the next iteration and push its frames,
    /// or retire the repeater when the block is done.
    fn drive_repeater(&mut self) -> Result<()> {
        let Some(repeater) = self.repeaters.last_mut() else {
            return Ok(());
        };
        let sync = match repeater.sync_id() {
            Some(id) => self.syncs.get_mut(id),
            None => None,
        };
        let Some(step) = repeater.select(&mut self.rng, sync) else {
            trace!("block finished");
            self.repeaters.pop();
            return Ok(());
        };

        let (pattern, output) = {
            let top = self.states.last_mut().expect("state stack non-empty");
            top.pre = Some(Blueprint::Repeat);
            (Rc::clone(&top.pattern), Rc::clone(&top.output))
        };

        // Pushed in reverse so execution runs before, item, after, separator.
        if let Some(separator) = step.separator {
            let state = State::new(Rc::clone(&pattern), separator, Rc::clone(&output))
                .with_pre(Blueprint::SetStats(false))
                .with_post(Blueprint::SetStats(true));
            self.push_state(state)?;
        }
        if let Some(after) = step.after {
            self.push_state(State::new(
                Rc::clone(&pattern),
                after,
                Rc::clone(&output),
            ))?;
        }
        self.push_state(State::new(
            Rc::clone(&pattern),
            step.item,
            Rc::clone(&output),
        ))?;
        if let Some(before) = step.before {
            self.push_state(State::new(pattern, before, output))?;
        }
        Ok(())
    }

    /// Open a tag call: jump past it, then either schedule eager-argument
    /// frames ahead of the handler, or resolve a subroutine.
    fn begin_tag(
        &mut self,
        name: String,
        args: Vec<InstrSlice>,
        end: usize,
        span: Span,
    ) -> Result<()> {
        let pattern = {
            let top = self.states.last_mut().expect("state stack non-empty");
            top.ip = end + 1;
            Rc::clone(&top.pattern)
        };

        let registry = Arc::clone(&self.registry);
        if let Some(def) = registry.get(&name) {
            if def.params.len() != args.len() {
                return Err(EngineError::ArgumentMismatch {
                    name,
                    expected: def.params.len(),
                    got: args.len(),
                    span,
                });
            }
            let mut eager = Vec::new();
            let mut lazy = Vec::new();
            for (mode, slice) in def.params.iter().zip(&args) {
                match mode {
                    ParamMode::Eager => eager.push(*slice),
                    ParamMode::Lazy => lazy.push(*slice),
                }
            }
            trace!(tag = %name, eager = eager.len(), lazy = lazy.len(), "tag opened");
            let top = self.states.last_mut().expect("state stack non-empty");
            top.pre = Some(Blueprint::FinishTag {
                name,
                span,
                eager: eager.len(),
                lazy,
            });
            // Reverse order so the first argument evaluates first.
            for slice in eager.into_iter().rev() {
                self.push_arg_frame(&pattern, slice)?;
            }
            return Ok(());
        }

        if self.subroutines.get(&name, args.len()).is_some() {
            trace!(subroutine = %name, arity = args.len(), "subroutine call");
            let top = self.states.last_mut().expect("state stack non-empty");
            top.pre = Some(Blueprint::CallSubroutine {
                name,
                span,
                arity: args.len(),
            });
            for slice in args.into_iter().rev() {
                self.push_arg_frame(&pattern, slice)?;
            }
            return Ok(());
        }

        // The name exists as a subroutine, just not at this arity.
        if self.subroutines.contains_name(&name) {
            return Err(EngineError::UnresolvedSubroutine {
                name,
                arity: args.len(),
                span,
            });
        }

        Err(EngineError::UnknownTag { name, span })
    }

    /// Resolve a dictionary query and write the result, or the missing
    /// sentinel when there is no dictionary or no matching entry.
    fn run_query(&mut self, query: &QueryDescriptor) -> Result<()> {
        let Some(dictionary) = self.dictionary.clone() else {
            return self.write(&missing_sentinel(&query.table));
        };
        let filter = self.config.content_filter;
        let text = match &query.carrier {
            Some(id) => {
                self.ensure_sync(id, SyncType::Deck);
                // Destructured so the synchronizer and RNG borrows stay
                // disjoint.
                let Self { syncs, rng, .. } = self;
                dictionary.query(rng, syncs.get_mut(id.as_str()), query, filter)
            }
            None => dictionary.query(&mut self.rng, None, query, filter),
        };
        match text {
            Some(text) => self.write(&text),
            None => self.write(&missing_sentinel(&query.table)),
        }
    }

    fn invoke(&mut self, blueprint: Blueprint) -> Result<()> {
        match blueprint {
            Blueprint::Repeat => self.drive_repeater(),
            Blueprint::SetStats(enabled) => {
                if let Some(repeater) = self.repeaters.last_mut() {
                    repeater.set_stats(enabled);
                }
                Ok(())
            }
            Blueprint::PopLocals => {
                self.locals.pop();
                Ok(())
            }
            Blueprint::PopChannel(name) => {
                self.output().borrow_mut().pop(&name);
                Ok(())
            }
            Blueprint::FinishTag {
                name,
                span,
                eager,
                lazy,
            } => {
                let eager = self.take_results(eager);
                let registry = Arc::clone(&self.registry);
                let def = registry.get(&name).expect("tag registered");
                (def.handler)(self, TagInvocation { span, eager, lazy })
            }
            Blueprint::CallSubroutine { name, span: _, arity } => {
                let values = self.take_results(arity);
                let subroutines = Rc::clone(&self.subroutines);
                let sub = subroutines
                    .get(&name, arity)
                    .expect("subroutine resolved at call site");
                let bindings: Vec<(String, String)> =
                    sub.params.iter().cloned().zip(values).collect();
                self.locals.push(bindings);
                let output = self.output();
                let state = State::new(Rc::clone(&sub.body), sub.body.full_slice(), output)
                    .with_post(Blueprint::PopLocals);
                self.push_state(state)
            }
        }
    }

    fn take_results(&mut self, count: usize) -> Vec<String> {
        let at = self
            .results
            .len()
            .checked_sub(count)
            .expect("eager results collected");
        self.results.split_off(at)
    }

    fn push_state(&mut self, state: State) -> Result<()> {
        if self.states.len() >= self.config.max_frame_depth {
            return Err(EngineError::FrameDepthExceeded {
                max: self.config.max_frame_depth,
            });
        }
        self.states.push(state);
        Ok(())
    }

    /// Push a frame with a private channel stack; its main text lands on
    /// the results stack when it retires. The private stack draws on the
    /// run's shared character budget.
    fn push_arg_frame(&mut self, pattern: &Rc<Pattern>, slice: InstrSlice) -> Result<()> {
        let top = self.states.last().expect("state stack non-empty");
        let output = Rc::new(RefCell::new(top.output.borrow().subsidiary()));
        self.push_state(State::new(Rc::clone(pattern), slice, output))
    }

    // Accessors for tag handlers.

    /// Channel stack of the current frame.
    pub fn output(&self) -> Rc<RefCell<ChannelStack>> {
        Rc::clone(&self.states.last().expect("state stack non-empty").output)
    }

    pub fn write(&mut self, text: &str) -> Result<()> {
        self.output().borrow_mut().write(text)
    }

    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.output().borrow_mut().write_raw(text)
    }

    pub fn pending_mut(&mut self) -> &mut BlockAttributes {
        &mut self.pending
    }

    /// Push a body frame sharing the current frame's output.
    pub fn push_body_frame(&mut self, slice: InstrSlice) -> Result<()> {
        let top = self.states.last().expect("state stack non-empty");
        let state = State::new(Rc::clone(&top.pattern), slice, Rc::clone(&top.output));
        self.push_state(state)
    }

    /// Push a body frame with work to run when it retires.
    pub(crate) fn push_scoped_frame(&mut self, slice: InstrSlice, post: Blueprint) -> Result<()> {
        let top = self.states.last().expect("state stack non-empty");
        let state = State::new(Rc::clone(&top.pattern), slice, Rc::clone(&top.output))
            .with_post(post);
        self.push_state(state)
    }

    /// Create a synchronizer under `id` if none exists. The synchronizer's
    /// RNG branch is derived from the run seed and the id alone, so its
    /// sequence is independent of draw order elsewhere.
    pub fn ensure_sync(&mut self, id: &str, sync_type: SyncType) {
        if !self.syncs.contains_key(id) {
            let mut rng = PatternRng::new(self.base_seed);
            rng.branch(fnv1a64_str(id));
            self.syncs
                .insert(id.to_string(), Synchronizer::new(sync_type, rng));
        }
    }

    pub fn sync_mut(&mut self, id: &str) -> Option<&mut Synchronizer> {
        self.syncs.get_mut(id)
    }

    /// Innermost repeater, but only while its positional stats are
    /// visible (they are hidden during separator expansion).
    pub fn active_repeater(&mut self) -> Option<&mut Repeater> {
        self.repeaters
            .last_mut()
            .filter(|repeater| repeater.stats_enabled())
    }

    /// Look up a subroutine argument, innermost binding frame first.
    pub fn local_arg(&self, name: &str) -> Option<&str> {
        self.locals.iter().rev().find_map(|frame| {
            frame
                .iter()
                .find(|(param, _)| param == name)
                .map(|(_, value)| value.as_str())
        })
    }
}
