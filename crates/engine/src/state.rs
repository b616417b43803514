//! Interpreter frames.

use std::cell::RefCell;
use std::rc::Rc;

use weft_pattern::{InstrSlice, Pattern};

use crate::blueprint::Blueprint;
use crate::channel::ChannelStack;

/// One frame on the explicit interpreter stack: a window into a pattern,
/// an instruction pointer, the channel stack its writes land on, and the
/// deferred work scheduled around it.
#[derive(Debug)]
pub(crate) struct State {
    pub pattern: Rc<Pattern>,
    pub slice: InstrSlice,
    pub ip: usize,
    /// Output sink. Argument frames get a fresh stack; body frames share
    /// their parent's.
    pub output: Rc<RefCell<ChannelStack>>,
    /// Runs before the next instruction of this frame.
    pub pre: Option<Blueprint>,
    /// Run in LIFO order once the frame's instructions are exhausted.
    pub post: Vec<Blueprint>,
}

impl State {
    pub fn new(pattern: Rc<Pattern>, slice: InstrSlice, output: Rc<RefCell<ChannelStack>>) -> Self {
        Self {
            pattern,
            slice,
            ip: slice.start,
            output,
            pre: None,
            post: Vec::new(),
        }
    }

    pub fn with_pre(mut self, blueprint: Blueprint) -> Self {
        self.pre = Some(blueprint);
        self
    }

    pub fn with_post(mut self, blueprint: Blueprint) -> Self {
        self.post.push(blueprint);
        self
    }

    pub fn take_pre(&mut self) -> Option<Blueprint> {
        self.pre.take()
    }

    pub fn pop_post(&mut self) -> Option<Blueprint> {
        self.post.pop()
    }

    pub fn finished(&self) -> bool {
        self.ip >= self.slice.end
    }
}
