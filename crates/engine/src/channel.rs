//! Layered named output channels.
//!
//! Generated text is multiplexed into named buffers with visibility-scoped
//! write propagation. A write lands on the most recently activated channel
//! and cascades down the scope stack according to each channel's
//! visibility; the ever-present `main` channel sits at the bottom and is the
//! default result of a run.
//!
//! Cascade rules, scanning the active stack newest to oldest:
//! - **Public** channels take the write and let the scan continue downward
//!   (so it eventually reaches `main`).
//! - **Private** channels take the write; if a Public channel was crossed
//!   earlier in the scan the write also lands on `main` and the scan stops.
//!   A Private channel with nothing Public above it lets the scan continue.
//! - **Internal** channels take the write and stop the scan, isolating
//!   everything beneath them.
//!
//! Capitalization is per-channel state applied at write time, with the last
//! emitted character carried so word-boundary detection works across
//! separate writes.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::output::{ChannelOutput, RunOutput};

/// Name of the channel that always exists and is never removed.
pub const MAIN_CHANNEL: &str = "main";

/// Write-propagation scope of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Receives writes and cascades them toward `main`.
    Public,
    /// Receives writes; forwards to `main` only when reached through a
    /// Public channel, and hides them from everything else below.
    Private,
    /// Receives writes and blocks the cascade entirely.
    Internal,
}

impl Visibility {
    /// Parse a visibility name as it appears in tag arguments.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

/// Capitalization transform applied to incoming text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapsMode {
    #[default]
    None,
    /// Everything lowercased.
    Lower,
    /// Everything uppercased.
    Upper,
    /// The next alphabetic character is uppercased, then the mode resets.
    First,
    /// Title case: alphabetic characters at word boundaries are uppercased.
    Word,
}

impl CapsMode {
    /// Parse a mode name as it appears in tag arguments.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "lower" => Some(Self::Lower),
            "upper" => Some(Self::Upper),
            "first" => Some(Self::First),
            "word" | "title" => Some(Self::Word),
            _ => None,
        }
    }
}

/// A single named output buffer.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    visibility: Visibility,
    /// Ordered text fragments; writes append new fragments, write points
    /// reserve one for forward insertion.
    fragments: Vec<String>,
    caps: CapsMode,
    /// Last character emitted through the caps transform, for word-boundary
    /// detection across separate writes.
    last_char: Option<char>,
    /// Named write points: fragment index reserved for later insertion.
    write_points: HashMap<String, usize>,
    /// Named markers: character offset at the time the marker was set.
    markers: HashMap<String, usize>,
    /// Characters accumulated (appends and insertions).
    char_len: usize,
}

impl Channel {
    fn new(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            visibility,
            fragments: Vec::new(),
            caps: CapsMode::None,
            last_char: None,
            write_points: HashMap::new(),
            markers: HashMap::new(),
            char_len: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn caps(&self) -> CapsMode {
        self.caps
    }

    /// Accumulated text.
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    /// Characters written so far (appends and insertions).
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Append text through the capitalization transform. Returns the number
    /// of characters appended.
    fn write(&mut self, text: &str) -> usize {
        let transformed = self.transform(text);
        self.append(transformed)
    }

    /// Append text verbatim, bypassing capitalization. Returns the number of
    /// characters appended.
    fn write_raw(&mut self, text: &str) -> usize {
        self.append(text.to_string())
    }

    fn append(&mut self, text: String) -> usize {
        if text.is_empty() {
            return 0;
        }
        let count = text.chars().count();
        self.last_char = text.chars().last();
        self.char_len += count;
        self.fragments.push(text);
        count
    }

    fn set_caps(&mut self, mode: CapsMode) {
        self.caps = mode;
    }

    /// Reserve a named slot at the current end of the buffer for forward
    /// insertion. Re-using a name moves the point.
    fn set_write_point(&mut self, name: &str) {
        self.fragments.push(String::new());
        self.write_points
            .insert(name.to_string(), self.fragments.len() - 1);
    }

    /// Insert text at a previously reserved write point. Returns the number
    /// of characters inserted, or None if the point does not exist.
    fn insert_at(&mut self, name: &str, text: &str) -> Option<usize> {
        let idx = *self.write_points.get(name)?;
        let count = text.chars().count();
        self.char_len += count;
        self.fragments[idx].push_str(text);
        Some(count)
    }

    /// Remember the current character offset under `name`.
    fn set_marker(&mut self, name: &str) {
        self.markers.insert(name.to_string(), self.char_len);
    }

    /// Distance in characters between two markers, if both exist.
    fn distance(&self, a: &str, b: &str) -> Option<usize> {
        let a = *self.markers.get(a)?;
        let b = *self.markers.get(b)?;
        Some(a.abs_diff(b))
    }

    /// Apply the current caps mode to incoming text, updating transient
    /// mode state (First consumes itself on the first alphabetic char).
    fn transform(&mut self, text: &str) -> String {
        match self.caps {
            CapsMode::None => text.to_string(),
            CapsMode::Lower => text.to_lowercase(),
            CapsMode::Upper => text.to_uppercase(),
            CapsMode::First => {
                let mut out = String::with_capacity(text.len());
                let mut consumed = false;
                for ch in text.chars() {
                    if !consumed && ch.is_alphabetic() {
                        out.extend(ch.to_uppercase());
                        consumed = true;
                    } else {
                        out.push(ch);
                    }
                }
                if consumed {
                    self.caps = CapsMode::None;
                }
                out
            }
            CapsMode::Word => {
                let mut out = String::with_capacity(text.len());
                let mut prev = self.last_char;
                for ch in text.chars() {
                    let boundary = prev.is_none_or(|p| !p.is_alphanumeric());
                    if boundary && ch.is_alphabetic() {
                        out.extend(ch.to_uppercase());
                    } else {
                        out.push(ch);
                    }
                    prev = Some(ch);
                }
                out
            }
        }
    }
}

/// An active-channel scope stack plus a name→channel registry.
///
/// Popped channels stay registered and keep their content; only their place
/// on the active stack goes away. `main` is created on construction, sits
/// at the bottom of the stack, and can be neither re-pushed nor popped.
#[derive(Debug, Clone)]
pub struct ChannelStack {
    channels: IndexMap<String, Channel>,
    /// Active scope stack, oldest first. `active[0]` is always `main`.
    active: Vec<String>,
    /// Character limit across all channels; 0 = unlimited.
    char_limit: usize,
    /// Characters written across all channels, insertions included. The
    /// counter is shared with subsidiary stacks so the limit stays global
    /// to the run, not per scope.
    total_chars: Rc<Cell<usize>>,
}

impl ChannelStack {
    pub fn new(char_limit: usize) -> Self {
        let mut channels = IndexMap::new();
        channels.insert(
            MAIN_CHANNEL.to_string(),
            Channel::new(MAIN_CHANNEL, Visibility::Public),
        );
        Self {
            channels,
            active: vec![MAIN_CHANNEL.to_string()],
            char_limit,
            total_chars: Rc::new(Cell::new(0)),
        }
    }

    /// A fresh stack (just `main`, nothing active) that draws on this
    /// stack's character budget. Distinct-output scopes use this so text
    /// generated there still counts toward the run's limit.
    pub fn subsidiary(&self) -> Self {
        let mut stack = Self::new(self.char_limit);
        stack.total_chars = Rc::clone(&self.total_chars);
        stack
    }

    /// Register (if new) and activate a channel. Pushing `main` or an
    /// already-active channel is a no-op.
    pub fn push(&mut self, name: &str, visibility: Visibility) {
        if name == MAIN_CHANNEL || self.active.iter().any(|n| n == name) {
            return;
        }
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::new(name, visibility));
        self.active.push(name.to_string());
    }

    /// Deactivate a channel; its content is retained. Popping `main` or an
    /// inactive channel is a no-op.
    pub fn pop(&mut self, name: &str) {
        if name == MAIN_CHANNEL {
            return;
        }
        if let Some(pos) = self.active.iter().position(|n| n == name) {
            self.active.remove(pos);
        }
    }

    /// Number of active channels (including `main`).
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Look up a channel (active or not).
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Accumulated text of the `main` channel.
    pub fn main_text(&self) -> String {
        self.channels[MAIN_CHANNEL].text()
    }

    /// Write text through the visibility cascade.
    pub fn write(&mut self, text: &str) -> Result<()> {
        let written: usize = {
            let targets = self.reachable();
            let mut written = 0;
            for name in targets {
                written += self.channels[&name].write(text);
            }
            written
        };
        self.account(written)
    }

    /// Write text through the cascade without capitalization transforms.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        let targets = self.reachable();
        let mut written = 0;
        for name in targets {
            written += self.channels[&name].write_raw(text);
        }
        self.account(written)
    }

    /// Set the capitalization mode on every channel the cascade reaches.
    pub fn set_caps(&mut self, mode: CapsMode) {
        for name in self.reachable() {
            self.channels[&name].set_caps(mode);
        }
    }

    /// Reserve a named write point on every channel the cascade reaches.
    pub fn set_write_point(&mut self, name: &str) {
        for target in self.reachable() {
            self.channels[&target].set_write_point(name);
        }
    }

    /// Insert text at a named write point on every reachable channel that
    /// has one. Channels without the point are skipped.
    pub fn insert_at(&mut self, name: &str, text: &str) -> Result<()> {
        let targets = self.reachable();
        let mut written = 0;
        for target in targets {
            written += self.channels[&target].insert_at(name, text).unwrap_or(0);
        }
        self.account(written)
    }

    /// Set a named marker on every channel the cascade reaches.
    pub fn set_marker(&mut self, name: &str) {
        for target in self.reachable() {
            self.channels[&target].set_marker(name);
        }
    }

    /// Distance between two markers, measured on the topmost reachable
    /// channel that has both.
    pub fn distance(&self, a: &str, b: &str) -> Option<usize> {
        self.reachable()
            .into_iter()
            .find_map(|name| self.channels[&name].distance(a, b))
    }

    /// Channels the cascade reaches from the top of the active stack, in
    /// scan order. See the module docs for the visibility rules.
    fn reachable(&self) -> Vec<String> {
        let mut reached = Vec::new();
        let mut crossed_public = false;
        for name in self.active.iter().rev() {
            let visibility = self.channels[name].visibility;
            match visibility {
                Visibility::Public => {
                    reached.push(name.clone());
                    crossed_public = true;
                }
                Visibility::Private => {
                    reached.push(name.clone());
                    if crossed_public {
                        reached.push(MAIN_CHANNEL.to_string());
                        break;
                    }
                    // Nothing public above: the scan continues downward.
                }
                Visibility::Internal => {
                    reached.push(name.clone());
                    break;
                }
            }
        }
        reached
    }

    /// Accumulate written characters and enforce the configured limit.
    /// Checked after the write lands, so the crossing write is the one that
    /// fails.
    fn account(&mut self, written: usize) -> Result<()> {
        let total = self.total_chars.get() + written;
        self.total_chars.set(total);
        if self.char_limit > 0 && total > self.char_limit {
            return Err(EngineError::CharLimitExceeded {
                limit: self.char_limit,
            });
        }
        Ok(())
    }

    /// Freeze every registered channel into a run output.
    pub fn finalize(&self) -> RunOutput {
        let mut channels = IndexMap::new();
        for (name, channel) in &self.channels {
            channels.insert(
                name.clone(),
                ChannelOutput {
                    name: name.clone(),
                    visibility: channel.visibility,
                    text: channel.text(),
                },
            );
        }
        RunOutput::new(channels)
    }
}
