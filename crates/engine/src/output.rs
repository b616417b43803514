//! Finalized run output.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::channel::{MAIN_CHANNEL, Visibility};

/// Frozen content of one channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutput {
    pub name: String,
    pub visibility: Visibility,
    pub text: String,
}

/// Everything a run produced, keyed by channel name. `main` is always
/// present.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    channels: IndexMap<String, ChannelOutput>,
}

impl RunOutput {
    pub(crate) fn new(channels: IndexMap<String, ChannelOutput>) -> Self {
        Self { channels }
    }

    /// Text of the `main` channel.
    pub fn main(&self) -> &str {
        self.channels
            .get(MAIN_CHANNEL)
            .map(|c| c.text.as_str())
            .unwrap_or("")
    }

    /// A named channel, if the run wrote to it.
    pub fn channel(&self, name: &str) -> Option<&ChannelOutput> {
        self.channels.get(name)
    }

    /// All channels in registration order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelOutput> {
        self.channels.values()
    }
}

impl fmt::Display for RunOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.main())
    }
}
