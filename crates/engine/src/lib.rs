//! Weft Engine
//!
//! Executes compiled patterns. The interpreter is an explicit frame stack
//! driven by deferred-work blueprints (no recursion), writing into
//! visibility-scoped channels. Hosts extend it at three seams: the tag
//! registry, the subroutine set, and the dictionary collaborator.
//!
//! ```
//! use weft_engine::{EngineConfig, Interpreter};
//! use weft_pattern::PatternBuilder;
//!
//! let pattern = PatternBuilder::new()
//!     .text("the ")
//!     .block(|b| {
//!         b.text("quick").text("lazy");
//!     })
//!     .text(" fox")
//!     .build();
//! let mut interp = Interpreter::new(pattern, EngineConfig::seeded(42));
//! let output = interp.run().unwrap();
//! assert!(output.main() == "the quick fox" || output.main() == "the lazy fox");
//! ```

mod blueprint;
pub mod channel;
pub mod config;
pub mod dict;
pub mod error;
pub mod interpreter;
pub mod math;
pub mod output;
pub mod registry;
pub mod repeater;
mod state;
pub mod sync;
mod tags;

pub use channel::{CapsMode, ChannelStack, MAIN_CHANNEL, Visibility};
pub use config::{DEFAULT_MAX_FRAME_DEPTH, EngineConfig};
pub use dict::{Dictionary, TableDictionary, TableEntry, missing_sentinel};
pub use error::{EngineError, Result};
pub use interpreter::Interpreter;
pub use output::{ChannelOutput, RunOutput};
pub use registry::{ParamMode, SubroutineSet, TagDef, TagHandlerFn, TagInvocation, TagRegistry};
pub use repeater::{BlockAttributes, RepCount};
pub use sync::{SyncType, Synchronizer};
