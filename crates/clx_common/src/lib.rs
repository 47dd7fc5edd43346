//! Shared collaborators for the clx launcher.
//!
//! Everything the updater core treats as an external contract lives here:
//! console output, HTTP fetch helpers, the partition oracle, debug flags,
//! and the binary-replacement primitive.

pub mod console;
pub mod debug_flags;
pub mod http;
pub mod partition;
pub mod replace;

pub use console::{Prompter, StdinPrompter};
pub use debug_flags::DebugFlags;
pub use http::{Download, Fetch, HttpFetch};
pub use partition::{PartitionOracle, User};
pub use replace::{Replace, SelfReplace};
