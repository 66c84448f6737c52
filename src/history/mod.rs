//! History mining: ticket linking plus the commit walk.

pub mod linker;
pub mod walker;

pub use linker::{BugCommitLinker, BugLinkIndex};
pub use walker::{function_id, HistoryWalker, WalkOutcome};
