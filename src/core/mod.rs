//! Core types shared across the mining pipeline.

mod error;
mod history;
mod release;
mod ticket;

pub use error::{Error, Result};
pub use history::{Change, CommitId, CommitMeta, FileHistory, FunctionHistory};
pub use release::{Release, ReleaseCatalog};
pub use ticket::{Ticket, VersionSlot};
