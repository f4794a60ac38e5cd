//! Brain-dump task capture.
//!
//! Free text is split into clauses, each clause is filed under today, week,
//! month or year by keyword cues, and the result is kept as one markdown
//! checklist per timeframe. [`TaskRegistry`] owns the checklists and every
//! operation on them; [`extract`] turns a dump into registry adds.

pub mod checklist;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod registry;
pub mod report;
pub mod store;
pub mod task;
pub mod timeframe;

pub use checklist::{Checklist, CorruptLine};
pub use classify::classify;
pub use error::{Error, Result};
pub use registry::{AddOutcome, SearchQuery, StatusFilter, TaskRegistry};
pub use store::{Backend, FileBackend, MemoryBackend};
pub use task::{normalize, Pattern, TaskEntry};
pub use timeframe::{Scope, Timeframe};
