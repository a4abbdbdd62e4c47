//! Turn suggested names into safe filesystem renames.
//!
//! [`detect`] finds problems in a ledger snapshot,
//! [`resolve`] derives corrected names for them,
//! [`RenamePlan::build`] combines both into the final mapping,
//! and [`Reconciler`] applies it to disk.

pub mod engine;
pub mod fs;
pub mod plan;
pub mod resolve;
pub mod validate;

pub use engine::{Reconciler, RenameOutcome, RenameReport};
pub use fs::{FileSystem, LocalFileSystem};
pub use plan::{PlannedRename, RenamePlan};
pub use resolve::{
    DUPLICATE_MARKER, Resolution, ResolvedName, apply_duplicate_marker, ensure_extension, pass_through, resolve,
    sanitize,
};
pub use validate::{INVALID_CHARACTERS, Issue, IssueKind, detect, has_invalid_characters};
