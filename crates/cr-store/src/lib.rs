//! Merged record store for CR reports.
//!
//! [`ReportStore`] implements the reader's [`ReportSink`] contract and
//! maintains the merged block tree: every block is indexed by its identity
//! (its type plus its own id tuple, or the block it nests under when it
//! has none), scoped by the type's unique-scope ancestor, and a repeated
//! observation of the same identity merges into the stored block under a
//! turn-ordered conflict-resolution policy (newer turn wins; deterministic
//! tie-breaks at equal turns).
//!
//! # Design Rules
//!
//! 1. Blocks live in an arena and are addressed by [`BlockId`] handles;
//!    parent/child/index relationships are id lists, never references, so
//!    re-parenting and merge-replacement cannot dangle.
//! 2. A block superseded by a merge is freed immediately; its slot is
//!    reused for later blocks.
//! 3. Attribute names are interned ([`PropId`]), so matching entries
//!    during merge compares handles, not strings.
//! 4. All mutation goes through `&mut self`; callers sharing a store
//!    provide their own exclusion around a whole parse run.
//!
//! [`ReportSink`]: cr_reader::ReportSink

pub mod block;
pub mod error;
pub mod policy;
pub mod props;
pub mod store;

mod merge;
mod sink;
mod writer;

pub use block::{BlockId, Entry, EntryValue};
pub use error::{StoreError, StoreResult};
pub use policy::{DropUnknown, TypePolicy};
pub use props::PropId;
pub use store::ReportStore;
