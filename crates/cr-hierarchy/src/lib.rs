//! Block-type hierarchy for CR reports.
//!
//! A CR file does not nest its blocks lexically: adjacency in the text
//! stream implies nesting only through a lookup in a tree of type
//! definitions. This crate provides that tree ([`TypeHierarchy`]), the
//! per-type merge flags ([`TypeFlags`]), and the plain-text definition
//! format it round-trips through ([`parse`]/[`write`]).
//!
//! # Design Rules
//!
//! 1. Types are immutable once created; new types may only be appended.
//! 2. Types are addressed by copyable [`TypeId`] handles, never by
//!    reference, so the hierarchy can be shared and cloned freely.
//! 3. Name lookup is case-sensitive; unique-scope resolution in the
//!    definition format is case-insensitive.

pub mod error;
pub mod format;
pub mod types;

pub use error::{HierarchyError, HierarchyResult};
pub use format::{parse, write};
pub use types::{BlockType, TypeFlags, TypeHierarchy, TypeId};
