//! The type tree: [`BlockType`] nodes owned by a [`TypeHierarchy`] arena.
//!
//! Every block in a CR report carries a type, and a block's parent must be
//! of its type's parent type. The hierarchy therefore fully determines how
//! a flat stream of blocks folds into a tree. Nodes are stored in a `Vec`
//! and addressed by [`TypeId`] indices; child and scope relationships are
//! kept as id lists so structural edits cannot dangle.

use tracing::debug;

/// Handle to a node in a [`TypeHierarchy`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TypeId(u32);

/// Per-type merge behavior flags.
///
/// Stored as a raw bit set so unknown bits from a definition file survive a
/// round-trip unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct TypeFlags(u32);

impl TypeFlags {
    /// No flags set.
    pub const NONE: TypeFlags = TypeFlags(0);
    /// New observations fully replace old ones instead of merging
    /// attribute by attribute.
    pub const NO_MERGE: TypeFlags = TypeFlags(1);
    /// A block of this type is always exactly as old as its parent; it is
    /// suppressed from output when the turns disagree.
    pub const PARENTAGE: TypeFlags = TypeFlags(2);

    /// Construct from raw bits.
    pub fn from_bits(bits: u32) -> Self {
        TypeFlags(bits)
    }

    /// The raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if all flags in `other` are set in `self`.
    pub fn contains(self, other: TypeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no flags are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for TypeFlags {
    type Output = TypeFlags;

    fn bitor(self, rhs: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 | rhs.0)
    }
}

/// One named node in the type forest.
#[derive(Clone, Debug)]
pub struct BlockType {
    name: String,
    parent: Option<TypeId>,
    children: Vec<TypeId>,
    unique_scope: Option<TypeId>,
    flags: TypeFlags,
}

impl BlockType {
    /// The type name. Unique along any single parent chain, not globally.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning type, `None` for roots.
    pub fn parent(&self) -> Option<TypeId> {
        self.parent
    }

    /// Child types, in definition order.
    pub fn children(&self) -> &[TypeId] {
        &self.children
    }

    /// The ancestor type below which block ids must be unique, if any.
    pub fn unique_scope(&self) -> Option<TypeId> {
        self.unique_scope
    }

    /// The merge flags.
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }
}

/// An arena-backed forest of block-type definitions.
#[derive(Clone, Debug, Default)]
pub struct TypeHierarchy {
    nodes: Vec<BlockType>,
    roots: Vec<TypeId>,
}

impl TypeHierarchy {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of types.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no types are defined.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root types, in definition order.
    pub fn roots(&self) -> &[TypeId] {
        &self.roots
    }

    /// Look up a node by handle.
    pub fn get(&self, id: TypeId) -> &BlockType {
        &self.nodes[id.0 as usize]
    }

    /// The name of a type.
    pub fn name(&self, id: TypeId) -> &str {
        self.get(id).name()
    }

    /// The parent of a type.
    pub fn parent(&self, id: TypeId) -> Option<TypeId> {
        self.get(id).parent()
    }

    /// The children of a type, in definition order.
    pub fn children(&self, id: TypeId) -> &[TypeId] {
        self.get(id).children()
    }

    /// The unique-scope ancestor of a type, if any.
    pub fn unique_scope(&self, id: TypeId) -> Option<TypeId> {
        self.get(id).unique_scope()
    }

    /// The merge flags of a type.
    pub fn flags(&self, id: TypeId) -> TypeFlags {
        self.get(id).flags()
    }

    /// The type itself followed by its ancestors, nearest first.
    pub fn ancestors(&self, from: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::successors(Some(from), move |&t| self.parent(t))
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Register a new type as a child of `parent` (or a new root).
    ///
    /// Children are appended in creation order, so serialization is
    /// order-stable across write/parse cycles.
    pub fn make_type(
        &mut self,
        name: &str,
        parent: Option<TypeId>,
        unique_scope: Option<TypeId>,
        flags: TypeFlags,
    ) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(BlockType {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            unique_scope,
            flags,
        });
        match parent {
            Some(p) => self.nodes[p.0 as usize].children.push(id),
            None => self.roots.push(id),
        }
        debug!(name, parent = parent.is_some(), "registered block type");
        id
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Depth-first, case-sensitive search of the subtree rooted at `root`
    /// (including `root` itself). First match wins.
    pub fn find(&self, name: &str, root: TypeId) -> Option<TypeId> {
        if self.name(root) == name {
            return Some(root);
        }
        for &child in self.children(root) {
            if let Some(found) = self.find(name, child) {
                return Some(found);
            }
        }
        None
    }

    /// Resolution used while parsing a report: a name is valid if it is a
    /// plausible child or sibling of where we currently are, or appears
    /// anywhere higher up.
    ///
    /// The scan order is: `from` itself, `from`'s children, the children
    /// of `from`'s parent (or of `from` when it is a root), then every
    /// ancestor and each ancestor's children.
    pub fn find_relative(&self, name: &str, from: TypeId) -> Option<TypeId> {
        if self.name(from) == name {
            return Some(from);
        }
        for &child in self.children(from) {
            if self.name(child) == name {
                return Some(child);
            }
        }
        let base = self.parent(from).unwrap_or(from);
        for &child in self.children(base) {
            if self.name(child) == name {
                return Some(child);
            }
        }
        let mut up = self.parent(from);
        while let Some(t) = up {
            if self.name(t) == name {
                return Some(t);
            }
            for &child in self.children(t) {
                if self.name(child) == name {
                    return Some(child);
                }
            }
            up = self.parent(t);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (TypeHierarchy, TypeId, TypeId, TypeId, TypeId) {
        let mut h = TypeHierarchy::new();
        let version = h.make_type("VERSION", None, None, TypeFlags::NONE);
        let region = h.make_type("REGION", Some(version), None, TypeFlags::NONE);
        let unit = h.make_type("EINHEIT", Some(region), None, TypeFlags::NONE);
        let msg = h.make_type("MESSAGE", Some(version), None, TypeFlags::NO_MERGE);
        (h, version, region, unit, msg)
    }

    #[test]
    fn make_type_links_parent_and_children() {
        let (h, version, region, unit, msg) = sample();
        assert_eq!(h.roots(), &[version]);
        assert_eq!(h.children(version), &[region, msg]);
        assert_eq!(h.parent(unit), Some(region));
        assert_eq!(h.parent(version), None);
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn find_is_depth_first_and_case_sensitive() {
        let (h, version, _, unit, _) = sample();
        assert_eq!(h.find("EINHEIT", version), Some(unit));
        assert_eq!(h.find("einheit", version), None);
        assert_eq!(h.find("VERSION", version), Some(version));
        assert_eq!(h.find("BURG", version), None);
    }

    #[test]
    fn find_relative_prefers_children_then_siblings_then_ancestors() {
        let (h, version, region, unit, msg) = sample();
        // from REGION: own child
        assert_eq!(h.find_relative("EINHEIT", region), Some(unit));
        // from EINHEIT: sibling of parent (uncle scan finds MESSAGE via VERSION)
        assert_eq!(h.find_relative("MESSAGE", unit), Some(msg));
        // from EINHEIT: walk up to the root
        assert_eq!(h.find_relative("VERSION", unit), Some(version));
        // from a root: its own children
        assert_eq!(h.find_relative("REGION", version), Some(region));
        assert_eq!(h.find_relative("NICHTS", unit), None);
    }

    #[test]
    fn flags_bit_ops() {
        let f = TypeFlags::NO_MERGE | TypeFlags::PARENTAGE;
        assert_eq!(f.bits(), 3);
        assert!(f.contains(TypeFlags::NO_MERGE));
        assert!(f.contains(TypeFlags::PARENTAGE));
        assert!(!TypeFlags::NO_MERGE.contains(TypeFlags::PARENTAGE));
        assert!(TypeFlags::NONE.is_empty());
        assert_eq!(TypeFlags::from_bits(5).bits(), 5);
    }

    #[test]
    fn ancestors_walks_to_the_root() {
        let (h, version, region, unit, _) = sample();
        let chain: Vec<TypeId> = h.ancestors(unit).collect();
        assert_eq!(chain, vec![unit, region, version]);
    }
}
