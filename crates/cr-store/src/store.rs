//! The [`ReportStore`]: arena, indexes, and the read-side accessor
//! contract consumed by converters.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use cr_hierarchy::{TypeFlags, TypeHierarchy, TypeId};

use crate::block::{Block, BlockId, Entry, EntryValue};
use crate::policy::{DropUnknown, TypePolicy};
use crate::props::{PropId, PropertyTable};

/// Slots in the contiguous-run insertion cache.
pub(crate) const CACHE_SLOTS: usize = 16;

/// Remembered end of the contiguous same-type sibling run in one child
/// list, so repeated inserts of the same type append without rescanning.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CacheSlot {
    pub(crate) owner: Option<BlockId>,
    pub(crate) btype: TypeId,
    pub(crate) end: usize,
}

/// How a block is keyed in the identity index.
///
/// Blocks with an id tuple are keyed by it. Id-less blocks are keyed by
/// the handle of the block they nest under; handles are stable, so the
/// key survives later mutation of ancestor ids (the version revision is
/// raised in place by merges).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) enum IdentKey {
    Ids(Vec<i32>),
    Under(BlockId),
}

impl IdentKey {
    pub(crate) fn new(ids: &[i32], father: Option<BlockId>) -> IdentKey {
        if !ids.is_empty() {
            return IdentKey::Ids(ids.to_vec());
        }
        match father {
            Some(f) => IdentKey::Under(f),
            None => IdentKey::Ids(Vec::new()),
        }
    }
}

/// The merged block tree for one logical report, fed from any number of
/// input passes.
///
/// Implements the reader's sink contract; consumers traverse the result
/// read-only through the accessors below.
pub struct ReportStore {
    pub(crate) hierarchy: TypeHierarchy,
    /// The first root type; blocks of it are a store-wide singleton.
    pub(crate) version_type: TypeId,
    pub(crate) blocks: Vec<Option<Block>>,
    pub(crate) free: Vec<BlockId>,
    /// Top-level blocks, in insertion order.
    pub(crate) top: Vec<BlockId>,
    pub(crate) props: PropertyTable,
    /// Identity index: `(type, identity key)` to candidate blocks.
    pub(crate) index: HashMap<(TypeId, IdentKey), Vec<BlockId>>,
    pub(crate) cache: [Option<CacheSlot>; CACHE_SLOTS],
    pub(crate) cache_pos: usize,
    /// The last block added; relative type resolution starts here.
    pub(crate) current: Option<BlockId>,
    /// The block opened by `create` and not yet added.
    pub(crate) pending: Option<BlockId>,
    /// Current input line, for diagnostics.
    pub(crate) line: u64,
    pub(crate) policy: Box<dyn TypePolicy>,
    /// Types that carried a message entry; treated as no-merge from then on.
    pub(crate) message_types: HashSet<TypeId>,
    pub(crate) hierarchy_modified: bool,
}

impl ReportStore {
    /// Create a store over `hierarchy` with the default batch policy for
    /// unknown types.
    ///
    /// An empty hierarchy receives a synthesized `VERSION` root.
    pub fn new(hierarchy: TypeHierarchy) -> Self {
        Self::with_policy(hierarchy, Box::new(DropUnknown))
    }

    /// Create a store with an explicit unknown-type policy.
    pub fn with_policy(mut hierarchy: TypeHierarchy, policy: Box<dyn TypePolicy>) -> Self {
        if hierarchy.roots().is_empty() {
            hierarchy.make_type("VERSION", None, None, TypeFlags::NONE);
        }
        let version_type = hierarchy.roots()[0];
        ReportStore {
            hierarchy,
            version_type,
            blocks: Vec::new(),
            free: Vec::new(),
            top: Vec::new(),
            props: PropertyTable::default(),
            index: HashMap::new(),
            cache: [None; CACHE_SLOTS],
            cache_pos: 0,
            current: None,
            pending: None,
            line: 0,
            policy,
            message_types: HashSet::new(),
            hierarchy_modified: false,
        }
    }

    /// The type hierarchy, including any types added by the policy.
    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Consume the store, returning its hierarchy.
    pub fn into_hierarchy(self) -> TypeHierarchy {
        self.hierarchy
    }

    /// Whether the unknown-type policy extended the hierarchy.
    pub fn hierarchy_modified(&self) -> bool {
        self.hierarchy_modified
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns `true` if no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---------------------------------------------------------------
    // Arena plumbing
    // ---------------------------------------------------------------

    pub(crate) fn block(&self, id: BlockId) -> &Block {
        self.blocks[id.index()].as_ref().expect("stale block handle")
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        self.blocks[id.index()].as_mut().expect("stale block handle")
    }

    pub(crate) fn alloc(&mut self, block: Block) -> BlockId {
        match self.free.pop() {
            Some(id) => {
                self.blocks[id.index()] = Some(block);
                id
            }
            None => {
                let id = BlockId(self.blocks.len() as u32);
                self.blocks.push(Some(block));
                id
            }
        }
    }

    /// Move a block out of its slot; the slot stays reserved until either
    /// [`restore`](Self::restore) or [`release`](Self::release).
    pub(crate) fn take(&mut self, id: BlockId) -> Block {
        self.blocks[id.index()].take().expect("stale block handle")
    }

    pub(crate) fn restore(&mut self, id: BlockId, block: Block) {
        self.blocks[id.index()] = Some(block);
    }

    pub(crate) fn release(&mut self, id: BlockId) {
        debug_assert!(self.blocks[id.index()].is_none());
        self.free.push(id);
    }

    // ---------------------------------------------------------------
    // Sink-side mutation (driven by the reader)
    // ---------------------------------------------------------------

    pub(crate) fn create_block(&mut self, name: &str, ids: &[i32]) {
        if let Some(stale) = self.pending.take() {
            // only reachable when a caller skips `add`; drop the orphan
            warn!(line = self.line, "unfinalized block dropped");
            self.take(stale);
            self.release(stale);
        }
        let ctx_type = match self.current {
            Some(b) => self.block(b).btype,
            None => self.hierarchy.roots()[0],
        };
        let btype = match self.hierarchy.find_relative(name, ctx_type) {
            Some(t) => t,
            None => match self.resolve_unknown(name, ctx_type) {
                Some(t) => t,
                None => {
                    warn!(line = self.line, name, "ignoring unknown block type");
                    return;
                }
            },
        };
        let id = self.alloc(Block::new(btype, ids.to_vec()));
        self.pending = Some(id);
    }

    fn resolve_unknown(&mut self, name: &str, ctx_type: TypeId) -> Option<TypeId> {
        // an id-less context shares its parent's identity scope, so offer
        // the chain from the parent type instead
        let mut base = ctx_type;
        if let Some(cur) = self.current {
            if self.block(cur).ids.is_empty() {
                if let Some(p) = self.hierarchy.parent(ctx_type) {
                    base = p;
                }
            }
        }
        let chain: Vec<TypeId> = self.hierarchy.ancestors(base).collect();
        let names: Vec<&str> = chain.iter().map(|&t| self.hierarchy.name(t)).collect();
        let answer = self.policy.resolve_parent(name, &names)?;
        let parent = chain
            .iter()
            .copied()
            .find(|&t| self.hierarchy.name(t).eq_ignore_ascii_case(&answer));
        let Some(parent) = parent else {
            warn!(
                line = self.line,
                name,
                answer,
                "unknown-type policy named a type outside the ancestor chain"
            );
            return None;
        };
        let btype = self
            .hierarchy
            .make_type(name, Some(parent), None, TypeFlags::NONE);
        self.hierarchy_modified = true;
        debug!(line = self.line, name, parent = answer, "hierarchy extended");
        Some(btype)
    }

    pub(crate) fn set_int_attr(&mut self, name: &str, value: i32) {
        let Some(id) = self.pending else {
            debug!(line = self.line, name, "attribute with no open block");
            return;
        };
        if name.eq_ignore_ascii_case("turn") {
            self.block_mut(id).turn = value;
            return;
        }
        self.upsert(id, name, EntryValue::Int(value));
    }

    pub(crate) fn set_ints_attr(&mut self, name: &str, values: &[i32]) {
        let Some(id) = self.pending else {
            debug!(line = self.line, name, "attribute with no open block");
            return;
        };
        self.upsert(id, name, EntryValue::Ints(values.to_vec()));
    }

    pub(crate) fn set_string_attr(&mut self, name: &str, value: &str) {
        let Some(id) = self.pending else {
            debug!(line = self.line, name, "attribute with no open block");
            return;
        };
        self.upsert(id, name, EntryValue::Text(value.to_string()));
    }

    pub(crate) fn set_message_attr(&mut self, value: &str) {
        let Some(id) = self.pending else {
            debug!(line = self.line, "message with no open block");
            return;
        };
        let btype = self.block(id).btype;
        self.message_types.insert(btype);
        self.block_mut(id).entries.push(Entry {
            key: None,
            value: EntryValue::Message(value.to_string()),
        });
    }

    /// At most one entry per property per block; a duplicate attribute in
    /// the same observation overwrites the earlier value in place.
    fn upsert(&mut self, id: BlockId, name: &str, value: EntryValue) {
        let key = self.props.intern(name);
        let block = self.block_mut(id);
        match block.entries.iter_mut().find(|e| e.key == Some(key)) {
            Some(entry) => entry.value = value,
            None => block.entries.push(Entry {
                key: Some(key),
                value,
            }),
        }
    }

    // ---------------------------------------------------------------
    // Accessor contract
    // ---------------------------------------------------------------

    /// Top-level blocks, in insertion order.
    pub fn roots(&self) -> &[BlockId] {
        &self.top
    }

    /// The type of a block.
    pub fn block_type(&self, b: BlockId) -> TypeId {
        self.block(b).btype
    }

    /// The block's own id tuple, possibly empty.
    pub fn ids(&self, b: BlockId) -> &[i32] {
        &self.block(b).ids
    }

    /// The id tuple a block is identified by: its own, or the nearest
    /// ancestor's when it has none.
    pub fn effective_ids(&self, b: BlockId) -> &[i32] {
        let block = self.block(b);
        if !block.ids.is_empty() {
            return &block.ids;
        }
        match block.parent {
            Some(p) => self.effective_ids(p),
            None => &[],
        }
    }

    /// The turn of the last observation merged into this block.
    pub fn turn(&self, b: BlockId) -> i32 {
        self.block(b).turn
    }

    /// The parent block; `None` for top-level blocks.
    pub fn parent(&self, b: BlockId) -> Option<BlockId> {
        self.block(b).parent
    }

    /// Child blocks, in insertion order (same-type children contiguous).
    pub fn children(&self, b: BlockId) -> &[BlockId] {
        &self.block(b).children
    }

    /// The next block in the owning child list.
    pub fn next_sibling(&self, b: BlockId) -> Option<BlockId> {
        let list: &[BlockId] = match self.block(b).parent {
            Some(p) => &self.block(p).children,
            None => &self.top,
        };
        let at = list.iter().position(|&x| x == b)?;
        list.get(at + 1).copied()
    }

    /// The contiguous run of `btype` children under `b`.
    pub fn children_of_type(
        &self,
        b: BlockId,
        btype: TypeId,
    ) -> impl Iterator<Item = BlockId> + '_ {
        self.block(b)
            .children
            .iter()
            .copied()
            .skip_while(move |&c| self.block(c).btype != btype)
            .take_while(move |&c| self.block(c).btype == btype)
    }

    /// All entries of a block, in merge order.
    pub fn entries(&self, b: BlockId) -> &[Entry] {
        &self.block(b).entries
    }

    /// The first-seen spelling of an interned property.
    pub fn property_name(&self, p: PropId) -> &str {
        self.props.name(p)
    }

    fn entry(&self, b: BlockId, name: &str) -> Option<&Entry> {
        let key = self.props.lookup(name)?;
        self.block(b).entries.iter().find(|e| e.key == Some(key))
    }

    /// A single-integer attribute by name (case-insensitive).
    pub fn get_int(&self, b: BlockId, name: &str) -> Option<i32> {
        match self.entry(b, name)?.value {
            EntryValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// An integer-list attribute by name.
    pub fn get_ints(&self, b: BlockId, name: &str) -> Option<&[i32]> {
        match &self.entry(b, name)?.value {
            EntryValue::Ints(vs) => Some(vs),
            _ => None,
        }
    }

    /// A string attribute by name.
    pub fn get_str(&self, b: BlockId, name: &str) -> Option<&str> {
        match &self.entry(b, name)?.value {
            EntryValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The block's message entries, in order.
    pub fn messages(&self, b: BlockId) -> impl Iterator<Item = &str> {
        self.block(b).entries.iter().filter_map(|e| match &e.value {
            EntryValue::Message(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Depth-first search under `root` for a block of type `name` (resolved
    /// within `root`'s type subtree) whose ids start with `ids`; empty
    /// `ids` matches any. Does not descend into blocks of the target type.
    pub fn find(&self, root: BlockId, name: &str, ids: &[i32]) -> Option<BlockId> {
        let btype = self.hierarchy.find(name, self.block(root).btype)?;
        self.find_in(root, btype, ids)
    }

    fn find_in(&self, b: BlockId, btype: TypeId, ids: &[i32]) -> Option<BlockId> {
        let block = self.block(b);
        if block.btype == btype {
            return (ids.is_empty() || block.ids.starts_with(ids)).then_some(b);
        }
        for &child in &block.children {
            if let Some(found) = self.find_in(child, btype, ids) {
                return Some(found);
            }
        }
        None
    }
}

impl std::fmt::Debug for ReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStore")
            .field("blocks", &self.len())
            .field("types", &self.hierarchy.len())
            .field("top", &self.top.len())
            .finish()
    }
}
