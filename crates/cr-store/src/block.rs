//! Blocks and their attribute entries.

use cr_hierarchy::TypeId;

use crate::props::PropId;

/// Handle to a block in a [`ReportStore`](crate::ReportStore) arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The value of one attribute entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryValue {
    /// A single integer.
    Int(i32),
    /// An integer list.
    Ints(Vec<i32>),
    /// A named string.
    Text(String),
    /// An unnamed free-text message line.
    Message(String),
}

/// One attribute attached to a block.
///
/// The key is `None` exactly for messages, which are order-preserving and
/// excluded from per-attribute matching.
#[derive(Clone, Debug)]
pub struct Entry {
    pub(crate) key: Option<PropId>,
    pub(crate) value: EntryValue,
}

impl Entry {
    /// The interned property this entry is keyed by, if any.
    pub fn key(&self) -> Option<PropId> {
        self.key
    }

    /// The entry value.
    pub fn value(&self) -> &EntryValue {
        &self.value
    }
}

/// One observed block instance in the store's arena.
#[derive(Debug)]
pub(crate) struct Block {
    pub(crate) btype: TypeId,
    pub(crate) ids: Vec<i32>,
    pub(crate) turn: i32,
    pub(crate) parent: Option<BlockId>,
    pub(crate) children: Vec<BlockId>,
    pub(crate) entries: Vec<Entry>,
}

impl Block {
    pub(crate) fn new(btype: TypeId, ids: Vec<i32>) -> Self {
        Block {
            btype,
            ids,
            turn: 0,
            parent: None,
            children: Vec::new(),
            entries: Vec::new(),
        }
    }
}
