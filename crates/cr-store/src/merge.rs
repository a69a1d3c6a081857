//! The merge entry point behind `add`, and the structural edits it needs:
//! identity lookup, contiguous sibling insertion, re-parenting, and turn
//! propagation.

use tracing::warn;

use cr_hierarchy::{TypeFlags, TypeId};

use crate::block::{Block, BlockId, EntryValue};
use crate::error::{StoreError, StoreResult};
use crate::props::PropId;
use crate::store::{CacheSlot, IdentKey, ReportStore, CACHE_SLOTS};

impl ReportStore {
    /// Finalize the pending block: merge it into an existing same-identity
    /// block, or insert it as a new sibling. Either way the surviving
    /// block becomes the context for subsequent relative type resolution.
    pub(crate) fn add_block(&mut self) -> StoreResult<()> {
        let Some(nid) = self.pending.take() else {
            return Ok(());
        };
        let mut nb = self.take(nid);

        let mut father: Option<BlockId> = None;
        let mut existing: Option<BlockId> = None;

        if nb.btype == self.version_type {
            // version blocks are a singleton, ids notwithstanding
            existing = self
                .top
                .iter()
                .copied()
                .find(|&b| self.block(b).btype == self.version_type);
        } else if self.hierarchy.parent(nb.btype).is_none() {
            // a non-version root type still merges by identity
            existing = self.find_identity(None, &nb);
        } else {
            let parent_type = self.hierarchy.parent(nb.btype);
            let mut walk = self.current;
            while let Some(candidate) = walk {
                if Some(self.block(candidate).btype) == parent_type {
                    father = Some(candidate);
                    break;
                }
                walk = self.block(candidate).parent;
            }
            if let Some(f) = father {
                nb.parent = Some(f);
                let father_turn = self.block(f).turn;
                if nb.turn == 0 {
                    nb.turn = father_turn;
                } else if nb.turn > father_turn {
                    self.raise_turn(f, nb.turn, nb.btype);
                }
                existing = self.find_identity(Some(f), &nb);
            }
        }

        match existing {
            Some(bid) => {
                self.merge_into(bid, nid, nb);
                self.current = Some(bid);
                Ok(())
            }
            None => self.insert_new(nid, nb, father),
        }
    }

    /// Raise every ancestor from `from` upward to at least `turn`. A
    /// non-zero older turn being overwritten means observations arrived
    /// out of order, which is worth a warning.
    fn raise_turn(&mut self, from: BlockId, turn: i32, child_type: TypeId) {
        let mut walk = Some(from);
        while let Some(p) = walk {
            let (ptype, pturn, pparent) = {
                let block = self.block(p);
                (block.btype, block.turn, block.parent)
            };
            if pturn >= turn {
                break;
            }
            if pturn != 0 {
                warn!(
                    line = self.line,
                    block = self.hierarchy.name(child_type),
                    parent = self.hierarchy.name(ptype),
                    "block is younger than its parent"
                );
            }
            self.block_mut(p).turn = turn;
            walk = pparent;
        }
    }

    /// Same-identity lookup for an incoming block whose parent will be
    /// `father`. Identity is the type plus the block's [`IdentKey`],
    /// confirmed against the unique-scope ancestor when the type declares
    /// one.
    fn find_identity(&self, father: Option<BlockId>, nb: &Block) -> Option<BlockId> {
        let bucket = self
            .index
            .get(&(nb.btype, IdentKey::new(&nb.ids, father)))?;
        match self.hierarchy.unique_scope(nb.btype) {
            None => bucket.first().copied(),
            Some(scope_type) => {
                let ours = self.ancestor_of_type(father, scope_type)?;
                bucket.iter().copied().find(|&cand| {
                    self.ancestor_of_type(self.block(cand).parent, scope_type) == Some(ours)
                })
            }
        }
    }

    fn ancestor_of_type(&self, from: Option<BlockId>, btype: TypeId) -> Option<BlockId> {
        let mut walk = from;
        while let Some(b) = walk {
            if self.block(b).btype == btype {
                return Some(b);
            }
            walk = self.block(b).parent;
        }
        None
    }

    /// Merge the incoming observation `nb` into the stored block `bid` and
    /// free the incoming slot `nid`.
    fn merge_into(&mut self, bid: BlockId, nid: BlockId, mut nb: Block) {
        if self.block(bid).btype == self.version_type {
            // the first id is the format revision; keep the maximum seen,
            // adopting the incoming tuple when the stored one is bare
            if self.block(bid).ids.is_empty() {
                self.block_mut(bid).ids = std::mem::take(&mut nb.ids);
            } else if let (Some(&new0), Some(&old0)) = (nb.ids.first(), self.block(bid).ids.first())
            {
                if new0 > old0 {
                    self.block_mut(bid).ids[0] = new0;
                }
            }
        }

        let no_merge = self.hierarchy.flags(nb.btype).contains(TypeFlags::NO_MERGE)
            || self.message_types.contains(&nb.btype);

        if no_merge {
            // whole-block replacement, and only ever forward in time
            if nb.turn > self.block(bid).turn {
                let old_parent = self.block(bid).parent;
                let block = self.block_mut(bid);
                block.entries = std::mem::take(&mut nb.entries);
                block.turn = nb.turn;
                if let Some(p) = old_parent {
                    self.raise_turn(p, nb.turn, nb.btype);
                }
                if nb.parent != old_parent {
                    if let Some(np) = nb.parent {
                        self.switch_parent(bid, np);
                    }
                }
            }
        } else {
            let old_turn = self.block(bid).turn;
            for entry in nb.entries.drain(..) {
                let Some(key) = entry.key else {
                    // messages are excluded from matching; adopt in order
                    self.block_mut(bid).entries.push(entry);
                    continue;
                };
                let at = self
                    .block(bid)
                    .entries
                    .iter()
                    .position(|e| e.key == Some(key));
                match at {
                    None => self.block_mut(bid).entries.push(entry),
                    Some(i) => {
                        let newer = if nb.turn != old_turn {
                            nb.turn > old_turn
                        } else {
                            self.tie_break(key, nb.turn, &self.block(bid).entries[i].value, &entry.value)
                        };
                        if newer {
                            self.block_mut(bid).entries[i] = entry;
                        }
                    }
                }
            }
            if self.block(bid).turn < nb.turn {
                self.block_mut(bid).turn = nb.turn;
            }
            let old_parent = self.block(bid).parent;
            if nb.parent != old_parent {
                if let Some(np) = nb.parent {
                    self.switch_parent(bid, np);
                }
            }
        }
        self.release(nid);
    }

    /// Equal-turn value conflict resolution. Integers: the larger value
    /// wins. Integer lists: any strictly greater positional element (over
    /// the common prefix) replaces the list wholesale. Strings: logged,
    /// first-observed wins.
    fn tie_break(&self, key: PropId, turn: i32, old: &EntryValue, new: &EntryValue) -> bool {
        match (old, new) {
            (EntryValue::Int(o), EntryValue::Int(n)) => n > o,
            (EntryValue::Ints(o), EntryValue::Ints(n)) => {
                o.iter().zip(n).any(|(a, b)| b > a)
            }
            (EntryValue::Text(o), EntryValue::Text(n))
            | (EntryValue::Message(o), EntryValue::Message(n)) => {
                if !o.eq_ignore_ascii_case(n) {
                    warn!(
                        line = self.line,
                        attribute = self.props.name(key),
                        turn,
                        old = %o,
                        new = %n,
                        "conflicting values at equal turn"
                    );
                }
                false
            }
            _ => {
                warn!(
                    line = self.line,
                    attribute = self.props.name(key),
                    turn,
                    "conflicting value kinds at equal turn"
                );
                false
            }
        }
    }

    /// Insert a brand-new block at the end of its type's contiguous
    /// sibling run, and index it by identity.
    fn insert_new(&mut self, nid: BlockId, mut nb: Block, father: Option<BlockId>) -> StoreResult<()> {
        let owner: Option<BlockId> = match self.hierarchy.parent(nb.btype) {
            None => {
                nb.parent = None;
                None
            }
            Some(parent_type) => match father {
                Some(f) => {
                    nb.parent = Some(f);
                    Some(f)
                }
                None => {
                    // malformed input skipped a level; later attribute
                    // lines would attach to the wrong context
                    let block = self.hierarchy.name(nb.btype).to_string();
                    let parent = self.hierarchy.name(parent_type).to_string();
                    self.release(nid);
                    return Err(StoreError::MissingParent {
                        line: self.line,
                        block,
                        parent,
                    });
                }
            },
        };

        let at = self.insert_pos(owner, nb.btype);
        if nb.btype != self.version_type {
            // version blocks are found by scanning `top`, never the index,
            // and their ids are mutated by merges; leave them unindexed
            let key = IdentKey::new(&nb.ids, owner);
            self.index.entry((nb.btype, key)).or_default().push(nid);
        }
        self.restore(nid, nb);
        match owner {
            None => self.top.insert(at, nid),
            Some(f) => self.block_mut(f).children.insert(at, nid),
        }
        self.current = Some(nid);
        Ok(())
    }

    /// Where to insert a `btype` block in `owner`'s child list: the end of
    /// the first contiguous run of that type, or the end of the list.
    /// A small round-robin cache of run ends makes repeated same-typed
    /// inserts O(1); stale slots are detected and fall back to a scan.
    fn insert_pos(&mut self, owner: Option<BlockId>, btype: TypeId) -> usize {
        let mut slot_at = None;
        let start = self.cache_pos;
        let mut i = start;
        loop {
            if let Some(slot) = self.cache[i] {
                if slot.owner == owner && slot.btype == btype {
                    slot_at = Some(i);
                    break;
                }
            }
            i = (i + 1) % CACHE_SLOTS;
            if i == start {
                break;
            }
        }

        let at = match slot_at {
            Some(i) => {
                self.cache_pos = i;
                let slot = self.cache[i].expect("probed cache slot");
                if self.cache_valid(&slot) {
                    slot.end
                } else {
                    self.run_end(owner, btype)
                }
            }
            None => {
                self.cache_pos = (self.cache_pos + 1) % CACHE_SLOTS;
                self.run_end(owner, btype)
            }
        };
        self.cache[self.cache_pos] = Some(CacheSlot {
            owner,
            btype,
            end: at + 1,
        });
        at
    }

    fn cache_valid(&self, slot: &CacheSlot) -> bool {
        let list: &[BlockId] = match slot.owner {
            Some(f) => &self.block(f).children,
            None => &self.top,
        };
        let end = slot.end;
        end > 0
            && end <= list.len()
            && self.block(list[end - 1]).btype == slot.btype
            && (end == list.len() || self.block(list[end]).btype != slot.btype)
    }

    fn run_end(&self, owner: Option<BlockId>, btype: TypeId) -> usize {
        let list: &[BlockId] = match owner {
            Some(f) => &self.block(f).children,
            None => &self.top,
        };
        match list.iter().position(|&c| self.block(c).btype == btype) {
            Some(start) => {
                start
                    + list[start..]
                        .iter()
                        .take_while(|&&c| self.block(c).btype == btype)
                        .count()
            }
            None => list.len(),
        }
    }

    /// The block has moved: extract it from its old child list and splice
    /// it into `new_parent`'s list at the end of its type's run.
    fn switch_parent(&mut self, b: BlockId, new_parent: BlockId) {
        let old_parent = self.block(b).parent;
        match old_parent {
            Some(op) => {
                let at = self
                    .block(op)
                    .children
                    .iter()
                    .position(|&c| c == b)
                    .expect("child link");
                self.block_mut(op).children.remove(at);
            }
            None => {
                let at = self.top.iter().position(|&c| c == b).expect("top link");
                self.top.remove(at);
            }
        }
        let btype = self.block(b).btype;
        let at = self.run_end(Some(new_parent), btype);
        self.block_mut(new_parent).children.insert(at, b);
        self.block_mut(b).parent = Some(new_parent);
    }
}
