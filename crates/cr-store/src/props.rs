//! Interned attribute names.
//!
//! Equal names (ASCII case-insensitive) always resolve to the same
//! [`PropId`] for the lifetime of one store, so matching attributes during
//! merge is a handle comparison. The first-seen spelling is retained for
//! output.

use std::collections::HashMap;

/// Handle to an interned attribute name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PropId(u32);

#[derive(Debug, Default)]
pub(crate) struct PropertyTable {
    by_name: HashMap<String, PropId>,
    names: Vec<String>,
}

impl PropertyTable {
    /// Resolve `name` to its property, creating it on first use.
    pub(crate) fn intern(&mut self, name: &str) -> PropId {
        let folded = name.to_ascii_lowercase();
        if let Some(&id) = self.by_name.get(&folded) {
            return id;
        }
        let id = PropId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(folded, id);
        id
    }

    /// Resolve `name` without creating it. Used on the read path.
    pub(crate) fn lookup(&self, name: &str) -> Option<PropId> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// The first-seen spelling of a property.
    pub(crate) fn name(&self, id: PropId) -> &str {
        &self.names[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_case_insensitive() {
        let mut table = PropertyTable::default();
        let a = table.intern("Bauern");
        let b = table.intern("bauern");
        let c = table.intern("BAUERN");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(table.name(a), "Bauern");
    }

    #[test]
    fn lookup_never_creates() {
        let mut table = PropertyTable::default();
        assert_eq!(table.lookup("silber"), None);
        let id = table.intern("Silber");
        assert_eq!(table.lookup("silber"), Some(id));
        assert_eq!(table.lookup("SILBER"), Some(id));
    }

    #[test]
    fn distinct_names_get_distinct_handles() {
        let mut table = PropertyTable::default();
        assert_ne!(table.intern("bauern"), table.intern("silber"));
    }
}
