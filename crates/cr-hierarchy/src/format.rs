//! The plain-text hierarchy definition format.
//!
//! One type per line, `name[:flags[:unique]]`, where indentation encodes
//! nesting depth (tabs expand to 8-column stops) and a child's indentation
//! must exceed its parent's. `flags` is the decimal bit-OR of the
//! [`TypeFlags`] constants; `unique` names the ancestor type below which
//! block ids are unique. The format round-trips losslessly through
//! [`write`]/[`parse`].

use crate::error::{HierarchyError, HierarchyResult};
use crate::types::{TypeFlags, TypeHierarchy, TypeId};

const TAB_STOP: usize = 8;

/// Parse a hierarchy definition.
pub fn parse(text: &str) -> HierarchyResult<TypeHierarchy> {
    let mut hierarchy = TypeHierarchy::new();
    // open parent chain as (indentation, type) pairs
    let mut stack: Vec<(usize, TypeId)> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index as u64 + 1;
        let (offset, body) = indentation(raw);
        if body.is_empty() {
            continue;
        }

        let mut fields = body
            .split(|c| c == ':' || c == ' ' || c == '\t')
            .filter(|f| !f.is_empty());
        let name = match fields.next() {
            Some(n) => n,
            None => continue,
        };
        let flags = match fields.next() {
            Some(f) => f.parse::<u32>().map_err(|_| HierarchyError::BadFlags {
                line,
                value: f.to_string(),
            })?,
            None => 0,
        };
        let unique_name = fields.next();

        while matches!(stack.last(), Some(&(depth, _)) if depth >= offset) {
            stack.pop();
        }
        let parent = stack.last().map(|&(_, id)| id);

        let unique_scope = match unique_name {
            Some(unique) => {
                let mut found = None;
                let mut up = parent;
                while let Some(t) = up {
                    if hierarchy.name(t).eq_ignore_ascii_case(unique) {
                        found = Some(t);
                        break;
                    }
                    up = hierarchy.parent(t);
                }
                match found {
                    Some(t) => Some(t),
                    None => {
                        return Err(HierarchyError::UnknownScope {
                            line,
                            name: unique.to_string(),
                        })
                    }
                }
            }
            None => None,
        };

        let id = hierarchy.make_type(name, parent, unique_scope, TypeFlags::from_bits(flags));
        stack.push((offset, id));
    }
    Ok(hierarchy)
}

/// Serialize a hierarchy, depth-first, one space of indentation per level.
pub fn write(hierarchy: &TypeHierarchy) -> String {
    let mut out = String::new();
    for &root in hierarchy.roots() {
        write_node(hierarchy, root, 0, &mut out);
    }
    out
}

fn write_node(hierarchy: &TypeHierarchy, id: TypeId, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push(' ');
    }
    out.push_str(hierarchy.name(id));
    let flags = hierarchy.flags(id);
    let unique = hierarchy.unique_scope(id);
    if !flags.is_empty() || unique.is_some() {
        out.push(':');
        out.push_str(&flags.bits().to_string());
        if let Some(u) = unique {
            out.push(':');
            out.push_str(hierarchy.name(u));
        }
    }
    out.push('\n');
    for &child in hierarchy.children(id) {
        write_node(hierarchy, child, depth + 1, out);
    }
}

/// Leading indentation in columns, and the rest of the line.
fn indentation(line: &str) -> (usize, &str) {
    let mut offset = 0;
    for (at, c) in line.char_indices() {
        match c {
            ' ' => offset += 1,
            '\t' => offset = (offset + TAB_STOP) & !(TAB_STOP - 1),
            _ => return (offset, line[at..].trim_end()),
        }
    }
    (offset, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn structurally_eq(a: &TypeHierarchy, b: &TypeHierarchy) -> bool {
        fn node_eq(a: &TypeHierarchy, x: TypeId, b: &TypeHierarchy, y: TypeId) -> bool {
            if a.name(x) != b.name(y) || a.flags(x) != b.flags(y) {
                return false;
            }
            let scope_a = a.unique_scope(x).map(|s| a.name(s));
            let scope_b = b.unique_scope(y).map(|s| b.name(s));
            if scope_a != scope_b {
                return false;
            }
            let ca = a.children(x);
            let cb = b.children(y);
            ca.len() == cb.len()
                && ca
                    .iter()
                    .zip(cb)
                    .all(|(&cx, &cy)| node_eq(a, cx, b, cy))
        }
        a.roots().len() == b.roots().len()
            && a.roots()
                .iter()
                .zip(b.roots())
                .all(|(&x, &y)| node_eq(a, x, b, y))
    }

    #[test]
    fn parse_basic_nesting() {
        let h = parse("VERSION\n REGION\n  EINHEIT\n MESSAGE:1\n").unwrap();
        assert_eq!(h.roots().len(), 1);
        let version = h.roots()[0];
        assert_eq!(h.name(version), "VERSION");
        let region = h.children(version)[0];
        assert_eq!(h.name(region), "REGION");
        assert_eq!(h.name(h.children(region)[0]), "EINHEIT");
        let msg = h.children(version)[1];
        assert_eq!(h.name(msg), "MESSAGE");
        assert!(h.flags(msg).contains(TypeFlags::NO_MERGE));
    }

    #[test]
    fn parse_resolves_unique_scope_case_insensitively() {
        let h = parse("VERSION\n REGION\n  BURG:0:region\n").unwrap();
        let version = h.roots()[0];
        let region = h.children(version)[0];
        let burg = h.children(region)[0];
        assert_eq!(h.unique_scope(burg), Some(region));
    }

    #[test]
    fn parse_rejects_unresolvable_scope() {
        let err = parse("VERSION\n REGION:0:SCHIFF\n").unwrap_err();
        assert_eq!(
            err,
            HierarchyError::UnknownScope {
                line: 2,
                name: "SCHIFF".to_string()
            }
        );
    }

    #[test]
    fn parse_rejects_non_numeric_flags() {
        let err = parse("VERSION\n REGION:x\n").unwrap_err();
        assert!(matches!(err, HierarchyError::BadFlags { line: 2, .. }));
    }

    #[test]
    fn tabs_expand_to_eight_column_stops() {
        // the tab-indented child sits deeper than the space-indented one
        let h = parse("VERSION\n REGION\n\tEINHEIT\n").unwrap();
        let version = h.roots()[0];
        let region = h.children(version)[0];
        assert_eq!(h.name(h.children(region)[0]), "EINHEIT");
    }

    #[test]
    fn equal_indentation_means_sibling() {
        let h = parse("VERSION\n REGION\n SCHIFF\n").unwrap();
        let version = h.roots()[0];
        assert_eq!(h.children(version).len(), 2);
    }

    #[test]
    fn round_trip_preserves_structure() {
        let text = "VERSION\n PARTEI\n  EINHEIT:0:PARTEI\n  MESSAGE:1\n REGION:2\n  BURG:0:REGION\n";
        let h = parse(text).unwrap();
        assert_eq!(write(&h), text);
        let again = parse(&write(&h)).unwrap();
        assert!(structurally_eq(&h, &again));
    }

    // -----------------------------------------------------------------------
    // Property: write/parse round-trip for arbitrary hierarchies
    // -----------------------------------------------------------------------

    fn build(ops: &[(u8, u8, u8)]) -> TypeHierarchy {
        let mut h = TypeHierarchy::new();
        let mut stack: Vec<TypeId> = Vec::new();
        for (i, &(pops, flags, scope)) in ops.iter().enumerate() {
            let keep = stack.len().saturating_sub(pops as usize % (stack.len() + 1));
            stack.truncate(keep);
            let parent = stack.last().copied();
            let unique = if scope % 2 == 1 && !stack.is_empty() {
                Some(stack[scope as usize / 2 % stack.len()])
            } else {
                None
            };
            let name = format!("T{i}");
            let id = h.make_type(&name, parent, unique, TypeFlags::from_bits(u32::from(flags % 4)));
            stack.push(id);
        }
        h
    }

    proptest! {
        #[test]
        fn prop_round_trip(ops in proptest::collection::vec((0u8..4, 0u8..4, 0u8..8), 0..40)) {
            let h = build(&ops);
            let text = write(&h);
            let parsed = parse(&text).unwrap();
            prop_assert!(structurally_eq(&h, &parsed));
        }
    }
}
