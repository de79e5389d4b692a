//! Derived parent/child views over the flat zone collection.
//!
//! Nothing here is stored: a [`TreeIndex`] is built from a zone slice when
//! needed and dropped afterwards. Deleted zones are invisible to every
//! traversal. All walks use explicit worklists so deep hierarchies cannot
//! exhaust the stack.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::Zone;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Natural ordering
// ---------------------------------------------------------------------------

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        if let Some(prev) = in_digits {
            if prev != is_digit {
                out.push(make_chunk(&s[start..i], prev));
                start = i;
            }
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        out.push(make_chunk(&s[start..], prev));
    }
    out
}

fn make_chunk(s: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(s)
    } else {
        Chunk::Text(s)
    }
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Case-insensitive, numeric-aware comparison: `"Z2" < "Z10"`, `"a1" == "A1"`
/// up to a final byte-wise tie-break.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => compare_digits(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Adjacency view of a zone slice.
pub struct TreeIndex<'a> {
    zones: &'a [Zone],
    by_id: HashMap<EntityId, usize>,
    /// Live children per parent, already sorted by code.
    children: HashMap<Option<EntityId>, Vec<usize>>,
}

impl<'a> TreeIndex<'a> {
    pub fn new(zones: &'a [Zone]) -> Self {
        let mut by_id = HashMap::with_capacity(zones.len());
        let mut children: HashMap<Option<EntityId>, Vec<usize>> = HashMap::new();

        for (idx, zone) in zones.iter().enumerate() {
            by_id.insert(zone.id, idx);
            if zone.is_live() {
                children.entry(zone.parent_id).or_default().push(idx);
            }
        }
        for list in children.values_mut() {
            list.sort_by(|&a, &b| natural_cmp(&zones[a].code, &zones[b].code));
        }

        Self {
            zones,
            by_id,
            children,
        }
    }

    /// Look up a zone by id regardless of status.
    pub fn zone(&self, id: EntityId) -> Option<&'a Zone> {
        self.by_id.get(&id).map(|&idx| &self.zones[idx])
    }

    /// Look up a zone by id, hiding deleted ones.
    pub fn live_zone(&self, id: EntityId) -> Option<&'a Zone> {
        self.zone(id).filter(|z| z.is_live())
    }

    /// Live children of `parent` (`None` = roots), in natural code order.
    pub fn children(&self, parent: Option<EntityId>) -> Vec<&'a Zone> {
        self.child_indices(parent)
            .iter()
            .map(|&idx| &self.zones[idx])
            .collect()
    }

    fn child_indices(&self, parent: Option<EntityId>) -> &[usize] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: EntityId) -> bool {
        !self.child_indices(Some(id)).is_empty()
    }

    /// Number of live descendants below `id`.
    pub fn descendant_count(&self, id: EntityId) -> usize {
        self.subtree(id).len().saturating_sub(1)
    }

    /// The live subtree rooted at `id` in pre-order, root first. Empty when
    /// `id` is unknown or deleted.
    pub fn subtree(&self, id: EntityId) -> Vec<&'a Zone> {
        let Some(root) = self.live_zone(id) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(zone) = stack.pop() {
            out.push(zone);
            // Reverse so siblings pop in code order.
            for &idx in self.child_indices(Some(zone.id)).iter().rev() {
                stack.push(&self.zones[idx]);
            }
        }
        out
    }

    /// Leaf zones below `id` (zones without live children). A childless zone
    /// is its own single leaf.
    pub fn leaves(&self, id: EntityId) -> Vec<&'a Zone> {
        self.subtree(id)
            .into_iter()
            .filter(|z| !self.has_children(z.id))
            .collect()
    }

    /// Root-to-node path, inclusive. Empty when `id` is unknown.
    pub fn ancestor_chain(&self, id: EntityId) -> Vec<&'a Zone> {
        let mut chain = Vec::new();
        let mut current = self.zone(id);
        while let Some(zone) = current {
            // Guard against a corrupted parent relation.
            if chain.len() > self.zones.len() {
                break;
            }
            chain.push(zone);
            current = zone.parent_id.and_then(|pid| self.zone(pid));
        }
        chain.reverse();
        chain
    }

    /// Ancestor codes joined with `.`, e.g. `"NK1.KA.D1"`.
    pub fn path_codes(&self, id: EntityId) -> String {
        self.ancestor_chain(id)
            .iter()
            .filter(|z| !z.code.is_empty())
            .map(|z| z.code.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Default code prefix offered for manual position creation.
    pub fn default_position_prefix(&self, id: EntityId) -> String {
        format!("{}.V", self.path_codes(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StagingStatus;

    fn zone(code: &str, parent: Option<&Zone>) -> Zone {
        let mut z = Zone::new_local(
            code.to_string(),
            code.to_string(),
            parent.map(|p| p.id),
            parent.map_or(0, |p| p.level + 1),
        );
        z.status = StagingStatus::Existing;
        z
    }

    // -- natural_cmp ---------------------------------------------------------

    #[test]
    fn numeric_runs_compare_by_value() {
        assert_eq!(natural_cmp("Z2", "Z10"), Ordering::Less);
        assert_eq!(natural_cmp("Z10", "Z9"), Ordering::Greater);
    }

    #[test]
    fn text_compares_case_insensitively() {
        assert_eq!(natural_cmp("a2", "B1"), Ordering::Less);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(natural_cmp("A", "A1"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_tie_break() {
        assert_eq!(natural_cmp("V01", "V1"), Ordering::Greater);
        assert_eq!(natural_cmp("V02", "V1"), Ordering::Greater);
    }

    // -- TreeIndex -----------------------------------------------------------

    #[test]
    fn children_sorted_and_exclude_deleted() {
        let root = zone("A", None);
        let z10 = zone("Z10", Some(&root));
        let z2 = zone("Z2", Some(&root));
        let mut gone = zone("Z1", Some(&root));
        gone.status = StagingStatus::Deleted;
        let zones = vec![root.clone(), z10, z2, gone];

        let index = TreeIndex::new(&zones);
        let codes: Vec<_> = index
            .children(Some(root.id))
            .iter()
            .map(|z| z.code.as_str())
            .collect();
        assert_eq!(codes, vec!["Z2", "Z10"]);
        assert_eq!(index.children(None).len(), 1);
    }

    #[test]
    fn descendant_count_is_recursive() {
        let root = zone("A", None);
        let b = zone("B", Some(&root));
        let c = zone("C", Some(&b));
        let d = zone("D", Some(&b));
        let zones = vec![root.clone(), b.clone(), c, d];

        let index = TreeIndex::new(&zones);
        assert_eq!(index.descendant_count(root.id), 3);
        assert_eq!(index.descendant_count(b.id), 2);
    }

    #[test]
    fn leaves_of_childless_zone_is_itself() {
        let root = zone("A", None);
        let zones = vec![root.clone()];
        let index = TreeIndex::new(&zones);

        let leaves = index.leaves(root.id);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].id, root.id);
    }

    #[test]
    fn leaves_skip_inner_nodes() {
        let root = zone("A", None);
        let b = zone("B", Some(&root));
        let c = zone("C", Some(&b));
        let d = zone("D", Some(&root));
        let zones = vec![root.clone(), b, c.clone(), d.clone()];

        let index = TreeIndex::new(&zones);
        let ids: Vec<_> = index.leaves(root.id).iter().map(|z| z.id).collect();
        assert_eq!(ids, vec![c.id, d.id]);
    }

    #[test]
    fn leaves_of_unknown_zone_is_empty() {
        let zones: Vec<Zone> = Vec::new();
        let index = TreeIndex::new(&zones);
        assert!(index.leaves(crate::types::new_id()).is_empty());
    }

    #[test]
    fn ancestor_chain_runs_root_to_node() {
        let nk = zone("NK1", None);
        let ka = zone("KA", Some(&nk));
        let d = zone("D1", Some(&ka));
        let zones = vec![d.clone(), ka, nk];

        let index = TreeIndex::new(&zones);
        let codes: Vec<_> = index
            .ancestor_chain(d.id)
            .iter()
            .map(|z| z.code.as_str())
            .collect();
        assert_eq!(codes, vec!["NK1", "KA", "D1"]);
        assert_eq!(index.path_codes(d.id), "NK1.KA.D1");
        assert_eq!(index.default_position_prefix(d.id), "NK1.KA.D1.V");
    }
}
