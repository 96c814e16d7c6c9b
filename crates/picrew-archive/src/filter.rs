//! Active-set filter — prune everything that carries no actual image.
//!
//! The blob declares far more than it populates: items with no urls, parts
//! whose every item is empty, layers nothing draws into. An item is active
//! iff at least one (layer, color) slot under it, in either image tree,
//! holds a non-empty url; a part is active iff it retains at least one
//! active item. Declaration order of parts and items is preserved — the
//! Y-axis assignment downstream is order-sensitive.

use crate::state::{ItemId, Part, RawState};
use std::collections::HashSet;

/// The survivors: active item ids plus parts filtered down to active items.
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    pub items: HashSet<ItemId>,
    pub parts: Vec<Part>,
}

impl ActiveSet {
    /// True when nothing at all is active — a distinguishable "no assets"
    /// outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Compute the active set for a decoded state. Pure; empty input yields
/// empty output.
pub fn active_set(state: &RawState) -> ActiveSet {
    let mut items = HashSet::new();
    for tree in state.image_trees() {
        for (item_id, layers) in tree {
            if items.contains(item_id) {
                continue;
            }
            let populated = layers
                .values()
                .any(|colors| colors.values().any(|cell| cell.has_url()));
            if populated {
                items.insert(item_id.clone());
            }
        }
    }

    let parts = state
        .config
        .parts
        .iter()
        .filter_map(|part| {
            let kept: Vec<_> = part
                .items
                .iter()
                .filter(|item| items.contains(&item.id))
                .cloned()
                .collect();
            if kept.is_empty() {
                return None;
            }
            let mut part = part.clone();
            part.items = kept;
            Some(part)
        })
        .collect();

    ActiveSet { items, parts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RawState;

    fn state_from(json: &str) -> RawState {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_item_with_one_url_is_active() {
        let state = state_from(
            r#"{
                "config": {"pList": [{"pId": 1, "items": [{"itmId": 10}, {"itmId": 11}], "lyrs": [5]}]},
                "commonImages": {
                    "10": {"5": {"0": {"url": "/i/10.png"}}},
                    "11": {"5": {"0": {"url": ""}, "1": {}}}
                }
            }"#,
        );
        let active = active_set(&state);
        assert!(active.items.contains(&ItemId::from(10)));
        assert!(!active.items.contains(&ItemId::from(11)));
        assert_eq!(active.parts.len(), 1);
        assert_eq!(active.parts[0].items.len(), 1);
    }

    #[test]
    fn test_member_tree_counts_too() {
        let state = state_from(
            r#"{
                "config": {"pList": [{"pId": 1, "items": [{"itmId": 10}], "lyrs": [5]}]},
                "memberImages": {"10": {"5": {"0": {"url": "/m/10.png"}}}}
            }"#,
        );
        assert!(!active_set(&state).is_empty());
    }

    #[test]
    fn test_part_with_no_active_items_is_pruned() {
        let state = state_from(
            r#"{
                "config": {"pList": [
                    {"pId": 1, "items": [{"itmId": 10}], "lyrs": [5]},
                    {"pId": 2, "items": [{"itmId": 20}], "lyrs": [6]}
                ]},
                "commonImages": {
                    "10": {"5": {"0": {"url": "/i/10.png"}}},
                    "20": {"6": {"0": {"url": ""}}}
                }
            }"#,
        );
        let active = active_set(&state);
        assert_eq!(active.parts.len(), 1);
        assert_eq!(active.parts[0].id, crate::state::PartId::from(1));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let state = state_from(
            r#"{
                "config": {"pList": [
                    {"pId": 3, "items": [{"itmId": 30}], "lyrs": [7]},
                    {"pId": 1, "items": [{"itmId": 10}], "lyrs": [5]}
                ]},
                "commonImages": {
                    "10": {"5": {"0": {"url": "/i/10.png"}}},
                    "30": {"7": {"0": {"url": "/i/30.png"}}}
                }
            }"#,
        );
        let ids: Vec<_> = active_set(&state).parts.iter().map(|p| p.id.clone()).collect();
        assert_eq!(
            ids,
            vec![crate::state::PartId::from(3), crate::state::PartId::from(1)]
        );
    }

    #[test]
    fn test_empty_state_yields_empty_set() {
        let active = active_set(&RawState::default());
        assert!(active.is_empty());
        assert!(active.items.is_empty());
    }
}
