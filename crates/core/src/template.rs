//! Template capture and instantiation.
//!
//! A snapshot strips a live subtree down to codes, names and shape. Stamping
//! it somewhere else mints fresh zones one level deeper per template level,
//! parented only to other freshly minted zones.

use crate::error::CoreError;
use crate::models::{TemplateNode, Zone};
use crate::staging::{normalize_code, normalize_name, StagingStore};
use crate::types::EntityId;

impl StagingStore {
    /// Capture the live subtree at `zone_id` as an identity-free structure.
    pub fn snapshot_template(&self, zone_id: EntityId) -> Result<TemplateNode, CoreError> {
        let root = self.live_zone(zone_id)?;
        let index = self.tree();

        // Build bottom-up: walk in pre-order, then fold children into parents
        // in reverse so every child is complete before its parent consumes it.
        let order = index.subtree(root.id);
        let mut built: std::collections::HashMap<EntityId, TemplateNode> =
            std::collections::HashMap::with_capacity(order.len());

        for zone in order.iter().rev() {
            let children = index
                .children(Some(zone.id))
                .iter()
                .filter_map(|child| built.remove(&child.id))
                .collect();
            built.insert(
                zone.id,
                TemplateNode {
                    code: zone.code.clone(),
                    name: zone.name.clone(),
                    children,
                },
            );
        }

        built
            .remove(&root.id)
            .ok_or_else(|| CoreError::Internal("snapshot lost its root".to_string()))
    }

    /// Stamp `template` under `parent_id` with a new root labelled
    /// `root_code` / `root_name`. The template's own root label is replaced;
    /// every descendant keeps its captured code and name.
    ///
    /// Returns the new zone ids, root first.
    pub fn instantiate_template(
        &mut self,
        parent_id: Option<EntityId>,
        template: &TemplateNode,
        root_code: &str,
        root_name: &str,
    ) -> Result<Vec<EntityId>, CoreError> {
        let root_code = normalize_code(root_code)?;
        let root_name = normalize_name(root_name)?;
        let level = match parent_id {
            Some(pid) => self.live_zone(pid)?.level + 1,
            None => 0,
        };

        let root = Zone::new_local(root_code, root_name, parent_id, level);
        let mut created = Vec::with_capacity(template.node_count());
        let mut stack: Vec<(&TemplateNode, EntityId, i32)> = template
            .children
            .iter()
            .rev()
            .map(|child| (child, root.id, level + 1))
            .collect();
        created.push(root);

        while let Some((node, parent, depth)) = stack.pop() {
            let zone = Zone::new_local(node.code.clone(), node.name.clone(), Some(parent), depth);
            for child in node.children.iter().rev() {
                stack.push((child, zone.id, depth + 1));
            }
            created.push(zone);
        }

        let ids = created.iter().map(|z| z.id).collect();
        self.zones.extend(created);
        Ok(ids)
    }
}
