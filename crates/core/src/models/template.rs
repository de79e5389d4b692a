//! Zone template value objects.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntityId, Timestamp};

/// Identity-free snapshot of a zone and its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    /// Number of nodes in this structure, root included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// A named, timestamped template. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: EntityId,
    pub name: String,
    pub structure: TemplateNode,
    pub created_at: Timestamp,
}

impl Template {
    /// Wrap a captured structure under a trimmed, non-empty name.
    pub fn capture(name: &str, structure: TemplateNode) -> Result<Self, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation(
                "Template name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: crate::types::new_id(),
            name: name.to_string(),
            structure,
            created_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn leaf_nodes_may_omit_children() {
        let node: TemplateNode = serde_json::from_str(
            r#"{"code":"KA","name":"Kệ A","children":[{"code":"D1","name":"Dãy 1"}]}"#,
        )
        .unwrap();
        assert_eq!(node.node_count(), 2);
        assert!(node.children[0].children.is_empty());
    }

    #[test]
    fn capture_requires_a_name() {
        let node = TemplateNode {
            code: "KA".to_string(),
            name: "Kệ A".to_string(),
            children: vec![],
        };
        assert_matches!(
            Template::capture("  ", node.clone()),
            Err(CoreError::Validation(_))
        );
        assert_eq!(Template::capture(" Aisle ", node).unwrap().name, "Aisle");
    }
}
