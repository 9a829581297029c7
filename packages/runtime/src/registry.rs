//! Live entities and the indexes used to find them without tree walks.

use crate::dom::NodeId;
use crate::entity::{Entity, EntityId};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Registry {
    entities: IndexMap<EntityId, Entity>,
    by_node: HashMap<NodeId, EntityId>,
    by_scope: HashMap<String, EntityId>,
    /// Every variable name ever discovered; never pruned
    variables: IndexSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) {
        self.by_node.insert(entity.node, entity.id.clone());
        if let Some(scope) = &entity.scope_id {
            self.by_scope.insert(scope.clone(), entity.id.clone());
        }
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        let entity = self.entities.shift_remove(id)?;
        if self.by_node.get(&entity.node) == Some(id) {
            self.by_node.remove(&entity.node);
        }
        if let Some(scope) = &entity.scope_id {
            self.by_scope.remove(scope);
        }
        Some(entity)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn for_node(&self, node: NodeId) -> Option<&EntityId> {
        self.by_node.get(&node)
    }

    /// Entity owning the scope `scope`
    pub fn for_scope(&self, scope: &str) -> Option<&EntityId> {
        self.by_scope.get(scope)
    }

    pub fn mark_scope_root(&mut self, id: &EntityId, scope: String) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.scope_id = Some(scope.clone());
            self.by_scope.insert(scope, id.clone());
        }
    }

    pub fn merge_variables<'a>(&mut self, names: impl IntoIterator<Item = &'a String>) {
        for name in names {
            self.variables.insert(name.clone());
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = &String> {
        self.variables.iter()
    }

    /// Live entities in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexes_follow_insert_and_remove() {
        let mut registry = Registry::new();
        let id = EntityId::from("E1");
        registry.insert(Entity::new(id.clone(), NodeId(3), Vec::new()));
        registry.mark_scope_root(&id, "E1".into());

        assert_eq!(registry.for_node(NodeId(3)), Some(&id));
        assert_eq!(registry.for_scope("E1"), Some(&id));

        registry.remove(&id);
        assert!(registry.for_node(NodeId(3)).is_none());
        assert!(registry.for_scope("E1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_variable_union_only_grows() {
        let mut registry = Registry::new();
        let id = EntityId::from("E1");
        registry.insert(Entity::new(id.clone(), NodeId(1), Vec::new()));
        registry.merge_variables(&["count".to_string(), "open".to_string()]);
        registry.remove(&id);
        registry.merge_variables(&["count".to_string()]);

        assert_eq!(registry.variables().collect::<Vec<_>>(), vec!["count", "open"]);
    }
}
