//! Multi-declarations - several declarations fused into one lookup target
//!
//! A Go package spread over files, a type whose methods live in another file
//! or a redefined Python function all produce more than one entity with one
//! qualified name. The group keeps each member intact and answers lookups
//! across them in member order.

use super::{Entity, EntityData, EntityId};
use crate::repo::EntityRepo;
use crate::scope::Resolver;

#[derive(Debug, Default)]
pub struct MultiDeclareEntities {
    members: Vec<EntityId>,
}

impl MultiDeclareEntities {
    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    pub(crate) fn remap(&mut self, offset: u32) {
        for member in &mut self.members {
            *member = member.offset(offset);
        }
    }
}

impl EntityRepo {
    /// Start a group from its first declaration. The group takes the
    /// first declaration's name and parent but is not one of the parent's
    /// children.
    pub fn add_multi_declare(&mut self, first: EntityId) -> EntityId {
        let (raw_name, qualified_name, parent) = match self.get(first) {
            Some(e) => (e.raw_name.clone(), e.qualified_name.clone(), e.parent),
            None => (String::new(), String::new(), None),
        };
        let id = self.next_id();
        self.push_entity(Entity {
            id,
            raw_name,
            qualified_name,
            parent,
            children: Vec::new(),
            group: None,
            data: EntityData::MultiDeclare(MultiDeclareEntities::default()),
        });
        self.add_to_group(id, first);
        id
    }

    /// Point `entity` at the group; only containers become members.
    pub fn add_to_group(&mut self, group: EntityId, entity: EntityId) {
        let is_container = match self.get_mut(entity) {
            Some(e) => {
                e.group = Some(group);
                e.is_container()
            }
            None => return,
        };
        if !is_container {
            return;
        }
        if let Some(EntityData::MultiDeclare(g)) = self.get_mut(group).map(|e| &mut e.data) {
            g.members.push(entity);
        }
    }

    pub fn group_members(&self, id: EntityId) -> &[EntityId] {
        self.get(id)
            .and_then(Entity::as_group)
            .map(MultiDeclareEntities::members)
            .unwrap_or(&[])
    }

    /// Children of an entity; a group yields its members' children in
    /// member order.
    pub fn get_children(&self, id: EntityId) -> Vec<EntityId> {
        let Some(entity) = self.get(id) else { return Vec::new() };
        match &entity.data {
            EntityData::MultiDeclare(group) => group
                .members
                .iter()
                .filter_map(|&m| self.get(m))
                .flat_map(|m| m.children.iter().copied())
                .collect(),
            _ => entity.children.clone(),
        }
    }

    pub(crate) fn infer_group(&self, id: EntityId, resolver: &dyn Resolver) {
        for &member in self.group_members(id) {
            self.infer_local_level_entities(member, resolver);
        }
    }
}
