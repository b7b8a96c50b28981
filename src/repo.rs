//! Entity repository - the arena owning every entity
//!
//! Frontends fill one repository per file. The coordinator merges them into
//! the shared repository, shifting ids by an offset, and then calls
//! [`EntityRepo::seal`]: the barrier that indexes qualified names and fuses
//! redeclarations into multi-declare groups. Resolution only reads the
//! repository; resolved state lives in write-once cells on each entity.

use crate::entity::{
    AliasEntity, Entity, EntityData, EntityId, EntityKind, Expression, ExpressionKey, FileEntity,
    FunctionEntity, Import, Initializer, PackageEntity, TypeEntity, VarEntity,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Default)]
pub struct EntityRepo {
    entities: Vec<Entity>,
    files: Vec<EntityId>,
    by_qualified_name: HashMap<String, EntityId>,
    by_raw_name: HashMap<String, Vec<EntityId>>,
    sealed: bool,
}

impl EntityRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    /// Entity by id. Panics on an id this repository never issued.
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Root file entities, in merge order
    pub fn files(&self) -> &[EntityId] {
        &self.files
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn next_id(&self) -> EntityId {
        EntityId(self.entities.len() as u32)
    }

    pub(crate) fn push_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    fn add_entity(&mut self, parent: Option<EntityId>, raw_name: &str, data: EntityData) -> EntityId {
        let id = self.next_id();
        let qualified_name = self.child_qualified_name(parent, raw_name);
        self.entities.push(Entity {
            id,
            raw_name: raw_name.to_string(),
            qualified_name,
            parent,
            children: Vec::new(),
            group: None,
            data,
        });
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.push(id);
        }
        id
    }

    fn child_qualified_name(&self, parent: Option<EntityId>, name: &str) -> String {
        let prefix = match parent.and_then(|p| self.get(p)) {
            None => "",
            Some(entity) => match &entity.data {
                EntityData::File(file) => file.namespace(),
                _ => entity.qualified_name.as_str(),
            },
        };
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        }
    }

    pub fn add_file(&mut self, path: &str, namespace: impl Into<String>) -> EntityId {
        let id = self.add_entity(None, path, EntityData::File(FileEntity::new(namespace)));
        self.files.push(id);
        id
    }

    pub fn add_package(&mut self, parent: EntityId, name: &str) -> EntityId {
        self.add_entity(Some(parent), name, EntityData::Package(PackageEntity::default()))
    }

    pub fn add_type(&mut self, parent: EntityId, name: &str) -> EntityId {
        self.add_entity(Some(parent), name, EntityData::Type(TypeEntity::default()))
    }

    /// A root type with no parent, such as a built-in.
    pub fn add_root_type(&mut self, name: &str) -> EntityId {
        self.add_entity(None, name, EntityData::Type(TypeEntity::default()))
    }

    pub fn add_function(&mut self, parent: EntityId, name: &str) -> EntityId {
        let id = self.add_entity(Some(parent), name, EntityData::Function(FunctionEntity::default()));
        if let Some(container) = self.get_mut(parent).and_then(Entity::container_mut) {
            container.add_function(id);
        }
        id
    }

    /// A member variable of `parent`.
    pub fn add_var(&mut self, parent: EntityId, name: &str, raw_type: Option<&str>) -> EntityId {
        let id = self.add_entity(
            Some(parent),
            name,
            EntityData::Var(VarEntity::new(raw_type.map(str::to_string))),
        );
        if let Some(container) = self.get_mut(parent).and_then(Entity::container_mut) {
            container.add_var(id);
            debug!("Var found: {} of type {}", name, raw_type.unwrap_or("?"));
        }
        id
    }

    /// A parameter of `function`, kept apart from its body variables.
    pub fn add_parameter(&mut self, function: EntityId, name: &str, raw_type: Option<&str>) -> EntityId {
        let id = self.add_entity(
            Some(function),
            name,
            EntityData::Var(VarEntity::new(raw_type.map(str::to_string))),
        );
        if let Some(EntityData::Function(f)) = self.get_mut(function).map(|e| &mut e.data) {
            f.add_parameter(id);
        }
        id
    }

    pub fn add_alias(&mut self, parent: EntityId, name: &str, origin_name: &str) -> EntityId {
        self.add_entity(Some(parent), name, EntityData::Alias(AliasEntity::new(origin_name)))
    }

    pub fn add_expression(&mut self, container: EntityId, key: ExpressionKey, expression: Expression) {
        if let Some(container) = self.get_mut(container).and_then(Entity::container_mut) {
            container.add_expression(key, expression);
        }
    }

    pub fn add_mixin(&mut self, container: EntityId, name: &str) {
        if let Some(container) = self.get_mut(container).and_then(Entity::container_mut) {
            container.add_mixin(name);
        }
    }

    pub fn add_type_parameter(&mut self, id: EntityId, name: &str) {
        if let Some(container) = self.get_mut(id).and_then(Entity::container_mut) {
            container.decorations_mut().add_type_parameter(name);
        }
    }

    pub fn add_annotation(&mut self, id: EntityId, name: &str) {
        if let Some(container) = self.get_mut(id).and_then(Entity::container_mut) {
            container.decorations_mut().add_annotation(name);
        }
    }

    /// Declared return type name; absent names are ignored.
    pub fn add_return_type(&mut self, function: EntityId, raw_name: Option<&str>) {
        let Some(raw_name) = raw_name else { return };
        if let Some(EntityData::Function(f)) = self.get_mut(function).map(|e| &mut e.data) {
            f.add_return_type(raw_name);
        }
    }

    pub fn add_resolved_return_type(&mut self, function: EntityId, ty: EntityId) {
        let raw_name = match self.get(ty) {
            Some(e) => e.raw_name.clone(),
            None => return,
        };
        if let Some(EntityData::Function(f)) = self.get_mut(function).map(|e| &mut e.data) {
            f.add_resolved_return_type(ty, &raw_name);
        }
    }

    pub fn add_throw_type(&mut self, function: EntityId, raw_name: &str) {
        if let Some(EntityData::Function(f)) = self.get_mut(function).map(|e| &mut e.data) {
            f.add_throw_type(raw_name);
        }
    }

    pub fn add_inherited_type(&mut self, ty: EntityId, raw_name: &str) {
        if let Some(EntityData::Type(t)) = self.get_mut(ty).map(|e| &mut e.data) {
            t.add_inherited(raw_name);
        }
    }

    pub fn add_implemented_type(&mut self, ty: EntityId, raw_name: &str) {
        if let Some(EntityData::Type(t)) = self.get_mut(ty).map(|e| &mut e.data) {
            t.add_implemented(raw_name);
        }
    }

    pub fn add_import(&mut self, file: EntityId, import: Import) {
        if let Some(EntityData::File(f)) = self.get_mut(file).map(|e| &mut e.data) {
            f.add_import(import);
        }
    }

    pub fn set_initializer(&mut self, var: EntityId, container: EntityId, key: ExpressionKey) {
        if let Some(EntityData::Var(v)) = self.get_mut(var).map(|e| &mut e.data) {
            v.set_initializer(Initializer { container, key });
        }
    }

    /// Nearest file entity at or above `id`.
    pub fn file_of(&self, id: EntityId) -> Option<EntityId> {
        let mut current = Some(id);
        while let Some(candidate) = current {
            let entity = self.get(candidate)?;
            if entity.kind() == EntityKind::File {
                return Some(candidate);
            }
            current = entity.parent();
        }
        None
    }

    /// Append another repository, shifting all of its ids past ours.
    pub fn merge(&mut self, other: EntityRepo) {
        let offset = self.entities.len() as u32;
        for mut entity in other.entities {
            entity.remap(offset);
            self.entities.push(entity);
        }
        self.files.extend(other.files.iter().map(|f| f.offset(offset)));
        self.sealed = false;
    }

    /// Index qualified names and fuse redeclarations. The first declaration
    /// of a type, function, package or alias owns its name until a second
    /// one arrives; from then on a group holding both owns it. Variables are
    /// indexed first-wins and never grouped.
    pub fn seal(&mut self) {
        self.by_qualified_name.clear();
        self.by_raw_name.clear();
        let declared = self.entities.len();
        for index in 0..declared {
            let id = EntityId(index as u32);
            let (kind, group) = match self.get(id) {
                Some(entity) => (entity.kind(), entity.group),
                None => continue,
            };
            let name = self.qualified_name(id);
            match kind {
                EntityKind::File | EntityKind::MultiDeclare => continue,
                EntityKind::Var => {
                    self.by_qualified_name.entry(name).or_insert(id);
                    continue;
                }
                _ => {}
            }
            let owner = match (self.by_qualified_name.get(&name).copied(), group) {
                (None, group) => group.unwrap_or(id),
                (Some(existing), Some(group)) if existing == group => group,
                (Some(existing), _) => {
                    let group = match self.get(existing).map(Entity::kind) {
                        Some(EntityKind::MultiDeclare) => existing,
                        _ => self.add_multi_declare(existing),
                    };
                    self.add_to_group(group, id);
                    debug!("Multiple declarations of {}", name);
                    group
                }
            };
            self.by_qualified_name.insert(name, owner);
        }

        // Imports and calls name functions without a signature; the first
        // overload owns the bare name.
        for entity in &self.entities[..declared] {
            if entity.kind() == EntityKind::Function {
                let owner = entity.group.unwrap_or(entity.id);
                self.by_qualified_name
                    .entry(entity.qualified_name.clone())
                    .or_insert(owner);
            }
        }

        for entity in &self.entities[..declared] {
            if !matches!(
                entity.kind(),
                EntityKind::Type | EntityKind::Package | EntityKind::Alias
            ) {
                continue;
            }
            let owner = entity.group.unwrap_or(entity.id);
            let declarations = self.by_raw_name.entry(entity.raw_name.clone()).or_default();
            if !declarations.contains(&owner) {
                declarations.push(owner);
            }
        }
        self.sealed = true;
    }

    pub fn find_by_qualified_name(&self, name: &str) -> Option<EntityId> {
        self.by_qualified_name.get(name).copied()
    }

    /// Type-like declarations with the given raw name, in declaration order.
    pub fn find_declarations_by_name(&self, name: &str) -> &[EntityId] {
        self.by_raw_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count_by_kind(&self) -> BTreeMap<EntityKind, usize> {
        let mut counts = BTreeMap::new();
        for entity in &self.entities {
            *counts.entry(entity.kind()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_names_follow_parent_chain() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("pkg/widgets.py", "pkg.widgets");
        let class = repo.add_type(file, "Widget");
        let method = repo.add_function(class, "draw");
        let var = repo.add_var(method, "size", Some("int"));

        assert_eq!(repo.entity(class).base_qualified_name(), "pkg.widgets.Widget");
        assert_eq!(repo.qualified_name(method), "pkg.widgets.Widget.draw()");
        assert_eq!(repo.entity(var).base_qualified_name(), "pkg.widgets.Widget.draw.size");
        assert_eq!(repo.entity(file).children(), [class]);
        assert_eq!(repo.file_of(var), Some(file));
    }

    #[test]
    fn test_merge_remaps_ids() {
        let mut first = EntityRepo::new();
        let a = first.add_file("a.py", "a");
        first.add_type(a, "A");

        let mut second = EntityRepo::new();
        let b = second.add_file("b.py", "b");
        let class = second.add_type(b, "B");
        second.add_function(class, "run");

        first.merge(second);
        assert_eq!(first.len(), 5);
        assert_eq!(first.files(), [EntityId(0), EntityId(2)]);

        let merged_class = EntityId(3);
        assert_eq!(first.entity(merged_class).raw_name(), "B");
        assert_eq!(first.entity(merged_class).parent(), Some(EntityId(2)));
        assert_eq!(first.get_functions(merged_class), vec![EntityId(4)]);
    }

    #[test]
    fn test_seal_indexes_and_groups() {
        let mut repo = EntityRepo::new();
        let a = repo.add_file("a.py", "app");
        let first = repo.add_type(a, "Config");
        let b = repo.add_file("b.py", "app");
        let second = repo.add_type(b, "Config");
        let single = repo.add_type(b, "Loader");
        repo.seal();

        assert!(repo.is_sealed());
        assert_eq!(repo.find_by_qualified_name("app.Loader"), Some(single));
        let group = repo.find_by_qualified_name("app.Config").expect("grouped");
        assert_eq!(repo.group_members(group), [first, second]);
        assert_eq!(repo.find_declarations_by_name("Config"), [group]);
        assert_eq!(repo.get_type(first), Some(group));
        assert_eq!(repo.get_type(group), Some(group));
    }

    #[test]
    fn test_seal_indexes_functions_by_bare_name() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("util.py", "util");
        let by_int = repo.add_function(file, "helper");
        repo.add_parameter(by_int, "x", Some("int"));
        let by_str = repo.add_function(file, "helper");
        repo.add_parameter(by_str, "x", Some("str"));
        repo.seal();

        assert_eq!(repo.find_by_qualified_name("util.helper(int)"), Some(by_int));
        assert_eq!(repo.find_by_qualified_name("util.helper(str)"), Some(by_str));
        assert_eq!(repo.find_by_qualified_name("util.helper"), Some(by_int));
    }

    #[test]
    fn test_seal_is_repeatable() {
        let mut repo = EntityRepo::new();
        let a = repo.add_file("a.py", "app");
        repo.add_type(a, "Config");
        let b = repo.add_file("b.py", "app");
        repo.add_type(b, "Config");
        repo.seal();
        let group = repo.find_by_qualified_name("app.Config");
        let entities = repo.len();

        repo.seal();
        assert_eq!(repo.find_by_qualified_name("app.Config"), group);
        assert_eq!(repo.len(), entities);
    }

    #[test]
    fn test_count_by_kind() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let class = repo.add_type(file, "A");
        repo.add_function(class, "f");
        repo.add_function(class, "g");

        let counts = repo.count_by_kind();
        assert_eq!(counts.get(&EntityKind::Function), Some(&2));
        assert_eq!(counts.get(&EntityKind::Var), None);
    }
}
