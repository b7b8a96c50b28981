//! Entity model - the symbol table every frontend populates
//!
//! Entities live in an arena ([`EntityRepo`]) and refer to each other by
//! [`EntityId`]. The closed [`EntityData`] variant set replaces runtime type
//! tests: a query that needs a capability (members, signature, inheritance)
//! matches on the variant and degrades to an empty result when the entity
//! lacks it.
//!
//! Every resolved field is a write-once cell owned by its entity, so
//! resolution runs over a shared `&EntityRepo`.

pub mod alias;
pub mod container;
pub mod decorated;
pub mod expression;
pub mod file;
pub mod function;
pub mod multi_declare;
pub mod types;
pub mod var;

pub use alias::AliasEntity;
pub use container::Container;
pub use decorated::Decorations;
pub use expression::{Expression, ExpressionKey, ExpressionStore};
pub use file::{FileEntity, Import, ImportKind, PackageEntity};
pub use function::FunctionEntity;
pub use multi_declare::MultiDeclareEntities;
pub use types::TypeEntity;
pub use var::{Initializer, VarEntity};

use crate::repo::EntityRepo;
use crate::scope::Resolver;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Identity of an entity, assigned by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn offset(self, by: u32) -> Self {
        Self(self.0 + by)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entity kinds, as stored and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A parsed source file, root of its scope tree
    File,
    /// A package declared by a file (Go)
    Package,
    /// Class, struct, interface, defined type
    Type,
    /// Function or method
    Function,
    /// Variable, parameter, field, constant
    Var,
    /// Type alias
    Alias,
    /// Group fusing several declarations of one qualified name
    MultiDeclare,
}

impl EntityKind {
    /// Get the string representation of the entity kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::File => "file",
            EntityKind::Package => "package",
            EntityKind::Type => "type",
            EntityKind::Function => "function",
            EntityKind::Var => "var",
            EntityKind::Alias => "alias",
            EntityKind::MultiDeclare => "multi",
        }
    }

    /// Get all entity kinds
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::File,
            EntityKind::Package,
            EntityKind::Type,
            EntityKind::Function,
            EntityKind::Var,
            EntityKind::Alias,
            EntityKind::MultiDeclare,
        ]
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" | "module" => Ok(EntityKind::File),
            "package" | "pkg" => Ok(EntityKind::Package),
            "type" | "class" | "struct" | "interface" => Ok(EntityKind::Type),
            "function" | "method" | "func" | "def" => Ok(EntityKind::Function),
            "var" | "variable" | "field" | "param" | "const" => Ok(EntityKind::Var),
            "alias" => Ok(EntityKind::Alias),
            "multi" | "group" | "multideclare" => Ok(EntityKind::MultiDeclare),
            _ => Err(Error::InvalidKind(s.to_string())),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific payload of an entity.
#[derive(Debug)]
pub enum EntityData {
    File(FileEntity),
    Package(PackageEntity),
    Type(TypeEntity),
    Function(FunctionEntity),
    Var(VarEntity),
    Alias(AliasEntity),
    MultiDeclare(MultiDeclareEntities),
}

/// Names a resolution pass attempted, split into what bound and what did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTypes {
    pub types: Vec<EntityId>,
    pub unresolved: Vec<String>,
}

impl ResolvedTypes {
    pub(crate) fn remap(&mut self, offset: u32) {
        for id in &mut self.types {
            *id = id.offset(offset);
        }
    }
}

/// Entities that own member variables, member functions and expressions.
pub trait HasMembers {
    fn container(&self) -> &Container;
    fn container_mut(&mut self) -> &mut Container;
}

/// Entities with parameters, return types and thrown types.
pub trait HasSignature {
    fn parameters(&self) -> &[EntityId];
    fn return_types(&self) -> &[EntityId];
    fn throw_types(&self) -> &[EntityId];
}

/// Entities with supertypes.
pub trait HasInheritance {
    fn inherited_types(&self) -> &[EntityId];
    fn implemented_types(&self) -> &[EntityId];
}

/// A node of the scope tree.
#[derive(Debug)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) raw_name: String,
    pub(crate) qualified_name: String,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) group: Option<EntityId>,
    pub(crate) data: EntityData,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Qualified name derived from the parent chain, without a signature.
    pub fn base_qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Multi-declare group this entity was fused into
    pub fn group(&self) -> Option<EntityId> {
        self.group
    }

    pub fn data(&self) -> &EntityData {
        &self.data
    }

    pub fn kind(&self) -> EntityKind {
        match &self.data {
            EntityData::File(_) => EntityKind::File,
            EntityData::Package(_) => EntityKind::Package,
            EntityData::Type(_) => EntityKind::Type,
            EntityData::Function(_) => EntityKind::Function,
            EntityData::Var(_) => EntityKind::Var,
            EntityData::Alias(_) => EntityKind::Alias,
            EntityData::MultiDeclare(_) => EntityKind::MultiDeclare,
        }
    }

    pub fn members(&self) -> Option<&dyn HasMembers> {
        match &self.data {
            EntityData::File(f) => Some(f),
            EntityData::Package(p) => Some(p),
            EntityData::Type(t) => Some(t),
            EntityData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn container(&self) -> Option<&Container> {
        self.members().map(HasMembers::container)
    }

    pub(crate) fn container_mut(&mut self) -> Option<&mut Container> {
        match &mut self.data {
            EntityData::File(f) => Some(f.container_mut()),
            EntityData::Package(p) => Some(p.container_mut()),
            EntityData::Type(t) => Some(t.container_mut()),
            EntityData::Function(f) => Some(f.container_mut()),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&dyn HasSignature> {
        match &self.data {
            EntityData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn inheritance(&self) -> Option<&dyn HasInheritance> {
        match &self.data {
            EntityData::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn decorations(&self) -> Option<&Decorations> {
        self.container().map(Container::decorations)
    }

    pub fn as_file(&self) -> Option<&FileEntity> {
        match &self.data {
            EntityData::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeEntity> {
        match &self.data {
            EntityData::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionEntity> {
        match &self.data {
            EntityData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&VarEntity> {
        match &self.data {
            EntityData::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&AliasEntity> {
        match &self.data {
            EntityData::Alias(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&MultiDeclareEntities> {
        match &self.data {
            EntityData::MultiDeclare(g) => Some(g),
            _ => None,
        }
    }

    /// Scope-bearing: owns members, or fuses entities that do.
    pub fn is_container(&self) -> bool {
        self.members().is_some() || matches!(self.data, EntityData::MultiDeclare(_))
    }

    /// Can stand where a type name is expected.
    pub fn is_type_like(&self) -> bool {
        matches!(
            self.data,
            EntityData::Type(_)
                | EntityData::Alias(_)
                | EntityData::MultiDeclare(_)
                | EntityData::Package(_)
        )
    }

    /// Shift every handle this entity holds, used when merging repositories.
    pub(crate) fn remap(&mut self, offset: u32) {
        self.id = self.id.offset(offset);
        self.parent = self.parent.map(|p| p.offset(offset));
        self.group = self.group.map(|g| g.offset(offset));
        for child in &mut self.children {
            *child = child.offset(offset);
        }
        match &mut self.data {
            EntityData::File(f) => f.container_mut().remap(offset),
            EntityData::Package(p) => p.container_mut().remap(offset),
            EntityData::Type(t) => t.remap(offset),
            EntityData::Function(f) => f.remap(offset),
            EntityData::Var(v) => v.remap(offset),
            EntityData::Alias(a) => a.remap(offset),
            EntityData::MultiDeclare(g) => g.remap(offset),
        }
    }

    /// Names this entity tried and failed to bind.
    pub(crate) fn unresolved_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if let Some(container) = self.container() {
            names.extend(container.unresolved_names());
        }
        match &self.data {
            EntityData::Type(t) => names.extend(t.unresolved_names()),
            EntityData::Function(f) => names.extend(f.unresolved_names()),
            EntityData::Var(v) => names.extend(v.unresolved_name()),
            EntityData::Alias(a) => names.extend(a.unresolved_name()),
            _ => {}
        }
        names
    }
}

impl EntityRepo {
    /// Resolve the entity's own bindings: the per-kind pass of the second
    /// phase. Idempotent.
    pub fn infer_local_level_entities(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(entity) = self.get(id) else { return };
        match &entity.data {
            EntityData::File(_) | EntityData::Package(_) => self.infer_container(id, resolver),
            EntityData::Type(_) => self.infer_type(id, resolver),
            EntityData::Function(_) => self.infer_function(id, resolver),
            EntityData::Var(_) => self.infer_var(id, resolver),
            EntityData::Alias(_) => self.infer_alias(id, resolver),
            EntityData::MultiDeclare(_) => self.infer_group(id, resolver),
        }
    }

    /// Resolve what an entity declares without looking into bodies:
    /// alias targets, supertypes, mixins, decorations, declared variable
    /// types and signatures.
    pub fn infer_declaration(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(entity) = self.get(id) else { return };
        match &entity.data {
            EntityData::Alias(_) => self.infer_alias(id, resolver),
            EntityData::Var(_) => self.infer_var(id, resolver),
            EntityData::Type(_) => self.infer_supertypes(id, resolver),
            EntityData::Function(_) => self.infer_signature(id, resolver),
            EntityData::File(_) | EntityData::Package(_) | EntityData::MultiDeclare(_) => {}
        }
        if entity.is_container() {
            self.infer_decorations(id, resolver);
            self.infer_mixins(id, resolver);
        }
    }

    /// Resolve an entity and its whole subtree.
    pub fn infer_entities(&self, id: EntityId, resolver: &dyn Resolver) {
        self.infer_local_level_entities(id, resolver);
        let Some(entity) = self.get(id) else { return };
        for &child in entity.children() {
            self.infer_entities(child, resolver);
        }
    }

    /// The resolved type of an entity, if any. Never triggers resolution.
    pub fn get_type(&self, id: EntityId) -> Option<EntityId> {
        let entity = self.get(id)?;
        match &entity.data {
            EntityData::Type(_) => Some(entity.group.unwrap_or(id)),
            EntityData::Var(var) => self.var_type(var),
            EntityData::Function(function) => function.return_types().first().copied(),
            EntityData::Alias(alias) => alias.target().and_then(|t| self.get_type(t)),
            EntityData::MultiDeclare(group) => {
                group.members().iter().find_map(|&m| self.get_type(m))
            }
            EntityData::File(_) | EntityData::Package(_) => None,
        }
    }

    /// Every name some entity failed to bind, sorted and deduplicated.
    pub fn unresolved_names(&self) -> BTreeSet<String> {
        self.iter()
            .flat_map(Entity::unresolved_names)
            .map(str::to_string)
            .collect()
    }
}
