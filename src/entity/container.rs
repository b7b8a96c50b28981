//! Containers - scope-bearing entities and their lookup engine
//!
//! Files, packages, types and functions own member variables, member
//! functions, an ordered and keyed expression store and a list of mixin
//! names. Lookups walk bottom-up from a container through its nearest
//! container ancestors; groups and aliases are looked through.

use super::{
    Decorations, EntityData, EntityId, Expression, ExpressionKey, ExpressionStore, HasInheritance,
    HasMembers, HasSignature, ResolvedTypes,
};
use crate::repo::EntityRepo;
use crate::scope::Resolver;
use std::collections::HashSet;
use std::sync::OnceLock;

#[derive(Debug, Default)]
pub struct Container {
    decorations: Decorations,
    vars: Vec<EntityId>,
    functions: Vec<EntityId>,
    expressions: ExpressionStore,
    mixin_names: Vec<String>,
    resolved_mixins: OnceLock<ResolvedTypes>,
}

impl Container {
    pub fn add_var(&mut self, var: EntityId) {
        self.vars.push(var);
    }

    pub fn add_function(&mut self, function: EntityId) {
        self.functions.push(function);
    }

    pub fn add_expression(&mut self, key: ExpressionKey, expression: Expression) {
        self.expressions.add(key, expression);
    }

    pub fn add_mixin(&mut self, name: impl Into<String>) {
        self.mixin_names.push(name.into());
    }

    pub fn decorations(&self) -> &Decorations {
        &self.decorations
    }

    pub fn decorations_mut(&mut self) -> &mut Decorations {
        &mut self.decorations
    }

    pub fn vars(&self) -> &[EntityId] {
        &self.vars
    }

    pub fn functions(&self) -> &[EntityId] {
        &self.functions
    }

    pub fn expressions(&self) -> &ExpressionStore {
        &self.expressions
    }

    pub fn mixin_names(&self) -> &[String] {
        &self.mixin_names
    }

    pub fn resolved_mixins(&self) -> &[EntityId] {
        self.resolved_mixins
            .get()
            .map(|r| r.types.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn unresolved_names(&self) -> impl Iterator<Item = &str> {
        self.decorations.unresolved_names().chain(
            self.resolved_mixins
                .get()
                .into_iter()
                .flat_map(|r| r.unresolved.iter().map(String::as_str)),
        )
    }

    pub(crate) fn remap(&mut self, offset: u32) {
        self.decorations.remap(offset);
        for id in self.vars.iter_mut().chain(self.functions.iter_mut()) {
            *id = id.offset(offset);
        }
        self.expressions.remap(offset);
        if let Some(mixins) = self.resolved_mixins.get_mut() {
            mixins.remap(offset);
        }
    }
}

impl EntityRepo {
    /// Resolve decorations, members, mixins and (when eager) expressions.
    pub(crate) fn infer_container(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(container) = self.get(id).and_then(|e| e.container()) else {
            return;
        };
        self.infer_decorations(id, resolver);
        for &var in container.vars() {
            self.infer_local_level_entities(var, resolver);
        }
        for &function in container.functions() {
            self.infer_local_level_entities(function, resolver);
        }
        self.infer_mixins(id, resolver);
        if resolver.is_eager_expression_resolve() {
            self.resolve_expressions(id, resolver);
        }
    }

    pub(crate) fn infer_mixins(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(container) = self.get(id).and_then(|e| e.container()) else {
            return;
        };
        if container.resolved_mixins.get().is_none() {
            let mixins = self.identifiers_to_containers(id, &container.mixin_names, resolver);
            let _ = container.resolved_mixins.set(mixins);
        }
    }

    /// Names that bind to nothing are recorded; names that bind to a
    /// non-container are dropped.
    fn identifiers_to_containers(
        &self,
        from: EntityId,
        names: &[String],
        resolver: &dyn Resolver,
    ) -> ResolvedTypes {
        let mut resolved = ResolvedTypes::default();
        for name in names {
            match resolver.resolve_name(self, from, name, true) {
                Some(found) => {
                    let found = self.forward(found);
                    if self.get(found).is_some_and(|e| e.is_container()) {
                        resolved.types.push(found);
                    }
                }
                None => resolved.unresolved.push(name.clone()),
            }
        }
        resolved
    }

    pub fn get_vars(&self, id: EntityId) -> Vec<EntityId> {
        let Some(entity) = self.get(id) else { return Vec::new() };
        match &entity.data {
            EntityData::Alias(alias) => alias.target().map(|t| self.get_vars(t)).unwrap_or_default(),
            EntityData::MultiDeclare(group) => {
                group.members().iter().flat_map(|&m| self.get_vars(m)).collect()
            }
            _ => entity.container().map(|c| c.vars().to_vec()).unwrap_or_default(),
        }
    }

    pub fn get_functions(&self, id: EntityId) -> Vec<EntityId> {
        let Some(entity) = self.get(id) else { return Vec::new() };
        match &entity.data {
            EntityData::Alias(alias) => {
                alias.target().map(|t| self.get_functions(t)).unwrap_or_default()
            }
            EntityData::MultiDeclare(group) => {
                group.members().iter().flat_map(|&m| self.get_functions(m)).collect()
            }
            _ => entity.container().map(|c| c.functions().to_vec()).unwrap_or_default(),
        }
    }

    pub fn resolved_mixins(&self, id: EntityId) -> &[EntityId] {
        let id = self.forward(id);
        self.get(id)
            .and_then(|e| e.container())
            .map(Container::resolved_mixins)
            .unwrap_or(&[])
    }

    /// Nearest container strictly above `id`.
    pub fn nearest_container(&self, id: EntityId) -> Option<EntityId> {
        let mut current = self.get(id)?.parent();
        while let Some(ancestor) = current {
            let entity = self.get(ancestor)?;
            if entity.is_container() {
                return Some(ancestor);
            }
            current = entity.parent();
        }
        None
    }

    /// Member function declared by the entity itself. Types also search
    /// their supertypes and mixins.
    pub fn lookup_function_locally(&self, id: EntityId, name: &str) -> Option<EntityId> {
        self.lookup_function_in_hierarchy(id, name, &mut HashSet::new())
    }

    pub(crate) fn lookup_function_in_hierarchy(
        &self,
        id: EntityId,
        name: &str,
        visited: &mut HashSet<EntityId>,
    ) -> Option<EntityId> {
        if !visited.insert(id) {
            return None;
        }
        let entity = self.get(id)?;
        match &entity.data {
            EntityData::Alias(alias) => {
                self.lookup_function_in_hierarchy(alias.target()?, name, visited)
            }
            EntityData::MultiDeclare(group) => group
                .members()
                .iter()
                .find_map(|&m| self.lookup_function_in_hierarchy(m, name, visited)),
            EntityData::Type(ty) => self.named_in(ty.container().functions(), name).or_else(|| {
                let supertypes = ty
                    .inherited_types()
                    .iter()
                    .chain(ty.implemented_types())
                    .chain(ty.container().resolved_mixins());
                for &supertype in supertypes {
                    if let Some(found) = self.lookup_function_in_hierarchy(supertype, name, visited) {
                        return Some(found);
                    }
                }
                None
            }),
            _ => self.named_in(entity.container()?.functions(), name),
        }
    }

    /// Member variable declared by the entity itself; a function checks its
    /// parameters first.
    pub fn lookup_var_locally(&self, id: EntityId, name: &str) -> Option<EntityId> {
        let entity = self.get(id)?;
        match &entity.data {
            EntityData::Alias(alias) => self.lookup_var_locally(alias.target()?, name),
            EntityData::MultiDeclare(group) => group
                .members()
                .iter()
                .find_map(|&m| self.lookup_var_locally(m, name)),
            EntityData::Function(function) => self
                .named_in(function.parameters(), name)
                .or_else(|| self.named_in(function.container().vars(), name)),
            _ => self.named_in(entity.container()?.vars(), name),
        }
    }

    /// Function visible from the entity: each group member in order when
    /// grouped, otherwise the entity itself, searched bottom-up.
    pub fn lookup_function_in_visible_scope(&self, id: EntityId, name: &str) -> Option<EntityId> {
        let entity = self.get(id)?;
        if let Some(alias) = entity.as_alias() {
            return self.lookup_function_in_visible_scope(alias.target()?, name);
        }
        if let Some(group) = entity.group().and_then(|g| self.get(g)).and_then(|g| g.as_group()) {
            return group
                .members()
                .iter()
                .find_map(|&m| self.lookup_function_bottom_up(m, name));
        }
        self.lookup_function_bottom_up(id, name)
    }

    /// Enclosing scopes that were fused are searched as their group.
    fn lookup_function_bottom_up(&self, from: EntityId, name: &str) -> Option<EntityId> {
        if let Some(found) = self.lookup_function_locally(from, name) {
            return Some(found);
        }
        let mut current = self.nearest_container(from);
        while let Some(scope) = current {
            let fused = self.get(scope).and_then(|e| e.group()).unwrap_or(scope);
            if let Some(found) = self.lookup_function_locally(fused, name) {
                return Some(found);
            }
            current = self.nearest_container(scope);
        }
        None
    }

    /// Variable visible from the entity, searched bottom-up without group
    /// awareness.
    pub fn lookup_var_in_visible_scope(&self, id: EntityId, name: &str) -> Option<EntityId> {
        if let Some(alias) = self.get(id)?.as_alias() {
            return self.lookup_var_in_visible_scope(alias.target()?, name);
        }
        let mut current = Some(id);
        while let Some(scope) = current {
            if let Some(found) = self.lookup_var_locally(scope, name) {
                return Some(found);
            }
            current = self.nearest_container(scope);
        }
        None
    }

    fn named_in(&self, ids: &[EntityId], name: &str) -> Option<EntityId> {
        ids.iter()
            .copied()
            .find(|&m| self.get(m).is_some_and(|e| e.raw_name() == name))
    }

    /// Type every untyped, non-dot expression of the container, chaining
    /// the result into dot expressions built on it.
    pub fn resolve_expressions(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(container) = self.get(id).and_then(|e| e.container()) else {
            return;
        };
        let store = container.expressions();
        for expression in store.iter() {
            if expression.get_type().is_some() || expression.is_dot || expression.is_empty() {
                continue;
            }
            if let Some(raw_type) = &expression.raw_type {
                if let Some(ty) = resolver.infer_type_from_name(self, id, raw_type) {
                    self.bind_expression(store, expression, Some(ty), None);
                    continue;
                }
            }
            let Some(identifier) = expression.identifier.as_deref() else { continue };
            if let Some(entity) = resolver.resolve_name(self, id, identifier, true) {
                self.bind_expression(store, expression, self.get_type(entity), Some(entity));
                continue;
            }
            let found = if expression.is_call {
                self.lookup_function_in_visible_scope(id, identifier)
            } else {
                self.lookup_var_in_visible_scope(id, identifier)
            };
            if let Some(entity) = found {
                self.bind_expression(store, expression, self.get_type(entity), Some(entity));
            }
        }
    }

    fn bind_expression(
        &self,
        store: &ExpressionStore,
        expression: &Expression,
        ty: Option<EntityId>,
        referred: Option<EntityId>,
    ) {
        expression.bind(ty, referred);
        let mut current = expression;
        while let (Some(ty), Some(parent_key)) = (current.get_type(), current.parent) {
            let Some(parent) = store.get(parent_key) else { break };
            if !parent.is_dot || parent.get_type().is_some() {
                break;
            }
            let Some(member_name) = parent.identifier.as_deref() else { break };
            let member = if parent.is_call {
                self.lookup_function_locally(ty, member_name)
            } else {
                self.lookup_var_locally(ty, member_name)
            };
            let Some(member) = member else { break };
            parent.bind(self.get_type(member), Some(member));
            current = parent;
        }
    }

    /// Type of the container's most recent statement expression.
    pub fn last_expression_type(&self, id: EntityId) -> Option<EntityId> {
        self.get(id)?.container()?.expressions().last_statement_type()
    }
}
