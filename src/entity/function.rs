//! Functions - signatures, overload-aware naming and return-type inference

use super::{Container, EntityData, EntityId, HasMembers, HasSignature, ResolvedTypes};
use crate::repo::EntityRepo;
use crate::scope::Resolver;
use std::sync::OnceLock;

#[derive(Debug, Default)]
pub struct FunctionEntity {
    container: Container,
    parameters: Vec<EntityId>,
    return_type_names: Vec<String>,
    /// Return types known at parse time
    return_types: Vec<EntityId>,
    throw_type_names: Vec<String>,
    declared: OnceLock<DeclaredSignature>,
    inferred_return: OnceLock<EntityId>,
}

#[derive(Debug, Clone, Default)]
struct DeclaredSignature {
    return_types: ResolvedTypes,
    throw_types: ResolvedTypes,
}

impl FunctionEntity {
    pub fn add_return_type(&mut self, raw_name: impl Into<String>) {
        self.return_type_names.push(raw_name.into());
    }

    /// Record an already resolved return type, once per raw name.
    pub fn add_resolved_return_type(&mut self, ty: EntityId, raw_name: &str) {
        if self.return_type_names.iter().any(|n| n == raw_name) {
            return;
        }
        self.return_type_names.push(raw_name.to_string());
        self.return_types.push(ty);
    }

    pub fn add_throw_type(&mut self, raw_name: impl Into<String>) {
        self.throw_type_names.push(raw_name.into());
    }

    pub fn add_parameter(&mut self, var: EntityId) {
        self.parameters.push(var);
    }

    pub fn return_type_names(&self) -> &[String] {
        &self.return_type_names
    }

    pub fn throw_type_names(&self) -> &[String] {
        &self.throw_type_names
    }

    pub(crate) fn unresolved_names(&self) -> impl Iterator<Item = &str> {
        self.declared.get().into_iter().flat_map(|d| {
            d.return_types
                .unresolved
                .iter()
                .chain(&d.throw_types.unresolved)
                .map(String::as_str)
        })
    }

    pub(crate) fn remap(&mut self, offset: u32) {
        self.container.remap(offset);
        for id in self.parameters.iter_mut().chain(self.return_types.iter_mut()) {
            *id = id.offset(offset);
        }
        if let Some(declared) = self.declared.get_mut() {
            declared.return_types.remap(offset);
            declared.throw_types.remap(offset);
        }
        if let Some(inferred) = self.inferred_return.get_mut() {
            *inferred = inferred.offset(offset);
        }
    }
}

impl HasMembers for FunctionEntity {
    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

impl HasSignature for FunctionEntity {
    fn parameters(&self) -> &[EntityId] {
        &self.parameters
    }

    fn return_types(&self) -> &[EntityId] {
        match self.declared.get() {
            Some(declared) if !declared.return_types.types.is_empty() => {
                &declared.return_types.types
            }
            Some(_) => self
                .inferred_return
                .get()
                .map(std::slice::from_ref)
                .unwrap_or(&[]),
            None => &self.return_types,
        }
    }

    fn throw_types(&self) -> &[EntityId] {
        self.declared
            .get()
            .map(|d| d.throw_types.types.as_slice())
            .unwrap_or(&[])
    }
}

impl EntityRepo {
    /// Parameters, declared return and throw types, the body, then the
    /// trailing statement when no return type is known.
    pub(crate) fn infer_function(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(function) = self.get(id).and_then(|e| e.as_function()) else {
            return;
        };
        for &parameter in &function.parameters {
            self.infer_local_level_entities(parameter, resolver);
        }
        self.infer_signature(id, resolver);
        self.infer_container(id, resolver);

        let has_declared_return = function
            .declared
            .get()
            .is_some_and(|d| !d.return_types.types.is_empty());
        if !has_declared_return {
            // A lazy resolver has not typed the body yet.
            if !resolver.is_eager_expression_resolve() {
                self.resolve_expressions(id, resolver);
            }
            if let Some(ty) = self.last_expression_type(id) {
                let _ = function.inferred_return.set(ty);
            }
        }
    }

    /// Declared return and throw types. Names are re-resolved only when
    /// some of them were not already known at parse time.
    pub(crate) fn infer_signature(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(function) = self.get(id).and_then(|e| e.as_function()) else {
            return;
        };
        if function.declared.get().is_some() {
            return;
        }
        let return_types = if function.return_types.len() < function.return_type_names.len() {
            self.identifiers_to_types(id, &function.return_type_names, resolver)
        } else {
            ResolvedTypes {
                types: function.return_types.clone(),
                unresolved: Vec::new(),
            }
        };
        let declared = DeclaredSignature {
            return_types,
            throw_types: self.identifiers_to_types(id, &function.throw_type_names, resolver),
        };
        let _ = function.declared.set(declared);
    }

    /// Base qualified name followed by the raw parameter types.
    pub fn qualified_name(&self, id: EntityId) -> String {
        let Some(entity) = self.get(id) else { return String::new() };
        let EntityData::Function(function) = &entity.data else {
            return entity.qualified_name.clone();
        };
        let parameter_types: Vec<&str> = function
            .parameters
            .iter()
            .map(|&p| {
                self.get(p)
                    .and_then(|e| e.as_var())
                    .and_then(|v| v.raw_type())
                    .unwrap_or("")
            })
            .collect();
        format!("{}({})", entity.qualified_name, parameter_types.join(","))
    }

    /// Qualified name prefixed by the declaring file.
    pub fn display_name(&self, id: EntityId) -> String {
        let qualified = self.qualified_name(id);
        match self.file_of(id).and_then(|f| self.get(f)) {
            Some(file) if self.get(id).is_some_and(|e| e.as_function().is_some()) => {
                format!("{}({})", file.raw_name(), qualified)
            }
            _ => qualified,
        }
    }

    pub fn parameters(&self, id: EntityId) -> &[EntityId] {
        let id = self.forward(id);
        self.get(id)
            .and_then(|e| e.signature())
            .map(HasSignature::parameters)
            .unwrap_or(&[])
    }

    pub fn return_types(&self, id: EntityId) -> &[EntityId] {
        let id = self.forward(id);
        self.get(id)
            .and_then(|e| e.signature())
            .map(HasSignature::return_types)
            .unwrap_or(&[])
    }

    pub fn throw_types(&self, id: EntityId) -> &[EntityId] {
        let id = self.forward(id);
        self.get(id)
            .and_then(|e| e.signature())
            .map(HasSignature::throw_types)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Expression, ExpressionKey};
    use crate::scope::{BuiltInTypes, Inferer};

    #[test]
    fn test_overloads_have_distinct_qualified_names() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("calc.py", "calc");
        let class = repo.add_type(file, "Calc");
        let by_int = repo.add_function(class, "f");
        repo.add_parameter(by_int, "x", Some("int"));
        let by_str = repo.add_function(class, "f");
        repo.add_parameter(by_str, "x", Some("str"));

        assert_eq!(repo.qualified_name(by_int), "calc.Calc.f(int)");
        assert_eq!(repo.qualified_name(by_str), "calc.Calc.f(str)");
        assert_eq!(repo.display_name(by_int), "calc.py(calc.Calc.f(int))");
        assert_eq!(repo.lookup_function_locally(class, "f"), Some(by_int));
        assert_eq!(repo.get_functions(class), vec![by_int, by_str]);
    }

    #[test]
    fn test_signature_queries_forward_through_alias() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let f = repo.add_function(file, "f");
        let x = repo.add_parameter(f, "x", Some("int"));
        repo.add_return_type(f, Some("str"));
        repo.add_throw_type(f, "ValueError");
        let alias = repo.add_alias(file, "g", "m.f");
        repo.seal();
        let mut built_ins = BuiltInTypes::python();
        built_ins.extend(&BuiltInTypes::new(["ValueError"]));
        let inferer = Inferer::new(&mut repo, &built_ins, true);
        inferer.resolve_all_bindings(&repo);

        assert_eq!(repo.alias_target(alias), Some(f));
        assert_eq!(repo.parameters(alias), [x]);
        assert_eq!(repo.return_types(alias), repo.return_types(f));
        assert_eq!(repo.return_types(alias), inferer.built_in_type("str").as_slice());
        assert_eq!(repo.throw_types(alias), repo.throw_types(f));
        assert_eq!(repo.throw_types(alias).len(), 1);
    }

    #[test]
    fn test_lazy_resolver_infers_return_from_trailing_statement() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let widget = repo.add_type(file, "Widget");
        let make = repo.add_function(file, "make");
        repo.add_expression(
            make,
            ExpressionKey(1),
            Expression::new().with_identifier("Widget").call().statement(true),
        );
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), false);
        inferer.resolve_all_bindings(&repo);

        assert_eq!(repo.get_type(make), Some(widget));
    }

    #[test]
    fn test_untyped_parameter_renders_empty() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let function = repo.add_function(file, "g");
        repo.add_parameter(function, "a", None);
        repo.add_parameter(function, "b", Some("int"));

        assert_eq!(repo.qualified_name(function), "m.g(,int)");
    }

    #[test]
    fn test_resolved_return_type_deduplicated_by_name() {
        let mut function = FunctionEntity::default();
        function.add_resolved_return_type(EntityId(4), "Widget");
        function.add_resolved_return_type(EntityId(5), "Widget");

        assert_eq!(function.return_type_names(), ["Widget"]);
        assert_eq!(function.return_types(), [EntityId(4)]);
    }

    #[test]
    fn test_return_type_inferred_from_trailing_statement() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let widget = repo.add_type(file, "Widget");
        let make = repo.add_function(file, "make");
        repo.add_expression(
            make,
            ExpressionKey(1),
            Expression::new().with_raw_type("str").statement(true),
        );
        repo.add_expression(
            make,
            ExpressionKey(2),
            Expression::new().with_identifier("Widget").call().statement(true),
        );
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);
        inferer.resolve_all_bindings(&repo);

        assert_eq!(repo.get_type(make), Some(widget));
        assert_eq!(repo.return_types(make), [widget]);
    }

    #[test]
    fn test_declared_return_type_wins() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        repo.add_type(file, "Widget");
        let make = repo.add_function(file, "make");
        repo.add_return_type(make, Some("int"));
        repo.add_expression(
            make,
            ExpressionKey(1),
            Expression::new().with_identifier("Widget").call().statement(true),
        );
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);
        inferer.resolve_all_bindings(&repo);

        assert_eq!(repo.get_type(make), inferer.built_in_type("int"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let make = repo.add_function(file, "make");
        repo.add_return_type(make, Some("Missing"));
        repo.add_expression(
            make,
            ExpressionKey(1),
            Expression::new().with_raw_type("int").statement(true),
        );
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);

        let first = inferer.resolve_all_bindings(&repo);
        let first_type = repo.get_type(make);
        let second = inferer.resolve_all_bindings(&repo);

        assert_eq!(first, second);
        assert_eq!(repo.get_type(make), first_type);
        assert_eq!(first_type, inferer.built_in_type("int"));
        assert!(first.contains("Missing"));
    }
}
