//! Variables - fields, parameters, locals and constants

use super::{EntityId, ExpressionKey};
use crate::repo::EntityRepo;
use crate::scope::Resolver;
use std::sync::OnceLock;

/// Expression whose type a variable takes when it declares none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Initializer {
    pub container: EntityId,
    pub key: ExpressionKey,
}

#[derive(Debug, Default)]
pub struct VarEntity {
    raw_type: Option<String>,
    initializer: Option<Initializer>,
    resolved: OnceLock<Option<EntityId>>,
}

impl VarEntity {
    pub fn new(raw_type: Option<String>) -> Self {
        Self {
            raw_type,
            ..Self::default()
        }
    }

    pub fn raw_type(&self) -> Option<&str> {
        self.raw_type.as_deref()
    }

    pub fn initializer(&self) -> Option<Initializer> {
        self.initializer
    }

    pub(crate) fn set_initializer(&mut self, initializer: Initializer) {
        self.initializer = Some(initializer);
    }

    pub(crate) fn unresolved_name(&self) -> Option<&str> {
        match self.resolved.get() {
            Some(None) => self.raw_type.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn remap(&mut self, offset: u32) {
        if let Some(initializer) = &mut self.initializer {
            initializer.container = initializer.container.offset(offset);
        }
        if let Some(Some(ty)) = self.resolved.get_mut() {
            *ty = ty.offset(offset);
        }
    }
}

impl EntityRepo {
    pub(crate) fn infer_var(&self, id: EntityId, resolver: &dyn Resolver) {
        let Some(var) = self.get(id).and_then(|e| e.as_var()) else {
            return;
        };
        if var.resolved.get().is_some() {
            return;
        }
        let Some(raw_type) = var.raw_type.as_deref() else {
            return;
        };
        let ty = resolver.infer_type_from_name(self, id, raw_type).or_else(|| {
            self.is_generic_type_parameter(id, raw_type)
                .then(|| resolver.generic_parameter_type())
        });
        let _ = var.resolved.set(ty);
    }

    /// Declared type when it resolved, else the initializer's type.
    pub(crate) fn var_type(&self, var: &VarEntity) -> Option<EntityId> {
        var.resolved.get().copied().flatten().or_else(|| {
            let initializer = var.initializer?;
            self.get(initializer.container)?
                .container()?
                .expressions()
                .get(initializer.key)?
                .get_type()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::{Expression, ExpressionKey};
    use crate::repo::EntityRepo;
    use crate::scope::{BuiltInTypes, Inferer};

    #[test]
    fn test_initializer_types_undeclared_var() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let widget = repo.add_type(file, "Widget");
        let main = repo.add_function(file, "main");
        repo.add_expression(main, ExpressionKey(1), Expression::new().with_identifier("Widget").call());
        let w = repo.add_var(main, "w", None);
        repo.set_initializer(w, main, ExpressionKey(1));
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);
        inferer.resolve_all_bindings(&repo);

        assert_eq!(repo.get_type(w), Some(widget));
    }

    #[test]
    fn test_unknown_declared_type_reported() {
        let mut repo = EntityRepo::new();
        let file = repo.add_file("m.py", "m");
        let v = repo.add_var(file, "v", Some("Gadget"));
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);
        let unresolved = inferer.resolve_all_bindings(&repo);

        assert_eq!(repo.get_type(v), None);
        assert!(unresolved.contains("Gadget"));
    }
}
