//! Expressions - typed-on-demand occurrences of names inside a container

use super::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Frontend-chosen key of an expression, unique within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExpressionKey(pub u64);

impl From<usize> for ExpressionKey {
    fn from(node_id: usize) -> Self {
        Self(node_id as u64)
    }
}

/// A name occurrence: a call, a member access, a bare identifier or a
/// literal of a known type.
#[derive(Debug, Default)]
pub struct Expression {
    pub raw_type: Option<String>,
    pub identifier: Option<String>,
    pub is_dot: bool,
    pub is_call: bool,
    pub is_statement: bool,
    /// The member-access or call this expression is the base of
    pub parent: Option<ExpressionKey>,
    ty: OnceLock<EntityId>,
    referred: OnceLock<EntityId>,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_raw_type(mut self, raw_type: impl Into<String>) -> Self {
        self.raw_type = Some(raw_type.into());
        self
    }

    pub fn with_parent(mut self, parent: Option<ExpressionKey>) -> Self {
        self.parent = parent;
        self
    }

    pub fn call(mut self) -> Self {
        self.is_call = true;
        self
    }

    pub fn dot(mut self) -> Self {
        self.is_dot = true;
        self
    }

    pub fn statement(mut self, is_statement: bool) -> Self {
        self.is_statement = is_statement;
        self
    }

    pub fn get_type(&self) -> Option<EntityId> {
        self.ty.get().copied()
    }

    /// Entity the identifier bound to
    pub fn referred_entity(&self) -> Option<EntityId> {
        self.referred.get().copied()
    }

    /// Nothing to resolve: neither a raw type nor an identifier.
    pub fn is_empty(&self) -> bool {
        self.raw_type.is_none() && self.identifier.is_none()
    }

    /// Record the outcome of resolution. A type, once set, never changes.
    pub(crate) fn bind(&self, ty: Option<EntityId>, referred: Option<EntityId>) {
        if let Some(referred) = referred {
            let _ = self.referred.set(referred);
        }
        if let Some(ty) = ty {
            let _ = self.ty.set(ty);
        }
    }

    fn remap(&mut self, offset: u32) {
        if let Some(ty) = self.ty.get_mut() {
            *ty = ty.offset(offset);
        }
        if let Some(referred) = self.referred.get_mut() {
            *referred = referred.offset(offset);
        }
    }
}

/// Insertion-ordered expressions with a keyed index.
#[derive(Debug, Default)]
pub struct ExpressionStore {
    list: Vec<Expression>,
    index: HashMap<ExpressionKey, usize>,
}

impl ExpressionStore {
    /// Append an expression; a repeated key points at the newest one.
    pub fn add(&mut self, key: ExpressionKey, expression: Expression) {
        self.index.insert(key, self.list.len());
        self.list.push(expression);
    }

    pub fn get(&self, key: ExpressionKey) -> Option<&Expression> {
        self.index.get(&key).and_then(|&i| self.list.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expression> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Type of the most recent statement expression.
    pub fn last_statement_type(&self) -> Option<EntityId> {
        self.list
            .iter()
            .rev()
            .find(|e| e.is_statement)
            .and_then(Expression::get_type)
    }

    pub(crate) fn remap(&mut self, offset: u32) {
        for expression in &mut self.list {
            expression.remap(offset);
        }
    }
}
