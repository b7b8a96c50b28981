//! Python language processor
//!
//! Maps a tree-sitter-python syntax tree onto entities. The module becomes a
//! file entity whose namespace is its dotted module path, `class` becomes a
//! type, `def` a function and assignments declare variables. Calls,
//! attribute accesses, names and literals are recorded as expressions of the
//! innermost enclosing container.

use super::framework::{LangProcessor, ParsedFile};
use crate::entity::{EntityId, Expression, ExpressionKey, Import};
use crate::repo::EntityRepo;
use crate::scope::{BuiltInTypes, ImportLookup, PythonImports};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::debug;
use tree_sitter::{Node, Parser};

/// Python language processor
pub struct PythonProcessor;

impl PythonProcessor {
    /// Create a new Python processor
    pub fn new() -> Self {
        Self
    }
}

impl Default for PythonProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl LangProcessor for PythonProcessor {
    fn supported_language(&self) -> &str {
        "python"
    }

    fn file_suffixes(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn built_in_types(&self) -> BuiltInTypes {
        BuiltInTypes::python()
    }

    fn import_lookup(&self) -> Arc<dyn ImportLookup> {
        Arc::new(PythonImports)
    }

    fn parse_file(&self, path: &str, content: &str) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| Error::Parse(format!("Failed to load Python grammar: {}", e)))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| Error::Parse(format!("Failed to parse {}", path)))?;

        let mut entities = EntityRepo::new();
        let namespace = module_namespace(path);
        let file = entities.add_file(path, namespace.clone());
        let mut walker = PythonWalker {
            source: content.as_bytes(),
            repo: &mut entities,
            file,
            namespace,
            is_package_init: path.ends_with("__init__.py") || path.ends_with("__init__.pyi"),
        };
        walker.visit_block(tree.root_node(), file, None);
        debug!("Parsed {} into {} entities", path, entities.len());

        Ok(ParsedFile {
            path: path.to_string(),
            entities,
        })
    }
}

/// Dotted module path of a file: `pkg/widgets.py` is `pkg.widgets` and a
/// package's `__init__.py` is the package itself.
pub fn module_namespace(path: &str) -> String {
    let stem = path
        .strip_suffix(".pyi")
        .or_else(|| path.strip_suffix(".py"))
        .unwrap_or(path);
    let mut segments: Vec<&str> = stem
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.last() == Some(&"__init__") {
        segments.pop();
    }
    segments.join(".")
}

/// Reduce an annotation to the name of the type it denotes: subscripts are
/// dropped, forward references unquoted and `X | None` taken as `X`.
fn normalize_type(text: &str) -> String {
    let text = text.trim().trim_matches(|c| c == '"' || c == '\'');
    let text = text
        .split('|')
        .map(str::trim)
        .find(|part| !part.is_empty() && *part != "None")
        .unwrap_or(text);
    let text = match text.find('[') {
        Some(index) => &text[..index],
        None => text,
    };
    text.trim().to_string()
}

fn is_statement_kind(kind: &str) -> bool {
    kind.ends_with("_statement")
        || kind.ends_with("_clause")
        || kind.ends_with("_definition")
        || kind == "with_item"
        || kind == "ERROR"
}

fn literal_type(kind: &str) -> Option<&'static str> {
    match kind {
        "string" | "concatenated_string" => Some("str"),
        "integer" => Some("int"),
        "float" => Some("float"),
        "true" | "false" => Some("bool"),
        "none" => Some("None"),
        "list" | "list_comprehension" => Some("list"),
        "dictionary" | "dictionary_comprehension" => Some("dict"),
        "set" | "set_comprehension" => Some("set"),
        "tuple" => Some("tuple"),
        _ => None,
    }
}

struct PythonWalker<'a> {
    source: &'a [u8],
    repo: &'a mut EntityRepo,
    file: EntityId,
    namespace: String,
    is_package_init: bool,
}

impl PythonWalker<'_> {
    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    }

    /// `class` is the innermost class whose methods are being walked.
    fn visit_block(&mut self, node: Node, scope: EntityId, class: Option<EntityId>) {
        for child in Self::named_children(node) {
            self.visit_statement(child, scope, class);
        }
    }

    fn visit_statement(&mut self, node: Node, scope: EntityId, class: Option<EntityId>) {
        match node.kind() {
            "class_definition" => {
                self.visit_class(node, scope, &[]);
            }
            "function_definition" => {
                self.visit_function(node, scope, class, &[]);
            }
            "decorated_definition" => self.visit_decorated(node, scope, class),
            "expression_statement" => {
                for child in Self::named_children(node) {
                    match child.kind() {
                        "assignment" => self.visit_assignment(child, scope, class),
                        "augmented_assignment" => {
                            if let Some(right) = child.child_by_field_name("right") {
                                self.record_expression(right, scope, None, false);
                            }
                        }
                        _ => {
                            self.record_expression(child, scope, None, true);
                        }
                    }
                }
            }
            "return_statement" => {
                for child in Self::named_children(node) {
                    self.record_expression(child, scope, None, true);
                }
            }
            "import_statement" => self.visit_import(node),
            "import_from_statement" | "future_import_statement" => self.visit_import_from(node),
            "type_alias_statement" => self.visit_type_alias(node, scope),
            "comment" | "pass_statement" | "break_statement" | "continue_statement" => {}
            _ => {
                for child in Self::named_children(node) {
                    let kind = child.kind();
                    if kind == "block" {
                        self.visit_block(child, scope, class);
                    } else if is_statement_kind(kind) {
                        self.visit_statement(child, scope, class);
                    } else {
                        self.record_expression(child, scope, None, false);
                    }
                }
            }
        }
    }

    fn visit_decorated(&mut self, node: Node, scope: EntityId, class: Option<EntityId>) {
        let decorators: Vec<String> = Self::named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .filter_map(|d| d.named_child(0))
            .map(|e| match e.kind() {
                "call" => e
                    .child_by_field_name("function")
                    .map(|f| self.text(f))
                    .unwrap_or_default(),
                _ => self.text(e),
            })
            .filter(|name| !name.is_empty())
            .collect();
        let Some(definition) = node.child_by_field_name("definition") else {
            return;
        };
        match definition.kind() {
            "class_definition" => {
                self.visit_class(definition, scope, &decorators);
            }
            "function_definition" => {
                self.visit_function(definition, scope, class, &decorators);
            }
            _ => {}
        }
    }

    fn visit_type_parameters(&mut self, node: Node, owner: EntityId) {
        let Some(parameters) = node.child_by_field_name("type_parameters") else {
            return;
        };
        for parameter in Self::named_children(parameters) {
            let text = self.text(parameter);
            let name = text
                .split(':')
                .next()
                .unwrap_or("")
                .trim_start_matches('*')
                .trim();
            if !name.is_empty() {
                self.repo.add_type_parameter(owner, name);
            }
        }
    }

    fn visit_class(&mut self, node: Node, scope: EntityId, decorators: &[String]) -> Option<EntityId> {
        let name = self.text(node.child_by_field_name("name")?);
        let class = self.repo.add_type(scope, &name);
        debug!("Class found: {}", name);
        for decorator in decorators {
            self.repo.add_annotation(class, decorator);
        }
        self.visit_type_parameters(node, class);
        if let Some(bases) = node.child_by_field_name("superclasses") {
            for base in Self::named_children(bases) {
                match base.kind() {
                    "identifier" | "attribute" | "subscript" => {
                        let base_name = normalize_type(&self.text(base));
                        self.repo.add_inherited_type(class, &base_name);
                    }
                    _ => {}
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_block(body, class, Some(class));
        }
        Some(class)
    }

    fn visit_function(
        &mut self,
        node: Node,
        scope: EntityId,
        class: Option<EntityId>,
        decorators: &[String],
    ) -> Option<EntityId> {
        let name = self.text(node.child_by_field_name("name")?);
        let function = self.repo.add_function(scope, &name);
        debug!("Function found: {}", name);
        for decorator in decorators {
            self.repo.add_annotation(function, decorator);
        }
        self.visit_type_parameters(node, function);
        if let Some(parameters) = node.child_by_field_name("parameters") {
            self.visit_parameters(parameters, function, class);
        }
        if let Some(return_type) = node.child_by_field_name("return_type") {
            let return_type = normalize_type(&self.text(return_type));
            self.repo.add_return_type(function, Some(&return_type));
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_block(body, function, class);
        }
        Some(function)
    }

    /// The first parameter of a method named `self` or `cls` is typed as
    /// the enclosing class.
    fn visit_parameters(&mut self, node: Node, function: EntityId, class: Option<EntityId>) {
        for (index, parameter) in Self::named_children(node).into_iter().enumerate() {
            let (name, raw_type) = match parameter.kind() {
                "identifier" => (self.text(parameter), None),
                "typed_parameter" => (
                    self.first_identifier(parameter),
                    parameter.child_by_field_name("type").map(|t| self.text(t)),
                ),
                "default_parameter" => (
                    parameter
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default(),
                    None,
                ),
                "typed_default_parameter" => (
                    parameter
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default(),
                    parameter.child_by_field_name("type").map(|t| self.text(t)),
                ),
                "list_splat_pattern" | "dictionary_splat_pattern" => (self.first_identifier(parameter), None),
                _ => continue,
            };
            if name.is_empty() {
                continue;
            }
            let raw_type = raw_type.map(|t| normalize_type(&t)).or_else(|| {
                let is_receiver = index == 0 && (name == "self" || name == "cls");
                class
                    .filter(|_| is_receiver)
                    .and_then(|c| self.repo.get(c))
                    .map(|c| c.raw_name().to_string())
            });
            self.repo.add_parameter(function, &name, raw_type.as_deref());
        }
    }

    fn first_identifier(&self, node: Node) -> String {
        if node.kind() == "identifier" {
            return self.text(node);
        }
        Self::named_children(node)
            .into_iter()
            .map(|c| self.first_identifier(c))
            .find(|name| !name.is_empty())
            .unwrap_or_default()
    }

    fn visit_assignment(&mut self, node: Node, scope: EntityId, class: Option<EntityId>) {
        let annotation = node.child_by_field_name("type").map(|t| self.text(t));
        let Some(left) = node.child_by_field_name("left") else { return };
        let right = node.child_by_field_name("right");

        if annotation.as_deref().map(str::trim) == Some("TypeAlias") && left.kind() == "identifier" {
            if let Some(right) = right {
                let (name, origin) = (self.text(left), normalize_type(&self.text(right)));
                self.repo.add_alias(scope, &name, &origin);
            }
            return;
        }

        let initializer = right.and_then(|r| self.record_expression(r, scope, None, false));
        let raw_type = annotation.map(|t| normalize_type(&t));
        match left.kind() {
            "identifier" => {
                let name = self.text(left);
                self.declare_var(scope, &name, raw_type.as_deref(), initializer.map(|k| (scope, k)));
            }
            "attribute" => {
                let object = left.child_by_field_name("object").map(|o| self.text(o));
                let attribute = left.child_by_field_name("attribute").map(|a| self.text(a));
                if let (Some(class), Some("self"), Some(attribute)) = (class, object.as_deref(), attribute) {
                    self.declare_var(class, &attribute, raw_type.as_deref(), initializer.map(|k| (scope, k)));
                }
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" => {
                for target in Self::named_children(left) {
                    if target.kind() == "identifier" {
                        let name = self.text(target);
                        self.declare_var(scope, &name, None, None);
                    }
                }
            }
            _ => {}
        }
    }

    /// First declaration of a name in a scope wins.
    fn declare_var(
        &mut self,
        scope: EntityId,
        name: &str,
        raw_type: Option<&str>,
        initializer: Option<(EntityId, ExpressionKey)>,
    ) {
        if self.repo.lookup_var_locally(scope, name).is_some() {
            return;
        }
        let var = self.repo.add_var(scope, name, raw_type);
        if let Some((container, key)) = initializer {
            self.repo.set_initializer(var, container, key);
        }
    }

    fn visit_type_alias(&mut self, node: Node, scope: EntityId) {
        let children = Self::named_children(node);
        let left = node.child_by_field_name("left").or_else(|| children.first().copied());
        let right = node.child_by_field_name("right").or_else(|| children.last().copied());
        let (Some(left), Some(right)) = (left, right) else { return };
        let name = normalize_type(&self.text(left));
        let origin = normalize_type(&self.text(right));
        if !name.is_empty() && name != origin {
            let alias = self.repo.add_alias(scope, &name, &origin);
            debug!("Alias found: {} = {} ({})", name, origin, alias);
        }
    }

    fn visit_import(&mut self, node: Node) {
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let import = match name.kind() {
                "aliased_import" => Import::module(
                    name.child_by_field_name("name").map(|n| self.text(n)).unwrap_or_default(),
                    name.child_by_field_name("alias").map(|a| self.text(a)),
                ),
                _ => Import::module(self.text(name), None),
            };
            if !import.target.is_empty() {
                self.repo.add_import(self.file, import);
            }
        }
    }

    fn visit_import_from(&mut self, node: Node) {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| self.absolute_module(&self.text(m)))
            .unwrap_or_else(|| "__future__".to_string());
        if Self::named_children(node).iter().any(|c| c.kind() == "wildcard_import") {
            self.repo.add_import(self.file, Import::new(format!("{}.*", module), None));
            return;
        }
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let (member, alias) = match name.kind() {
                "aliased_import" => (
                    name.child_by_field_name("name").map(|n| self.text(n)).unwrap_or_default(),
                    name.child_by_field_name("alias").map(|a| self.text(a)),
                ),
                _ => (self.text(name), None),
            };
            if member.is_empty() {
                continue;
            }
            let target = if module.is_empty() {
                member
            } else {
                format!("{}.{}", module, member)
            };
            self.repo.add_import(self.file, Import::new(target, alias));
        }
    }

    /// Resolve leading dots of a relative module against this file's package.
    fn absolute_module(&self, module: &str) -> String {
        let dots = module.chars().take_while(|&c| c == '.').count();
        let rest = &module[dots..];
        if dots == 0 {
            return rest.to_string();
        }
        let mut package: Vec<&str> = self.namespace.split('.').filter(|s| !s.is_empty()).collect();
        let levels = if self.is_package_init { dots - 1 } else { dots };
        for _ in 0..levels {
            package.pop();
        }
        if !rest.is_empty() {
            package.push(rest);
        }
        package.join(".")
    }

    /// Record an expression and the expressions it is built from. Returns
    /// the key of the expression that stands for `node`, if any.
    fn record_expression(
        &mut self,
        node: Node,
        scope: EntityId,
        parent: Option<ExpressionKey>,
        is_statement: bool,
    ) -> Option<ExpressionKey> {
        let key = ExpressionKey::from(node.id());
        match node.kind() {
            "call" => {
                let function = node.child_by_field_name("function")?;
                let mut expression = Expression::new().call().statement(is_statement).with_parent(parent);
                let mut base = None;
                match function.kind() {
                    "identifier" => expression = expression.with_identifier(self.text(function)),
                    "attribute" => {
                        if let Some(attribute) = function.child_by_field_name("attribute") {
                            expression = expression.with_identifier(self.text(attribute)).dot();
                        }
                        base = function.child_by_field_name("object");
                    }
                    _ => {
                        self.record_expression(function, scope, None, false);
                    }
                }
                self.repo.add_expression(scope, key, expression);
                if let Some(base) = base {
                    self.record_expression(base, scope, Some(key), false);
                }
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    self.record_arguments(arguments, scope);
                }
                Some(key)
            }
            "attribute" => {
                let mut expression = Expression::new().dot().statement(is_statement).with_parent(parent);
                if let Some(attribute) = node.child_by_field_name("attribute") {
                    expression = expression.with_identifier(self.text(attribute));
                }
                self.repo.add_expression(scope, key, expression);
                if let Some(object) = node.child_by_field_name("object") {
                    self.record_expression(object, scope, Some(key), false);
                }
                Some(key)
            }
            "identifier" => {
                let expression = Expression::new()
                    .with_identifier(self.text(node))
                    .statement(is_statement)
                    .with_parent(parent);
                self.repo.add_expression(scope, key, expression);
                Some(key)
            }
            "parenthesized_expression" | "await" => {
                let inner = node.named_child(0)?;
                self.record_expression(inner, scope, parent, is_statement)
            }
            "lambda" | "comment" | "keyword_separator" => None,
            "keyword_argument" => {
                let value = node.child_by_field_name("value")?;
                self.record_expression(value, scope, None, false);
                None
            }
            kind => {
                if let Some(raw_type) = literal_type(kind) {
                    let expression = Expression::new()
                        .with_raw_type(raw_type)
                        .statement(is_statement)
                        .with_parent(parent);
                    self.repo.add_expression(scope, key, expression);
                    for element in Self::named_children(node) {
                        self.record_expression(element, scope, None, false);
                    }
                    return Some(key);
                }
                for child in Self::named_children(node) {
                    self.record_expression(child, scope, None, false);
                }
                None
            }
        }
    }

    fn record_arguments(&mut self, arguments: Node, scope: EntityId) {
        for argument in Self::named_children(arguments) {
            self.record_expression(argument, scope, None, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::scope::{Inferer, Resolver};

    fn parse(path: &str, source: &str) -> EntityRepo {
        PythonProcessor::new().parse_file(path, source).unwrap().entities
    }

    fn find(repo: &EntityRepo, kind: EntityKind, name: &str) -> EntityId {
        repo.iter()
            .find(|e| e.kind() == kind && e.raw_name() == name)
            .map(|e| e.id())
            .unwrap_or_else(|| panic!("no {} named {}", kind, name))
    }

    #[test]
    fn test_module_namespace() {
        assert_eq!(module_namespace("pkg/widgets.py"), "pkg.widgets");
        assert_eq!(module_namespace("pkg/__init__.py"), "pkg");
        assert_eq!(module_namespace("./main.py"), "main");
        assert_eq!(module_namespace("stubs/io.pyi"), "stubs.io");
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("List[int]"), "List");
        assert_eq!(normalize_type("'Widget'"), "Widget");
        assert_eq!(normalize_type("Widget | None"), "Widget");
        assert_eq!(normalize_type(" int "), "int");
    }

    #[test]
    fn test_class_structure() {
        let source = r#"
@dataclass
class Widget(Base):
    size: int = 0

    def __init__(self, name: str, *args, **kwargs):
        self.name = name

    @staticmethod
    def make() -> "Widget":
        return Widget()
"#;
        let repo = parse("ui/widgets.py", source);
        let widget = find(&repo, EntityKind::Type, "Widget");
        let entity = repo.entity(widget);

        assert_eq!(entity.base_qualified_name(), "ui.widgets.Widget");
        let names: Vec<&str> = repo.get_vars(widget).iter().map(|&v| repo.entity(v).raw_name()).collect();
        assert_eq!(names, vec!["size", "name"]);
        assert_eq!(entity.decorations().map(|d| d.annotation_names().to_vec()), Some(vec!["dataclass".to_string()]));
        assert_eq!(entity.as_type().map(|t| t.inherited_names().to_vec()), Some(vec!["Base".to_string()]));

        let init = find(&repo, EntityKind::Function, "__init__");
        assert_eq!(repo.qualified_name(init), "ui.widgets.Widget.__init__(Widget,str,,)");
        let make = find(&repo, EntityKind::Function, "make");
        assert_eq!(repo.entity(make).as_function().map(|f| f.return_type_names().to_vec()), Some(vec!["Widget".to_string()]));
    }

    #[test]
    fn test_imports_collected() {
        let source = r#"
import os.path
import numpy as np
from .models import User as Account, Group
from . import helpers
from shapes import *
"#;
        let repo = parse("app/views.py", source);
        let file = repo.files()[0];
        let imports = repo.entity(file).as_file().map(|f| f.imports().to_vec()).unwrap_or_default();

        let targets: Vec<(&str, &str)> = imports
            .iter()
            .map(|i| (i.target.as_str(), PythonImports.binding_name(i)))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("os.path", "os"),
                ("numpy", "np"),
                ("app.models.User", "Account"),
                ("app.models.Group", "Group"),
                ("app.helpers", "helpers"),
                ("shapes.*", "*"),
            ]
        );
    }

    #[test]
    fn test_type_alias_and_self_alias() {
        let source = "type Handle = Widget\nclass Widget: pass\nLegacy: TypeAlias = Handle\n";
        let repo = parse("m.py", source);
        let handle = find(&repo, EntityKind::Alias, "Handle");
        let legacy = find(&repo, EntityKind::Alias, "Legacy");

        assert_eq!(repo.entity(handle).as_alias().map(|a| a.origin_name()), Some("Widget"));
        assert_eq!(repo.entity(legacy).as_alias().map(|a| a.origin_name()), Some("Handle"));
    }

    #[test]
    fn test_dot_chain_through_initializer() {
        let source = r#"
class Widget:
    def draw(self) -> int:
        return 1

def main():
    w = Widget()
    w.draw()
"#;
        let mut repo = parse("m.py", source);
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);
        inferer.resolve_all_bindings(&repo);

        let widget = find(&repo, EntityKind::Type, "Widget");
        let draw = find(&repo, EntityKind::Function, "draw");
        let main = find(&repo, EntityKind::Function, "main");
        let w = find(&repo, EntityKind::Var, "w");
        assert_eq!(repo.get_type(w), Some(widget));

        let expressions = repo.entity(main).container().map(|c| c.expressions()).expect("main is a container");
        let call = expressions
            .iter()
            .find(|e| e.is_dot && e.identifier.as_deref() == Some("draw"))
            .expect("w.draw() recorded");
        assert_eq!(call.referred_entity(), Some(draw));
        assert_eq!(call.get_type(), inferer.built_in_type("int"));
        assert_eq!(repo.get_type(main), inferer.built_in_type("int"));
    }

    #[test]
    fn test_self_attribute_resolves_through_method_receiver() {
        let source = r#"
class Engine:
    def start(self) -> bool:
        return True

class Car:
    def __init__(self):
        self.engine = Engine()

    def go(self):
        return self.engine.start()
"#;
        let mut repo = parse("car.py", source);
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::python(), true);
        inferer.resolve_all_bindings(&repo);

        let go = find(&repo, EntityKind::Function, "go");
        assert_eq!(repo.get_type(go), inferer.built_in_type("bool"));
        let car = find(&repo, EntityKind::Type, "Car");
        let engine = find(&repo, EntityKind::Type, "Engine");
        let field = repo.lookup_var_locally(car, "engine").expect("self.engine declared on the class");
        assert_eq!(repo.get_type(field), Some(engine));
        assert_eq!(inferer.resolve_name(&repo, go, "Engine", true), Some(engine));
    }

    #[test]
    fn test_syntax_errors_still_parse() {
        let repo = parse("broken.py", "class Ok: pass\ndef f(:\n    pass\n");
        assert_eq!(repo.files().len(), 1);
        assert!(repo.iter().any(|e| e.raw_name() == "Ok"));
    }
}
