//! Go language processor
//!
//! Every file declares its package as a package entity under the file; all
//! top-level declarations hang off that package, so `seal` fuses the files
//! of one package into a single scope. Methods attach to their receiver
//! type, which is created as a partial type when it is declared in another
//! file of the package.

use super::framework::{LangProcessor, ParsedFile};
use crate::entity::{EntityId, EntityKind, Expression, ExpressionKey, Import};
use crate::repo::EntityRepo;
use crate::scope::BuiltInTypes;
use crate::{Error, Result};
use tracing::debug;
use tree_sitter::{Node, Parser};

/// Go language processor
pub struct GoProcessor;

impl GoProcessor {
    /// Create a new Go processor
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl LangProcessor for GoProcessor {
    fn supported_language(&self) -> &str {
        "go"
    }

    fn file_suffixes(&self) -> &[&str] {
        &["go"]
    }

    fn built_in_types(&self) -> BuiltInTypes {
        BuiltInTypes::go()
    }

    fn parse_file(&self, path: &str, content: &str) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| Error::Parse(format!("Failed to load Go grammar: {}", e)))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| Error::Parse(format!("Failed to parse {}", path)))?;

        let mut entities = EntityRepo::new();
        let file = entities.add_file(path, "");
        let mut walker = GoWalker {
            source: content.as_bytes(),
            repo: &mut entities,
            file,
        };
        walker.visit_source(tree.root_node());
        debug!("Parsed {} into {} entities", path, entities.len());

        Ok(ParsedFile {
            path: path.to_string(),
            entities,
        })
    }
}

/// Reduce a Go type expression to a type name: pointers, slices, arrays,
/// variadics and channels denote their element type, maps are `map`,
/// functions `func`, and type arguments are dropped.
fn normalize_type(text: &str) -> String {
    let mut text = text.trim();
    loop {
        let before = text;
        text = text.trim_start_matches('*').trim_start();
        text = text.strip_prefix("...").unwrap_or(text);
        text = text.strip_prefix("<-").unwrap_or(text).trim_start();
        text = text.strip_prefix("chan").map(str::trim_start).unwrap_or(text);
        text = text.strip_prefix("<-").unwrap_or(text).trim_start();
        if text.starts_with('[') {
            if let Some(end) = text.find(']') {
                text = &text[end + 1..];
            }
        }
        if text == before {
            break;
        }
    }
    if text.starts_with("map[") {
        return "map".to_string();
    }
    if text.starts_with("func") {
        return "func".to_string();
    }
    if text.starts_with("interface") {
        return "any".to_string();
    }
    if text.starts_with("struct") {
        return "struct".to_string();
    }
    let text = match text.find('[') {
        Some(index) => &text[..index],
        None => text,
    };
    text.trim().to_string()
}

fn literal_type(kind: &str) -> Option<&'static str> {
    match kind {
        "interpreted_string_literal" | "raw_string_literal" => Some("string"),
        "int_literal" => Some("int"),
        "float_literal" => Some("float64"),
        "imaginary_literal" => Some("complex128"),
        "rune_literal" => Some("rune"),
        "true" | "false" => Some("bool"),
        "func_literal" => Some("func"),
        _ => None,
    }
}

fn is_expression_kind(kind: &str) -> bool {
    kind.ends_with("_expression")
        || kind.ends_with("_literal")
        || matches!(kind, "identifier" | "true" | "false" | "nil" | "iota")
}

struct GoWalker<'a> {
    source: &'a [u8],
    repo: &'a mut EntityRepo,
    file: EntityId,
}

impl GoWalker<'_> {
    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    }

    fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.children_by_field_name(field, &mut cursor).collect()
    }

    /// Types before functions so methods find receivers declared later in
    /// the same file.
    fn visit_source(&mut self, root: Node) {
        let children = Self::named_children(root);
        let package_name = children
            .iter()
            .find(|c| c.kind() == "package_clause")
            .and_then(|c| c.named_child(0))
            .map(|n| self.text(n))
            .unwrap_or_else(|| "main".to_string());
        let package = self.repo.add_package(self.file, &package_name);
        debug!("Package found: {}", package_name);

        for child in &children {
            match child.kind() {
                "import_declaration" => self.visit_imports(*child),
                "type_declaration" => self.visit_type_declaration(*child, package),
                _ => {}
            }
        }
        for child in &children {
            match child.kind() {
                "function_declaration" => self.visit_function(*child, package),
                "method_declaration" => self.visit_method(*child, package),
                "var_declaration" | "const_declaration" => self.visit_statement(*child, package),
                _ => {}
            }
        }
    }

    fn visit_imports(&mut self, node: Node) {
        for child in Self::named_children(node) {
            match child.kind() {
                "import_spec_list" => self.visit_imports(child),
                "import_spec" => {
                    let Some(path) = child.child_by_field_name("path") else { continue };
                    let path = self.text(path);
                    let path = path.trim_matches(|c| c == '"' || c == '`');
                    let package = path.rsplit('/').next().unwrap_or(path).to_string();
                    let import = match child.child_by_field_name("name") {
                        Some(name) if name.kind() == "blank_identifier" => continue,
                        Some(name) if name.kind() == "dot" => Import::new(format!("{}.*", package), None),
                        Some(name) => Import::module(package, Some(self.text(name))),
                        None => Import::module(package, None),
                    };
                    self.repo.add_import(self.file, import);
                }
                _ => {}
            }
        }
    }

    fn visit_type_declaration(&mut self, node: Node, package: EntityId) {
        for spec in Self::named_children(node) {
            let Some(name) = spec.child_by_field_name("name").map(|n| self.text(n)) else {
                continue;
            };
            let Some(underlying) = spec.child_by_field_name("type") else { continue };
            match spec.kind() {
                "type_alias" => {
                    let origin = normalize_type(&self.text(underlying));
                    self.repo.add_alias(package, &name, &origin);
                }
                "type_spec" => {
                    let ty = self.repo.add_type(package, &name);
                    debug!("Type found: {}", name);
                    self.visit_type_parameters(spec, ty);
                    self.visit_underlying(underlying, ty);
                }
                _ => {}
            }
        }
    }

    fn visit_type_parameters(&mut self, node: Node, owner: EntityId) {
        let Some(parameters) = node.child_by_field_name("type_parameters") else {
            return;
        };
        for declaration in Self::named_children(parameters) {
            for name in Self::field_children(declaration, "name") {
                let name = self.text(name);
                self.repo.add_type_parameter(owner, &name);
            }
        }
    }

    fn visit_underlying(&mut self, node: Node, ty: EntityId) {
        match node.kind() {
            "struct_type" => {
                for list in Self::named_children(node) {
                    for field in Self::named_children(list) {
                        if field.kind() == "field_declaration" {
                            self.visit_field(field, ty);
                        }
                    }
                }
            }
            "interface_type" => {
                for element in Self::named_children(node) {
                    match element.kind() {
                        "method_elem" | "method_spec" => {
                            let Some(name) = element.child_by_field_name("name") else { continue };
                            let name = self.text(name);
                            let method = self.repo.add_function(ty, &name);
                            self.visit_signature(element, method);
                        }
                        "type_elem" | "constraint_elem" => {
                            for embedded in Self::named_children(element) {
                                let embedded = normalize_type(&self.text(embedded));
                                self.repo.add_inherited_type(ty, &embedded);
                            }
                        }
                        "type_identifier" | "qualified_type" | "generic_type" => {
                            let embedded = normalize_type(&self.text(element));
                            self.repo.add_inherited_type(ty, &embedded);
                        }
                        _ => {}
                    }
                }
            }
            _ => {
                let underlying = normalize_type(&self.text(node));
                if !underlying.is_empty() {
                    self.repo.add_inherited_type(ty, &underlying);
                }
            }
        }
    }

    /// Named fields become vars, an embedded field a mixin.
    fn visit_field(&mut self, field: Node, ty: EntityId) {
        let Some(field_type) = field.child_by_field_name("type") else { return };
        let field_type = normalize_type(&self.text(field_type));
        let names = Self::field_children(field, "name");
        if names.is_empty() {
            self.repo.add_mixin(ty, &field_type);
            return;
        }
        for name in names {
            let name = self.text(name);
            self.repo.add_var(ty, &name, Some(&field_type));
        }
    }

    /// Parameters and results of a function, method or interface method.
    fn visit_signature(&mut self, node: Node, function: EntityId) {
        if let Some(parameters) = node.child_by_field_name("parameters") {
            for declaration in Self::named_children(parameters) {
                let Some(parameter_type) = declaration.child_by_field_name("type") else {
                    continue;
                };
                let parameter_type = normalize_type(&self.text(parameter_type));
                let names = Self::field_children(declaration, "name");
                if names.is_empty() {
                    self.repo.add_parameter(function, "_", Some(&parameter_type));
                }
                for name in names {
                    let name = self.text(name);
                    self.repo.add_parameter(function, &name, Some(&parameter_type));
                }
            }
        }
        let Some(result) = node.child_by_field_name("result") else { return };
        if result.kind() != "parameter_list" {
            let result = normalize_type(&self.text(result));
            self.repo.add_return_type(function, Some(&result));
            return;
        }
        for declaration in Self::named_children(result) {
            let Some(result_type) = declaration.child_by_field_name("type") else { continue };
            let result_type = normalize_type(&self.text(result_type));
            self.repo.add_return_type(function, Some(&result_type));
            for name in Self::field_children(declaration, "name") {
                let name = self.text(name);
                self.repo.add_var(function, &name, Some(&result_type));
            }
        }
    }

    fn visit_function(&mut self, node: Node, package: EntityId) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };
        let function = self.repo.add_function(package, &name);
        debug!("Function found: {}", name);
        self.visit_type_parameters(node, function);
        self.visit_signature(node, function);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_statement(body, function);
        }
    }

    fn visit_method(&mut self, node: Node, package: EntityId) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };
        let receiver = node
            .child_by_field_name("receiver")
            .and_then(|r| r.named_child(0))
            .filter(|r| r.kind() == "parameter_declaration");
        let Some(receiver) = receiver else {
            self.visit_function(node, package);
            return;
        };
        let Some(receiver_type) = receiver.child_by_field_name("type") else { return };
        let receiver_type = normalize_type(&self.text(receiver_type));
        let owner = self.receiver_type(package, &receiver_type);

        let method = self.repo.add_function(owner, &name);
        debug!("Method found: {}.{}", receiver_type, name);
        if let Some(receiver_name) = receiver.child_by_field_name("name") {
            let receiver_name = self.text(receiver_name);
            self.repo.add_var(method, &receiver_name, Some(&receiver_type));
        }
        self.visit_signature(node, method);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_statement(body, method);
        }
    }

    /// The receiver's type in this file, or a partial type standing for the
    /// declaration in another file of the package.
    fn receiver_type(&mut self, package: EntityId, name: &str) -> EntityId {
        let existing = self.repo.entity(package).children().iter().copied().find(|&child| {
            let entity = self.repo.entity(child);
            entity.kind() == EntityKind::Type && entity.raw_name() == name
        });
        match existing {
            Some(ty) => ty,
            None => {
                debug!("Partial type for receiver {}", name);
                self.repo.add_type(package, name)
            }
        }
    }

    fn visit_statement(&mut self, node: Node, scope: EntityId) {
        match node.kind() {
            "expression_statement" | "return_statement" => {
                for child in Self::named_children(node) {
                    self.record_statement_expressions(child, scope, true);
                }
            }
            "var_declaration" | "const_declaration" | "var_spec_list" | "const_spec_list" => {
                for spec in Self::named_children(node) {
                    self.visit_statement(spec, scope);
                }
            }
            "var_spec" | "const_spec" => {
                let names = Self::field_children(node, "name");
                let declared_type = node.child_by_field_name("type").map(|t| normalize_type(&self.text(t)));
                let values = node.child_by_field_name("value").map(Self::named_children).unwrap_or_default();
                self.declare_vars(scope, &names, declared_type.as_deref(), &values);
            }
            "short_var_declaration" => {
                let names = node.child_by_field_name("left").map(Self::named_children).unwrap_or_default();
                let values = node.child_by_field_name("right").map(Self::named_children).unwrap_or_default();
                self.declare_vars(scope, &names, None, &values);
            }
            "comment" => {}
            _ => {
                for child in Self::named_children(node) {
                    self.record_statement_expressions(child, scope, false);
                }
            }
        }
    }

    fn record_statement_expressions(&mut self, node: Node, scope: EntityId, is_statement: bool) {
        match node.kind() {
            "expression_list" => {
                for element in Self::named_children(node) {
                    self.record_expression(element, scope, None, is_statement);
                }
            }
            kind if is_expression_kind(kind) => {
                self.record_expression(node, scope, None, is_statement);
            }
            _ => self.visit_statement(node, scope),
        }
    }

    /// Values pair with names by position; a single value feeding several
    /// names initializes the first one.
    fn declare_vars(&mut self, scope: EntityId, names: &[Node], raw_type: Option<&str>, values: &[Node]) {
        let keys: Vec<Option<ExpressionKey>> = values
            .iter()
            .map(|&value| self.record_expression(value, scope, None, false))
            .collect();
        for (index, &name) in names.iter().enumerate() {
            if name.kind() != "identifier" {
                continue;
            }
            let name = self.text(name);
            if name == "_" || self.repo.lookup_var_locally(scope, &name).is_some() {
                continue;
            }
            let var = self.repo.add_var(scope, &name, raw_type);
            let key = if keys.len() == names.len() {
                keys[index]
            } else if index == 0 {
                keys.first().copied().flatten()
            } else {
                None
            };
            if let Some(key) = key {
                self.repo.set_initializer(var, scope, key);
            }
        }
    }

    /// Record an expression and its operands. Returns the key of the
    /// expression that stands for `node`, if any.
    fn record_expression(
        &mut self,
        node: Node,
        scope: EntityId,
        parent: Option<ExpressionKey>,
        is_statement: bool,
    ) -> Option<ExpressionKey> {
        let key = ExpressionKey::from(node.id());
        match node.kind() {
            "call_expression" => {
                let function = node.child_by_field_name("function")?;
                let mut expression = Expression::new().call().statement(is_statement).with_parent(parent);
                let mut operand = None;
                match function.kind() {
                    "identifier" => expression = expression.with_identifier(self.text(function)),
                    "selector_expression" => {
                        if let Some(field) = function.child_by_field_name("field") {
                            expression = expression.with_identifier(self.text(field)).dot();
                        }
                        operand = function.child_by_field_name("operand");
                    }
                    _ => {
                        self.record_expression(function, scope, None, false);
                    }
                }
                self.repo.add_expression(scope, key, expression);
                if let Some(operand) = operand {
                    self.record_expression(operand, scope, Some(key), false);
                }
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    for argument in Self::named_children(arguments) {
                        self.record_expression(argument, scope, None, false);
                    }
                }
                Some(key)
            }
            "selector_expression" => {
                let mut expression = Expression::new().dot().statement(is_statement).with_parent(parent);
                if let Some(field) = node.child_by_field_name("field") {
                    expression = expression.with_identifier(self.text(field));
                }
                self.repo.add_expression(scope, key, expression);
                if let Some(operand) = node.child_by_field_name("operand") {
                    self.record_expression(operand, scope, Some(key), false);
                }
                Some(key)
            }
            "composite_literal" => {
                let literal_type = node.child_by_field_name("type").map(|t| normalize_type(&self.text(t)))?;
                let expression = Expression::new()
                    .with_raw_type(literal_type)
                    .statement(is_statement)
                    .with_parent(parent);
                self.repo.add_expression(scope, key, expression);
                if let Some(body) = node.child_by_field_name("body") {
                    self.record_nested(body, scope);
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
            "unary_expression" | "parenthesized_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .or_else(|| node.named_child(0))?;
                self.record_expression(operand, scope, parent, is_statement)
            }
            "func_literal" => {
                let expression = Expression::new()
                    .with_raw_type("func")
                    .statement(is_statement)
                    .with_parent(parent);
                self.repo.add_expression(scope, key, expression);
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_statement(body, scope);
                }
                Some(key)
            }
            kind => {
                if let Some(raw_type) = literal_type(kind) {
                    let expression = Expression::new()
                        .with_raw_type(raw_type)
                        .statement(is_statement)
                        .with_parent(parent);
                    self.repo.add_expression(scope, key, expression);
                    return Some(key);
                }
                self.record_nested(node, scope);
                None
            }
        }
    }

    fn record_nested(&mut self, node: Node, scope: EntityId) {
        for child in Self::named_children(node) {
            if is_expression_kind(child.kind()) {
                self.record_expression(child, scope, None, false);
            } else {
                self.record_nested(child, scope);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Inferer;

    fn parse(path: &str, source: &str) -> EntityRepo {
        GoProcessor::new().parse_file(path, source).unwrap().entities
    }

    fn find_all(repo: &EntityRepo, kind: EntityKind, name: &str) -> Vec<EntityId> {
        repo.iter()
            .filter(|e| e.kind() == kind && e.raw_name() == name)
            .map(|e| e.id())
            .collect()
    }

    fn find(repo: &EntityRepo, kind: EntityKind, name: &str) -> EntityId {
        find_all(repo, kind, name)
            .first()
            .copied()
            .unwrap_or_else(|| panic!("no {} named {}", kind, name))
    }

    fn names(repo: &EntityRepo, ids: &[EntityId]) -> Vec<String> {
        ids.iter().map(|&id| repo.entity(id).raw_name().to_string()).collect()
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("*Circle"), "Circle");
        assert_eq!(normalize_type("[]string"), "string");
        assert_eq!(normalize_type("[4]*Node"), "Node");
        assert_eq!(normalize_type("...int"), "int");
        assert_eq!(normalize_type("chan<- Event"), "Event");
        assert_eq!(normalize_type("map[string]int"), "map");
        assert_eq!(normalize_type("List[T]"), "List");
        assert_eq!(normalize_type("shapes.Circle"), "shapes.Circle");
        assert_eq!(normalize_type("func(int) error"), "func");
    }

    #[test]
    fn test_declarations() {
        let source = r#"
package shapes

import (
    "fmt"
    m "math"
    . "strings"
    _ "embed"
)

type Shape interface {
    Area() float64
    fmt.Stringer
}

type Base struct{ ID int }

type Circle struct {
    Base
    R, D float64
}

type Celsius float64

type Round = Circle

type List[T any] struct {
    items []T
}
"#;
        let repo = parse("shapes/shapes.go", source);
        let package = find(&repo, EntityKind::Package, "shapes");
        assert_eq!(repo.entity(package).parent(), Some(repo.files()[0]));

        let shape = find(&repo, EntityKind::Type, "Shape");
        assert_eq!(names(&repo, &repo.get_functions(shape)), ["Area"]);
        assert_eq!(
            repo.entity(shape).as_type().map(|t| t.inherited_names().to_vec()),
            Some(vec!["fmt.Stringer".to_string()])
        );

        let circle = find(&repo, EntityKind::Type, "Circle");
        assert_eq!(repo.entity(circle).base_qualified_name(), "shapes.Circle");
        assert_eq!(names(&repo, &repo.get_vars(circle)), ["R", "D"]);
        assert_eq!(
            repo.entity(circle).container().map(|c| c.mixin_names().to_vec()),
            Some(vec!["Base".to_string()])
        );

        let celsius = find(&repo, EntityKind::Type, "Celsius");
        assert_eq!(
            repo.entity(celsius).as_type().map(|t| t.inherited_names().to_vec()),
            Some(vec!["float64".to_string()])
        );
        let round = find(&repo, EntityKind::Alias, "Round");
        assert_eq!(repo.entity(round).as_alias().map(|a| a.origin_name()), Some("Circle"));
        let list = find(&repo, EntityKind::Type, "List");
        assert!(repo.entity(list).decorations().is_some_and(|d| d.has_type_parameter("T")));

        let file = repo.entity(repo.files()[0]).as_file().expect("file entity");
        let imports: Vec<(&str, &str)> = file
            .imports()
            .iter()
            .map(|i| (i.target.as_str(), i.binding_name()))
            .collect();
        assert_eq!(imports, vec![("fmt", "fmt"), ("math", "m"), ("strings.*", "*")]);
    }

    #[test]
    fn test_signatures() {
        let source = r#"
package calc

func Divide(a, b int) (q int, err error) {
    return a / b, nil
}

func Sum(values ...float64) float64 {
    total := 0.0
    return total
}
"#;
        let repo = parse("calc.go", source);
        let divide = find(&repo, EntityKind::Function, "Divide");
        assert_eq!(repo.qualified_name(divide), "calc.Divide(int,int)");
        assert_eq!(
            repo.entity(divide).as_function().map(|f| f.return_type_names().to_vec()),
            Some(vec!["int".to_string(), "error".to_string()])
        );
        assert!(repo.lookup_var_locally(divide, "err").is_some());

        let sum = find(&repo, EntityKind::Function, "Sum");
        assert_eq!(repo.qualified_name(sum), "calc.Sum(float64)");
        assert!(repo.lookup_var_locally(sum, "total").is_some());
    }

    #[test]
    fn test_method_on_type_from_same_file() {
        let source = r#"
package geo

func (p *Point) Norm() float64 { return p.X }

type Point struct { X, Y float64 }
"#;
        let repo = parse("geo.go", source);
        assert_eq!(find_all(&repo, EntityKind::Type, "Point").len(), 1);
        let point = find(&repo, EntityKind::Type, "Point");
        assert_eq!(names(&repo, &repo.get_functions(point)), ["Norm"]);
        let norm = find(&repo, EntityKind::Function, "Norm");
        let receiver = repo.lookup_var_locally(norm, "p").expect("receiver declared");
        assert_eq!(repo.entity(receiver).as_var().and_then(|v| v.raw_type()), Some("Point"));
    }

    #[test]
    fn test_cross_file_method_fusion() {
        let circle_go = r#"
package shapes

type Circle struct {
    R float64
}
"#;
        let area_go = r#"
package shapes

func (c *Circle) Area() float64 {
    return c.R * c.R * 3.14
}
"#;
        let main_go = r#"
package main

import "example.com/geo/shapes"

func run() float64 {
    c := shapes.Circle{R: 2}
    return c.Area()
}
"#;
        let mut repo = EntityRepo::new();
        repo.merge(parse("shapes/circle.go", circle_go));
        repo.merge(parse("shapes/area.go", area_go));
        repo.merge(parse("main.go", main_go));
        repo.seal();
        let inferer = Inferer::new(&mut repo, &BuiltInTypes::go(), true);
        let unresolved = inferer.resolve_all_bindings(&repo);
        assert!(unresolved.is_empty(), "unresolved: {:?}", unresolved);

        let circles = find_all(&repo, EntityKind::Type, "Circle");
        assert_eq!(circles.len(), 2);
        let group = repo.entity(circles[0]).group().expect("partial type fused");
        assert_eq!(repo.entity(circles[1]).group(), Some(group));
        assert_eq!(repo.find_by_qualified_name("shapes.Circle"), Some(group));

        let area = find(&repo, EntityKind::Function, "Area");
        assert_eq!(repo.lookup_function_locally(group, "Area"), Some(area));

        let run = find(&repo, EntityKind::Function, "run");
        let c = repo.lookup_var_locally(run, "c").expect("short variable declared");
        assert_eq!(repo.get_type(c), Some(group));

        let expressions = repo.entity(run).container().map(|c| c.expressions()).expect("run is a container");
        let call = expressions
            .iter()
            .find(|e| e.is_call && e.identifier.as_deref() == Some("Area"))
            .expect("c.Area() recorded");
        assert_eq!(call.referred_entity(), Some(area));
        assert_eq!(call.get_type(), inferer.built_in_type("float64"));
    }
}
