//! Builders for the runtime calls the transform emits, plus the matching
//! recognizers used to avoid instrumenting code twice.
//!
//! Every call shape is built structurally from [`RuntimeNames`]; no target is
//! ever produced by concatenating identifier text.

use crate::options::RuntimeNames;
use oxc_allocator::Box as OxcBox;
use oxc_ast::ast::*;
use oxc_ast::{AstBuilder, NONE};
use oxc_span::SPAN;

/// Which half of the style registry a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleRegistry {
    /// `__.$._static["tags"] = {..}`
    Static,
    /// `__.$["tags"] = function (_index) { return ..; }`
    Dynamic,
}

/// Tag path of a style descriptor: `$` is empty, `$h1.span` is `["h1", "span"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPath(pub Vec<String>);

impl TagPath {
    /// Registry key. Empty paths address the view's own style.
    pub fn key(&self) -> String {
        if self.0.is_empty() {
            "$".to_string()
        } else {
            self.0.join(",")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Set,
    Get,
}

pub struct RuntimeBuilder<'a> {
    pub ast: AstBuilder<'a>,
    pub names: RuntimeNames,
}

impl<'a> RuntimeBuilder<'a> {
    pub fn new(ast: AstBuilder<'a>, names: RuntimeNames) -> Self {
        Self { ast, names }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRIMITIVES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn identifier(&self, name: &str) -> Expression<'a> {
        self.ast.expression_identifier(SPAN, self.ast.atom(name))
    }

    pub fn string(&self, value: &str) -> Expression<'a> {
        self.ast.expression_string_literal(SPAN, self.ast.atom(value), None)
    }

    pub fn number(&self, value: u32) -> Expression<'a> {
        self.ast
            .expression_numeric_literal(SPAN, f64::from(value), None, NumberBase::Decimal)
    }

    pub fn null(&self) -> Expression<'a> {
        self.ast.expression_null_literal(SPAN)
    }

    pub fn undefined(&self) -> Expression<'a> {
        self.identifier("undefined")
    }

    pub fn member(&self, object: Expression<'a>, property: &str) -> Expression<'a> {
        Expression::from(self.ast.member_expression_static(
            SPAN,
            object,
            self.ast.identifier_name(SPAN, self.ast.atom(property)),
            false,
        ))
    }

    fn computed_member(&self, object: Expression<'a>, key: &str) -> MemberExpression<'a> {
        self.ast
            .member_expression_computed(SPAN, object, self.string(key), false)
    }

    pub fn call(&self, callee: Expression<'a>, args: Vec<Expression<'a>>) -> Expression<'a> {
        let arguments = self
            .ast
            .vec_from_iter(args.into_iter().map(Argument::from));
        self.ast.expression_call(
            SPAN,
            callee,
            None::<OxcBox<TSTypeParameterInstantiation>>,
            arguments,
            false,
        )
    }

    pub fn array(&self, elements: Vec<Expression<'a>>) -> Expression<'a> {
        self.ast.expression_array(
            SPAN,
            self.ast
                .vec_from_iter(elements.into_iter().map(ArrayExpressionElement::from)),
        )
    }

    pub fn and(&self, left: Expression<'a>, right: Expression<'a>) -> Expression<'a> {
        self.ast
            .expression_logical(SPAN, left, LogicalOperator::And, right)
    }

    fn params(&self, names: &[&str]) -> FormalParameters<'a> {
        let items = self.ast.vec_from_iter(names.iter().map(|name| {
            self.ast.plain_formal_parameter(
                SPAN,
                self.ast
                    .binding_pattern_binding_identifier(SPAN, self.ast.atom(name)),
            )
        }));
        self.ast
            .formal_parameters(SPAN, FormalParameterKind::FormalParameter, items, NONE)
    }

    /// `function (params) { body }`
    pub fn function(&self, params: &[&str], body: FunctionBody<'a>) -> Expression<'a> {
        self.ast.expression_function(
            SPAN,
            FunctionType::FunctionExpression,
            None,
            false,
            false,
            false,
            NONE,
            NONE,
            self.params(params),
            NONE,
            Some(body),
        )
    }

    /// `function (params) { return value; }`
    pub fn returning(&self, params: &[&str], value: Expression<'a>) -> Expression<'a> {
        let body = self.ast.function_body(
            SPAN,
            self.ast.vec(),
            self.ast
                .vec1(self.ast.statement_return(SPAN, Some(value))),
        );
        self.function(params, body)
    }

    fn global_call(&self, method: &str, args: Vec<Expression<'a>>) -> Expression<'a> {
        let callee = self.member(self.identifier(&self.names.global), method);
        self.call(callee, args)
    }

    fn view_call(&self, method: &str, args: Vec<Expression<'a>>) -> Expression<'a> {
        let callee = self.member(self.identifier(&self.names.view_handle), method);
        self.call(callee, args)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// `Flint.view("Name.Sub", function (__, on) { body })`
    pub fn component_register(&self, qualified_name: &str, body: FunctionBody<'a>) -> Expression<'a> {
        let handles = [
            self.names.view_handle.as_str(),
            self.names.event_handle.as_str(),
        ];
        let view_fn = self.function(&handles, body);
        self.global_call("view", vec![self.string(qualified_name), view_fn])
    }

    /// `Flint.style("style", function () { body })`
    pub fn style_register(&self, body: FunctionBody<'a>) -> Expression<'a> {
        let style_fn = self.function(&[], body);
        self.global_call("style", vec![self.string("style"), style_fn])
    }

    /// One style slot assignment. Dynamic slots wrap `value` in an index accessor.
    pub fn style_slot(
        &self,
        registry: StyleRegistry,
        tags: &TagPath,
        value: Expression<'a>,
    ) -> Statement<'a> {
        let styles = self.member(
            self.identifier(&self.names.view_handle),
            &self.names.style_registry,
        );
        let (target, right) = match registry {
            StyleRegistry::Static => {
                let statics = self.member(styles, &self.names.static_registry);
                (self.computed_member(statics, &tags.key()), value)
            }
            StyleRegistry::Dynamic => (
                self.computed_member(styles, &tags.key()),
                self.returning(&[self.names.index_binding.as_str()], value),
            ),
        };
        let assignment = self.ast.expression_assignment(
            SPAN,
            AssignmentOperator::Assign,
            AssignmentTarget::from(SimpleAssignmentTarget::from(target)),
            right,
        );
        self.ast.statement_expression(SPAN, assignment)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REACTIVITY
    // ═══════════════════════════════════════════════════════════════════════════

    /// `__.set("name", expr)`
    pub fn setter_report(&self, name: &str, expr: Expression<'a>) -> Expression<'a> {
        self.view_call("set", vec![self.string(name), expr])
    }

    /// `__.get("name", expr)`
    pub fn getter_report(&self, name: &str, expr: Expression<'a>) -> Expression<'a> {
        self.view_call("get", vec![self.string(name), expr])
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MARKUP
    // ═══════════════════════════════════════════════════════════════════════════

    /// `Flint.routeMatch(route) && node`
    pub fn route_match(&self, route: Expression<'a>, node: Expression<'a>) -> Expression<'a> {
        self.and(self.global_call("routeMatch", vec![route]), node)
    }

    /// `Flint.routeParams(route)`
    pub fn route_params(&self, route: Expression<'a>) -> Expression<'a> {
        self.global_call("routeParams", vec![route])
    }

    /// `Flint.range(count).map(function (_, _index) { return node; })`
    pub fn range_map(&self, count: Expression<'a>, node: Expression<'a>) -> Expression<'a> {
        let range = self.global_call("range", vec![count]);
        let mapper = self.returning(&["_", self.names.index_binding.as_str()], node);
        self.call(self.member(range, "map"), vec![mapper])
    }

    /// `__.render(function () { return node; })`
    pub fn render_register(&self, node: Expression<'a>) -> Expression<'a> {
        let thunk = self.returning(&[], node);
        self.view_call("render", vec![thunk])
    }

    /// `Flint.el(identity, props, children)`
    pub fn element_create(
        &self,
        identity: Expression<'a>,
        props: Expression<'a>,
        children: Expression<'a>,
    ) -> Expression<'a> {
        self.global_call("el", vec![identity, props, children])
    }

    /// `Flint.fragment(children)`
    pub fn fragment_create(&self, children: Expression<'a>) -> Expression<'a> {
        self.global_call("fragment", vec![children])
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RECOGNIZERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// `__.set(..)` / `__.get(..)` calls that already carry a report.
    pub fn report_kind(&self, call: &CallExpression<'a>) -> Option<ReportKind> {
        if call.arguments.len() != 2 {
            return None;
        }
        let member = call.callee.get_inner_expression().as_member_expression()?;
        if !member.object().is_specific_id(&self.names.view_handle) {
            return None;
        }
        match member.static_property_name()? {
            "set" => Some(ReportKind::Set),
            "get" => Some(ReportKind::Get),
            _ => None,
        }
    }

    /// `__.get("name", ..)` for exactly this binding. A setter report or a
    /// getter for another binding still needs its own getter.
    pub fn is_getter_for(&self, expr: &Expression<'a>, name: &str) -> bool {
        let Expression::CallExpression(call) = expr else {
            return false;
        };
        if self.report_kind(call) != Some(ReportKind::Get) {
            return false;
        }
        matches!(
            call.arguments.first().and_then(|arg| arg.as_expression()),
            Some(Expression::StringLiteral(lit)) if lit.value.as_str() == name
        )
    }

    /// Member targets the framework owns: the style registry (`__.$...`) and
    /// the render slot (`__.render`).
    pub fn is_framework_target(&self, target: &AssignmentTarget<'a>) -> bool {
        let Some(member) = target.as_member_expression() else {
            return false;
        };
        let Some((root, path)) = member_path(member) else {
            return false;
        };
        if root != self.names.view_handle {
            return false;
        }
        match path.first().map(String::as_str) {
            Some(first) if first == self.names.style_registry => true,
            Some("render") => path.len() == 1,
            _ => false,
        }
    }
}

/// Root identifier and property names of a member chain, `a.b["c"]` is `("a", ["b", "c"])`.
/// Computed keys that are not string literals read as `*`.
pub fn member_path(member: &MemberExpression<'_>) -> Option<(String, Vec<String>)> {
    let mut path = vec![member
        .static_property_name()
        .map_or_else(|| "*".to_string(), str::to_string)];
    let mut object = member.object().without_parentheses();
    loop {
        match object {
            Expression::Identifier(id) => {
                path.reverse();
                return Some((id.name.to_string(), path));
            }
            _ => {
                let inner = object.as_member_expression()?;
                path.push(
                    inner
                        .static_property_name()
                        .map_or_else(|| "*".to_string(), str::to_string),
                );
                object = inner.object().without_parentheses();
            }
        }
    }
}

/// Root identifier of an expression: `x`, `x.y`, `x[i].z` all root at `x`.
pub fn root_identifier<'b>(expr: &'b Expression<'_>) -> Option<&'b str> {
    let mut current = expr.without_parentheses();
    loop {
        match current {
            Expression::Identifier(id) => return Some(id.name.as_str()),
            _ => current = current.as_member_expression()?.object().without_parentheses(),
        }
    }
}

/// Root identifier of an assignment or update target.
pub fn target_root<'b>(target: &'b SimpleAssignmentTarget<'_>) -> Option<&'b str> {
    match target {
        SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => Some(id.name.as_str()),
        _ => root_identifier(target.as_member_expression()?.object()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{parse_expression, print_expression, print_statements};
    use oxc_allocator::Allocator;

    fn builder(allocator: &Allocator) -> RuntimeBuilder<'_> {
        RuntimeBuilder::new(AstBuilder::new(allocator), RuntimeNames::default())
    }

    #[test]
    fn tag_path_keys() {
        assert_eq!(TagPath::default().key(), "$");
        assert_eq!(TagPath(vec!["h1".into()]).key(), "h1");
        assert_eq!(TagPath(vec!["h1".into(), "span".into()]).key(), "h1,span");
    }

    #[test]
    fn style_slots_are_computed_members() {
        let allocator = Allocator::default();
        let rt = builder(&allocator);
        let tags = TagPath(vec!["h1".into()]);
        let statics = rt.style_slot(StyleRegistry::Static, &tags, rt.number(1));
        let dynamics = rt.style_slot(StyleRegistry::Dynamic, &tags, rt.identifier("color"));
        let code = print_statements(&allocator, vec![statics, dynamics]);
        crate::test_support::assert_code_contains(&code, r#"__.$._static["h1"] = 1;"#);
        crate::test_support::assert_code_contains(
            &code,
            r#"__.$["h1"] = function(_index) { return color; };"#,
        );
    }

    #[test]
    fn range_map_binds_index() {
        let allocator = Allocator::default();
        let rt = builder(&allocator);
        let expr = rt.range_map(rt.identifier("n"), rt.identifier("node"));
        crate::test_support::assert_code_contains(
            &print_expression(&allocator, expr),
            "Flint.range(n).map(function(_, _index) { return node; })",
        );
    }

    #[test]
    fn recognizes_reports_and_framework_targets() {
        let allocator = Allocator::default();
        let rt = builder(&allocator);

        let getter = parse_expression(&allocator, r#"__.get("x", 1)"#);
        assert!(rt.is_getter_for(&getter, "x"));
        assert!(!rt.is_getter_for(&getter, "y"));
        let setter = parse_expression(&allocator, r#"__.set("x", x = 1)"#);
        assert!(!rt.is_getter_for(&setter, "x"));
        let other = parse_expression(&allocator, r#"view.get("x", 1)"#);
        assert!(!rt.is_getter_for(&other, "x"));

        for (src, expected) in [
            (r#"__.$["h1"] = 1"#, true),
            (r#"__.$._static["h1"] = 1"#, true),
            ("__.render = 1", true),
            ("__.render.x = 1", false),
            ("state.render = 1", false),
            ("x = 1", false),
        ] {
            let Expression::AssignmentExpression(assign) = parse_expression(&allocator, src) else {
                panic!("not an assignment: {}", src);
            };
            assert_eq!(rt.is_framework_target(&assign.left), expected, "{}", src);
        }
    }

    #[test]
    fn roots_of_member_chains() {
        let allocator = Allocator::default();
        let expr = parse_expression(&allocator, "a.b[c].d");
        assert_eq!(root_identifier(&expr), Some("a"));
        let call = parse_expression(&allocator, "f().x");
        assert_eq!(root_identifier(&call), None);

        let member = parse_expression(&allocator, r#"a.b["c"][d]"#);
        let (root, path) = member_path(member.as_member_expression().unwrap()).unwrap();
        assert_eq!(root, "a");
        assert_eq!(path, vec!["b", "c", "*"]);
    }
}
