//! Visit dispatcher for the Flint transform.
//!
//! One traversal drives every rewrite. The dispatcher owns the scope chain,
//! the per-component key counter and both visit ledgers, and hands borrowed
//! views of them to the rewriters as it enters and leaves nodes.

use crate::markup::{self, ElementKeyCounter, ElementLedger, VisitState};
use crate::options::RuntimeNames;
use crate::preprocess::{DslStatement, DslTable};
use crate::reactive::{InstrumentationLedger, Rewriter};
use crate::runtime::{RuntimeBuilder, TagPath};
use crate::scope::{Frame, ScopeChain};
use crate::style;
use oxc_allocator::{Allocator, Box as OxcBox, GetAddress, TakeIn, Vec as OxcVec};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::walk_mut::{
    walk_arrow_function_expression, walk_block_statement, walk_catch_clause, walk_expression,
    walk_for_in_statement, walk_for_of_statement, walk_for_statement, walk_function,
    walk_program, walk_statement, walk_statements, walk_variable_declaration,
};
use oxc_ast_visit::VisitMut;
use oxc_span::SPAN;
use oxc_syntax::scope::ScopeFlags;
use serde::{Deserialize, Serialize};

/// What one traversal did to a program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSummary {
    /// Qualified names of the registered components, in source order.
    pub components: Vec<String>,
    pub style_blocks: u32,
    /// Elements lowered to element-creation calls.
    pub elements: usize,
    /// Element visits across both passes.
    pub element_visits: usize,
    pub setters: usize,
    pub getters: usize,
}

pub struct FlintTransformer<'a, 't> {
    runtime: RuntimeBuilder<'a>,
    table: &'t DslTable,
    scopes: ScopeChain,
    keys: ElementKeyCounter,
    elements: ElementLedger,
    instrumented: InstrumentationLedger,
    /// Nesting of element lowering; render roots only appear at depth 0.
    markup_depth: usize,
    summary: TransformSummary,
}

impl<'a, 't> FlintTransformer<'a, 't> {
    pub fn new(allocator: &'a Allocator, table: &'t DslTable, names: RuntimeNames) -> Self {
        let scopes = ScopeChain::new(&names.view_handle, &names.event_handle);
        Self {
            runtime: RuntimeBuilder::new(AstBuilder::new(allocator), names),
            table,
            scopes,
            keys: ElementKeyCounter::default(),
            elements: ElementLedger::default(),
            instrumented: InstrumentationLedger::default(),
            markup_depth: 0,
            summary: TransformSummary::default(),
        }
    }

    pub fn transform(mut self, program: &mut Program<'a>) -> TransformSummary {
        self.visit_program(program);
        let mut summary = self.summary;
        summary.elements = self
            .elements
            .visits()
            .filter(|state| *state == VisitState::FullyDone)
            .count();
        summary.setters = self.instrumented.setters();
        summary.getters = self.instrumented.getters();
        summary
    }

    fn rewriter(&mut self) -> Rewriter<'_, 'a> {
        Rewriter::new(&self.runtime, &self.scopes, &mut self.instrumented)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATEMENT EXPANSION
    // ═══════════════════════════════════════════════════════════════════════════

    fn dsl_statement(&self, stmt: &Statement<'a>) -> Option<&'t DslStatement> {
        let table: &'t DslTable = self.table;
        let Statement::FunctionDeclaration(func) = stmt else {
            return None;
        };
        table.lookup(&func.id.as_ref()?.name)
    }

    /// Replaces a placeholder declaration with its registration call, after
    /// transforming the body inside the matching frame.
    fn expand_dsl(&mut self, stmt: &mut Statement<'a>, dsl: &DslStatement) {
        let Statement::FunctionDeclaration(func) = stmt else {
            return;
        };
        let Some(body) = func.body.take() else {
            return;
        };
        let call = match dsl.qualified_name() {
            Some(name) => self.register_component(name, body),
            None => self.register_style(body),
        };
        *stmt = self.runtime.ast.statement_expression(SPAN, call);
    }

    fn register_component(
        &mut self,
        name: String,
        mut body: OxcBox<'a, FunctionBody<'a>>,
    ) -> Expression<'a> {
        let outer_keys = std::mem::take(&mut self.keys);
        self.scopes.push(Frame::component(
            &body,
            &self.runtime.names.view_handle,
            &self.runtime.names.event_handle,
        ));
        self.visit_function_body(&mut body);
        self.scopes.pop();
        let keys = std::mem::replace(&mut self.keys, outer_keys);

        tracing::debug!(component = %name, element_kinds = keys.len(), "registered component");
        let call = self.runtime.component_register(&name, body.unbox());
        self.summary.components.push(name);
        call
    }

    fn register_style(&mut self, mut body: OxcBox<'a, FunctionBody<'a>>) -> Expression<'a> {
        self.scopes.push(Frame::style_block(&body));
        self.visit_function_body(&mut body);
        self.scopes.pop();

        self.summary.style_blocks += 1;
        tracing::debug!(index = self.summary.style_blocks, "registered style block");
        self.runtime.style_register(body.unbox())
    }

    /// Tag path and body of a style descriptor statement, taking the body out.
    fn take_descriptor(&self, stmt: &mut Statement<'a>) -> Option<(TagPath, Expression<'a>)> {
        let Statement::ExpressionStatement(statement) = stmt else {
            return None;
        };
        let Expression::AssignmentExpression(assign) = &mut statement.expression else {
            return None;
        };
        let tags = style::descriptor_tags(assign)?;
        Some((tags, assign.right.take_in(self.runtime.ast)))
    }

    fn expand_descriptors(&mut self, stmts: &mut OxcVec<'a, Statement<'a>>) {
        let statements = std::mem::replace(stmts, self.runtime.ast.vec());
        let mut expanded = self.runtime.ast.vec_with_capacity(statements.len() + 1);
        for mut stmt in statements {
            match self.take_descriptor(&mut stmt) {
                Some((tags, body)) => {
                    expanded.extend(style::split_style(&self.runtime, &tags, body))
                }
                None => expanded.push(stmt),
            }
        }
        *stmts = expanded;
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MARKUP
    // ═══════════════════════════════════════════════════════════════════════════

    fn visit_element(&mut self, expr: &mut Expression<'a>) {
        let address = expr.address();
        match self.elements.state(address) {
            VisitState::Unvisited => {
                let Expression::JSXElement(element) = expr else {
                    return;
                };
                self.summary.element_visits += 1;
                markup::expand_sync(&self.runtime, element);
                let identity = markup::identify(element, &self.scopes, &mut self.keys);
                let sugar = markup::extract_sugar(&self.runtime, element);
                self.elements.first_pass_done(address, identity);

                let render = self.markup_depth == 0 && self.scopes.is_view_body();
                let node = expr.take_in(self.runtime.ast);
                *expr = markup::compose(&self.runtime, node, sugar, render);
                // Reaches the element again through whatever now wraps it.
                self.visit_expression(expr);
            }
            VisitState::FirstPassDone => {
                let Some(mut identity) = self.elements.finish(address) else {
                    return;
                };
                let Expression::JSXElement(element) = expr else {
                    return;
                };
                self.summary.element_visits += 1;
                identity.indexed = self
                    .scopes
                    .has_binding(&self.runtime.names.index_binding);

                let ast = self.runtime.ast;
                let attributes =
                    std::mem::replace(&mut element.opening_element.attributes, ast.vec());
                let children = std::mem::replace(&mut element.children, ast.vec());

                self.markup_depth += 1;
                let props = self.lower_attributes(attributes);
                let children = self.lower_children(children);
                self.markup_depth -= 1;

                let children = if children.is_empty() {
                    self.runtime.null()
                } else {
                    ast.expression_array(SPAN, children)
                };
                *expr = self.runtime.element_create(
                    identity.to_expression(&self.runtime),
                    props,
                    children,
                );
            }
            VisitState::FullyDone => {}
        }
    }

    fn visit_fragment(&mut self, expr: &mut Expression<'a>) {
        let Expression::JSXFragment(fragment) = expr else {
            return;
        };
        let render = self.markup_depth == 0 && self.scopes.is_view_body();
        let children = std::mem::replace(&mut fragment.children, self.runtime.ast.vec());
        self.markup_depth += 1;
        let children = self.lower_children(children);
        self.markup_depth -= 1;
        let children = self.runtime.ast.expression_array(SPAN, children);
        let node = self.runtime.fragment_create(children);
        *expr = if render {
            self.runtime.render_register(node)
        } else {
            node
        };
    }

    /// Markup nested in attributes or children is visited like any other expression.
    fn lower_nested(&mut self, mut expr: Expression<'a>) -> Expression<'a> {
        self.visit_expression(&mut expr);
        expr
    }

    fn lower_attribute_value(&mut self, value: Option<JSXAttributeValue<'a>>) -> Expression<'a> {
        let ast = self.runtime.ast;
        match value {
            None => ast.expression_boolean_literal(SPAN, true),
            Some(JSXAttributeValue::StringLiteral(lit)) => Expression::StringLiteral(lit),
            Some(JSXAttributeValue::ExpressionContainer(container)) => {
                let expression = container.unbox().expression;
                if expression.is_expression() {
                    self.lower_nested(expression.into_expression())
                } else {
                    ast.expression_boolean_literal(SPAN, true)
                }
            }
            Some(JSXAttributeValue::Element(element)) => {
                self.lower_nested(Expression::JSXElement(element))
            }
            Some(JSXAttributeValue::Fragment(fragment)) => {
                self.lower_nested(Expression::JSXFragment(fragment))
            }
        }
    }

    fn lower_attributes(&mut self, attributes: OxcVec<'a, JSXAttributeItem<'a>>) -> Expression<'a> {
        let ast = self.runtime.ast;
        if attributes.is_empty() {
            return self.runtime.null();
        }
        let mut props = ast.vec_with_capacity(attributes.len());
        for item in attributes {
            match item {
                JSXAttributeItem::Attribute(attr) => {
                    let JSXAttribute { name, value, .. } = attr.unbox();
                    let key = markup::prop_key(&self.runtime, &name);
                    let value = self.lower_attribute_value(value);
                    props.push(ast.object_property_kind_object_property(
                        SPAN,
                        PropertyKind::Init,
                        key,
                        value,
                        false,
                        false,
                        false,
                    ));
                }
                JSXAttributeItem::SpreadAttribute(spread) => {
                    let argument = self.lower_nested(spread.unbox().argument);
                    props.push(ast.object_property_kind_spread_property(SPAN, argument));
                }
            }
        }
        ast.expression_object(SPAN, props)
    }

    fn lower_children(
        &mut self,
        children: OxcVec<'a, JSXChild<'a>>,
    ) -> OxcVec<'a, ArrayExpressionElement<'a>> {
        let ast = self.runtime.ast;
        let mut items = ast.vec_with_capacity(children.len());
        for child in children {
            match child {
                JSXChild::Text(text) => {
                    if let Some(text) = markup::text_child(&self.runtime, &text) {
                        items.push(ArrayExpressionElement::from(text));
                    }
                }
                JSXChild::Element(element) => {
                    let lowered = self.lower_nested(Expression::JSXElement(element));
                    items.push(ArrayExpressionElement::from(lowered));
                }
                JSXChild::Fragment(fragment) => {
                    let lowered = self.lower_nested(Expression::JSXFragment(fragment));
                    items.push(ArrayExpressionElement::from(lowered));
                }
                JSXChild::ExpressionContainer(container) => {
                    let expression = container.unbox().expression;
                    if expression.is_expression() {
                        let lowered = self.lower_nested(expression.into_expression());
                        items.push(ArrayExpressionElement::from(lowered));
                    }
                }
                JSXChild::Spread(spread) => {
                    let lowered = self.lower_nested(spread.unbox().expression);
                    items.push(ast.array_expression_element_spread_element(SPAN, lowered));
                }
            }
        }
        items
    }
}

impl<'a, 't> VisitMut<'a> for FlintTransformer<'a, 't> {
    fn visit_program(&mut self, program: &mut Program<'a>) {
        self.scopes.push(Frame::program(program));
        walk_program(self, program);
        self.scopes.pop();
    }

    fn visit_statement(&mut self, stmt: &mut Statement<'a>) {
        match self.dsl_statement(stmt) {
            Some(dsl) => self.expand_dsl(stmt, dsl),
            None => walk_statement(self, stmt),
        }
    }

    fn visit_statements(&mut self, stmts: &mut OxcVec<'a, Statement<'a>>) {
        if self.scopes.in_view() || self.scopes.in_style_block() {
            self.expand_descriptors(stmts);
        }
        walk_statements(self, stmts);
    }

    fn visit_function(&mut self, func: &mut Function<'a>, flags: ScopeFlags) {
        self.scopes
            .push(Frame::function(&func.params, func.body.as_deref()));
        walk_function(self, func, flags);
        self.scopes.pop();
    }

    fn visit_arrow_function_expression(&mut self, arrow: &mut ArrowFunctionExpression<'a>) {
        self.scopes
            .push(Frame::function(&arrow.params, Some(&*arrow.body)));
        walk_arrow_function_expression(self, arrow);
        self.scopes.pop();
    }

    fn visit_block_statement(&mut self, block: &mut BlockStatement<'a>) {
        self.scopes.push(Frame::block(&block.body));
        walk_block_statement(self, block);
        self.scopes.pop();
    }

    fn visit_catch_clause(&mut self, clause: &mut CatchClause<'a>) {
        self.scopes.push(Frame::catch_clause(clause.param.as_ref()));
        walk_catch_clause(self, clause);
        self.scopes.pop();
    }

    fn visit_for_statement(&mut self, stmt: &mut ForStatement<'a>) {
        let head = match &stmt.init {
            Some(ForStatementInit::VariableDeclaration(decl)) => Some(&**decl),
            _ => None,
        };
        self.scopes.push(Frame::loop_head(head));
        walk_for_statement(self, stmt);
        self.scopes.pop();
    }

    fn visit_for_in_statement(&mut self, stmt: &mut ForInStatement<'a>) {
        let head = match &stmt.left {
            ForStatementLeft::VariableDeclaration(decl) => Some(&**decl),
            _ => None,
        };
        self.scopes.push(Frame::loop_head(head));
        walk_for_in_statement(self, stmt);
        self.scopes.pop();
    }

    fn visit_for_of_statement(&mut self, stmt: &mut ForOfStatement<'a>) {
        let head = match &stmt.left {
            ForStatementLeft::VariableDeclaration(decl) => Some(&**decl),
            _ => None,
        };
        self.scopes.push(Frame::loop_head(head));
        walk_for_of_statement(self, stmt);
        self.scopes.pop();
    }

    fn visit_variable_declaration(&mut self, decl: &mut VariableDeclaration<'a>) {
        walk_variable_declaration(self, decl);
        self.rewriter().exit_declaration(decl);
    }

    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        match expr {
            Expression::JSXElement(_) => self.visit_element(expr),
            Expression::JSXFragment(_) => self.visit_fragment(expr),
            _ => {
                self.rewriter().mark_existing_reports(expr);
                walk_expression(self, expr);
                self.rewriter().exit_expression(expr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::preprocess;
    use crate::test_support::{assert_code_contains, assert_code_lacks, parse_program};
    use oxc_codegen::Codegen;

    fn run(src: &str) -> (String, TransformSummary) {
        let allocator = Allocator::default();
        let pre = preprocess(src);
        let source = allocator.alloc_str(&pre.source);
        let mut program = parse_program(&allocator, source);
        let summary = FlintTransformer::new(&allocator, &pre.table, RuntimeNames::default())
            .transform(&mut program);
        (Codegen::new().build(&program).code, summary)
    }

    #[test]
    fn component_header_becomes_registration() {
        let (code, summary) = run("view Main {\n  let count = 0\n}\n");
        assert_code_contains(&code, r#"Flint.view("Main", function(__, on) {"#);
        assert_code_contains(&code, r#"let count = __.get("count", 0);"#);
        assert_code_lacks(&code, "__flint$");
        assert_eq!(summary.components, vec!["Main"]);
    }

    #[test]
    fn style_block_registers_without_handles() {
        let (code, summary) = run("style {\n  $h1 = { color: 'red' }\n}\n");
        assert_code_contains(&code, r#"Flint.style("style", function() {"#);
        assert_code_contains(&code, r#"__.$._static["h1"] = { color: "red" };"#);
        assert_eq!(summary.style_blocks, 1);
    }

    #[test]
    fn descriptors_outside_views_are_plain_assignments() {
        let (code, _) = run("$h1 = { color: 'red' };\n");
        assert_code_contains(&code, r#"$h1 = { color: "red" };"#);
        assert_code_lacks(&code, "_static");
    }

    #[test]
    fn only_top_level_markup_is_a_render_root() {
        let (code, summary) = run("view Main {\n  <div><span>hi</span>{open && <b />}</div>\n}\n");
        assert_eq!(code.matches("__.render").count(), 1, "{}", code);
        assert_code_contains(
            &code,
            r#"__.render(function() { return Flint.el(["div", 1], null, [Flint.el(["span", 1], null, ["hi"]), open && Flint.el(["b", 1], null, null)]); })"#,
        );
        assert_eq!(summary.elements, 3);
        assert_eq!(summary.element_visits, 6);
    }

    #[test]
    fn fragments_lower_their_children() {
        let (code, _) = run("const x = <><p /> text </>;\n");
        assert_code_contains(&code, r#"Flint.fragment([Flint.el(["p", 1], null, null), "text"])"#);
    }
}
