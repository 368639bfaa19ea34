//! Lexical binding frames.
//!
//! The dispatcher owns a [`ScopeChain`] and pushes/pops one [`Frame`] per
//! lexical construct as it walks. Rewriters only ever see `&ScopeChain`.

use crate::preprocess::DslTable;
use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Program,
    Component,
    StyleBlock,
    Function,
    Block,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    bindings: HashSet<String>,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            bindings: HashSet::new(),
        }
    }

    pub fn binds(&self, name: &str) -> bool {
        self.bindings.contains(name)
    }

    pub fn bind(&mut self, name: impl Into<String>) {
        self.bindings.insert(name.into());
    }

    pub fn program(program: &Program<'_>) -> Self {
        let mut frame = Self::new(FrameKind::Program);
        frame.collect_hoisted(&program.body);
        frame.collect_lexical(&program.body);
        frame
    }

    /// Component body: the two hidden handles plus everything the body declares.
    pub fn component(body: &FunctionBody<'_>, view_handle: &str, event_handle: &str) -> Self {
        let mut frame = Self::new(FrameKind::Component);
        frame.bind(view_handle);
        frame.bind(event_handle);
        frame.collect_hoisted(&body.statements);
        frame.collect_lexical(&body.statements);
        frame
    }

    pub fn style_block(body: &FunctionBody<'_>) -> Self {
        let mut frame = Self::new(FrameKind::StyleBlock);
        frame.collect_hoisted(&body.statements);
        frame.collect_lexical(&body.statements);
        frame
    }

    pub fn function(params: &FormalParameters<'_>, body: Option<&FunctionBody<'_>>) -> Self {
        let mut frame = Self::new(FrameKind::Function);
        for param in &params.items {
            frame.collect_pattern(&param.pattern);
        }
        if let Some(rest) = &params.rest {
            frame.collect_pattern(&rest.rest.argument);
        }
        if let Some(body) = body {
            frame.collect_hoisted(&body.statements);
            frame.collect_lexical(&body.statements);
        }
        frame
    }

    pub fn block(statements: &[Statement<'_>]) -> Self {
        let mut frame = Self::new(FrameKind::Block);
        frame.collect_lexical(statements);
        frame
    }

    pub fn catch_clause(param: Option<&CatchParameter<'_>>) -> Self {
        let mut frame = Self::new(FrameKind::Block);
        if let Some(param) = param {
            frame.collect_pattern(&param.pattern);
        }
        frame
    }

    /// `for (let i ...)` heads; `var` heads hoist to the enclosing function instead.
    pub fn loop_head(declaration: Option<&VariableDeclaration<'_>>) -> Self {
        let mut frame = Self::new(FrameKind::Block);
        if let Some(decl) = declaration.filter(|d| d.kind != VariableDeclarationKind::Var) {
            for declarator in &decl.declarations {
                frame.collect_pattern(&declarator.id);
            }
        }
        frame
    }

    fn collect_pattern(&mut self, pattern: &BindingPattern<'_>) {
        for id in pattern.get_binding_identifiers() {
            self.bind(id.name.as_str());
        }
    }

    fn collect_hoisted(&mut self, statements: &[Statement<'_>]) {
        let mut collector = VarCollector {
            names: &mut self.bindings,
        };
        for stmt in statements {
            collector.visit_statement(stmt);
        }
    }

    fn collect_lexical(&mut self, statements: &[Statement<'_>]) {
        for stmt in statements {
            match stmt {
                Statement::VariableDeclaration(decl) => {
                    for declarator in &decl.declarations {
                        self.collect_pattern(&declarator.id);
                    }
                }
                Statement::FunctionDeclaration(func) => self.collect_function_name(func),
                Statement::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        self.bind(id.name.as_str());
                    }
                }
                Statement::ImportDeclaration(import) => {
                    if let Some(specifiers) = &import.specifiers {
                        for specifier in specifiers {
                            self.bind(specifier.local().name.as_str());
                        }
                    }
                }
                Statement::ExportNamedDeclaration(export) => match &export.declaration {
                    Some(Declaration::VariableDeclaration(decl)) => {
                        for declarator in &decl.declarations {
                            self.collect_pattern(&declarator.id);
                        }
                    }
                    Some(Declaration::FunctionDeclaration(func)) => self.collect_function_name(func),
                    Some(Declaration::ClassDeclaration(class)) => {
                        if let Some(id) = &class.id {
                            self.bind(id.name.as_str());
                        }
                    }
                    _ => {}
                },
                Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        self.collect_function_name(func)
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        if let Some(id) = &class.id {
                            self.bind(id.name.as_str());
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    fn collect_function_name(&mut self, func: &Function<'_>) {
        if let Some(id) = &func.id {
            if !DslTable::is_placeholder(&id.name) {
                self.bind(id.name.as_str());
            }
        }
    }
}

/// Collects `var` names of one function scope without entering nested functions.
struct VarCollector<'s> {
    names: &'s mut HashSet<String>,
}

impl<'a, 's> Visit<'a> for VarCollector<'s> {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if decl.kind == VariableDeclarationKind::Var {
            for declarator in &decl.declarations {
                for id in declarator.id.get_binding_identifiers() {
                    self.names.insert(id.name.to_string());
                }
            }
        }
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'a>) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE CHAIN
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered frames, outermost first.
#[derive(Debug, Clone)]
pub struct ScopeChain {
    frames: Vec<Frame>,
    view_handle: String,
    event_handle: String,
}

impl ScopeChain {
    pub fn new(view_handle: &str, event_handle: &str) -> Self {
        Self {
            frames: Vec::new(),
            view_handle: view_handle.to_string(),
            event_handle: event_handle.to_string(),
        }
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.binds(name))
    }

    pub fn has_own_binding(&self, name: &str) -> bool {
        self.frames.last().is_some_and(|f| f.binds(name))
    }

    /// Bound at file level, i.e. in the program frame.
    pub fn has_file_binding(&self, name: &str) -> bool {
        self.frames
            .first()
            .is_some_and(|f| f.kind == FrameKind::Program && f.binds(name))
    }

    /// Nearest frame that binds `name`.
    pub fn resolve(&self, name: &str) -> Option<&Frame> {
        self.frames.iter().rev().find(|f| f.binds(name))
    }

    /// Lexically anywhere inside a component body.
    pub fn in_view(&self) -> bool {
        self.has_binding(&self.view_handle)
    }

    /// Directly inside a component body, not in a nested function or block.
    pub fn is_view_body(&self) -> bool {
        self.has_own_binding(&self.view_handle)
    }

    pub fn in_style_block(&self) -> bool {
        self.frames.iter().any(|f| f.kind == FrameKind::StyleBlock)
    }

    /// Component state: resolves to a view frame and is not one of the hidden handles.
    pub fn is_tracked(&self, name: &str) -> bool {
        if name == self.view_handle || name == self.event_handle {
            return false;
        }
        self.resolve(name)
            .is_some_and(|frame| frame.binds(&self.view_handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn parse<'a>(allocator: &'a Allocator, src: &'a str) -> Program<'a> {
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        Parser::new(allocator, src, source_type).parse().program
    }

    fn first_function<'b, 'a>(program: &'b Program<'a>) -> &'b Function<'a> {
        program
            .body
            .iter()
            .find_map(|s| match s {
                Statement::FunctionDeclaration(f) => Some(&**f),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn program_frame_collects_hoisted_and_lexical_names() {
        let allocator = Allocator::default();
        let program = parse(
            &allocator,
            "import Foo, { bar as baz } from 'x';\nlet a = 1;\nif (a) { var hoisted = 2; let inner = 3; }\nfunction helper() { var nope = 1; }\nclass Widget {}\nfunction __flint$0() {}",
        );
        let frame = Frame::program(&program);
        for name in ["Foo", "baz", "a", "hoisted", "helper", "Widget"] {
            assert!(frame.binds(name), "missing {}", name);
        }
        for name in ["inner", "nope", "bar", "__flint$0"] {
            assert!(!frame.binds(name), "unexpected {}", name);
        }
    }

    #[test]
    fn function_frame_collects_params_and_body() {
        let allocator = Allocator::default();
        let program = parse(
            &allocator,
            "function f(a, { b, c: [d] }, e = 1, ...rest) { const g = 1; for (var i = 0;;) {} }",
        );
        let func = first_function(&program);
        let frame = Frame::function(&func.params, func.body.as_deref());
        for name in ["a", "b", "d", "e", "rest", "g", "i"] {
            assert!(frame.binds(name), "missing {}", name);
        }
        assert!(!frame.binds("c"));
    }

    #[test]
    fn tracking_resolves_to_nearest_frame() {
        let allocator = Allocator::default();
        let program = parse(&allocator, "function __flint$0() { let count = 0; let items = []; }");
        let func = first_function(&program);
        let body = func.body.as_deref().unwrap();

        let mut chain = ScopeChain::new("__", "on");
        chain.push(Frame::program(&program));
        assert!(!chain.in_view());

        chain.push(Frame::component(body, "__", "on"));
        assert!(chain.in_view());
        assert!(chain.is_view_body());
        assert!(chain.is_tracked("count"));
        assert!(!chain.is_tracked("__"));
        assert!(!chain.is_tracked("on"));
        assert!(!chain.is_tracked("undeclared"));

        let mut handler = Frame::new(FrameKind::Function);
        handler.bind("count");
        handler.bind("_index");
        chain.push(handler);
        assert!(chain.in_view());
        assert!(!chain.is_view_body());
        assert!(!chain.is_tracked("count"), "shadowed by a nested function");
        assert!(chain.is_tracked("items"));
        assert!(chain.has_binding("_index"));

        chain.pop();
        chain.pop();
        assert!(!chain.has_binding("count"));
        assert_eq!(chain.depth(), 1);
    }

    #[test]
    fn file_binding_only_checks_program_frame() {
        let allocator = Allocator::default();
        let program = parse(&allocator, "const Button = 1;");
        let mut chain = ScopeChain::new("__", "on");
        chain.push(Frame::program(&program));
        let mut inner = Frame::new(FrameKind::Block);
        inner.bind("Local");
        chain.push(inner);
        assert!(chain.has_file_binding("Button"));
        assert!(!chain.has_file_binding("Local"));
        assert!(chain.has_own_binding("Local"));
    }
}
