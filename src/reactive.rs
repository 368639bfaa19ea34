//! Reactive binding rewriter.
//!
//! Writes to component state are wrapped in `__.set("name", ..)` so the view
//! can schedule a re-render, and state initializers are wrapped in
//! `__.get("name", ..)` so the view can restore them across renders. Every
//! handler here runs on the way *out* of a node, after its children were
//! rewritten.

use crate::runtime::{root_identifier, target_root, RuntimeBuilder};
use crate::scope::ScopeChain;
use lazy_static::lazy_static;
use oxc_allocator::{Address, GetAddress, TakeIn};
use oxc_ast::ast::*;
use std::collections::HashSet;

lazy_static! {
    /// Array methods that mutate their receiver in place.
    static ref MUTATING_METHODS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("push");
        s.insert("pop");
        s.insert("shift");
        s.insert("unshift");
        s.insert("splice");
        s.insert("reverse");
        s.insert("sort");
        s
    };
}

pub fn is_mutating_method(name: &str) -> bool {
    MUTATING_METHODS.contains(name)
}

/// Nodes already wrapped in a report, by arena address.
#[derive(Debug, Default)]
pub struct InstrumentationLedger {
    tagged: HashSet<Address>,
    setters: usize,
    getters: usize,
}

impl InstrumentationLedger {
    pub fn is_tagged(&self, address: Address) -> bool {
        self.tagged.contains(&address)
    }

    pub fn tag(&mut self, address: Address) {
        self.tagged.insert(address);
    }

    pub fn setters(&self) -> usize {
        self.setters
    }

    pub fn getters(&self) -> usize {
        self.getters
    }
}

pub struct Rewriter<'r, 'a> {
    rt: &'r RuntimeBuilder<'a>,
    scopes: &'r ScopeChain,
    ledger: &'r mut InstrumentationLedger,
}

impl<'r, 'a> Rewriter<'r, 'a> {
    pub fn new(
        rt: &'r RuntimeBuilder<'a>,
        scopes: &'r ScopeChain,
        ledger: &'r mut InstrumentationLedger,
    ) -> Self {
        Self { rt, scopes, ledger }
    }

    /// On entry: the payload of a report already present in the source is
    /// never wrapped again, so recompiling output is a no-op.
    pub fn mark_existing_reports(&mut self, expr: &Expression<'a>) {
        let Expression::CallExpression(call) = expr else {
            return;
        };
        if self.rt.report_kind(call).is_none() {
            return;
        }
        if let Some(payload) = call.arguments.get(1) {
            self.ledger.tag(payload.address());
        }
    }

    /// On exit of any expression.
    pub fn exit_expression(&mut self, expr: &mut Expression<'a>) {
        if !self.scopes.in_view() || self.ledger.is_tagged(expr.address()) {
            return;
        }
        match expr {
            Expression::CallExpression(_) => self.exit_call(expr),
            Expression::UpdateExpression(_) => self.exit_update(expr),
            Expression::AssignmentExpression(_) => self.exit_assignment(expr),
            _ => {}
        }
    }

    /// Name reported for a mutating call, if it writes to tracked state.
    fn mutation_name(&self, call: &CallExpression<'a>) -> Option<String> {
        if self.rt.report_kind(call).is_some() {
            return None;
        }
        let member = call.callee.get_inner_expression().as_member_expression()?;
        if member.is_specific_member_access("Object", "assign") {
            let Some(Expression::Identifier(first)) =
                call.arguments.first().and_then(Argument::as_expression)
            else {
                return None;
            };
            let name = first.name.as_str();
            return self.scopes.is_tracked(name).then(|| name.to_string());
        }
        let method = member.static_property_name()?;
        if !is_mutating_method(method) {
            return None;
        }
        let root = root_identifier(member.object())?;
        self.scopes.is_tracked(root).then(|| root.to_string())
    }

    fn exit_call(&mut self, expr: &mut Expression<'a>) {
        let Expression::CallExpression(call) = &*expr else {
            return;
        };
        let Some(name) = self.mutation_name(call) else {
            return;
        };
        self.wrap_setter(&name, expr);
    }

    fn exit_update(&mut self, expr: &mut Expression<'a>) {
        let Expression::UpdateExpression(update) = &*expr else {
            return;
        };
        let Some(name) = target_root(&update.argument)
            .filter(|root| self.scopes.is_tracked(root))
            .map(str::to_string)
        else {
            return;
        };
        self.wrap_setter(&name, expr);
    }

    fn exit_assignment(&mut self, expr: &mut Expression<'a>) {
        let Expression::AssignmentExpression(assign) = expr else {
            return;
        };
        if self.rt.is_framework_target(&assign.left) {
            return;
        }
        // Compound operators other than += and -= are left alone.
        if !matches!(
            assign.operator,
            AssignmentOperator::Assign
                | AssignmentOperator::Addition
                | AssignmentOperator::Subtraction
        ) {
            return;
        }
        let Some(target) = assign.left.as_simple_assignment_target() else {
            return;
        };
        let Some(name) = target_root(target)
            .filter(|root| self.scopes.is_tracked(root))
            .map(str::to_string)
        else {
            return;
        };

        let direct = matches!(
            assign.left,
            AssignmentTarget::AssignmentTargetIdentifier(_)
        );
        if direct && self.scopes.is_view_body() && !self.rt.is_getter_for(&assign.right, &name) {
            let value = assign.right.take_in(self.rt.ast);
            assign.right = self.rt.getter_report(&name, value);
            self.ledger.getters += 1;
        }
        self.wrap_setter(&name, expr);
    }

    fn wrap_setter(&mut self, name: &str, expr: &mut Expression<'a>) {
        tracing::trace!(binding = name, "instrumenting write");
        let original = expr.take_in(self.rt.ast);
        self.ledger.tag(original.address());
        *expr = self.rt.setter_report(name, original);
        self.ledger.tag(expr.address());
        self.ledger.setters += 1;
    }

    /// Declarations directly in a component body restore their value through
    /// `__.get`. Constants and destructuring patterns are not state.
    pub fn exit_declaration(&mut self, decl: &mut VariableDeclaration<'a>) {
        if !self.scopes.is_view_body()
            || !matches!(
                decl.kind,
                VariableDeclarationKind::Var | VariableDeclarationKind::Let
            )
        {
            return;
        }
        for declarator in decl.declarations.iter_mut() {
            let BindingPattern::BindingIdentifier(id) = &declarator.id else {
                continue;
            };
            let name = id.name.to_string();
            let init = declarator
                .init
                .take()
                .unwrap_or_else(|| self.rt.undefined());
            if self.rt.is_getter_for(&init, &name) {
                declarator.init = Some(init);
                continue;
            }
            tracing::trace!(binding = %name, "restoring declaration");
            declarator.init = Some(self.rt.getter_report(&name, init));
            self.ledger.getters += 1;
        }
    }
}
