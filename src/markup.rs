//! Markup element normalization.
//!
//! First visit of an element: stable identity and key, `sync` expansion, and
//! the `repeat` / `route` / `if` / render wrappers. Second visit: the per-
//! iteration index is appended when a `repeat` put one in scope. Lowering to
//! `Flint.el(..)` calls is driven by the dispatcher, which must visit the
//! attribute values and children it takes out of the element.

use crate::runtime::RuntimeBuilder;
use crate::scope::ScopeChain;
use lazy_static::lazy_static;
use oxc_allocator::{Address, Box as OxcBox, CloneIn};
use oxc_ast::ast::*;
use oxc_span::SPAN;
use std::collections::HashMap;

lazy_static! {
    /// Property-style attribute names and their markup spelling.
    static ref ATTRIBUTE_RENAMES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("className", "class");
        m.insert("htmlFor", "for");
        m.insert("srcSet", "srcset");
        m.insert("noValidate", "novalidate");
        m.insert("autoPlay", "autoplay");
        m.insert("frameBorder", "frameborder");
        m.insert("allowFullScreen", "allowfullscreen");
        m.insert("tabIndex", "tabindex");
        m
    };
}

pub fn rename_attribute(name: &str) -> &str {
    ATTRIBUTE_RENAMES.get(name).copied().unwrap_or(name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYS AND VISIT STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-component occurrence counter keyed by element identity.
#[derive(Debug, Default)]
pub struct ElementKeyCounter {
    counts: HashMap<String, u32>,
}

impl ElementKeyCounter {
    /// 1 for the first occurrence of `identity`, then 2, 3, ...
    pub fn next(&mut self, identity: &str) -> u32 {
        let count = self.counts.entry(identity.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Distinct element identities counted so far.
    pub(crate) fn len(&self) -> usize {
        self.counts.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitState {
    #[default]
    Unvisited,
    FirstPassDone,
    FullyDone,
}

/// `[Ref?, "name", key, _index?]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementIdentity {
    pub name: String,
    pub key: u32,
    /// Live reference to the component binding, for upper-case bound names.
    pub reference: bool,
    pub indexed: bool,
}

impl ElementIdentity {
    pub fn to_expression<'a>(&self, rt: &RuntimeBuilder<'a>) -> Expression<'a> {
        let mut segments = Vec::with_capacity(4);
        if self.reference {
            segments.push(reference_expression(rt, &self.name));
        }
        segments.push(rt.string(&self.name));
        segments.push(rt.number(self.key));
        if self.indexed {
            segments.push(rt.identifier(&rt.names.index_binding));
        }
        rt.array(segments)
    }
}

/// `Foo` or `Foo.Bar.Baz` as a member chain.
fn reference_expression<'a>(rt: &RuntimeBuilder<'a>, name: &str) -> Expression<'a> {
    let mut parts = name.split('.');
    let root = rt.identifier(parts.next().unwrap_or(name));
    parts.fold(root, |object, part| rt.member(object, part))
}

#[derive(Debug, Clone)]
pub struct ElementRecord {
    pub state: VisitState,
    pub identity: Option<ElementIdentity>,
}

/// Visit state of every element seen during one traversal, keyed by arena address.
#[derive(Debug, Default)]
pub struct ElementLedger {
    records: HashMap<Address, ElementRecord>,
}

impl ElementLedger {
    pub fn state(&self, address: Address) -> VisitState {
        self.records
            .get(&address)
            .map_or(VisitState::Unvisited, |r| r.state)
    }

    pub fn first_pass_done(&mut self, address: Address, identity: ElementIdentity) {
        self.records.insert(
            address,
            ElementRecord {
                state: VisitState::FirstPassDone,
                identity: Some(identity),
            },
        );
    }

    /// Moves the element to `FullyDone` and hands back its identity.
    pub fn finish(&mut self, address: Address) -> Option<ElementIdentity> {
        let record = self.records.get_mut(&address)?;
        if record.state != VisitState::FirstPassDone {
            return None;
        }
        record.state = VisitState::FullyDone;
        record.identity.clone()
    }

    pub fn visits(&self) -> impl Iterator<Item = VisitState> + '_ {
        self.records.values().map(|r| r.state)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn element_name(name: &JSXElementName<'_>) -> String {
    match name {
        JSXElementName::Identifier(id) => id.name.to_string(),
        JSXElementName::IdentifierReference(id) => id.name.to_string(),
        JSXElementName::NamespacedName(ns) => format!("{}:{}", ns.namespace.name, ns.name.name),
        JSXElementName::MemberExpression(member) => member_name(member),
        JSXElementName::ThisExpression(_) => "this".to_string(),
    }
}

fn member_name(member: &JSXMemberExpression<'_>) -> String {
    let object = match &member.object {
        JSXMemberExpressionObject::IdentifierReference(id) => id.name.to_string(),
        JSXMemberExpressionObject::MemberExpression(inner) => member_name(inner),
        JSXMemberExpressionObject::ThisExpression(_) => "this".to_string(),
    };
    format!("{}.{}", object, member.property.name)
}

/// Identity for a first visit. Only upper-case names bound in the current
/// frame or at file level carry a live reference.
pub fn identify(
    element: &JSXElement<'_>,
    scopes: &ScopeChain,
    keys: &mut ElementKeyCounter,
) -> ElementIdentity {
    let name = element_name(&element.opening_element.name);
    let key = keys.next(&name);
    let root = name.split('.').next().unwrap_or(&name);
    let upper = name.chars().next().is_some_and(char::is_uppercase);
    let reference = upper && (scopes.has_own_binding(root) || scopes.has_file_binding(root));
    ElementIdentity {
        name,
        key,
        reference,
        indexed: false,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTE SUGAR
// ═══════════════════════════════════════════════════════════════════════════════

fn attribute_name<'b>(name: &'b JSXAttributeName<'_>) -> Option<&'b str> {
    match name {
        JSXAttributeName::Identifier(id) => Some(id.name.as_str()),
        JSXAttributeName::NamespacedName(_) => None,
    }
}

/// Assignable expression held by a `sync` attribute.
fn sync_target<'b, 'a>(attr: &'b JSXAttribute<'a>) -> Option<&'b Expression<'a>> {
    let Some(JSXAttributeValue::ExpressionContainer(container)) = &attr.value else {
        return None;
    };
    let expr = container.expression.as_expression()?;
    match expr {
        Expression::Identifier(_) => Some(expr),
        _ if expr.is_member_expression() => Some(expr),
        _ => None,
    }
}

/// `function (e) { target = e.target.value; }`
fn sync_handler<'a>(rt: &RuntimeBuilder<'a>, target: Expression<'a>) -> Option<Expression<'a>> {
    let left = match target {
        Expression::Identifier(id) => rt
            .ast
            .simple_assignment_target_assignment_target_identifier(SPAN, id.name),
        other if other.is_member_expression() => {
            SimpleAssignmentTarget::from(other.into_member_expression())
        }
        _ => return None,
    };
    let incoming = rt.member(rt.member(rt.identifier("e"), "target"), "value");
    let assignment = rt.ast.expression_assignment(
        SPAN,
        AssignmentOperator::Assign,
        AssignmentTarget::from(left),
        incoming,
    );
    let body = rt.ast.function_body(
        SPAN,
        rt.ast.vec(),
        rt.ast.vec1(rt.ast.statement_expression(SPAN, assignment)),
    );
    Some(rt.function(&["e"], body))
}

/// Replaces each `sync={expr}` with `value={expr}` and an `onChange` writer.
/// A value that cannot be assigned gets no writer. Returns how many writers
/// were added.
pub fn expand_sync<'a>(rt: &RuntimeBuilder<'a>, element: &mut JSXElement<'a>) -> usize {
    let opening = &mut element.opening_element;
    let has_sync = opening.attributes.iter().any(|item| {
        matches!(item, JSXAttributeItem::Attribute(attr) if attribute_name(&attr.name) == Some("sync"))
    });
    if !has_sync {
        return 0;
    }

    let mut expanded = 0;
    let items = std::mem::replace(&mut opening.attributes, rt.ast.vec());
    let mut out = rt.ast.vec_with_capacity(items.len() + 1);
    for item in items {
        match item {
            JSXAttributeItem::Attribute(mut attr) if attribute_name(&attr.name) == Some("sync") => {
                let handler = sync_target(&attr)
                    .map(|target| target.clone_in(rt.ast.allocator))
                    .and_then(|target| sync_handler(rt, target));
                attr.name = rt.ast.jsx_attribute_name_identifier(SPAN, "value");
                out.push(JSXAttributeItem::Attribute(attr));
                if let Some(handler) = handler {
                    out.push(rt.ast.jsx_attribute_item_attribute(
                        SPAN,
                        rt.ast.jsx_attribute_name_identifier(SPAN, "onChange"),
                        Some(rt.ast.jsx_attribute_value_expression_container(
                            SPAN,
                            JSXExpression::from(handler),
                        )),
                    ));
                    expanded += 1;
                } else {
                    tracing::warn!("sync value is not assignable, bound as value only");
                }
            }
            other => out.push(other),
        }
    }
    opening.attributes = out;
    expanded
}

/// Values of the wrapping attributes, taken out of the element.
#[derive(Default)]
pub struct Sugar<'a> {
    pub repeat: Option<Expression<'a>>,
    pub route: Option<Expression<'a>>,
    pub condition: Option<Expression<'a>>,
}

fn attribute_value(value: JSXAttributeValue<'_>) -> Option<Expression<'_>> {
    match value {
        JSXAttributeValue::StringLiteral(lit) => Some(Expression::StringLiteral(lit)),
        JSXAttributeValue::ExpressionContainer(container) => {
            let expression = container.unbox().expression;
            if expression.is_expression() {
                Some(expression.into_expression())
            } else {
                None
            }
        }
        JSXAttributeValue::Element(element) => Some(Expression::JSXElement(element)),
        JSXAttributeValue::Fragment(fragment) => Some(Expression::JSXFragment(fragment)),
    }
}

/// Pulls `repeat`, `route` and `if` out of the attribute list. A `route` also
/// leaves a spread of its parameters behind. Valueless sugar attributes stay.
pub fn extract_sugar<'a>(rt: &RuntimeBuilder<'a>, element: &mut JSXElement<'a>) -> Sugar<'a> {
    let mut sugar = Sugar::default();
    let opening = &mut element.opening_element;
    let items = std::mem::replace(&mut opening.attributes, rt.ast.vec());
    let mut out = rt.ast.vec_with_capacity(items.len());

    for item in items {
        let JSXAttributeItem::Attribute(attr) = item else {
            out.push(item);
            continue;
        };
        let slot = match attribute_name(&attr.name) {
            Some("repeat") => &mut sugar.repeat,
            Some("route") => &mut sugar.route,
            Some("if") => &mut sugar.condition,
            _ => {
                out.push(JSXAttributeItem::Attribute(attr));
                continue;
            }
        };
        if attr.value.is_none() {
            out.push(JSXAttributeItem::Attribute(attr));
            continue;
        }
        let JSXAttribute { value, .. } = attr.unbox();
        *slot = value.and_then(attribute_value);
    }

    if let Some(route) = &sugar.route {
        let params = rt.route_params(route.clone_in(rt.ast.allocator));
        out.push(rt.ast.jsx_attribute_item_spread_attribute(SPAN, params));
    }
    opening.attributes = out;
    sugar
}

/// Applies the wrappers innermost first: repeat, route, if, then render when
/// the element sits directly in a component body.
pub fn compose<'a>(
    rt: &RuntimeBuilder<'a>,
    node: Expression<'a>,
    sugar: Sugar<'a>,
    render: bool,
) -> Expression<'a> {
    let mut node = node;
    if let Some(count) = sugar.repeat {
        node = rt.range_map(count, node);
    }
    if let Some(route) = sugar.route {
        node = rt.route_match(route, node);
    }
    if let Some(condition) = sugar.condition {
        node = rt.and(condition, node);
    }
    if render {
        node = rt.render_register(node);
    }
    node
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERING HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Object key for an attribute, after renaming.
pub fn prop_key<'a>(rt: &RuntimeBuilder<'a>, name: &JSXAttributeName<'a>) -> PropertyKey<'a> {
    let name = match name {
        JSXAttributeName::Identifier(id) => rename_attribute(id.name.as_str()).to_string(),
        JSXAttributeName::NamespacedName(ns) => format!("{}:{}", ns.namespace.name, ns.name.name),
    };
    if is_identifier_name(&name) {
        rt.ast.property_key_static_identifier(SPAN, rt.ast.atom(&name))
    } else {
        PropertyKey::StringLiteral(rt.ast.alloc_string_literal(SPAN, rt.ast.atom(&name), None))
    }
}

/// Trimmed text child, `None` when only whitespace.
pub fn text_child<'a>(rt: &RuntimeBuilder<'a>, text: &JSXText<'a>) -> Option<Expression<'a>> {
    let trimmed = text.value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(rt.string(trimmed))
    }
}

pub type ElementBox<'a> = OxcBox<'a, JSXElement<'a>>;
