//! Style descriptors: `$ = {..}`, `$h1 = {..}`, `$h1.span = [..]`.
//!
//! A descriptor's body is partitioned into literal properties, registered once,
//! and computed properties, re-evaluated per render through an index accessor.

use crate::runtime::{RuntimeBuilder, StyleRegistry, TagPath};
use oxc_allocator::Vec as OxcVec;
use oxc_ast::ast::*;
use oxc_span::SPAN;

/// Tag path of a style descriptor assignment, or `None` for ordinary assignments.
pub fn descriptor_tags(assign: &AssignmentExpression<'_>) -> Option<TagPath> {
    if assign.operator != AssignmentOperator::Assign {
        return None;
    }
    match &assign.left {
        AssignmentTarget::AssignmentTargetIdentifier(id) => root_tags(&id.name),
        AssignmentTarget::StaticMemberExpression(member) => {
            let mut tail = vec![member.property.name.to_string()];
            let mut object = &member.object;
            loop {
                match object {
                    Expression::StaticMemberExpression(inner) => {
                        tail.push(inner.property.name.to_string());
                        object = &inner.object;
                    }
                    Expression::Identifier(id) => {
                        let TagPath(mut tags) = root_tags(&id.name)?;
                        tags.extend(tail.into_iter().rev());
                        return Some(TagPath(tags));
                    }
                    _ => return None,
                }
            }
        }
        _ => None,
    }
}

fn root_tags(name: &str) -> Option<TagPath> {
    let rest = name.strip_prefix('$')?;
    if rest.is_empty() {
        Some(TagPath::default())
    } else {
        Some(TagPath(vec![rest.to_string()]))
    }
}

/// Literal value under a plain identifier key.
fn is_static_property(property: &ObjectPropertyKind<'_>) -> bool {
    match property {
        ObjectPropertyKind::ObjectProperty(prop) => {
            !prop.computed
                && matches!(prop.key, PropertyKey::StaticIdentifier(_))
                && prop.value.is_literal()
        }
        ObjectPropertyKind::SpreadProperty(_) => false,
    }
}

struct Partition<'a> {
    statics: OxcVec<'a, ObjectPropertyKind<'a>>,
    dynamics: OxcVec<'a, ObjectPropertyKind<'a>>,
}

fn partition<'a>(rt: &RuntimeBuilder<'a>, object: &mut ObjectExpression<'a>) -> Partition<'a> {
    let mut statics = rt.ast.vec();
    let mut dynamics = rt.ast.vec();
    let properties = std::mem::replace(&mut object.properties, rt.ast.vec());
    for property in properties {
        if is_static_property(&property) {
            statics.push(property);
        } else {
            dynamics.push(property);
        }
    }
    Partition { statics, dynamics }
}

/// Expands one descriptor into its registry statements, static slot first.
pub fn split_style<'a>(
    rt: &RuntimeBuilder<'a>,
    tags: &TagPath,
    body: Expression<'a>,
) -> Vec<Statement<'a>> {
    match body {
        Expression::ArrayExpression(mut array) => {
            let mut combined = rt.ast.vec();
            let mut remaining = rt.ast.vec();
            let elements = std::mem::replace(&mut array.elements, rt.ast.vec());
            for element in elements {
                match element {
                    ArrayExpressionElement::ObjectExpression(mut object) => {
                        let Partition { statics, dynamics } = partition(rt, &mut object);
                        combined.extend(statics);
                        if !dynamics.is_empty() {
                            object.properties = dynamics;
                            remaining.push(ArrayExpressionElement::ObjectExpression(object));
                        }
                    }
                    other => remaining.push(other),
                }
            }
            array.elements = remaining;
            vec![
                rt.style_slot(
                    StyleRegistry::Static,
                    tags,
                    rt.ast.expression_object(SPAN, combined),
                ),
                rt.style_slot(StyleRegistry::Dynamic, tags, Expression::ArrayExpression(array)),
            ]
        }
        Expression::ObjectExpression(mut object) => {
            let Partition { statics, dynamics } = partition(rt, &mut object);
            let mut statements = Vec::with_capacity(2);
            let has_statics = !statics.is_empty();
            if has_statics {
                statements.push(rt.style_slot(
                    StyleRegistry::Static,
                    tags,
                    rt.ast.expression_object(SPAN, statics),
                ));
            }
            if !has_statics || !dynamics.is_empty() {
                object.properties = dynamics;
                statements.push(rt.style_slot(
                    StyleRegistry::Dynamic,
                    tags,
                    Expression::ObjectExpression(object),
                ));
            }
            statements
        }
        other => vec![rt.style_slot(StyleRegistry::Dynamic, tags, other)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RuntimeNames;
    use crate::test_support::{
        assert_code_contains, assert_code_lacks, parse_expression, print_statements,
    };
    use oxc_allocator::Allocator;
    use oxc_ast::AstBuilder;

    fn split(src: &'static str, tags: &[&str]) -> (usize, String) {
        let allocator = Allocator::default();
        let rt = RuntimeBuilder::new(AstBuilder::new(&allocator), RuntimeNames::default());
        let tags = TagPath(tags.iter().map(|t| t.to_string()).collect());
        let statements = split_style(&rt, &tags, parse_expression(&allocator, src));
        let count = statements.len();
        (count, print_statements(&allocator, statements))
    }

    #[test]
    fn object_with_both_halves() {
        let (count, code) = split("{ a: 1, b: expr() }", &["h1"]);
        assert_eq!(count, 2);
        assert_code_contains(&code, r#"__.$._static["h1"] = { a: 1 };"#);
        assert_code_contains(&code, r#"__.$["h1"] = function(_index) { return { b: expr() }; };"#);
    }

    #[test]
    fn static_only_object_has_no_accessor() {
        let (count, code) = split("{ color: 'red', size: 12, bold: true }", &[]);
        assert_eq!(count, 1);
        assert_code_contains(&code, r#"__.$._static["$"] = { color: "red", size: 12, bold: true };"#);
        assert_code_lacks(&code, "function(_index)");
    }

    #[test]
    fn dynamic_only_object_has_no_static_slot() {
        let (count, code) = split("{ color: theme.color, [key]: 1, ...rest }", &["p"]);
        assert_eq!(count, 1);
        assert_code_lacks(&code, "_static");
        assert_code_contains(
            &code,
            r#"__.$["p"] = function(_index) { return { color: theme.color, [key]: 1, ...rest }; };"#,
        );
    }

    #[test]
    fn empty_object_is_dynamic() {
        let (count, code) = split("{}", &["div"]);
        assert_eq!(count, 1);
        assert_code_contains(&code, r#"__.$["div"] = function(_index) { return {}; };"#);
    }

    #[test]
    fn array_combines_statics_and_drops_emptied_elements() {
        let (count, code) = split("[{ a: 1 }, { b: expr() }]", &["h1"]);
        assert_eq!(count, 2);
        assert_code_contains(&code, r#"__.$._static["h1"] = { a: 1 };"#);
        assert_code_contains(&code, r#"return [{ b: expr() }];"#);
    }

    #[test]
    fn array_keeps_non_object_elements() {
        let (_, code) = split("[base, { a: 1, c: c() }]", &["h1", "span"]);
        assert_code_contains(&code, r#"__.$._static["h1,span"] = { a: 1 };"#);
        assert_code_contains(&code, r#"return [base, { c: c() }];"#);
    }

    #[test]
    fn arbitrary_expression_is_returned_by_accessor() {
        let (count, code) = split("active ? on : off", &["a"]);
        assert_eq!(count, 1);
        assert_code_contains(&code, r#"__.$["a"] = function(_index) { return active ? on : off; };"#);
    }

    #[test]
    fn descriptor_tag_paths() {
        let allocator = Allocator::default();
        for (src, expected) in [
            ("$ = {}", Some(vec![])),
            ("$h1 = {}", Some(vec!["h1"])),
            ("$h1.span = {}", Some(vec!["h1", "span"])),
            ("$.title = {}", Some(vec!["title"])),
            ("$h1 += {}", None),
            ("h1 = {}", None),
            ("$h1[x] = {}", None),
            ("a.$h1 = {}", None),
        ] {
            let Expression::AssignmentExpression(assign) = parse_expression(&allocator, src) else {
                panic!("not an assignment: {}", src);
            };
            let expected =
                expected.map(|tags: Vec<&str>| TagPath(tags.into_iter().map(String::from).collect()));
            assert_eq!(descriptor_tags(&assign), expected, "{}", src);
        }
    }
}
