//! Shared helpers for the crate's test modules.

use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, Program, Statement};
use oxc_ast::AstBuilder;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::{SourceType, SPAN};

fn source_type() -> SourceType {
    SourceType::default().with_module(true).with_jsx(true)
}

pub fn parse_program<'a>(allocator: &'a Allocator, src: &'a str) -> Program<'a> {
    let ret = Parser::new(allocator, src, source_type()).parse();
    assert!(ret.errors.is_empty(), "parse errors: {:?}", ret.errors);
    ret.program
}

pub fn parse_expression<'a>(allocator: &'a Allocator, src: &'a str) -> Expression<'a> {
    Parser::new(allocator, src, source_type())
        .parse_expression()
        .expect("expression should parse")
}

pub fn print_statements<'a>(allocator: &'a Allocator, statements: Vec<Statement<'a>>) -> String {
    let ast = AstBuilder::new(allocator);
    let mut program = parse_program(allocator, "");
    program.body = ast.vec_from_iter(statements);
    Codegen::new().build(&program).code
}

pub fn print_expression<'a>(allocator: &'a Allocator, expr: Expression<'a>) -> String {
    let ast = AstBuilder::new(allocator);
    print_statements(allocator, vec![ast.statement_expression(SPAN, expr)])
}

/// Whitespace-free, double-quoted form used for layout-insensitive comparisons.
pub fn squash(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\'' { '"' } else { c })
        .collect()
}

pub fn assert_code_contains(code: &str, expected: &str) {
    assert!(
        squash(code).contains(&squash(expected)),
        "expected output to contain:\n{}\n--- actual ---\n{}",
        expected,
        code
    );
}

pub fn assert_code_lacks(code: &str, unexpected: &str) {
    assert!(
        !squash(code).contains(&squash(unexpected)),
        "expected output not to contain:\n{}\n--- actual ---\n{}",
        unexpected,
        code
    );
}

pub fn occurrences(code: &str, needle: &str) -> usize {
    squash(code).matches(&squash(needle)).count()
}
