//! Source-to-source entry points: preprocess, parse, transform, print.

use crate::error::{CompilerError, Result, ERR_PARSER_PANIC, ERR_SYNTAX};
use crate::options::TransformOptions;
use crate::preprocess::{preprocess, DslTable, Preprocessed};
use crate::transform::{FlintTransformer, TransformSummary};
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub code: String,
    /// Qualified names of the registered components, in source order.
    pub components: Vec<String>,
    pub style_blocks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInput {
    pub file_path: String,
    pub source: String,
}

/// Runs the transform over an already parsed program.
pub fn transform_program<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    table: &DslTable,
    options: &TransformOptions,
) -> TransformSummary {
    FlintTransformer::new(allocator, table, options.runtime.clone()).transform(program)
}

pub fn compile(source: &str, options: &TransformOptions) -> Result<CompileResult> {
    let started = Instant::now();
    let Preprocessed { source, table } = preprocess(source);

    let allocator = Allocator::default();
    let source_type = SourceType::default()
        .with_module(true)
        .with_jsx(true)
        .with_typescript(options.typescript);
    let ret = Parser::new(&allocator, &source, source_type).parse();

    if let Some(diagnostic) = ret.errors.first() {
        let offset = diagnostic
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map_or(0, |label| label.offset());
        let mut error = CompilerError::at_offset(
            ERR_SYNTAX,
            &diagnostic.to_string(),
            &options.file_path,
            &source,
            offset,
        );
        if let Some(help) = &diagnostic.help {
            error = error.with_hint(help.to_string());
        }
        return Err(error);
    }
    if ret.panicked {
        return Err(CompilerError::new(
            ERR_PARSER_PANIC,
            "Parser stopped without reporting a diagnostic",
            &options.file_path,
            1,
            1,
        ));
    }

    let mut program = ret.program;
    let summary = transform_program(&allocator, &mut program, &table, options);
    let code = Codegen::new().build(&program).code;

    tracing::debug!(
        file = %options.file_path,
        components = summary.components.len(),
        style_blocks = summary.style_blocks,
        elements = summary.elements,
        setters = summary.setters,
        getters = summary.getters,
        elapsed_us = started.elapsed().as_micros() as u64,
        "compiled"
    );

    Ok(CompileResult {
        code,
        components: summary.components,
        style_blocks: summary.style_blocks,
    })
}

/// Compiles independent sources in parallel. Results keep input order.
pub fn compile_batch(inputs: &[SourceInput], options: &TransformOptions) -> Vec<Result<CompileResult>> {
    inputs
        .par_iter()
        .map(|input| {
            let options = options.clone().with_file_path(input.file_path.as_str());
            compile(&input.source, &options)
        })
        .collect()
}
