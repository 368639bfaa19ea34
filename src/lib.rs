//! # Flint Transform
//!
//! Source-to-source compiler pass for the Flint view language: JavaScript
//! with JSX plus `view Name { .. }` component blocks, `style { .. }` blocks and
//! `$tag = {..}` style descriptors.
//!
//! ## Output Shape
//!
//! 1. **Registration**: every component body becomes
//!    `Flint.view("Name", function (__, on) { .. })`, every style block
//!    `Flint.style("style", function () { .. })`.
//!
//! 2. **Styles**: descriptors split into a static slot registered once and a
//!    dynamic slot re-evaluated per render.
//!
//! 3. **Markup**: elements get a stable `[Ref?, "name", key, _index?]`
//!    identity, `repeat` / `route` / `if` wrappers and, directly in a
//!    component body, a render registration. They are lowered to `Flint.el`.
//!
//! 4. **Reactivity**: writes to component state report through `__.set`,
//!    state declarations restore through `__.get`.
//!
//! The pass never fails on shapes it does not understand; they pass through.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod compile;
mod error;
mod options;
mod preprocess;
mod transform;

pub mod markup;
pub mod reactive;
pub mod runtime;
pub mod scope;
pub mod style;

#[cfg(test)]
mod test_support;

pub use compile::{compile, compile_batch, transform_program, CompileResult, SourceInput};
pub use error::*;
pub use options::{RuntimeNames, TransformOptions};
pub use preprocess::{preprocess, DslStatement, DslTable, Preprocessed};
pub use transform::{FlintTransformer, TransformSummary};

#[cfg(feature = "napi")]
fn to_napi_error(error: CompilerError) -> napi::Error {
    let payload = serde_json::to_string(&error).unwrap_or_else(|_| error.to_string());
    napi::Error::from_reason(payload)
}

/// Compiles one source. Errors carry the serialized [`CompilerError`].
#[cfg(feature = "napi")]
#[napi]
pub fn transform_native(source: String, options_json: Option<String>) -> napi::Result<String> {
    let options = match options_json {
        Some(json) => TransformOptions::from_json(&json).map_err(to_napi_error)?,
        None => TransformOptions::default(),
    };
    let result = compile(&source, &options).map_err(to_napi_error)?;
    serde_json::to_string(&result).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_bridge() -> String {
    "Flint Native Bridge Connected".to_string()
}
