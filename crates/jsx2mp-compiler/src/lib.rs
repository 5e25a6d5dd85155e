pub mod adapter;
pub mod capture;
pub mod codegen;
pub mod context;
mod error;
pub mod list;
mod snippet;

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use tracing::debug;

pub use adapter::{Adapter, AdapterConfig, AdapterError, Role, Target};
pub use context::{CaptureSet, MergePolicy};
pub use error::{line_col, CompileError, TransformError};
pub use list::{transform_list, transform_program_list, ListTransform};

/// Sources are ES modules with JSX.
pub fn jsx_source_type() -> SourceType {
    SourceType::default().with_module(true).with_jsx(true)
}

/// How a source is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub adapter: Adapter,
    pub policy: MergePolicy,
    /// Print without whitespace.
    pub minify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            adapter: Adapter::ali(),
            policy: MergePolicy::default(),
            minify: false,
        }
    }
}

impl CompileOptions {
    pub fn for_target(target: Target) -> Self {
        Self {
            adapter: target.adapter(),
            ..Self::default()
        }
    }
}

/// Compile a single markup expression, e.g. the value a render function
/// returns.
pub fn compile_expression(source: &str, options: &CompileOptions) -> Result<String, CompileError> {
    let allocator = Allocator::default();
    let mut expr = Parser::new(&allocator, source, jsx_source_type())
        .parse_expression()
        .map_err(|errors| CompileError::parse(source, &errors))?;
    ListTransform::new(&allocator, &options.adapter)
        .policy(options.policy)
        .run(&mut expr)
        .map_err(|e| CompileError::transform(source, e))?;
    debug!(collection = options.adapter.collection(), "compiled expression");
    Ok(codegen::print_expression(&expr, options.minify))
}

/// Compile a whole component module.
pub fn compile_program(source: &str, options: &CompileOptions) -> Result<String, CompileError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, jsx_source_type()).parse();
    if !ret.errors.is_empty() {
        return Err(CompileError::parse(source, &ret.errors));
    }
    let mut program = ret.program;
    ListTransform::new(&allocator, &options.adapter)
        .policy(options.policy)
        .run_program(&mut program)
        .map_err(|e| CompileError::transform(source, e))?;
    debug!(
        statements = program.body.len(),
        collection = options.adapter.collection(),
        "compiled module"
    );
    Ok(codegen::print_program(&program, options.minify))
}

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn compile_jsx(source: &str, target: &str) -> Result<String, JsValue> {
    let target: Target = target
        .parse()
        .map_err(|e: AdapterError| JsValue::from_str(&e.to_string()))?;
    compile_program(source, &CompileOptions::for_target(target))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
