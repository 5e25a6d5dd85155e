//! Printing of transformed trees through `oxc_codegen`.
//!
//! Output is normalized: untouched nodes print the way the code generator
//! prints them, which is not necessarily their source spelling.

use oxc_ast::ast::{Expression, Program};
use oxc_codegen::{Codegen, CodegenOptions, Context, GenExpr};
use oxc_syntax::precedence::Precedence;

fn options(minify: bool) -> CodegenOptions {
    CodegenOptions {
        minify,
        ..CodegenOptions::default()
    }
}

/// Print a standalone expression, such as the markup a render function
/// returns.
pub fn print_expression(expr: &Expression<'_>, minify: bool) -> String {
    let mut codegen = Codegen::new().with_options(options(minify));
    expr.print_expr(&mut codegen, Precedence::Lowest, Context::default());
    codegen.into_source_text()
}

/// Print a whole module.
pub fn print_program(program: &Program<'_>, minify: bool) -> String {
    Codegen::new().with_options(options(minify)).build(program).code
}
