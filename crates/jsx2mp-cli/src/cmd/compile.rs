use anyhow::{Context, Result};
use jsx2mp_compiler::{CompileOptions, MergePolicy, Target};
use std::fs;
use std::path::Path;

pub fn run(
    file: &Path,
    target: Target,
    policy: MergePolicy,
    expression: bool,
    minify: bool,
) -> Result<()> {
    let source =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let options = CompileOptions {
        adapter: target.adapter(),
        policy,
        minify,
    };
    let code = compile_source(&source, &options, expression)
        .with_context(|| format!("Failed to compile {}", file.display()))?;
    print!("{code}");
    if !code.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub(crate) fn compile_source(
    source: &str,
    options: &CompileOptions,
    expression: bool,
) -> Result<String> {
    let code = if expression {
        jsx2mp_compiler::compile_expression(source.trim(), options)?
    } else {
        jsx2mp_compiler::compile_program(source, options)?
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_source_expression_trims_file_whitespace() {
        let code = compile_source(
            "\n<View>{a.map(x => <Text>{x}</Text>)}</View>\n",
            &CompileOptions::default(),
            true,
        )
        .unwrap();
        assert!(code.starts_with("<View><block a:for={a.map((x, index) =>"), "{code}");
    }

    #[test]
    fn test_compile_source_error_keeps_location() {
        let err = compile_source("<View>", &CompileOptions::default(), true).unwrap_err();
        assert!(format!("{err:#}").contains("parse error at 1:"));
    }
}
