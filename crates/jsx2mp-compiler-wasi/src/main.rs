use std::io::{self, BufRead, Read, Write};

use jsx2mp_compiler::{Adapter, AdapterConfig, CompileOptions, MergePolicy, Target};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct CompileRequest {
    source: String,
    #[serde(default)]
    target: Target,
    /// Overrides the target's attribute names.
    #[serde(default)]
    adapter: Option<AdapterConfig>,
    #[serde(default)]
    policy: MergePolicy,
    /// Treat `source` as a single markup expression instead of a module.
    #[serde(default)]
    expression: bool,
    #[serde(default)]
    minify: bool,
}

#[derive(Serialize)]
struct CompileResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CompileResponse {
    fn success(code: String) -> Self {
        Self {
            ok: true,
            code: Some(code),
            error: None,
        }
    }

    fn failure(error: impl ToString) -> Self {
        Self {
            ok: false,
            code: None,
            error: Some(error.to_string()),
        }
    }
}

fn compile(req: CompileRequest) -> CompileResponse {
    let adapter = match req.adapter {
        Some(config) => match Adapter::try_from(config) {
            Ok(adapter) => adapter,
            Err(e) => return CompileResponse::failure(e),
        },
        None => req.target.adapter(),
    };
    let options = CompileOptions {
        adapter,
        policy: req.policy,
        minify: req.minify,
    };
    let result = if req.expression {
        jsx2mp_compiler::compile_expression(&req.source, &options)
    } else {
        jsx2mp_compiler::compile_program(&req.source, &options)
    };
    match result {
        Ok(code) => CompileResponse::success(code),
        Err(e) => CompileResponse::failure(e),
    }
}

fn handle(input: &str) -> CompileResponse {
    match serde_json::from_str::<CompileRequest>(input) {
        Ok(req) => compile(req),
        Err(e) => CompileResponse::failure(e),
    }
}

fn write_response(resp: &CompileResponse) -> io::Result<()> {
    let out = serde_json::to_string(resp)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(out.as_bytes())?;
    handle.write_all(b"\n")?;
    handle.flush()
}

fn main() -> io::Result<()> {
    let daemon = std::env::args().any(|a| a == "--daemon");

    if daemon {
        // One JSON request per line; exits at EOF.
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            write_response(&handle(line))?;
        }
        Ok(())
    } else {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        write_response(&handle(&input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn respond(input: &str) -> serde_json::Value {
        serde_json::to_value(handle(input)).unwrap()
    }

    #[test]
    fn test_expression_request() {
        let resp = respond(
            r#"{"source": "<View>{a.map(x => <Text>{x}</Text>)}</View>", "expression": true, "target": "wechat"}"#,
        );
        assert_eq!(resp["ok"], true);
        assert!(resp["code"]
            .as_str()
            .unwrap()
            .contains("wx:for={a.map((x, index) =>"));
        assert!(resp.get("error").is_none());
    }

    #[test]
    fn test_custom_adapter_request() {
        let resp = respond(
            r#"{"source": "<View>{a.map(x => <Text />)}</View>", "expression": true,
                "adapter": {"collection": "s-for", "item": "s-for-item", "index": "s-for-index"}}"#,
        );
        assert_eq!(resp["ok"], true);
        assert!(resp["code"].as_str().unwrap().contains("s-for-item=\"x\""));
    }

    #[test]
    fn test_invalid_adapter_request() {
        let resp = respond(r#"{"source": "<View />", "adapter": {"collection": "s-for"}}"#);
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["error"], "adapter is missing the item-name attribute");
    }

    #[test]
    fn test_malformed_request() {
        let resp = respond(r#"{"target": "ali"}"#);
        assert_eq!(resp["ok"], false);
        assert!(resp["error"].as_str().unwrap().contains("source"));
    }

    #[test]
    fn test_parse_failure_is_reported() {
        let resp = respond(r#"{"source": "<View>", "expression": true}"#);
        assert_eq!(resp["ok"], false);
        assert!(resp["error"].as_str().unwrap().starts_with("parse error at 1:"));
    }
}
