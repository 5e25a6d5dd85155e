use jsx2mp_compiler::{Adapter, AdapterConfig, CompileOptions, MergePolicy, Target};
use serde::{Deserialize, Serialize};

/// Represents the `jsx2mp.json` project configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jsx2mpConfig {
    pub name: String,
    #[serde(default)]
    pub target: Target,
    /// Custom attribute names; takes precedence over `target`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<AdapterConfig>,
    #[serde(default)]
    pub policy: MergePolicy,
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_out")]
    pub out: String,
}

fn default_src() -> String {
    "src".into()
}

fn default_out() -> String {
    "dist".into()
}

impl Jsx2mpConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            target: Target::default(),
            adapter: None,
            policy: MergePolicy::default(),
            src: default_src(),
            out: default_out(),
        }
    }

    /// The adapter this project compiles for.
    pub fn adapter(&self) -> anyhow::Result<Adapter> {
        match &self.adapter {
            Some(config) => Ok(Adapter::try_from(config.clone())?),
            None => Ok(self.target.adapter()),
        }
    }

    pub fn compile_options(&self) -> anyhow::Result<CompileOptions> {
        Ok(CompileOptions {
            adapter: self.adapter()?,
            policy: self.policy,
            minify: false,
        })
    }

    /// Output subdirectory name: the target, or `custom` for a custom adapter.
    pub fn output_name(&self) -> &str {
        if self.adapter.is_some() {
            "custom"
        } else {
            self.target.as_str()
        }
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Jsx2mpConfig = serde_json::from_str(r#"{"name": "demo"}"#).unwrap();
        assert_eq!(config.target, Target::Ali);
        assert_eq!(config.policy, MergePolicy::Flatten);
        assert_eq!(config.src, "src");
        assert_eq!(config.out, "dist");
        assert_eq!(config.adapter().unwrap(), Adapter::ali());
        assert_eq!(config.output_name(), "ali");
    }

    #[test]
    fn test_custom_adapter_overrides_target() {
        let config: Jsx2mpConfig = serde_json::from_str(
            r#"{"name": "demo", "target": "wechat", "policy": "scoped",
                "adapter": {"collection": "s-for", "item": "s-for-item", "index": "s-for-index"}}"#,
        )
        .unwrap();
        let options = config.compile_options().unwrap();
        assert_eq!(options.adapter.collection(), "s-for");
        assert_eq!(options.policy, MergePolicy::Scoped);
        assert_eq!(config.output_name(), "custom");
    }

    #[test]
    fn test_incomplete_adapter_is_an_error() {
        let config: Jsx2mpConfig =
            serde_json::from_str(r#"{"name": "demo", "adapter": {"collection": "s-for"}}"#)
                .unwrap();
        let err = config.adapter().unwrap_err();
        assert_eq!(err.to_string(), "adapter is missing the item-name attribute");
    }

    #[test]
    fn test_roundtrip_omits_absent_adapter() {
        let json = Jsx2mpConfig::new("demo").to_json_pretty().unwrap();
        assert!(json.contains(r#""target": "ali""#));
        assert!(!json.contains("adapter"));
    }
}
