use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A markup attribute name, optionally namespaced (`a:for`, `s-for`).
static ATTRIBUTE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*(:[A-Za-z_][A-Za-z0-9_\-]*)?$").unwrap()
});

/// The three loop-directive roles a target host understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Collection,
    Item,
    Index,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Collection => "collection",
            Role::Item => "item-name",
            Role::Index => "index-name",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("adapter is missing the {0} attribute")]
    MissingRole(Role),
    #[error("adapter {0} attribute is empty")]
    EmptyRole(Role),
    #[error("adapter {role} attribute `{name}` is not a valid attribute name")]
    InvalidAttributeName { role: Role, name: String },
    #[error("unknown target `{0}` (expected one of: ali, wechat)")]
    UnknownTarget(String),
}

/// Attribute vocabulary of one host runtime.
///
/// Only constructible through validation, so a pass holding an `Adapter`
/// never sees an empty or malformed attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    collection: String,
    item: String,
    index: String,
}

impl Adapter {
    pub fn new(
        collection: impl Into<String>,
        item: impl Into<String>,
        index: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let collection = validate(Role::Collection, collection.into())?;
        let item = validate(Role::Item, item.into())?;
        let index = validate(Role::Index, index.into())?;
        Ok(Self {
            collection,
            item,
            index,
        })
    }

    /// Alipay mini programs: `a:for`, `a:for-item`, `a:for-index`.
    pub fn ali() -> Self {
        Self {
            collection: "a:for".into(),
            item: "a:for-item".into(),
            index: "a:for-index".into(),
        }
    }

    /// WeChat mini programs: `wx:for`, `wx:for-item`, `wx:for-index`.
    pub fn wechat() -> Self {
        Self {
            collection: "wx:for".into(),
            item: "wx:for-item".into(),
            index: "wx:for-index".into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

fn validate(role: Role, name: String) -> Result<String, AdapterError> {
    if name.trim().is_empty() {
        return Err(AdapterError::EmptyRole(role));
    }
    if !ATTRIBUTE_NAME.is_match(&name) {
        return Err(AdapterError::InvalidAttributeName { role, name });
    }
    Ok(name)
}

/// Adapter as written in configuration; every role is optional until
/// converted with [`Adapter::try_from`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

impl TryFrom<AdapterConfig> for Adapter {
    type Error = AdapterError;

    fn try_from(config: AdapterConfig) -> Result<Self, Self::Error> {
        let collection = config
            .collection
            .ok_or(AdapterError::MissingRole(Role::Collection))?;
        let item = config.item.ok_or(AdapterError::MissingRole(Role::Item))?;
        let index = config.index.ok_or(AdapterError::MissingRole(Role::Index))?;
        Adapter::new(collection, item, index)
    }
}

impl From<&Adapter> for AdapterConfig {
    fn from(adapter: &Adapter) -> Self {
        Self {
            collection: Some(adapter.collection.clone()),
            item: Some(adapter.item.clone()),
            index: Some(adapter.index.clone()),
        }
    }
}

/// Built-in compilation targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    #[serde(alias = "alipay")]
    Ali,
    #[serde(alias = "wx")]
    Wechat,
}

impl Target {
    pub fn adapter(self) -> Adapter {
        match self {
            Target::Ali => Adapter::ali(),
            Target::Wechat => Adapter::wechat(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Ali => "ali",
            Target::Wechat => "wechat",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ali" | "alipay" => Ok(Target::Ali),
            "wechat" | "wx" => Ok(Target::Wechat),
            _ => Err(AdapterError::UnknownTarget(s.to_string())),
        }
    }
}
