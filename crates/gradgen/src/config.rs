use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::trace::default_untraceable;

pub const STRICT_ARITY_VAR: &str = "GRADGEN_STRICT_ARITY";
pub const NAMESPACE_VAR: &str = "GRADGEN_NAMESPACE";

/// Knobs for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenConfig {
    /// Namespace wrapping every generated declaration.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Operation names whose backward must derive from the opaque base.
    #[serde(default = "default_untraceable")]
    pub untraceable: BTreeSet<String>,
    /// Reject multi-output formulas whose literal tuple arity is wrong.
    #[serde(default = "default_strict_arity")]
    pub strict_arity: bool,
    /// Name of the schema source, quoted in the generated header.
    #[serde(default = "default_source_label")]
    pub source_label: String,
}

fn default_namespace() -> String {
    "torch::autograd::generated".to_string()
}

fn default_strict_arity() -> bool {
    true
}

fn default_source_label() -> String {
    "derivatives.yaml".to_string()
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            untraceable: default_untraceable(),
            strict_arity: default_strict_arity(),
            source_label: default_source_label(),
        }
    }
}

impl GenConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid generator config")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Applies `GRADGEN_STRICT_ARITY` and `GRADGEN_NAMESPACE` from the
    /// process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Applies overrides read through `lookup`. Unset or blank variables
    /// leave the field alone.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        if let Some(value) = read(STRICT_ARITY_VAR) {
            self.strict_arity =
                parse_switch(&value).with_context(|| format!("invalid {STRICT_ARITY_VAR}"))?;
        }
        if let Some(namespace) = read(NAMESPACE_VAR) {
            self.namespace = namespace.trim().to_string();
        }
        Ok(self)
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_untraceable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.untraceable = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strict_arity(mut self, strict: bool) -> Self {
        self.strict_arity = strict;
        self
    }

    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean switch, got '{other}'"),
    }
}
