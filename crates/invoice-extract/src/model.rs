//! Model catalog entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A vision model to benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model family name as known to Ollama, e.g. `qwen2.5vl`
    pub name: String,
    /// Parameter count in billions
    pub parameters: u32,
    /// Download size in GB
    pub size_gb: f64,
}

impl ModelSpec {
    /// Create a catalog entry.
    #[must_use]
    pub fn new(name: impl Into<String>, parameters: u32, size_gb: f64) -> Self {
        Self {
            name: name.into(),
            parameters,
            size_gb,
        }
    }

    /// Ollama model tag, e.g. `qwen2.5vl:7b`.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{}:{}b", self.name, self.parameters)
    }

    /// Resolve a command-line model argument against a catalog.
    ///
    /// Tried in order: an exact tag (`qwen2.5vl:7b`), a bare family name (first
    /// catalog entry of that family), then any well-formed `name:Nb` tag that is
    /// not in the catalog (size reported as 0).
    ///
    /// # Errors
    ///
    /// Returns a message naming the argument when none of the forms match.
    pub fn resolve(arg: &str, catalog: &[Self]) -> Result<Self, String> {
        if let Some(spec) = catalog.iter().find(|m| m.tag() == arg) {
            return Ok(spec.clone());
        }
        if let Some(spec) = catalog.iter().find(|m| m.name == arg) {
            return Ok(spec.clone());
        }
        if let Some((name, params)) = arg.rsplit_once(':') {
            if let Some(parameters) = params
                .strip_suffix('b')
                .and_then(|p| p.parse::<u32>().ok())
            {
                if !name.is_empty() {
                    return Ok(Self::new(name, parameters, 0.0));
                }
            }
        }
        Err(format!(
            "unknown model '{arg}'. Use a catalog name or a tag like 'qwen2.5vl:7b'"
        ))
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} with {}B parameters and size {}GB",
            self.name, self.parameters, self.size_gb
        )
    }
}
