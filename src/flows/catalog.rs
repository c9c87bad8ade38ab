//! Flow catalog: business-facing flow slugs and their resolution to
//! concrete engine process identifiers.
//!
//! The catalog is parsed once from configuration and is immutable
//! afterwards. It is an explicitly constructed, application-scoped value;
//! there is no module-level cache.

use crate::config::ConfigError;
use crate::engine::ProcessDescriptor;
use serde_json::Value;
use std::collections::HashMap;

/// Errors raised while resolving a flow to a process.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlowError {
    #[error("flow '{0}' is not defined in the configuration")]
    NotDefined(String),
    #[error("{0}")]
    Resolution(String),
}

/// One configured flow and its matching criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowDefinition {
    pub slug: String,
    pub display_name: String,
    /// Trusted verbatim when present; the process listing is not consulted.
    pub process_id: Option<String>,
    pub process_name: Option<String>,
    pub process_version: Option<String>,
    pub metadata: Option<Value>,
}

impl FlowDefinition {
    /// Whether a listed process satisfies this definition's criteria.
    /// An unconfigured criterion matches vacuously.
    pub fn matches(&self, process: &ProcessDescriptor) -> bool {
        let name_matches = match &self.process_name {
            Some(name) => process.name == *name || process.display_name == *name,
            None => true,
        };
        let version_matches = match &self.process_version {
            Some(version) => process.version == *version,
            None => true,
        };
        name_matches && version_matches
    }
}

/// Immutable slug → definition catalog.
#[derive(Debug, Clone, Default)]
pub struct FlowCatalog {
    flows: HashMap<String, FlowDefinition>,
}

impl FlowCatalog {
    /// Parses raw configuration entries into a catalog. A non-object entry
    /// is a fatal configuration error.
    pub fn from_definitions(raw: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        let mut flows = HashMap::new();
        for (slug, entry) in raw {
            let Some(table) = entry.as_object() else {
                return Err(ConfigError::InvalidFlowDefinition { slug: slug.clone() });
            };

            let display_name = optional_string(table.get("display_name"))
                .or_else(|| optional_string(table.get("name")))
                .or_else(|| optional_string(table.get("title")))
                .unwrap_or_else(|| default_display_name(slug));

            flows.insert(
                slug.clone(),
                FlowDefinition {
                    slug: slug.clone(),
                    display_name,
                    process_id: optional_string(table.get("process_id")),
                    process_name: optional_string(table.get("process_name")),
                    process_version: optional_string(table.get("process_version")),
                    metadata: table.get("metadata").filter(|m| m.is_object()).cloned(),
                },
            );
        }
        Ok(Self { flows })
    }

    pub fn get(&self, slug: &str) -> Option<&FlowDefinition> {
        self.flows.get(slug)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &FlowDefinition> {
        self.flows.values()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Resolves a flow slug to an engine process id.
    ///
    /// An explicit `process_id` wins outright. Otherwise the supplied
    /// listing is filtered by the configured name and version criteria;
    /// the match must be unique. Ambiguity is always an error rather than
    /// an arbitrary pick, so a misconfigured flow can never silently start
    /// the wrong process.
    pub fn resolve(
        &self,
        slug: &str,
        processes: &[ProcessDescriptor],
    ) -> Result<String, FlowError> {
        let definition = self
            .flows
            .get(slug)
            .ok_or_else(|| FlowError::NotDefined(slug.to_string()))?;

        if let Some(process_id) = &definition.process_id {
            return Ok(process_id.clone());
        }

        let matching: Vec<&ProcessDescriptor> = processes
            .iter()
            .filter(|process| definition.matches(process))
            .collect();

        match matching.as_slice() {
            [] => Err(FlowError::Resolution(format!(
                "no engine process matches flow '{slug}'"
            ))),
            [only] => Ok(only.id.clone()),
            _ => Err(FlowError::Resolution(format!(
                "multiple engine processes match flow '{slug}'; \
                 set process_id or process_version to narrow the match"
            ))),
        }
    }
}

/// Normalizes an optional scalar into a trimmed, non-empty string.
/// Numeric values are accepted so `process_id = 8217` works in TOML.
fn optional_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `invoice-approval` → `Invoice Approval`, used when no display name is
/// configured.
fn default_display_name(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
