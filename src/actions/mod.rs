// Intent → action mapping module
// Static configuration mapping each known intent to a canned response, a
// response type and an escalation flag, plus the resolver that executes it.


pub mod api;
pub mod resolver;

pub use api::{ActionApi, HttpActionApi};
pub use resolver::{ActionResolver, ActionResult, ActionStatus, ResponseKind};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::{Result, SentinelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "API")]
    Api,
}

/// One configured intent action. `api_call` accepts the literal string
/// "none" as absent, matching the mapping file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMapping {
    pub intent: String,
    pub response_type: ResponseType,
    pub answer: String,
    #[serde(default, deserialize_with = "deserialize_api_call")]
    pub api_call: Option<String>,
    #[serde(default)]
    pub escalate: bool,
}

fn deserialize_api_call<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty() && v != "none"))
}

/// The full action mapping, read-only after load. Intents absent from the
/// map are implicitly unmapped and resolve to the escalation fallback.
#[derive(Debug, Clone)]
pub struct ActionMap {
    by_intent: HashMap<String, ActionMapping>,
}

impl ActionMap {
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SentinelError::Config(format!(
                "Failed to read action map {}: {}",
                path.display(),
                e
            ))
        })?;

        let mappings: Vec<ActionMapping> = serde_json::from_str(&content).map_err(|e| {
            SentinelError::Config(format!(
                "Failed to parse action map {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_mappings(mappings)
    }

    #[inline]
    pub fn from_mappings(mappings: Vec<ActionMapping>) -> Result<Self> {
        let mut by_intent = HashMap::with_capacity(mappings.len());
        for mapping in mappings {
            let intent = mapping.intent.clone();
            if by_intent.insert(intent.clone(), mapping).is_some() {
                return Err(SentinelError::Config(format!(
                    "Duplicate action mapping for intent '{}'",
                    intent
                )));
            }
        }

        Ok(Self { by_intent })
    }

    #[inline]
    pub fn get(&self, intent: &str) -> Option<&ActionMapping> {
        self.by_intent.get(intent)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_intent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_intent.is_empty()
    }
}
