
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{ActionMap, ResponseType};
use crate::actions::api::ActionApi;

pub const FALLBACK_MESSAGE: &str =
    "This intent is not recognized or supported yet. Escalating to support.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Fallback,
    Error,
}

impl std::fmt::Display for ActionStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            ActionStatus::Success => write!(f, "success"),
            ActionStatus::Fallback => write!(f, "fallback"),
            ActionStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseKind {
    Text,
    Api,
    Escalate,
}

impl std::fmt::Display for ResponseKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            ResponseKind::Text => write!(f, "TEXT"),
            ResponseKind::Api => write!(f, "API"),
            ResponseKind::Escalate => write!(f, "ESCALATE"),
        }
    }
}

/// Structured outcome of resolving an intent. Callers always receive one
/// of these; resolution never raises.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub intent: String,
    pub response_type: ResponseKind,
    pub message: String,
    pub escalate: bool,
    pub api_response: Option<Value>,
}

/// Maps a resolved intent to its configured action. Unknown intents are
/// expected traffic and resolve to the escalation fallback; downstream
/// call failures downgrade the result rather than propagating.
pub struct ActionResolver {
    map: ActionMap,
    api: Arc<dyn ActionApi>,
}

impl ActionResolver {
    #[inline]
    pub fn new(map: ActionMap, api: Arc<dyn ActionApi>) -> Self {
        Self { map, api }
    }

    #[inline]
    pub fn resolve(&self, intent: &str, query: Option<&str>) -> ActionResult {
        debug!(
            "Resolving intent '{}' (query: {:?})",
            intent,
            query.unwrap_or("<none>")
        );

        let Some(mapping) = self.map.get(intent) else {
            debug!("Intent '{}' is unmapped, escalating", intent);
            return ActionResult {
                status: ActionStatus::Fallback,
                intent: intent.to_string(),
                response_type: ResponseKind::Escalate,
                message: FALLBACK_MESSAGE.to_string(),
                escalate: true,
                api_response: None,
            };
        };

        let mut result = ActionResult {
            status: ActionStatus::Success,
            intent: intent.to_string(),
            response_type: match mapping.response_type {
                ResponseType::Text => ResponseKind::Text,
                ResponseType::Api => ResponseKind::Api,
            },
            message: mapping.answer.clone(),
            escalate: mapping.escalate,
            api_response: None,
        };

        if mapping.response_type == ResponseType::Api {
            if let Some(api_call) = &mapping.api_call {
                match self.api.call(api_call) {
                    Ok(payload) => {
                        debug!("API call '{}' succeeded", api_call);
                        result.api_response = Some(payload);
                    }
                    Err(e) => {
                        warn!("API call '{}' failed: {:#}", api_call, e);
                        result.status = ActionStatus::Error;
                        result.message = format!("API call failed: {:#}", e);
                    }
                }
            }
        }

        result
    }
}
