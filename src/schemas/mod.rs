use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

pub(crate) mod auth;
pub(crate) mod catalog;
pub(crate) mod dashboard;
pub(crate) mod job;
pub(crate) mod quiz;
pub(crate) mod score;
pub(crate) mod search;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Body of every `202 Accepted` job trigger.
#[derive(Debug, Serialize)]
pub(crate) struct JobAccepted {
    pub(crate) message: String,
    pub(crate) job_id: String,
    pub(crate) status: &'static str,
}

/// Missing strings deserialize as empty and surrounding whitespace is dropped,
/// so length validation sees what will be stored.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|value| value.trim().to_string()).unwrap_or_default())
}

/// Like [`trimmed`], but blank values become `None`.
pub(crate) fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "trimmed")]
        name: String,
        #[serde(default, deserialize_with = "trimmed_opt")]
        note: Option<String>,
    }

    #[test]
    fn strings_are_trimmed_and_blank_options_dropped() {
        let probe: Probe = serde_json::from_str(r#"{"name": "  Math ", "note": "   "}"#).unwrap();
        assert_eq!(probe.name, "Math");
        assert_eq!(probe.note, None);

        let probe: Probe = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert_eq!(probe.name, "");
    }
}
