//! Dialogflow v2 detectIntent client (https://dialogflow.googleapis.com by default).
//! One outbound call per invocation; no retries.

use super::{IntentResolver, NluQuery, NluResult};
use crate::session::SessionKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://dialogflow.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Client for the Dialogflow v2 REST API. Constructed once at startup and
/// shared by all dispatch cycles; immutable after construction.
#[derive(Clone)]
pub struct DialogflowClient {
    base_url: String,
    project_id: String,
    access_token: Option<String>,
    language_tag: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum DialogflowError {
    #[error("dialogflow request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("dialogflow api error: {0}")]
    Api(String),
}

impl DialogflowClient {
    pub fn new(
        project_id: String,
        access_token: Option<String>,
        base_url: Option<String>,
        language_tag: String,
        timeout_secs: Option<u64>,
    ) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            project_id,
            access_token,
            language_tag,
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            client: reqwest::Client::new(),
        }
    }

    /// POST /v2/projects/{project}/agent/sessions/{session}:detectIntent.
    /// The request is bounded by the configured timeout; expiry surfaces as a
    /// request error like any other transport failure.
    pub async fn detect_intent(&self, query: &NluQuery) -> Result<QueryResult, DialogflowError> {
        let url = format!(
            "{}/v2/projects/{}/agent/sessions/{}:detectIntent",
            self.base_url, self.project_id, query.session_key
        );
        let body = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text: query.text.clone(),
                    language_code: query.language_tag.clone(),
                },
            },
        };
        let mut req = self.client.post(&url).timeout(self.timeout).json(&body);
        if let Some(ref token) = self.access_token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DialogflowError::Api(format!("{} {}", status, body)));
        }
        let data: DetectIntentResponse = res.json().await?;
        data.query_result
            .ok_or_else(|| DialogflowError::Api("missing queryResult in response".to_string()))
    }
}

#[async_trait]
impl IntentResolver for DialogflowClient {
    /// Single attempt against the provider; every failure is captured here and
    /// classified as `Unavailable`, never propagated.
    async fn resolve_intent(
        &self,
        text: &str,
        session_key: &SessionKey,
    ) -> anyhow::Result<NluResult> {
        let query = NluQuery {
            session_key: session_key.clone(),
            text: text.to_string(),
            language_tag: self.language_tag.clone(),
        };
        match self.detect_intent(&query).await {
            Ok(result) => Ok(classify(result)),
            Err(e) => {
                log::error!("dialogflow api error: {}", e);
                Ok(NluResult::Unavailable {
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Map a provider query result onto the normalized contract: fallback-flagged
/// (or intent-less) results are `Fallback`, anything else is `Matched` with
/// the provider's fulfillment text verbatim.
fn classify(result: QueryResult) -> NluResult {
    match result.intent {
        Some(ref intent) if !intent.is_fallback => NluResult::Matched {
            reply_text: result.fulfillment_text,
        },
        _ => NluResult::Fallback,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest {
    query_input: QueryInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryInput {
    text: TextInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextInput {
    text: String,
    language_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    #[serde(default)]
    query_result: Option<QueryResult>,
}

/// Dialogflow query result: the fields the pipeline consumes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub fulfillment_text: String,
    #[serde(default)]
    pub intent: Option<Intent>,
}

/// Matched intent metadata; `is_fallback` marks the provider's designated
/// "no confident match" intent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_intent_classifies_as_matched() {
        let result = QueryResult {
            fulfillment_text: "Hi there!".to_string(),
            intent: Some(Intent {
                display_name: "greeting".to_string(),
                is_fallback: false,
            }),
        };
        assert_eq!(
            classify(result),
            NluResult::Matched {
                reply_text: "Hi there!".to_string()
            }
        );
    }

    #[test]
    fn fallback_flag_classifies_as_fallback() {
        let result = QueryResult {
            fulfillment_text: "I didn't get that.".to_string(),
            intent: Some(Intent {
                display_name: "Default Fallback Intent".to_string(),
                is_fallback: true,
            }),
        };
        assert_eq!(classify(result), NluResult::Fallback);
    }

    #[test]
    fn missing_intent_classifies_as_fallback() {
        let result = QueryResult {
            fulfillment_text: String::new(),
            intent: None,
        };
        assert_eq!(classify(result), NluResult::Fallback);
    }

    #[test]
    fn matched_with_empty_fulfillment_text_stays_matched() {
        let result = QueryResult {
            fulfillment_text: String::new(),
            intent: Some(Intent {
                display_name: "greeting".to_string(),
                is_fallback: false,
            }),
        };
        assert_eq!(
            classify(result),
            NluResult::Matched {
                reply_text: String::new()
            }
        );
    }

    #[test]
    fn detect_intent_request_serializes_to_dialogflow_shape() {
        let body = DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput {
                    text: "hello".to_string(),
                    language_code: "en".to_string(),
                },
            },
        };
        let json = serde_json::to_value(&body).expect("serialize request");
        assert_eq!(
            json,
            serde_json::json!({
                "queryInput": { "text": { "text": "hello", "languageCode": "en" } }
            })
        );
    }

    #[test]
    fn detect_intent_response_parses_camel_case_fields() {
        let raw = r#"{
            "responseId": "abc",
            "queryResult": {
                "queryText": "hello",
                "fulfillmentText": "Hi there!",
                "intent": { "displayName": "greeting", "isFallback": false },
                "intentDetectionConfidence": 0.87
            }
        }"#;
        let parsed: DetectIntentResponse = serde_json::from_str(raw).expect("parse response");
        let result = parsed.query_result.expect("queryResult present");
        assert_eq!(result.fulfillment_text, "Hi there!");
        assert!(!result.intent.expect("intent present").is_fallback);
    }
}
