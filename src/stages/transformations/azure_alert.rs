//! The `azure-alert://` transformation: reshapes an Azure Monitor Service
//! Health alert payload into a Slack Block Kit message, so it can be fed
//! straight into the `slack://` dispatcher. Generalizes the reference
//! implementation's maintenance-alert reshaper to the full alert schema
//! (alert rule, description, impact window, stage, status).

use crate::error::WebhookdError;
use crate::registry::ConfigError;
use crate::stage::Transformation;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AzureAlertTransformation;

impl AzureAlertTransformation {
    pub fn from_uri(_uri: &str) -> Result<Self, ConfigError> {
        Ok(AzureAlertTransformation)
    }
}

#[derive(Serialize)]
struct SlackMessage {
    blocks: Vec<Block>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Header {
        text: Text,
    },
    Context {
        elements: Vec<Element>,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Field>,
    },
}

#[derive(Serialize)]
struct Text {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
    #[serde(skip_serializing_if = "is_false")]
    emoji: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Serialize)]
struct Element {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

#[derive(Serialize)]
struct Field {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

fn at(value: &Value, path: &[&str]) -> String {
    let mut current = value;
    for segment in path {
        match current.get(segment) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    match current {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Transformation for AzureAlertTransformation {
    async fn transform(&self, _ctx: &CancellationToken, body: Bytes) -> Result<Bytes, WebhookdError> {
        let value: Value = serde_json::from_slice(&body)
            .map_err(|err| WebhookdError::status(axum::http::StatusCode::UNPROCESSABLE_ENTITY, format!("invalid JSON body: {err}")))?;

        let alert_rule = at(&value, &["data", "essentials", "alertRule"]);
        let description = at(&value, &["data", "essentials", "description"]);
        let start = at(&value, &["data", "alertContext", "properties", "impactStartTime"]);
        let end = at(&value, &["data", "alertContext", "properties", "impactMitigationTime"]);
        let stage = at(&value, &["data", "alertContext", "properties", "stage"]);
        let communication = at(&value, &["data", "alertContext", "properties", "communication"]);
        let status = at(&value, &["data", "alertContext", "status"]);

        let message = SlackMessage {
            blocks: vec![
                Block::Header {
                    text: Text {
                        kind: "plain_text",
                        text: "Service Health Alert".to_string(),
                        emoji: true,
                    },
                },
                Block::Context {
                    elements: vec![Element {
                        kind: "mrkdwn",
                        text: alert_rule,
                    }],
                },
                Block::Section {
                    text: None,
                    fields: vec![
                        Field { kind: "mrkdwn", text: start },
                        Field { kind: "mrkdwn", text: stage },
                        Field { kind: "mrkdwn", text: end },
                        Field { kind: "mrkdwn", text: status },
                    ],
                },
                Block::Section {
                    text: Some(Text {
                        kind: "mrkdwn",
                        text: description,
                        emoji: false,
                    }),
                    fields: vec![],
                },
                Block::Section {
                    text: Some(Text {
                        kind: "mrkdwn",
                        text: communication,
                        emoji: false,
                    }),
                    fields: vec![],
                },
            ],
        };

        let json = serde_json::to_vec(&message).map_err(WebhookdError::internal)?;
        Ok(Bytes::from(json))
    }
}

pub fn new(uri: &str) -> BoxFuture<'static, Result<Arc<dyn Transformation>, ConfigError>> {
    let result = AzureAlertTransformation::from_uri(uri);
    Box::pin(async move { result.map(|t| Arc::new(t) as Arc<dyn Transformation>) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reshapes_alert_into_slack_blocks() {
        let t = AzureAlertTransformation::from_uri("azure-alert://").unwrap();
        let ctx = CancellationToken::new();
        let input = serde_json::json!({
            "data": {
                "essentials": {
                    "alertRule": "storage-account-degraded",
                    "description": "Elevated latency in East US"
                },
                "alertContext": {
                    "status": "Active",
                    "properties": {
                        "impactStartTime": "2026-07-26T10:00:00Z",
                        "impactMitigationTime": "2026-07-26T12:00:00Z",
                        "stage": "Mitigating",
                        "communication": "We are investigating"
                    }
                }
            }
        });

        let out = t.transform(&ctx, Bytes::from(serde_json::to_vec(&input).unwrap())).await.unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        let blocks = parsed["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0]["text"]["text"], "Service Health Alert");
        assert_eq!(blocks[1]["elements"][0]["text"], "storage-account-degraded");
    }

    #[tokio::test]
    async fn rejects_invalid_json() {
        let t = AzureAlertTransformation::from_uri("azure-alert://").unwrap();
        let ctx = CancellationToken::new();

        let err = t.transform(&ctx, Bytes::from_static(b"not json")).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
