//! Fact extraction through a hosted language model (Messages API).
//!
//! The model is asked for a bare JSON array of reasoning nodes. Any reply
//! that does not parse in full is rejected; there is no partial salvage.

use async_trait::async_trait;
use compliance_core::ReasoningNode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ExtractionError;
use crate::extractor::FactExtractor;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const API_VERSION: &str = "2023-06-01";

// ── Prompt templates ──

const SYSTEM_PROMPT: &str = "\
You are a regulatory compliance analyst covering GDPR, CCPA, FDA and IRS rules.

Given a description of a business situation, identify every statement that has \
legal significance and map it onto the provision it engages.

Respond ONLY with a JSON array. No markdown fences, no explanation, just raw JSON:
[
  {
    \"fact\": \"the statement from the input, quoted\",
    \"legal_meaning\": \"short legal characterisation of the fact\",
    \"regulation\": \"GDPR\" | \"CCPA\" | \"FDA\" | \"IRS\" | \"Other\",
    \"article\": \"the specific provision (e.g. 'Art. 33', '§ 1798.150', '21 CFR 803.50', 'IRC § 6001')\",
    \"justification\": \"why the fact engages that provision\",
    \"regulation_version\": \"version or amendment relied on\" or null,
    \"effective_date\": \"YYYY-MM-DD\" or null
  }
]

Use \"Other\" for regimes outside the four named ones (HIPAA, SOX, PCI DSS, ...).
If nothing in the input has legal significance, respond with [].";

fn build_user_prompt(query: &str) -> String {
    format!("Situation to analyse:\n\n{query}")
}

// ── Types ──

/// Connection settings for [`LlmExtractor`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message; 1],
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Accepted reply shapes: a bare array, or an object wrapping one.
#[derive(Deserialize)]
#[serde(untagged)]
enum Reply {
    Nodes(Vec<ReasoningNode>),
    Wrapped {
        #[serde(alias = "nodes")]
        reasoning_map: Vec<ReasoningNode>,
    },
}

// ── Extractor ──

pub struct LlmExtractor {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmExtractor {
    pub fn new(mut config: LlmConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl FactExtractor for LlmExtractor {
    fn name(&self) -> &str {
        "llm"
    }

    async fn extract(&self, query: &str) -> Result<Vec<ReasoningNode>, ExtractionError> {
        let url = format!("{}/v1/messages", self.config.base_url);
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
            system: SYSTEM_PROMPT,
            messages: [Message {
                role: "user",
                content: build_user_prompt(query),
            }],
        };

        debug!(url = %url, model = %self.config.model, "requesting extraction");
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractionError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let reply: MessagesResponse = resp.json().await?;
        if let Some(usage) = &reply.usage {
            info!(
                model = %self.config.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "extraction complete"
            );
        }
        let text: String = reply
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        parse_nodes(&text)
    }
}

/// Parse a model reply into nodes, tolerating a surrounding markdown fence.
pub fn parse_nodes(text: &str) -> Result<Vec<ReasoningNode>, ExtractionError> {
    let json = strip_fences(text);
    match serde_json::from_str::<Reply>(json) {
        Ok(Reply::Nodes(nodes)) | Ok(Reply::Wrapped { reasoning_map: nodes }) => Ok(nodes),
        Err(e) => Err(ExtractionError::Malformed(format!(
            "{e}; reply starts: {}",
            preview(json, 200)
        ))),
    }
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn preview(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_core::Regulation;

    const ONE_NODE: &str = r#"[{
        "fact": "We lost a laptop with customer emails.",
        "legal_meaning": "Personal data breach",
        "regulation": "GDPR",
        "article": "Art. 33",
        "justification": "Loss of personal data triggers notification.",
        "regulation_version": null,
        "effective_date": "2018-05-25"
    }]"#;

    #[test]
    fn parses_bare_array() {
        let nodes = parse_nodes(ONE_NODE).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].regulation(), Regulation::Gdpr);
        assert_eq!(nodes[0].article(), "Art. 33");
    }

    #[test]
    fn parses_fenced_reply() {
        let fenced = format!("```json\n{ONE_NODE}\n```");
        assert_eq!(parse_nodes(&fenced).unwrap().len(), 1);
        let bare_fence = format!("```\n{ONE_NODE}\n```\n");
        assert_eq!(parse_nodes(&bare_fence).unwrap().len(), 1);
    }

    #[test]
    fn parses_wrapped_object() {
        let wrapped = format!(r#"{{"reasoning_map": {ONE_NODE}}}"#);
        assert_eq!(parse_nodes(&wrapped).unwrap().len(), 1);
        let alias = format!(r#"{{"nodes": {ONE_NODE}}}"#);
        assert_eq!(parse_nodes(&alias).unwrap().len(), 1);
    }

    #[test]
    fn empty_array_is_no_facts() {
        assert!(parse_nodes("[]").unwrap().is_empty());
    }

    #[test]
    fn unknown_regulation_label_becomes_other() {
        let reply = ONE_NODE.replace("\"GDPR\"", "\"HIPAA\"");
        let nodes = parse_nodes(&reply).unwrap();
        assert_eq!(nodes[0].regulation(), Regulation::Other);
    }

    #[test]
    fn one_bad_node_rejects_whole_reply() {
        let reply = r#"[
            {"fact": "a", "legal_meaning": "b", "regulation": "GDPR", "article": "Art. 5", "justification": "c"},
            {"fact": "", "legal_meaning": "b", "regulation": "GDPR", "article": "Art. 5", "justification": "c"}
        ]"#;
        assert!(matches!(parse_nodes(reply), Err(ExtractionError::Malformed(_))));
    }

    #[test]
    fn prose_reply_is_malformed() {
        let err = parse_nodes("I could not find any issues.").unwrap_err();
        assert!(err.to_string().contains("I could not find"));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("§§§§", 2), "§§");
        assert_eq!(preview("abc", 10), "abc");
    }

    #[test]
    fn extractor_trims_trailing_slash() {
        let mut config = LlmConfig::new("key");
        config.base_url = "http://localhost:8080/".into();
        let extractor = LlmExtractor::new(config);
        assert_eq!(extractor.config.base_url, "http://localhost:8080");
        assert_eq!(extractor.model(), DEFAULT_MODEL);
    }

    #[test]
    fn request_body_shape() {
        let body = MessagesRequest {
            model: "m",
            max_tokens: 10,
            temperature: 0.0,
            system: SYSTEM_PROMPT,
            messages: [Message {
                role: "user",
                content: build_user_prompt("hello"),
            }],
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][0]["role"], "user");
        assert!(v["messages"][0]["content"].as_str().unwrap().ends_with("hello"));
        assert_eq!(v["max_tokens"], 10);
    }

    // -- HTTP path against a local Messages endpoint --------------------------------

    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use serde_json::{Value, json};

    /// Serve `reply` with `status` on a random local port; requests without
    /// the expected API key get a 401. Returns the base URL with a trailing slash.
    async fn messages_endpoint(status: StatusCode, reply: Value) -> String {
        let app = axum::Router::new().route(
            "/v1/messages",
            post(move |headers: HeaderMap, Json(request): Json<Value>| {
                let reply = reply.clone();
                async move {
                    let keyed = headers.get("x-api-key").is_some_and(|v| v == "test-key");
                    let versioned = headers.get("anthropic-version").is_some_and(|v| v == API_VERSION);
                    if !keyed || !versioned || request["system"] != SYSTEM_PROMPT {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad request"})));
                    }
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn extractor_for(base_url: String) -> LlmExtractor {
        let mut config = LlmConfig::new("test-key");
        config.base_url = base_url;
        LlmExtractor::new(config)
    }

    #[tokio::test]
    async fn non_success_status_is_a_server_error() {
        let base = messages_endpoint(
            StatusCode::from_u16(529).unwrap(),
            json!({"type": "error", "error": {"type": "overloaded_error"}}),
        )
        .await;

        let err = extractor_for(base).extract("We lost a laptop.").await.unwrap_err();
        match err {
            ExtractionError::Server { status, body } => {
                assert_eq!(status, 529);
                assert!(body.contains("overloaded_error"));
            }
            other => panic!("expected a server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_blocks_are_joined_before_parsing() {
        let fenced = format!("```json\n{ONE_NODE}\n```");
        let (head, tail) = fenced.split_at(fenced.len() / 2);
        let base = messages_endpoint(
            StatusCode::OK,
            json!({
                "content": [
                    {"type": "text", "text": head},
                    {"type": "thinking", "thinking": "not part of the answer"},
                    {"type": "text", "text": tail}
                ],
                "usage": {"input_tokens": 120, "output_tokens": 80}
            }),
        )
        .await;

        let nodes = extractor_for(base).extract("We lost a laptop.").await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].regulation(), Regulation::Gdpr);
        assert_eq!(nodes[0].article(), "Art. 33");
    }

    #[tokio::test]
    async fn one_bad_node_in_reply_fails_the_extraction() {
        let reply = r#"[
            {"fact": "a", "legal_meaning": "b", "regulation": "GDPR", "article": "Art. 5", "justification": "c"},
            {"fact": "a", "legal_meaning": "b", "regulation": "GDPR", "article": "Art. 5"}
        ]"#;
        let base = messages_endpoint(
            StatusCode::OK,
            json!({"content": [{"type": "text", "text": reply}]}),
        )
        .await;

        let err = extractor_for(base).extract("anything").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed(_)));
    }

    #[tokio::test]
    async fn unparsable_envelope_is_an_http_error() {
        let base = messages_endpoint(StatusCode::OK, json!({"unexpected": true})).await;
        let err = extractor_for(base).extract("anything").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Http(_)));
    }
}
