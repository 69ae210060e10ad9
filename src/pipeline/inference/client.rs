use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{InferenceClient, InferenceError, InferenceRequest};
use crate::config::InferenceConfig;

/// Longest upstream error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
pub struct HttpInferenceClient {
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpInferenceClient {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| InferenceError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body<'a>(&'a self, request: &'a InferenceRequest) -> ChatCompletionRequest<'a> {
        let user_content = match &request.image {
            None => MessageContent::Text(&request.prompt.user),
            Some(image) => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: &request.prompt.user,
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                        detail: "high",
                    },
                },
            ]),
        };

        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(&request.prompt.system),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            response_format: request
                .options
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pull a readable message out of an error body: the `error.message` field of
/// the standard envelope when present, else the (truncated) body itself.
fn upstream_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn infer(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let start = Instant::now();
        let body = self.build_body(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    InferenceError::Network(format!("Could not connect to {}", self.endpoint))
                } else {
                    InferenceError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        tracing::debug!(
            model = %self.model,
            status = status.as_u16(),
            has_image = request.image.is_some(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Inference response received"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = parse_retry_after(response.headers());
            return Err(InferenceError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_message(&body);
            return Err(if status == StatusCode::UNAUTHORIZED {
                InferenceError::Authentication(message)
            } else {
                InferenceError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| InferenceError::ResponseParsing("Completion contained no choices".into()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::pipeline::inference::{ImagePayload, InferenceOptions};
    use crate::pipeline::prompt::PromptPair;

    fn config_for(base_url: &str) -> InferenceConfig {
        InferenceConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            timeout_secs: 5,
        }
    }

    fn text_request() -> InferenceRequest {
        InferenceRequest {
            prompt: PromptPair {
                system: "system text".into(),
                user: "user text".into(),
            },
            image: None,
            options: InferenceOptions::classification(),
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "cmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client = HttpInferenceClient::new(&config_for("http://localhost:8080/v1/")).unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model(), "test-model");
    }

    #[test]
    fn text_request_body_shape() {
        let client = HttpInferenceClient::new(&config_for("http://localhost")).unwrap();
        let request = text_request();
        let body = serde_json::to_value(client.build_body(&request)).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "system text");
        assert_eq!(body["messages"][1]["content"], "user text");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["max_tokens"], 512);
    }

    #[test]
    fn image_request_uses_content_parts() {
        let client = HttpInferenceClient::new(&config_for("http://localhost")).unwrap();
        let mut request = text_request();
        request.image = Some(ImagePayload::from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]));
        request.options.json_output = false;
        let body = serde_json::to_value(client.build_body(&request)).unwrap();
        let parts = &body["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "user text");
        assert_eq!(parts[1]["type"], "image_url");
        assert!(parts[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn returns_completion_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "test-model", "temperature": 0.1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"ok\":true}")))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpInferenceClient::new(&config_for(&server.uri())).unwrap();
        let text = client.infer(&text_request()).await.unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let client = HttpInferenceClient::new(&config_for(&server.uri())).unwrap();
        let err = client.infer(&text_request()).await.unwrap_err();
        assert_eq!(
            err,
            InferenceError::Authentication("Incorrect API key provided".into())
        );
    }

    #[tokio::test]
    async fn too_many_requests_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;

        let client = HttpInferenceClient::new(&config_for(&server.uri())).unwrap();
        let err = client.infer(&text_request()).await.unwrap_err();
        assert_eq!(
            err,
            InferenceError::RateLimited {
                retry_after_secs: Some(30)
            }
        );
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = HttpInferenceClient::new(&config_for(&server.uri())).unwrap();
        let err = client.infer(&text_request()).await.unwrap_err();
        assert_eq!(
            err,
            InferenceError::Api {
                status: 502,
                message: "bad gateway".into()
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn empty_choices_is_response_parsing_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = HttpInferenceClient::new(&config_for(&server.uri())).unwrap();
        let err = client.infer(&text_request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::ResponseParsing(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_network_error() {
        let client = HttpInferenceClient::new(&config_for("http://127.0.0.1:1")).unwrap();
        let err = client.infer(&text_request()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Network(_)), "got {err:?}");
    }

    #[test]
    fn upstream_message_falls_back_to_body() {
        assert_eq!(upstream_message("  plain failure "), "plain failure");
        assert_eq!(upstream_message(""), "no response body");
        let long = "x".repeat(MAX_ERROR_BODY_CHARS * 2);
        assert_eq!(upstream_message(&long).len(), MAX_ERROR_BODY_CHARS);
    }
}
