use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{Level, event, instrument};

use handle_errors::{Error, ExternalApiError};

/// 프롬프트를 받아 모델이 만든 글을 돌려주는 외부 서비스.
/// 글이 비어 있으면 `Ok(None)`.
#[async_trait]
pub trait CompletionService: Send + Sync + std::fmt::Debug {
    async fn complete(&self, prompt: &str) -> Result<Option<String>, Error>;
}

#[derive(Serialize, Debug, Clone)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize, Debug, Clone)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Clone)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug, Clone)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug, Clone)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize, Debug, Clone)]
struct ApiErrorBody {
    message: String,
}

/// Gemini `generateContent` 호출. 일시적 실패는 지수 백오프로 세 번까지 다시 보낸다.
#[derive(Clone)]
pub struct GeminiClient {
    client: ClientWithMiddleware,
    endpoint: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::ReqwestAPIError)?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(GeminiClient {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    #[instrument(skip(prompt), fields(prompt_chars = prompt.chars().count()))]
    async fn complete(&self, prompt: &str) -> Result<Option<String>, Error> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                return Err(Error::ClientError(ExternalApiError {
                    status: 401,
                    message: "completion API key is not configured".to_string(),
                }));
            }
        };

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };
        let body = serde_json::to_string(&request).map_err(|e| {
            Error::ClientError(ExternalApiError {
                status: 0,
                message: e.to_string(),
            })
        })?;

        let res = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .body(body)
            .send()
            .await
            .map_err(Error::MiddlewareReqwestAPIError)?;

        if !res.status().is_success() {
            if res.status().is_client_error() {
                let err = transform_error(res).await;
                return Err(Error::ClientError(err));
            } else {
                let err = transform_error(res).await;
                return Err(Error::ServerError(err));
            }
        }

        match res.json::<GenerateResponse>().await {
            Ok(res) => {
                let text = extract_text(res);
                if text.is_none() {
                    event!(Level::WARN, "completion service returned no candidates");
                }
                Ok(text)
            }
            Err(e) => Err(Error::ReqwestAPIError(e)),
        }
    }
}

/// 첫 번째 후보의 글 조각을 이어 붙인다.
fn extract_text(response: GenerateResponse) -> Option<String> {
    let parts = response.candidates.into_iter().next()?.content?.parts;
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

async fn transform_error(res: reqwest::Response) -> ExternalApiError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body,
    };
    ExternalApiError { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_taken_from_first_candidate() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    {"content": {"parts": [{"text": "Hello, "}, {"text": "world"}], "role": "model"}},
                    {"content": {"parts": [{"text": "ignored"}]}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(extract_text(response), Some("Hello, world".to_string()));
    }

    #[test]
    fn blocked_or_empty_responses_have_no_text() {
        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert_eq!(extract_text(blocked), None);

        let blank: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#)
                .unwrap();
        assert_eq!(extract_text(blank), None);
    }

    #[test]
    fn endpoint_is_built_from_base_url_and_model() {
        let client = GeminiClient::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "gemini-2.0-flash",
            Some(" ".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(client.api_key.is_none());
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let client =
            GeminiClient::new("http://127.0.0.1:9", "m", None, Duration::from_secs(1)).unwrap();
        match client.complete("hi").await {
            Err(Error::ClientError(err)) => assert_eq!(err.status, 401),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
