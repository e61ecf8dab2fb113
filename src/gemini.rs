//! Gemini API連携（画像生成・画像編集）
//!
//! generateContent に テキスト + inlineData を順番どおりに送り、
//! 先頭候補に含まれる inlineData 画像をすべて取り出す。
//! 自動リトライ・クライアント側タイムアウトは行わない。

use async_trait::async_trait;
use loom_lens_common::{ImageData, PromptPosition, SynthesisRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::dispatch::ImageSynthesizer;
use crate::error::{Result, StudioError};

/// レスポンスにMIMEタイプがない場合
const DEFAULT_RESPONSE_MIME: &str = "image/png";

/// Gemini APIリクエスト
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Gemini APIレスポンス
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

/// SynthesisRequest → Gemini リクエスト
pub fn build_request(request: &SynthesisRequest) -> GenerateContentRequest {
    let text = Part::Text {
        text: request.prompt.clone(),
    };
    let images = request.attachments.iter().map(|a| Part::InlineData {
        inline_data: InlineData {
            mime_type: Some(a.image.mime_type.clone()),
            data: Some(a.image.data.clone()),
        },
    });

    let parts = match request.prompt_position {
        PromptPosition::BeforeImages => std::iter::once(text).chain(images).collect(),
        PromptPosition::AfterImages => images.chain(std::iter::once(text)).collect(),
    };

    GenerateContentRequest {
        contents: vec![Content { parts }],
    }
}

/// 先頭候補から画像を取り出す（順序保持）
pub fn extract_images(response: GenerateContentResponse) -> Vec<ImageData> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.inline_data)
                .filter_map(|inline| {
                    let data = inline.data.filter(|d| !d.is_empty())?;
                    let mime_type = inline
                        .mime_type
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| DEFAULT_RESPONSE_MIME.to_string());
                    Some(ImageData::new(mime_type, data))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// ログ用のリクエスト要約（Base64本体は出さない）
fn summarize_request(request: &GenerateContentRequest) -> String {
    request
        .contents
        .iter()
        .flat_map(|c| c.parts.iter())
        .map(|part| match part {
            Part::Text { text } => format!("text({} chars)", text.chars().count()),
            Part::InlineData { inline_data } => format!(
                "{}({} bytes b64)",
                inline_data.mime_type.as_deref().unwrap_or("unknown"),
                inline_data.data.as_deref().map(str::len).unwrap_or(0)
            ),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

/// エラーレスポンスからメッセージを抽出
fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }

    serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| truncate_for_log(trimmed, 500))
}

/// Gemini クライアント
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    /// 設定から作成。APIキーがなくても作成はでき、送信時にエラーになる
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.resolve_api_key(), config.model.clone(), config.api_base_url.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn redact(&self, text: &str) -> String {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => text.replace(key, "[redacted]"),
            _ => text.to_string(),
        }
    }

    async fn generate_content(&self, payload: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let api_key = self.api_key.as_deref().ok_or(StudioError::MissingApiKey)?;

        debug!(target: "loom_lens::gemini", model = %self.model, parts = %summarize_request(payload));

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| StudioError::ApiCall(self.redact(&err.to_string())))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // ログにもエラーにもキーを残さない
            let detail = self.redact(&summarize_error_body(&body));
            warn!("Gemini API error: status={}, body={}", status, detail);
            return Err(StudioError::ApiCall(format!("status {}: {}", status, detail)));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            StudioError::ApiParse(format!("{}: {}", e, self.redact(&truncate_for_log(&body, 200))))
        })?;
        debug!(target: "loom_lens::gemini", candidates = parsed.candidates.len(), "response received");
        Ok(parsed)
    }
}

#[async_trait]
impl ImageSynthesizer for GeminiClient {
    fn ensure_ready(&self) -> Result<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(StudioError::MissingApiKey),
        }
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<ImageData>> {
        let payload = build_request(request);
        let response = self.generate_content(&payload).await?;
        Ok(extract_images(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_lens_common::{Attachment, AttachmentRole};

    fn request(position: PromptPosition) -> SynthesisRequest {
        SynthesisRequest {
            prompt: "make it pop".into(),
            attachments: vec![
                Attachment { role: AttachmentRole::ReferenceModel, image: ImageData::new("image/png", "REF") },
                Attachment { role: AttachmentRole::ClothingItem, image: ImageData::new("image/jpeg", "CLOTH") },
            ],
            prompt_position: position,
        }
    }

    #[test]
    fn test_build_request_prompt_first() {
        let payload = build_request(&request(PromptPosition::BeforeImages));
        let json = serde_json::to_value(&payload).unwrap();
        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "make it pop");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "REF");
        assert_eq!(parts[2]["inlineData"]["data"], "CLOTH");
    }

    #[test]
    fn test_build_request_prompt_last() {
        let payload = build_request(&request(PromptPosition::AfterImages));
        let json = serde_json::to_value(&payload).unwrap();
        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts[0]["inlineData"]["data"], "REF");
        assert_eq!(parts[2]["text"], "make it pop");
    }

    #[test]
    fn test_extract_images_first_candidate_only() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": "AAA"}},
                    {"inlineData": {"data": "BBB"}},
                    {"inlineData": {"mimeType": "image/png", "data": ""}}
                ]}},
                {"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "CCC"}}]}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let images = extract_images(response);
        assert_eq!(images, vec![
            ImageData::new("image/png", "AAA"),
            ImageData::new(DEFAULT_RESPONSE_MIME, "BBB"),
        ]);
    }

    #[test]
    fn test_extract_images_empty_response() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_images(response).is_empty());

        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(extract_images(response).is_empty());
    }

    #[test]
    fn test_summarize_error_body() {
        assert_eq!(summarize_error_body(""), "empty response body");
        assert_eq!(
            summarize_error_body(r#"{"error": {"code": 400, "message": "API key not valid"}}"#),
            "API key not valid"
        );
        assert_eq!(summarize_error_body("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_summarize_request_hides_payload() {
        let summary = summarize_request(&build_request(&request(PromptPosition::BeforeImages)));
        assert_eq!(summary, "text(11 chars), image/png(3 bytes b64), image/jpeg(5 bytes b64)");
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(None, "gemini-2.5-flash-image", "https://example.test/v1beta/");
        assert_eq!(client.endpoint(), "https://example.test/v1beta/models/gemini-2.5-flash-image:generateContent");
    }

    #[test]
    fn test_missing_key_not_ready() {
        let client = GeminiClient::new(None, "m", "https://example.test");
        assert!(matches!(client.ensure_ready(), Err(StudioError::MissingApiKey)));

        let client = GeminiClient::new(Some("  ".into()), "m", "https://example.test");
        assert!(client.ensure_ready().is_err());

        let client = GeminiClient::new(Some("key".into()), "m", "https://example.test");
        assert!(client.ensure_ready().is_ok());
    }

    #[test]
    fn test_redact() {
        let client = GeminiClient::new(Some("secret123".into()), "m", "https://example.test");
        assert_eq!(client.redact("url?key=secret123"), "url?key=[redacted]");
    }

    /// 1回だけ応答するローカルHTTPサーバ。受信したリクエスト全文を返す
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if raw.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{}/v1beta", addr), handle)
    }

    #[tokio::test]
    async fn test_http_error_status_is_redacted() {
        let (base_url, server) =
            serve_once("400 Bad Request", r#"{"error": {"code": 400, "message": "API key not valid: secret-key"}}"#).await;
        let client = GeminiClient::new(Some("secret-key".into()), "m", base_url);

        let err = client.synthesize(&request(PromptPosition::BeforeImages)).await.unwrap_err();
        let message = match err {
            StudioError::ApiCall(message) => message,
            other => panic!("unexpected error: {other:?}"),
        };
        assert!(message.starts_with("status 400"), "{message}");
        assert!(message.contains("[redacted]"));
        assert!(!message.contains("secret-key"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1beta/models/m:generateContent "), "{raw}");
        assert!(raw.to_ascii_lowercase().contains("x-goog-api-key: secret-key"));
        assert!(!raw.contains("?key="));
        assert!(raw.contains(r#""text":"make it pop""#));
    }

    #[tokio::test]
    async fn test_http_unparseable_body() {
        let (base_url, server) = serve_once("200 OK", "<html>gateway for secret-key</html>").await;
        let client = GeminiClient::new(Some("secret-key".into()), "m", base_url);

        let err = client.synthesize(&request(PromptPosition::AfterImages)).await.unwrap_err();
        let message = match err {
            StudioError::ApiParse(message) => message,
            other => panic!("unexpected error: {other:?}"),
        };
        assert!(message.contains("<html>gateway for [redacted]"), "{message}");
        assert!(!message.contains("secret-key"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_success_without_images() {
        let (base_url, server) = serve_once("200 OK", r#"{"candidates": []}"#).await;
        let client = GeminiClient::new(Some("k".into()), "m", base_url);

        let images = client.synthesize(&request(PromptPosition::BeforeImages)).await.unwrap();
        assert!(images.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_success_with_image() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/webp", "data": "UklGR"}}]}}]}"#,
        )
        .await;
        let client = GeminiClient::new(Some("k".into()), "m", base_url);

        let images = client.synthesize(&request(PromptPosition::BeforeImages)).await.unwrap();
        assert_eq!(images, vec![ImageData::new("image/webp", "UklGR")]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_key_sends_nothing() {
        // 接続先はないが、送信前に失敗する
        let client = GeminiClient::new(None, "m", "http://127.0.0.1:9/v1beta");
        let err = client.synthesize(&request(PromptPosition::BeforeImages)).await.unwrap_err();
        assert!(matches!(err, StudioError::MissingApiKey));
    }
}
