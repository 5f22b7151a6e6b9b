//! `OpenAI` chat-completions client for structured product extraction.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use showcase_core::Price;

use super::ExtractionError;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Page text beyond this many characters is not sent.
pub const MAX_PAGE_CHARS: usize = 12_000;

const MAX_TAGS: usize = 10;

const SYSTEM_PROMPT: &str = "You extract product listings from retailer web pages. \
Reply with a single JSON object with the keys: title (string), description \
(string, at most 300 characters), price (number or null), currency (ISO 4217 \
code or null), category (short lowercase string or null), tags (array of at \
most 10 short lowercase strings). Use null when a value is not on the page.";

/// Fields the model returned, already cleaned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

/// Client for the chat-completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    model: String,
    endpoint: String,
}

impl LlmClient {
    /// Create a client for `model` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Llm` if the HTTP client cannot be built.
    pub fn new(model: &str, timeout: Duration) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Llm(e.to_string()))?;

        Ok(Self {
            client,
            model: model.to_string(),
            endpoint: OPENAI_CHAT_URL.to_string(),
        })
    }

    /// Point the client at a different chat-completions URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model to extract a product from page text.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Llm` on transport failure, a non-success
    /// status, or a reply that is not the expected JSON object.
    #[instrument(skip(self, api_key, page_text), fields(model = %self.model, text_len = page_text.len()))]
    pub async fn extract_product(
        &self,
        api_key: &str,
        url: &str,
        page_text: &str,
    ) -> Result<LlmProduct, ExtractionError> {
        let truncated: String = page_text.chars().take(MAX_PAGE_CHARS).collect();

        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("URL: {url}\n\nPage text:\n{truncated}"),
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractionError::Llm(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Llm(format!(
                "OpenAI API error ({status}): {body}"
            )));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Llm(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ExtractionError::Llm("no choices in response".to_string()))?;

        parse_reply(&content)
    }
}

/// Parse the model's JSON reply.
///
/// # Errors
///
/// Returns `ExtractionError::Llm` if the reply is not a JSON object.
pub fn parse_reply(content: &str) -> Result<LlmProduct, ExtractionError> {
    let raw: RawProduct = serde_json::from_str(content.trim())
        .map_err(|e| ExtractionError::Llm(format!("unparseable reply: {e}")))?;
    Ok(raw.into())
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    price: Value,
    currency: Option<String>,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<RawProduct> for LlmProduct {
    fn from(raw: RawProduct) -> Self {
        let clean = |s: Option<String>| {
            s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        let price = match &raw.price {
            Value::Number(n) => Price::parse_amount(&n.to_string()),
            Value::String(s) => Price::parse_amount(s),
            _ => None,
        };

        let mut tags: Vec<String> = Vec::new();
        for tag in raw.tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
            if tags.len() == MAX_TAGS {
                break;
            }
        }

        Self {
            title: clean(raw.title),
            description: clean(raw.description),
            price,
            currency: clean(raw.currency),
            category: clean(raw.category).map(|c| c.to_lowercase()),
            tags,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_parse_reply_cleans_fields() {
        let reply = r#"{
            "title": "  Pour-Over Kettle ",
            "description": "",
            "price": "$39.95",
            "currency": "usd",
            "category": "Kitchen",
            "tags": ["Coffee", "coffee", " kettle ", ""]
        }"#;
        let product = parse_reply(reply).unwrap();
        assert_eq!(product.title.as_deref(), Some("Pour-Over Kettle"));
        assert_eq!(product.description, None);
        assert_eq!(product.price, Some(Decimal::from_str("39.95").unwrap()));
        assert_eq!(product.currency.as_deref(), Some("usd"));
        assert_eq!(product.category.as_deref(), Some("kitchen"));
        assert_eq!(product.tags, vec!["coffee", "kettle"]);
    }

    #[test]
    fn test_parse_reply_numeric_and_null_price() {
        let product = parse_reply(r#"{"title":"A","price":12}"#).unwrap();
        assert_eq!(product.price, Some(Decimal::from(12)));

        let product = parse_reply(r#"{"title":"A","price":null}"#).unwrap();
        assert_eq!(product.price, None);
    }

    #[test]
    fn test_parse_reply_rejects_non_json() {
        assert!(matches!(
            parse_reply("Sure! Here is the product."),
            Err(ExtractionError::Llm(_))
        ));
    }

    #[test]
    fn test_tags_are_capped() {
        let tags: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
        let reply = serde_json::json!({ "title": "x", "tags": tags }).to_string();
        assert_eq!(parse_reply(&reply).unwrap().tags.len(), MAX_TAGS);
    }
}
