use crate::error::{PagerError, Result};
use crate::services::credentials::mask_token;
use crate::types::AnomalyResult;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant that analyzes texts.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Used when the model answers a bare "yes" without explaining.
const UNDESCRIBED_ANOMALY: &str = "anomaly detected";

/// Something that can judge whether a page of text looks broken.
#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<AnomalyResult>;
}

#[derive(Debug, Clone)]
pub struct ProberConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ProberConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Asks a chat completion endpoint whether a page contains anomalies.
pub struct AnomalyProber {
    client: reqwest::Client,
    config: ProberConfig,
    affirmative_pattern: Regex,
}

impl AnomalyProber {
    pub fn new(config: ProberConfig) -> Result<Self> {
        Url::parse(&config.endpoint)?;

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let affirmative_pattern = Regex::new(r"(?is)^yes[\s,.:;!\-]*(.*)$").map_err(|e| {
            PagerError::Anyhow(anyhow::anyhow!("Invalid reply pattern: {}", e))
        })?;

        info!(
            endpoint = %config.endpoint,
            model = %config.model,
            api_key = %mask_token(&config.api_key),
            "Anomaly prober configured"
        );

        Ok(Self {
            client,
            config,
            affirmative_pattern,
        })
    }

    pub fn anomaly_prompt(text: &str) -> String {
        format!(
            "Please analyze the following text for any anomalies, such as broken sentences, incorrect formatting, or irrelevant content. If you find any issues, respond with 'yes' and describe the anomaly in a sentence, otherwise, respond with 'no': {}",
            text
        )
    }

    /// Interpret the model's free-text answer.
    ///
    /// A reply starting with "yes" (any case) is an anomaly; the leading
    /// "yes" and any separator after it (whitespace, `,.:;!-`) are stripped
    /// from the description. Everything else means no anomaly.
    pub fn parse_reply(&self, reply: &str) -> AnomalyResult {
        let trimmed = reply.trim();
        match self.affirmative_pattern.captures(trimmed) {
            Some(captures) => {
                let description = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                if description.is_empty() {
                    AnomalyResult::detected(UNDESCRIBED_ANOMALY)
                } else {
                    AnomalyResult::detected(description)
                }
            }
            None => AnomalyResult::none(),
        }
    }

    async fn request_reply(&self, text: &str) -> Result<Option<String>> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::anomaly_prompt(text),
                },
            ],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PagerError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content))
    }
}

#[async_trait]
impl AnomalyDetector for AnomalyProber {
    async fn detect(&self, text: &str) -> Result<AnomalyResult> {
        match self.request_reply(text).await? {
            Some(reply) => {
                debug!("Anomaly probe reply: {}", reply.trim());
                Ok(self.parse_reply(&reply))
            }
            None => {
                debug!("Anomaly probe response had no choices");
                Ok(AnomalyResult::none())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prober() -> AnomalyProber {
        AnomalyProber::new(ProberConfig::new("sk-test")).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = ProberConfig::new("key");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut config = ProberConfig::new("key");
        config.endpoint = "not a url".to_string();
        assert!(matches!(
            AnomalyProber::new(config),
            Err(PagerError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_prompt_embeds_text() {
        let prompt = AnomalyProber::anomaly_prompt("Page body here.");
        assert!(prompt.ends_with("respond with 'no': Page body here."));
    }

    #[test]
    fn test_parse_reply_negative() {
        let prober = prober();
        assert!(!prober.parse_reply("no").is_anomalous());
        assert!(!prober.parse_reply("No, the text looks fine.").is_anomalous());
        assert!(!prober.parse_reply("").is_anomalous());
        assert!(!prober.parse_reply("I think yes").is_anomalous());
    }

    #[test]
    fn test_parse_reply_keeps_full_description() {
        let prober = prober();
        let expected = "The second sentence is cut off.";

        for reply in [
            "yes, The second sentence is cut off.",
            "Yes The second sentence is cut off.",
            "YES: The second sentence is cut off.",
            "  yes.  The second sentence is cut off.\n",
        ] {
            assert_eq!(prober.parse_reply(reply).description, expected, "{reply:?}");
        }
    }

    #[test]
    fn test_parse_reply_keeps_leading_quote() {
        let prober = prober();
        assert_eq!(
            prober.parse_reply("yes \"Foo\" is cut off").description,
            "\"Foo\" is cut off"
        );
        assert_eq!(
            prober.parse_reply("Yes - (a) heading is duplicated").description,
            "(a) heading is duplicated"
        );
    }

    #[test]
    fn test_parse_reply_bare_yes() {
        let prober = prober();
        let result = prober.parse_reply("Yes.");
        assert!(result.is_anomalous());
        assert_eq!(result.description, UNDESCRIBED_ANOMALY);
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatCompletionRequest {
            model: DEFAULT_MODEL,
            messages: vec![ChatMessage {
                role: "system",
                content: SYSTEM_MESSAGE.to_string(),
            }],
            temperature: DEFAULT_TEMPERATURE,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], SYSTEM_MESSAGE);
    }

    #[test]
    fn test_response_without_choices_parses() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
