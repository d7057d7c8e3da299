//! Chat-completion decision function.

use crate::error::{map_http_status, map_reqwest_error};
use async_trait::async_trait;
use serde_json::json;
use vigil_core::{Decision, DecisionError, DecisionFn, DecisionInput};

/// Asks an OpenAI-compatible chat-completion endpoint for the next action.
///
/// The endpoint receives a system prompt built from the persona and a
/// user prompt carrying the battlefield as JSON, and is expected to
/// answer with `{"action", "boss_id", "reason"}`. Replies wrapped in
/// markdown code fences are unwrapped first.
///
/// Without an API key or a model the function reports
/// [`DecisionError::Unavailable`] on every call and the decision loop
/// uses its heuristic.
///
/// # Example
///
/// ```no_run
/// use vigil_agent::ChatDecision;
///
/// let chat = ChatDecision::new("https://api.example.com/v1/chat/completions")
///     .model("gpt-4o-mini")
///     .api_key(std::env::var("LLM_API_KEY").ok())
///     .identity("Cold and Cunning Mage");
/// ```
pub struct ChatDecision {
    url: String,
    model: Option<String>,
    api_key: Option<String>,
    identity: String,
    strategy_prompt: String,
    client: reqwest::Client,
}

impl ChatDecision {
    /// A backend at `url` with no credentials yet.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: None,
            api_key: None,
            identity: String::new(),
            strategy_prompt: String::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Model (or endpoint id) to ask.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into()).filter(|m: &String| !m.trim().is_empty());
        self
    }

    /// Bearer token. Blank keys count as missing.
    #[must_use]
    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());
        self
    }

    /// Persona line.
    #[must_use]
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Code of conduct.
    #[must_use]
    pub fn strategy_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.strategy_prompt = prompt.into();
        self
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Whether both a key and a model are configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.model.is_some()
    }

    /// The system prompt sent with every request.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are an AI Agent participating in a Boss challenge on the Sui blockchain.\n\
             Your Identity: {}.\n\
             Your Code of Conduct: {}.\n\
             \n\
             Battlefield information you can perceive includes:\n\
             1. List of alive Bosses (ID, Name, Current HP, Pool size, Attack cost).\n\
             2. Your wallet balance.\n\
             \n\
             Please make a decision from the following actions based on your identity settings and current status:\n\
             - ATTACK: Launch an attack. Requires boss_id.\n\
             - WAIT: Observe temporarily and take no action.\n\
             - WITHDRAW: Withdraw rewards.\n\
             \n\
             Output format requirement is JSON:\n\
             {{\n  \"action\": \"ATTACK\" | \"WAIT\" | \"WITHDRAW\",\n  \
             \"boss_id\": \"Required only when action is ATTACK\",\n  \
             \"reason\": \"A brief reasoning for your decision in English\"\n}}",
            self.identity, self.strategy_prompt
        )
    }

    /// The user prompt for one decision.
    pub fn user_prompt(input: &DecisionInput) -> Result<String, DecisionError> {
        let state = serde_json::to_string_pretty(input)
            .map_err(|e| DecisionError::Malformed(format!("cannot encode battlefield: {e}")))?;
        Ok(format!(
            "Current battlefield status:\n{state}\n\nPlease make your decision."
        ))
    }
}

/// Unwrap a reply that arrived inside a markdown code fence.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let body = if let Some(start) = trimmed.find("```json") {
        &trimmed[start + "```json".len()..]
    } else if let Some(start) = trimmed.find("```") {
        &trimmed[start + "```".len()..]
    } else {
        return trimmed;
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parse the assistant message into a [`Decision`].
pub fn parse_reply(content: &str) -> Result<Decision, DecisionError> {
    let body = strip_code_fences(content);
    serde_json::from_str(body).map_err(|e| DecisionError::Malformed(format!("{e}: {body}")))
}

#[async_trait]
impl DecisionFn for ChatDecision {
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError> {
        let (Some(key), Some(model)) = (&self.api_key, &self.model) else {
            return Err(DecisionError::Unavailable(
                "chat backend has no api key or model".into(),
            ));
        };

        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": self.system_prompt()},
                {"role": "user", "content": Self::user_prompt(input)?},
            ],
        });

        tracing::debug!(url = %self.url, model = %model, "requesting decision");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(map_http_status(status, &text));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| DecisionError::Malformed(format!("invalid JSON response: {e}")))?;
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| DecisionError::Malformed("response has no message content".into()))?;
        parse_reply(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use vigil_core::{DecisionAction, Target};

    #[test]
    fn strips_json_fence() {
        let reply = "```json\n{\"action\":\"WAIT\",\"reason\":\"hp high\"}\n```";
        assert_eq!(strip_code_fences(reply), "{\"action\":\"WAIT\",\"reason\":\"hp high\"}");
    }

    #[test]
    fn strips_bare_fence() {
        let reply = "Here you go:\n```\n{\"action\":\"WAIT\"}\n```\nGood luck";
        assert_eq!(strip_code_fences(reply), "{\"action\":\"WAIT\"}");
    }

    #[test]
    fn leaves_plain_json_alone() {
        assert_eq!(strip_code_fences("  {\"action\":\"WAIT\"} "), "{\"action\":\"WAIT\"}");
    }

    #[test]
    fn parses_attack_with_boss_id() {
        let d = parse_reply("```json\n{\"action\":\"ATTACK\",\"boss_id\":\"0xb\",\"reason\":\"go\"}\n```")
            .unwrap();
        assert_eq!(d.action, DecisionAction::Attack);
        assert_eq!(d.target_id.as_deref(), Some("0xb"));
    }

    #[test]
    fn unknown_action_is_malformed() {
        let err = parse_reply("{\"action\":\"FLEE\"}").unwrap_err();
        assert!(matches!(err, DecisionError::Malformed(_)));
    }

    #[test]
    fn prompts_carry_persona_and_state() {
        let chat = ChatDecision::new("http://localhost")
            .identity("Flexible and Shrewd Ranger")
            .strategy_prompt("Prefer the largest pool.");
        let system = chat.system_prompt();
        assert!(system.contains("Your Identity: Flexible and Shrewd Ranger."));
        assert!(system.contains("Your Code of Conduct: Prefer the largest pool.."));

        let input = DecisionInput {
            open_targets: vec![Target {
                id: "0xb".into(),
                name: "Kraken".into(),
                cost: Decimal::ONE,
                reward: Decimal::from(40),
                remaining: 300,
                max_remaining: Some(1000),
            }],
            balance: Decimal::from(7),
        };
        let user = ChatDecision::user_prompt(&input).unwrap();
        assert!(user.starts_with("Current battlefield status:\n"));
        assert!(user.contains("Kraken"));
        assert!(user.ends_with("Please make your decision."));
    }

    #[tokio::test]
    async fn missing_credentials_are_unavailable() {
        let input = DecisionInput {
            open_targets: vec![],
            balance: Decimal::ZERO,
        };
        let no_key = ChatDecision::new("http://localhost").model("m");
        assert!(matches!(
            no_key.decide(&input).await,
            Err(DecisionError::Unavailable(_))
        ));

        let blank_key = ChatDecision::new("http://localhost")
            .model("m")
            .api_key(Some("   ".into()));
        assert!(!blank_key.is_configured());

        let no_model = ChatDecision::new("http://localhost").api_key(Some("k".into()));
        assert!(matches!(
            no_model.decide(&input).await,
            Err(DecisionError::Unavailable(_))
        ));
    }
}
