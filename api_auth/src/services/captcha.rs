use std::time::Duration;

use async_trait::async_trait;
use common::{env_config::RecaptchaConfig, error::Res};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanVerdict {
    Human,
    /// Score between the bot and uncertain thresholds.
    Uncertain,
    Bot,
    /// The scoring service could not be reached.
    Unavailable,
}

impl HumanVerdict {
    pub fn is_human(self) -> bool {
        self == HumanVerdict::Human
    }
}

/// Anti-bot check run before a signup reaches the orchestrator.
#[async_trait]
pub trait HumanGate: Send + Sync {
    async fn check(&self, token: &str, remote_ip: Option<&str>) -> HumanVerdict;
}

/// Always answers with the same verdict. For development and tests.
pub struct StaticHumanGate(pub HumanVerdict);

#[async_trait]
impl HumanGate for StaticHumanGate {
    async fn check(&self, _token: &str, _remote_ip: Option<&str>) -> HumanVerdict {
        self.0
    }
}

#[derive(Debug, Deserialize)]
pub struct SiteVerifyResponse {
    pub success: bool,
    pub score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// reCAPTCHA v3 `siteverify` client.
pub struct RecaptchaGate {
    client: Client,
    private_key: String,
    verify_url: String,
    bot_threshold: f64,
    uncertain_threshold: f64,
}

impl RecaptchaGate {
    pub fn new(config: &RecaptchaConfig, timeout: Duration) -> Res<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            private_key: config.private_key.clone(),
            verify_url: config.verify_url.clone(),
            bot_threshold: config.bot_threshold,
            uncertain_threshold: config.uncertain_threshold,
        })
    }

    pub fn classify(&self, response: &SiteVerifyResponse) -> HumanVerdict {
        if !response.success {
            log::info!("reCAPTCHA verification failed: {:?}", response.error_codes);
            return HumanVerdict::Bot;
        }

        let Some(score) = response.score else {
            log::info!("reCAPTCHA response carried no score");
            return HumanVerdict::Bot;
        };

        let verdict = classify_score(score, self.bot_threshold, self.uncertain_threshold);
        if verdict == HumanVerdict::Uncertain {
            log::warn!("Uncertain reCAPTCHA score {}", score);
        }
        verdict
    }
}

#[async_trait]
impl HumanGate for RecaptchaGate {
    async fn check(&self, token: &str, remote_ip: Option<&str>) -> HumanVerdict {
        if token.trim().is_empty() {
            return HumanVerdict::Bot;
        }

        let mut params = vec![("secret", self.private_key.as_str()), ("response", token)];
        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip));
        }

        let response = match self.client.post(&self.verify_url).form(&params).send().await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Could not get reCAPTCHA score: {}", e);
                return HumanVerdict::Unavailable;
            }
        };

        if !response.status().is_success() {
            log::error!("reCAPTCHA answered with status {}", response.status());
            return HumanVerdict::Unavailable;
        }

        match response.json::<SiteVerifyResponse>().await {
            Ok(body) => self.classify(&body),
            Err(e) => {
                log::warn!("Unreadable reCAPTCHA response: {}", e);
                HumanVerdict::Bot
            }
        }
    }
}

pub fn classify_score(score: f64, bot_threshold: f64, uncertain_threshold: f64) -> HumanVerdict {
    if score < bot_threshold {
        HumanVerdict::Bot
    } else if score < uncertain_threshold {
        HumanVerdict::Uncertain
    } else {
        HumanVerdict::Human
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn gate() -> RecaptchaGate {
        RecaptchaGate::new(
            &RecaptchaConfig {
                private_key: "secret".to_string(),
                verify_url: "http://127.0.0.1:9/siteverify".to_string(),
                bot_threshold: 0.1,
                uncertain_threshold: 0.5,
            },
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn score_thresholds() {
        assert_eq!(classify_score(0.05, 0.1, 0.5), HumanVerdict::Bot);
        assert_eq!(classify_score(0.1, 0.1, 0.5), HumanVerdict::Uncertain);
        assert_eq!(classify_score(0.49, 0.1, 0.5), HumanVerdict::Uncertain);
        assert_eq!(classify_score(0.5, 0.1, 0.5), HumanVerdict::Human);
        assert_eq!(classify_score(0.9, 0.1, 0.5), HumanVerdict::Human);
    }

    #[test]
    fn failed_or_scoreless_responses_are_bots() {
        let gate = gate();

        let failed: SiteVerifyResponse = serde_json::from_value(json!({
            "success": false,
            "error-codes": ["invalid-input-response"]
        }))
        .unwrap();
        assert_eq!(gate.classify(&failed), HumanVerdict::Bot);

        let scoreless: SiteVerifyResponse =
            serde_json::from_value(json!({ "success": true })).unwrap();
        assert_eq!(gate.classify(&scoreless), HumanVerdict::Bot);

        let human: SiteVerifyResponse =
            serde_json::from_value(json!({ "success": true, "score": 0.9 })).unwrap();
        assert_eq!(gate.classify(&human), HumanVerdict::Human);
    }

    #[tokio::test]
    async fn empty_token_short_circuits() {
        assert_eq!(gate().check("", None).await, HumanVerdict::Bot);
    }
}
