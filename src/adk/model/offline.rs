// SPDX-License-Identifier: MIT

//! Offline Model - deterministic drafts without a network call

use super::{Content, GenerationConfig, Model, Role};
use crate::adk::error::ModelError;
use async_trait::async_trait;

/// Model that echoes the last user message into a fixed report layout
///
/// Used when no API key is configured so every workflow still runs end to end.
#[derive(Debug, Clone, Default)]
pub struct OfflineModel;

impl OfflineModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Model for OfflineModel {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate_content(
        &self,
        history: &[Content],
        _config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError> {
        let prompt = history
            .iter()
            .rev()
            .find(|c| c.role == Role::User)
            .map(|c| c.text.trim())
            .ok_or_else(|| ModelError::InvalidResponse("no user message to answer".into()))?;

        let evidence: Vec<String> = prompt
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| format!("- {}", line))
            .collect();

        Ok(Content::model(format!(
            "Summary of evidence:\n{}\n\nRecommendation: HOLD (drafted offline; no model configured)",
            evidence.join("\n")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::generate_text;

    #[tokio::test]
    async fn test_offline_model_is_deterministic() {
        let model = OfflineModel::new();
        let a = generate_text(&model, "sys", "Price up\n\nSentiment bullish")
            .await
            .unwrap();
        let b = generate_text(&model, "sys", "Price up\n\nSentiment bullish")
            .await
            .unwrap();
        assert_eq!(a, b);
        assert!(a.contains("- Price up\n- Sentiment bullish"));
        assert!(a.contains("Recommendation: HOLD"));
    }

    #[tokio::test]
    async fn test_offline_model_requires_user_message() {
        let model = OfflineModel::new();
        let err = model
            .generate_content(&[Content::system("only system")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
