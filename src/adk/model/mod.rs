// SPDX-License-Identifier: MIT

//! Model module - narrative generation collaborator
//!
//! This module provides the core Model trait and shared types.
//! Model implementations are in their own submodules:
//! - [openai] - OpenAI-compatible chat completions API
//! - [offline] - deterministic local drafts, used when no API key is configured

pub mod offline;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adk::error::ModelError;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// Speaker of a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Model,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: Role,
    pub text: String,
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Core trait for narrative model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &str;

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ModelError>;
}

/// Single-turn generation with a system context, at temperature 0
pub async fn generate_text(
    model: &dyn Model,
    system: &str,
    prompt: &str,
) -> Result<String, ModelError> {
    let history = [Content::system(system), Content::user(prompt)];
    let config = GenerationConfig {
        temperature: Some(0.0),
        ..Default::default()
    };

    log::debug!("Requesting narrative from model '{}'", model.name());
    let response = model.generate_content(&history, Some(&config)).await?;
    if response.text.trim().is_empty() {
        return Err(ModelError::InvalidResponse("empty completion".to_string()));
    }
    Ok(response.text)
}
