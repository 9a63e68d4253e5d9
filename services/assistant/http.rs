/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! generateContent HTTP transport.
//!
//! `HttpModelClient` implements both model-call seams over the same
//! endpoint family: exchanges go to the configured chat model with the
//! canvas tools attached, component generation goes to the component model
//! with no tools. The API key travels in a request header, never in the
//! URL, so it cannot leak through request logs.

use std::sync::OnceLock;
use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::config::AssistantConfig;
use super::protocol::{COMPONENT_GENERATOR_INSTRUCTION, Content, Part};
use super::{AssistantError, DocumentGenerator, ModelClient, ModelReply};
use crate::model::conversation::{TokenUsage, ToolCallRecord};

/// Generous ceiling; component generation regularly takes the better part
/// of a minute.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn shared_client() -> &'static Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client should build")
    })
}

/// Model transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpModelClient {
    config: AssistantConfig,
}

impl HttpModelClient {
    pub fn new(config: AssistantConfig) -> Self {
        Self { config }
    }

    async fn generate_content(
        &self,
        model_id: &str,
        body: &Value,
    ) -> Result<Value, AssistantError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| AssistantError::MissingApiKey(self.config.api_key_env.clone()))?;
        let url = request_url(&self.config.endpoint, model_id);
        debug!("calling {model_id}");

        let response = shared_client()
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AssistantError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::HttpStatus(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| AssistantError::Body(e.to_string()))
    }
}

impl ModelClient for HttpModelClient {
    async fn generate(
        &self,
        history: &[Content],
        system_instruction: &str,
        tools: &Value,
    ) -> Result<ModelReply, AssistantError> {
        let body = exchange_body(history, system_instruction, tools);
        let raw = self.generate_content(&self.config.model_id, &body).await?;
        reply_from_response(raw)
    }
}

impl DocumentGenerator for HttpModelClient {
    async fn generate_document(&self, prompt: &str) -> Result<String, AssistantError> {
        let body = document_body(prompt);
        let raw = self
            .generate_content(&self.config.component_model_id, &body)
            .await?;
        document_from_response(raw)
    }
}

fn request_url(endpoint: &str, model_id: &str) -> String {
    format!(
        "{}/models/{model_id}:generateContent",
        endpoint.trim_end_matches('/')
    )
}

fn exchange_body(history: &[Content], system_instruction: &str, tools: &Value) -> Value {
    json!({
        "contents": history,
        "systemInstruction": { "parts": [{ "text": system_instruction }] },
        "tools": tools,
    })
}

fn document_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "systemInstruction": { "parts": [{ "text": COMPONENT_GENERATOR_INSTRUCTION }] },
    })
}

// --- response decoding ---

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: u32,
    candidates_token_count: u32,
    total_token_count: u32,
}

fn decode_response(raw: Value) -> Result<GenerateContentResponse, AssistantError> {
    serde_json::from_value(raw).map_err(|e| AssistantError::Body(e.to_string()))
}

/// Reduce a response to what the exchange loop consumes: text segments and
/// tool calls from the first candidate, plus token accounting.
fn reply_from_response(raw: Value) -> Result<ModelReply, AssistantError> {
    let response = decode_response(raw)?;

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();
    if let Some(content) = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
    {
        for part in content.parts {
            if let Some(text) = part.text {
                text_parts.push(text);
            } else if let Some(call) = part.function_call {
                tool_calls.push(ToolCallRecord {
                    name: call.name,
                    args: call.args,
                });
            }
        }
    }

    let token_usage = response.usage_metadata.map(|usage| TokenUsage {
        prompt_tokens: usage.prompt_token_count,
        response_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    });

    Ok(ModelReply {
        text_parts,
        tool_calls,
        token_usage,
    })
}

/// Extract the generated document: the first candidate's text, trimmed.
fn document_from_response(raw: Value) -> Result<String, AssistantError> {
    let response = decode_response(raw)?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    Ok(text.trim().to_string())
}
