/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Conversation transcript between the user and the assistant.
//!
//! Core structures:
//! - `Conversation`: append-only turn list, persisted with the project
//! - `ConversationTurn`: one user / model / tool entry, tool traffic included
//! - `NodeReference`: canvas node attached to a user turn
//!
//! The transcript records tool calls and tool results verbatim so a later
//! exchange can replay the full history to the model instead of a lossy
//! text-only reconstruction.
//!
//! Boundary: turns are appended through `pub(crate)` methods on
//! `Conversation` — the exchange loop is the only writer.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use uuid::Uuid;

use crate::model::graph::Node;

/// Longest node-content excerpt quoted into a chat turn.
pub const NODE_REFERENCE_SUMMARY_LIMIT: usize = 200;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
    /// Results of tool calls, echoed back to the model.
    Tool,
}

/// Canvas node attached to a user turn.
///
/// Carries a content excerpt taken at send time, so the transcript stays
/// meaningful even after the node is edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReference {
    pub node_id: Uuid,
    pub kind_tag: String,
    pub summary: String,
}

impl NodeReference {
    pub fn from_node(node: &Node) -> Self {
        Self {
            node_id: node.id,
            kind_tag: node.content.kind_tag().to_string(),
            summary: node
                .content
                .summary()
                .chars()
                .take(NODE_REFERENCE_SUMMARY_LIMIT)
                .collect(),
        }
    }

    /// Context line sent to the model alongside the user's message text.
    pub fn prompt_preamble(&self) -> String {
        format!(
            "The user is referencing a \"{}\" node on the canvas. Node content summary: {}",
            self.kind_tag, self.summary
        )
    }
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub args: serde_json::Value,
}

/// The outcome returned for one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub name: String,
    pub result: serde_json::Value,
}

/// Token accounting reported by the model for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub response_tokens: u32,
    pub total_tokens: u32,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    /// Display text. Empty for pure tool-call or tool-result turns.
    pub text: String,
    /// Image attached by the user, as a data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
    /// Canvas node the user was pointing at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_reference: Option<NodeReference>,
    /// Tool calls the model emitted in this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
    /// Tool results echoed back in this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResultRecord>,
    /// Which model produced a final answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Token accounting for a final answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            image_data_url: None,
            node_reference: None,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            model_id: None,
            token_usage: None,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            ..Self::user(text)
        }
    }

    /// Model turn that carried tool calls instead of (or alongside) text.
    pub fn model_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self {
            tool_calls,
            ..Self::model(text)
        }
    }

    /// Tool-result turn answering the calls of the previous model turn.
    pub fn tool_results(results: Vec<ToolResultRecord>) -> Self {
        Self {
            role: TurnRole::Tool,
            tool_results: results,
            ..Self::user(String::new())
        }
    }

    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.image_data_url = Some(data_url.into());
        self
    }

    pub fn with_node_reference(mut self, reference: NodeReference) -> Self {
        self.node_reference = Some(reference);
        self
    }
}

/// Append-only transcript. Dereferences to the turn slice for reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }

    /// Annotate the most recent model turn with provenance, once the
    /// response metadata is known.
    pub(crate) fn annotate_last_model_turn(
        &mut self,
        model_id: Option<String>,
        token_usage: Option<TokenUsage>,
    ) {
        if let Some(turn) = self
            .turns
            .iter_mut()
            .rev()
            .find(|turn| turn.role == TurnRole::Model)
        {
            turn.model_id = model_id;
            turn.token_usage = token_usage;
        }
    }
}

impl Deref for Conversation {
    type Target = [ConversationTurn];

    fn deref(&self) -> &Self::Target {
        &self.turns
    }
}
