/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Assistant exchange loop.
//!
//! Core structures:
//! - `Orchestrator`: drives model rounds and executes the tool calls that
//!   come back until the model stops or the round budget runs out
//! - `ModelClient` / `DocumentGenerator`: transport seams, HTTP in
//!   production and scripted in tests
//! - `ExchangeOutcome`: how a finished exchange ended
//!
//! Boundary: every conversation and graph mutation an exchange makes goes
//! through the orchestrator; transports only turn contents into replies.

use euclid::default::Size2D;
use log::{debug, warn};
use serde_json::{Value, json};
use uuid::Uuid;

pub mod config;
pub mod http;
pub mod protocol;

use crate::app::Workspace;
use crate::model::conversation::{
    ConversationTurn, NodeReference, TokenUsage, ToolCallRecord, ToolResultRecord,
};
use crate::model::graph::{NodeContent, NodeKey};
use config::AssistantConfig;
use protocol::{
    COMPONENT_ERROR_DOCUMENT, Content, CreatedNodeKind, SYSTEM_INSTRUCTION, ToolCommand,
    tool_declarations, transcript_to_contents,
};

/// Footprint of nodes the `createNode` tool places.
const TOOL_NODE_SIZE: Size2D<f32> = Size2D::new(250.0, 100.0);
/// Placeholder footprint while a component generates.
const LOADING_NODE_SIZE: Size2D<f32> = Size2D::new(300.0, 200.0);
/// Footprint of a finished component node.
const COMPONENT_NODE_SIZE: Size2D<f32> = Size2D::new(450.0, 300.0);

const EXCHANGE_APOLOGY: &str = "Sorry, I encountered an error.";
const EXPANSION_APOLOGY: &str = "Sorry, I encountered an error while trying to expand on that.";
const BUDGET_STOP_MESSAGE: &str = "Stopped: too many tool calls.";
const UNKNOWN_FUNCTION_ERROR: &str = "Unknown function";

/// Errors from the assistant transport.
#[derive(Debug, Clone)]
pub enum AssistantError {
    /// Connection, TLS or timeout failure.
    Transport(String),
    /// Non-success HTTP status.
    HttpStatus(u16),
    /// Response body missing or undecodable.
    Body(String),
    /// Configured API key variable is unset.
    MissingApiKey(String),
}

impl std::fmt::Display for AssistantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantError::Transport(e) => write!(f, "transport error: {e}"),
            AssistantError::HttpStatus(status) => write!(f, "HTTP status {status}"),
            AssistantError::Body(e) => write!(f, "unreadable model response: {e}"),
            AssistantError::MissingApiKey(var) => {
                write!(f, "API key environment variable '{var}' is not set")
            },
        }
    }
}

impl std::error::Error for AssistantError {}

/// One model response, reduced to what the exchange loop consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Free-text segments, in response order.
    pub text_parts: Vec<String>,
    /// Tool invocations to execute, in response order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Token accounting, when the transport reports it.
    pub token_usage: Option<TokenUsage>,
}

/// Model-call seam behind the exchange loop.
#[allow(async_fn_in_trait)]
pub trait ModelClient {
    /// One model round over the converted transcript.
    async fn generate(
        &self,
        history: &[Content],
        system_instruction: &str,
        tools: &Value,
    ) -> Result<ModelReply, AssistantError>;
}

/// Secondary generation seam producing a self-contained HTML document
/// from a prompt.
#[allow(async_fn_in_trait)]
pub trait DocumentGenerator {
    async fn generate_document(&self, prompt: &str) -> Result<String, AssistantError>;
}

/// How a finished exchange ended. Entry points return `None` instead when
/// no exchange started at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The model produced a final response, or ended silently after tools.
    Completed,
    /// The round budget ran out before the model stopped calling tools.
    StoppedAtToolBudget,
    /// A transport or model failure aborted the exchange.
    TransportFailed,
}

/// Drives exchanges against a workspace, one at a time.
pub struct Orchestrator<C, G> {
    client: C,
    generator: G,
    config: AssistantConfig,
}

impl<C: ModelClient, G: DocumentGenerator> Orchestrator<C, G> {
    pub fn new(client: C, generator: G, config: AssistantConfig) -> Self {
        Self {
            client,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Run one exchange for a user message, optionally carrying an attached
    /// image and a referenced canvas node. `None` when an exchange is
    /// already in flight; the workspace is untouched in that case.
    pub async fn run_exchange(
        &self,
        workspace: &mut Workspace,
        prompt: &str,
        image_data_url: Option<String>,
        reference: Option<NodeReference>,
    ) -> Option<ExchangeOutcome> {
        if !workspace.begin_exchange() {
            return None;
        }

        let mut turn = ConversationTurn::user(prompt);
        if let Some(data_url) = image_data_url {
            turn = turn.with_image(data_url);
        }
        if let Some(reference) = reference {
            turn = turn.with_node_reference(reference);
        }
        workspace.conversation.push(turn);

        let outcome = self.drive_exchange(workspace, None, EXCHANGE_APOLOGY).await;
        workspace.finish_exchange();
        Some(outcome)
    }

    /// Grow a mind map out of an existing text node. The node itself
    /// becomes the default parent for the round's tool calls. `None` for
    /// nodes that cannot be expanded (missing, non-text, or empty) and
    /// when an exchange is already in flight.
    pub async fn expand_node(
        &self,
        workspace: &mut Workspace,
        node: NodeKey,
    ) -> Option<ExchangeOutcome> {
        let (source_id, reference, text) = {
            let source = workspace.graph.get_node(node)?;
            let NodeContent::Text { text } = &source.content else {
                return None;
            };
            if text.is_empty() {
                return None;
            }
            (source.id, NodeReference::from_node(source), text.clone())
        };
        if !workspace.begin_exchange() {
            return None;
        }

        debug!("expanding node {source_id}");
        let prompt = format!(
            "Based on the following text, create a mind map with a few related \
             concepts. The root node should be the original text.\n\nOriginal text: \"{text}\""
        );
        workspace.conversation.push(
            ConversationTurn::user(format!("(Expanding node) {prompt}"))
                .with_node_reference(reference),
        );

        let outcome = self
            .drive_exchange(workspace, Some(source_id), EXPANSION_APOLOGY)
            .await;
        workspace.finish_exchange();
        Some(outcome)
    }

    async fn drive_exchange(
        &self,
        workspace: &mut Workspace,
        initial_parent: Option<Uuid>,
        apology: &str,
    ) -> ExchangeOutcome {
        let tools = tool_declarations();
        let mut rounds_used: u32 = 0;

        loop {
            let contents = transcript_to_contents(&workspace.conversation);
            let reply = match self
                .client
                .generate(&contents, SYSTEM_INSTRUCTION, &tools)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("model call failed: {e}");
                    workspace.conversation.push(ConversationTurn::model(apology));
                    return ExchangeOutcome::TransportFailed;
                },
            };

            let text = reply.text_parts.concat();

            if reply.tool_calls.is_empty() {
                if !text.trim().is_empty() {
                    workspace.conversation.push(ConversationTurn::model(text));
                    workspace.conversation.annotate_last_model_turn(
                        Some(self.config.model_id.clone()),
                        reply.token_usage,
                    );
                }
                return ExchangeOutcome::Completed;
            }

            if rounds_used >= self.config.round_budget {
                warn!(
                    "exchange exceeded its budget of {} tool rounds",
                    self.config.round_budget
                );
                workspace
                    .conversation
                    .push(ConversationTurn::model(BUDGET_STOP_MESSAGE));
                return ExchangeOutcome::StoppedAtToolBudget;
            }
            rounds_used += 1;
            debug!("tool round {rounds_used}: {} calls", reply.tool_calls.len());

            workspace
                .conversation
                .push(ConversationTurn::model_tool_calls(
                    text,
                    reply.tool_calls.clone(),
                ));

            // The carried parent is scoped to one round: every round starts
            // over from the expansion source, or from nothing.
            let mut carried_parent = initial_parent;
            let mut results = Vec::with_capacity(reply.tool_calls.len());
            for call in &reply.tool_calls {
                let result = self
                    .execute_tool(workspace, call, &mut carried_parent)
                    .await;
                results.push(ToolResultRecord {
                    name: call.name.clone(),
                    result,
                });
            }
            workspace
                .conversation
                .push(ConversationTurn::tool_results(results));
        }
    }

    async fn execute_tool(
        &self,
        workspace: &mut Workspace,
        call: &ToolCallRecord,
        carried_parent: &mut Option<Uuid>,
    ) -> Value {
        let Some(command) = ToolCommand::parse(&call.name, &call.args) else {
            warn!("refusing tool call '{}'", call.name);
            return json!({ "error": UNKNOWN_FUNCTION_ERROR });
        };

        match command {
            ToolCommand::CreateNode {
                content,
                parent_node_id,
                node_type,
            } => {
                let parent =
                    resolve_parent(workspace, parent_node_id.as_deref(), *carried_parent);
                let node_content = match node_type {
                    Some(CreatedNodeKind::Code) => NodeContent::Code { html: content },
                    _ => NodeContent::Text { text: content },
                };
                let key = workspace.insert_node(node_content, TOOL_NODE_SIZE, parent);
                let node_id = node_uuid(workspace, key);
                if carried_parent.is_none() {
                    *carried_parent = Some(node_id);
                }
                json!({ "nodeId": node_id })
            },
            ToolCommand::CreateComponent {
                prompt,
                parent_node_id,
            } => {
                let parent =
                    resolve_parent(workspace, parent_node_id.as_deref(), *carried_parent);
                let key = workspace.insert_node(
                    NodeContent::Loading {
                        prompt: prompt.clone(),
                    },
                    LOADING_NODE_SIZE,
                    parent,
                );
                let node_id = node_uuid(workspace, key);
                if carried_parent.is_none() {
                    *carried_parent = Some(node_id);
                }

                match self.generator.generate_document(&prompt).await {
                    Ok(html) => {
                        workspace
                            .graph
                            .set_node_content(key, NodeContent::Code { html });
                        workspace.graph.resize_node(key, COMPONENT_NODE_SIZE);
                        json!({ "nodeId": node_id, "status": "completed" })
                    },
                    Err(e) => {
                        warn!("component generation failed: {e}");
                        workspace.graph.set_node_content(
                            key,
                            NodeContent::Code {
                                html: COMPONENT_ERROR_DOCUMENT.to_string(),
                            },
                        );
                        workspace.graph.resize_node(key, COMPONENT_NODE_SIZE);
                        json!({ "nodeId": node_id, "error": e.to_string() })
                    },
                }
            },
        }
    }
}

/// Resolve the parent for a tool-created node. An explicit non-empty id
/// wins over the carried parent; an explicit id that matches no live node
/// resolves to no parent at all.
fn resolve_parent(
    workspace: &Workspace,
    explicit: Option<&str>,
    carried: Option<Uuid>,
) -> Option<NodeKey> {
    let id = match explicit.filter(|raw| !raw.is_empty()) {
        Some(raw) => Uuid::parse_str(raw).ok(),
        None => carried,
    };
    id.and_then(|id| workspace.graph.get_node_key_by_id(id))
}

fn node_uuid(workspace: &Workspace, key: NodeKey) -> Uuid {
    workspace
        .graph
        .get_node(key)
        .map(|node| node.id)
        .unwrap_or_default()
}
