/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Wire contract for the model-call collaborator.
//!
//! Core structures:
//! - `Content` / `Part`: generateContent-style message shapes
//! - `ToolCommand`: typed decode of the tool calls the model may emit
//! - `transcript_to_contents`: verbatim replay of the stored conversation
//!
//! The part union stays a struct of optional fields because that is the
//! wire's own shape; `ToolCommand` re-tags calls into a closed enum at the
//! boundary so the orchestrator never dispatches on raw strings.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::model::conversation::{ConversationTurn, TurnRole};

/// Instruction framing every canvas exchange.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert AI assistant integrated into an infinite canvas application.\n\
You have two primary capabilities accessed via tools:\n\
1.  **Mind Mapping ('createNode' tool):** To help users visualize ideas. When a user asks to create a mind map, diagram, list, or any structured information, you MUST use the 'createNode' tool to build it visually. Create a root node, then use its 'nodeId' to create connected child nodes. Do not describe the mind map in text.\n\
2.  **Web Component Generation ('createComponent' tool):** To create interactive web components. When a user asks you to create a game, a tool, a simulation, or any visual interactive element, you MUST use the 'createComponent' tool. Provide a clear and concise prompt for the component to be generated.\n\
\n\
Always prefer using tools over just providing a text response.\n\
After you have finished using the tools, respond with a brief confirmation message like \"I've created that for you.\"";

/// Instruction for the secondary component-generation call.
pub const COMPONENT_GENERATOR_INSTRUCTION: &str = "You are an expert web developer. \
Given a prompt, you will use your creativity and coding skills to create a minimal web \
application that perfectly satisfies the prompt. Try to only use vanilla JavaScript, HTML, \
and CSS. Try to design the layout so it looks good at a 4:3 aspect ratio. Write a full HTML \
page with the styles and scripts inlined. The application will be run inside a sandboxed \
iframe, so do not use secure APIs like localStorage, and do not make network calls. Never \
import assets like images or videos as they will not work. Try to use emojis for graphics. \
Return ONLY the HTML page, nothing else, no comments.";

/// Document shown in place of a component that failed to generate.
pub const COMPONENT_ERROR_DOCUMENT: &str =
    "<p>Sorry, an error occurred while generating the component.</p>";

/// One role-attributed message in a model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// One slot of a content. Exactly one field is set per part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Self::default()
        }
    }

    pub fn call(name: impl Into<String>, args: Value) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
            }),
            ..Self::default()
        }
    }

    pub fn response(name: impl Into<String>, response: Value) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response,
            }),
            ..Self::default()
        }
    }
}

/// Base64 media attached to a user content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Tool invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
}

/// Tool result echoed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// Node kind the `createNode` tool may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedNodeKind {
    Text,
    Code,
}

/// A tool call decoded into its declared shape.
///
/// `name` and `args` re-tag directly onto serde's adjacent tagging, so the
/// decode accepts exactly what the declarations promise the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args")]
pub enum ToolCommand {
    #[serde(rename = "createNode")]
    CreateNode {
        content: String,
        #[serde(
            default,
            rename = "parentNodeId",
            skip_serializing_if = "Option::is_none"
        )]
        parent_node_id: Option<String>,
        #[serde(default, rename = "nodeType", skip_serializing_if = "Option::is_none")]
        node_type: Option<CreatedNodeKind>,
    },
    #[serde(rename = "createComponent")]
    CreateComponent {
        prompt: String,
        #[serde(
            default,
            rename = "parentNodeId",
            skip_serializing_if = "Option::is_none"
        )]
        parent_node_id: Option<String>,
    },
}

impl ToolCommand {
    /// Decode a named tool call. `None` for an unknown tool or arguments
    /// that do not fit its declared shape.
    pub fn parse(name: &str, args: &Value) -> Option<Self> {
        serde_json::from_value(json!({ "name": name, "args": args })).ok()
    }
}

/// Tool declarations sent with every exchange call, in the wire's
/// `tools` shape.
pub fn tool_declarations() -> Value {
    json!([
        {
            "functionDeclarations": [{
                "name": "createNode",
                "description": "Creates a new node on the canvas. Use this to build mind maps and diagrams for the user.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "content": {
                            "type": "STRING",
                            "description": "The text content to be placed inside the node."
                        },
                        "parentNodeId": {
                            "type": "STRING",
                            "description": "Optional. The ID of the parent node to connect this new node to."
                        },
                        "nodeType": {
                            "type": "STRING",
                            "description": "The type of node to create. Defaults to 'text'.",
                            "enum": ["text", "code"]
                        }
                    },
                    "required": ["content"]
                }
            }]
        },
        {
            "functionDeclarations": [{
                "name": "createComponent",
                "description": "Creates a new code node containing a fully functional web component (HTML, CSS, JS) based on a user prompt. Use this when the user asks to create a game, a tool, or any visual interactive element.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "prompt": {
                            "type": "STRING",
                            "description": "A detailed description of the web component to create. e.g., \"a simple drawing app with different colors\""
                        },
                        "parentNodeId": {
                            "type": "STRING",
                            "description": "Optional. The ID of the parent node to connect this new node to."
                        }
                    },
                    "required": ["prompt"]
                }
            }]
        }
    ])
}

/// Wire role for a transcript role. Tool results travel under the
/// `function` role.
pub fn wire_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
        TurnRole::Tool => "function",
    }
}

/// Split a `data:{mime};base64,{payload}` URL into mime type and payload.
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (mime_type, data) = rest.split_once(";base64,")?;
    if mime_type.is_empty() {
        return None;
    }
    Some((mime_type, data))
}

/// Convert the stored transcript into model-call contents, verbatim.
///
/// User turns contribute their text, attached image and node-reference
/// context; model turns contribute their text and any recorded tool calls;
/// tool turns contribute one response part per result. A turn that would
/// produce no parts is omitted, since the wire rejects empty contents.
pub fn transcript_to_contents(turns: &[ConversationTurn]) -> Vec<Content> {
    turns.iter().filter_map(content_for_turn).collect()
}

fn content_for_turn(turn: &ConversationTurn) -> Option<Content> {
    let mut parts = Vec::new();
    match turn.role {
        TurnRole::User => {
            if !turn.text.is_empty() {
                parts.push(Part::text(&turn.text));
            }
            if let Some(data_url) = &turn.image_data_url {
                if let Some((mime_type, data)) = split_data_url(data_url) {
                    parts.push(Part::inline(mime_type, data));
                }
            }
            if let Some(reference) = &turn.node_reference {
                parts.push(Part::text(reference.prompt_preamble()));
            }
        },
        TurnRole::Model => {
            if !turn.text.is_empty() {
                parts.push(Part::text(&turn.text));
            }
            for call in &turn.tool_calls {
                parts.push(Part::call(&call.name, call.args.clone()));
            }
        },
        TurnRole::Tool => {
            for result in &turn.tool_results {
                parts.push(Part::response(&result.name, result.result.clone()));
            }
        },
    }
    if parts.is_empty() {
        return None;
    }
    Some(Content {
        role: wire_role(turn.role).to_string(),
        parts,
    })
}
