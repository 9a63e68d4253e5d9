use std::collections::VecDeque;

use euclid::default::Size2D;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;
use uuid::Uuid;

use mindcanvas::VERSION;
use mindcanvas::app::{CanvasIntent, Workspace};
use mindcanvas::input::{KeyboardActions, intents_from_actions};
use mindcanvas::model::conversation::{TokenUsage, ToolCallRecord, TurnRole};
use mindcanvas::model::graph::{NodeContent, NodeKey};
use mindcanvas::persistence::ProjectStore;
use mindcanvas::services::assistant::config::AssistantConfig;
use mindcanvas::services::assistant::protocol::{COMPONENT_ERROR_DOCUMENT, Content};
use mindcanvas::services::assistant::{
    AssistantError, DocumentGenerator, ExchangeOutcome, ModelClient, ModelReply, Orchestrator,
};

// --- scripted transports ---

struct ScriptedClient {
    replies: Mutex<VecDeque<Result<ModelReply, AssistantError>>>,
    histories: Mutex<Vec<Vec<Content>>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<ModelReply, AssistantError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            histories: Mutex::new(Vec::new()),
        }
    }
}

impl ModelClient for &ScriptedClient {
    async fn generate(
        &self,
        history: &[Content],
        _system_instruction: &str,
        _tools: &Value,
    ) -> Result<ModelReply, AssistantError> {
        self.histories.lock().push(history.to_vec());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ModelReply::default()))
    }
}

struct ScriptedGenerator {
    documents: Mutex<VecDeque<Result<String, AssistantError>>>,
}

impl ScriptedGenerator {
    fn new(documents: Vec<Result<String, AssistantError>>) -> Self {
        Self {
            documents: Mutex::new(documents.into()),
        }
    }

    fn unused() -> Self {
        Self::new(Vec::new())
    }
}

impl DocumentGenerator for &ScriptedGenerator {
    async fn generate_document(&self, _prompt: &str) -> Result<String, AssistantError> {
        self.documents
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

fn text_reply(text: &str) -> Result<ModelReply, AssistantError> {
    Ok(ModelReply {
        text_parts: vec![text.to_string()],
        tool_calls: Vec::new(),
        token_usage: Some(TokenUsage {
            prompt_tokens: 20,
            response_tokens: 10,
            total_tokens: 30,
        }),
    })
}

fn call_reply(calls: Vec<(&str, Value)>) -> Result<ModelReply, AssistantError> {
    Ok(ModelReply {
        text_parts: Vec::new(),
        tool_calls: calls
            .into_iter()
            .map(|(name, args)| ToolCallRecord {
                name: name.to_string(),
                args,
            })
            .collect(),
        token_usage: None,
    })
}

fn node_key_by_summary(workspace: &Workspace, summary: &str) -> NodeKey {
    workspace
        .graph
        .nodes()
        .find(|(_, node)| node.content.summary() == summary)
        .map(|(key, _)| key)
        .unwrap_or_else(|| panic!("no node with summary '{summary}'"))
}

// --- scenarios ---

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

#[tokio::test]
async fn mind_map_exchange_scenario() {
    let client = ScriptedClient::new(vec![
        call_reply(vec![
            ("createNode", json!({ "content": "Mind Mapping" })),
            ("createNode", json!({ "content": "Brainstorm" })),
            ("createNode", json!({ "content": "Organize" })),
        ]),
        text_reply("I've created that for you."),
    ]);
    let generator = ScriptedGenerator::unused();
    let orchestrator = Orchestrator::new(&client, &generator, AssistantConfig::default());
    let mut workspace = Workspace::new();

    let outcome = orchestrator
        .run_exchange(&mut workspace, "make a mind map about mind mapping", None, None)
        .await;

    assert_eq!(outcome, Some(ExchangeOutcome::Completed));
    assert!(!workspace.is_processing());

    // One root with two children, linked by the carried parent.
    assert_eq!(workspace.graph.node_count(), 3);
    assert_eq!(workspace.graph.edge_count(), 2);
    let root = node_key_by_summary(&workspace, "Mind Mapping");
    assert_eq!(workspace.graph.children_of(root).len(), 2);
    let brainstorm = node_key_by_summary(&workspace, "Brainstorm");
    assert_eq!(workspace.graph.parent_of(brainstorm), Some(root));

    // user, tool-call turn, tool-result turn, final model turn.
    assert_eq!(workspace.conversation.len(), 4);
    assert_eq!(workspace.conversation[1].role, TurnRole::Model);
    assert_eq!(workspace.conversation[1].tool_calls.len(), 3);
    assert_eq!(workspace.conversation[2].role, TurnRole::Tool);
    assert_eq!(workspace.conversation[2].tool_results.len(), 3);
    let last = &workspace.conversation[3];
    assert_eq!(last.text, "I've created that for you.");
    assert_eq!(last.model_id.as_deref(), Some("gemini-2.5-flash"));
    assert!(last.token_usage.is_some());
}

#[tokio::test]
async fn transcript_replay_scenario() {
    let client = ScriptedClient::new(vec![
        call_reply(vec![("createNode", json!({ "content": "Root" }))]),
        text_reply("Done."),
    ]);
    let generator = ScriptedGenerator::unused();
    let orchestrator = Orchestrator::new(&client, &generator, AssistantConfig::default());
    let mut workspace = Workspace::new();

    orchestrator
        .run_exchange(&mut workspace, "make a mind map", None, None)
        .await;

    let node_id = workspace
        .graph
        .nodes()
        .next()
        .map(|(_, node)| node.id.to_string())
        .unwrap();

    // The second round must replay the recorded tool traffic verbatim.
    let histories = client.histories.lock();
    assert_eq!(histories.len(), 2);
    let second = &histories[1];
    assert_eq!(second.len(), 3);
    assert_eq!(second[0].role, "user");

    assert_eq!(second[1].role, "model");
    let call = second[1].parts[0].function_call.as_ref().unwrap();
    assert_eq!(call.name, "createNode");
    assert_eq!(call.args, json!({ "content": "Root" }));

    assert_eq!(second[2].role, "function");
    let response = second[2].parts[0].function_response.as_ref().unwrap();
    assert_eq!(response.name, "createNode");
    assert_eq!(response.response, json!({ "nodeId": node_id }));
}

#[tokio::test]
async fn component_failure_scenario() {
    let client = ScriptedClient::new(vec![
        call_reply(vec![(
            "createComponent",
            json!({ "prompt": "a pomodoro timer" }),
        )]),
        text_reply("That didn't work out."),
    ]);
    let generator = ScriptedGenerator::new(vec![Err(AssistantError::HttpStatus(503))]);
    let orchestrator = Orchestrator::new(&client, &generator, AssistantConfig::default());
    let mut workspace = Workspace::new();

    let outcome = orchestrator
        .run_exchange(&mut workspace, "build me a timer", None, None)
        .await;

    assert_eq!(outcome, Some(ExchangeOutcome::Completed));
    assert_eq!(workspace.graph.node_count(), 1);
    let (_, node) = workspace.graph.nodes().next().unwrap();
    // The loading placeholder is resolved in place, never left behind.
    assert!(!matches!(node.content, NodeContent::Loading { .. }));
    assert_eq!(
        node.content,
        NodeContent::Code {
            html: COMPONENT_ERROR_DOCUMENT.to_string()
        }
    );
    assert_eq!(node.size, Size2D::new(450.0, 300.0));

    let result = &workspace.conversation[2].tool_results[0];
    assert_eq!(result.result["error"], json!("HTTP status 503"));
}

#[tokio::test]
async fn tool_budget_scenario() {
    let client = ScriptedClient::new(vec![
        call_reply(vec![("createNode", json!({ "content": "One" }))]),
        call_reply(vec![("createNode", json!({ "content": "Two" }))]),
    ]);
    let generator = ScriptedGenerator::unused();
    let config = AssistantConfig {
        round_budget: 1,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(&client, &generator, config);
    let mut workspace = Workspace::new();

    let outcome = orchestrator
        .run_exchange(&mut workspace, "keep going forever", None, None)
        .await;

    assert_eq!(outcome, Some(ExchangeOutcome::StoppedAtToolBudget));
    assert!(!workspace.is_processing());
    // Only the first round executed.
    assert_eq!(workspace.graph.node_count(), 1);
    let last = workspace.conversation.last().unwrap();
    assert_eq!(last.role, TurnRole::Model);
    assert_eq!(last.text, "Stopped: too many tool calls.");
}

#[tokio::test]
async fn node_expansion_scenario() {
    let client = ScriptedClient::new(vec![
        call_reply(vec![
            ("createNode", json!({ "content": "Chlorophyll" })),
            ("createNode", json!({ "content": "Sunlight" })),
        ]),
        text_reply("Expanded it."),
    ]);
    let generator = ScriptedGenerator::unused();
    let orchestrator = Orchestrator::new(&client, &generator, AssistantConfig::default());
    let mut workspace = Workspace::new();
    workspace.apply_intents([CanvasIntent::AddNode {
        content: NodeContent::Text {
            text: "Photosynthesis".to_string(),
        },
        parent: None,
    }]);
    let source = node_key_by_summary(&workspace, "Photosynthesis");

    let outcome = orchestrator.expand_node(&mut workspace, source).await;

    assert_eq!(outcome, Some(ExchangeOutcome::Completed));
    // Both new nodes hang off the expanded source.
    assert_eq!(workspace.graph.node_count(), 3);
    assert_eq!(workspace.graph.children_of(source).len(), 2);

    let user_turn = &workspace.conversation[0];
    assert!(user_turn.text.starts_with("(Expanding node) "));
    assert!(user_turn.text.contains("Original text: \"Photosynthesis\""));
    assert_eq!(
        user_turn
            .node_reference
            .as_ref()
            .map(|reference| reference.summary.as_str()),
        Some("Photosynthesis")
    );
}

#[test]
fn relink_replaces_edge_scenario() {
    let mut workspace = Workspace::new();
    workspace.apply_intents([
        CanvasIntent::AddNode {
            content: NodeContent::Text {
                text: "A".to_string(),
            },
            parent: None,
        },
        CanvasIntent::AddNode {
            content: NodeContent::Text {
                text: "B".to_string(),
            },
            parent: None,
        },
    ]);
    let a = node_key_by_summary(&workspace, "A");
    let b = node_key_by_summary(&workspace, "B");

    workspace.apply_intents([
        CanvasIntent::LinkNodes { from: a, to: b },
        CanvasIntent::LinkNodes { from: a, to: b },
    ]);
    assert_eq!(workspace.graph.edge_count(), 1);

    // Self-links are refused outright.
    workspace.apply_intents([CanvasIntent::LinkNodes { from: a, to: a }]);
    assert_eq!(workspace.graph.edge_count(), 1);
}

#[test]
fn delete_releases_capture_scenario() {
    let mut workspace = Workspace::new();
    workspace.apply_intents([CanvasIntent::AddNode {
        content: NodeContent::Text {
            text: "Screen share".to_string(),
        },
        parent: None,
    }]);
    let node = node_key_by_summary(&workspace, "Screen share");
    let node_id = workspace.graph.get_node(node).map(|n| n.id).unwrap();

    let lease = workspace.captures.acquire(node_id).unwrap();
    assert!(workspace.captures.is_captured(node_id));

    workspace.apply_intents([CanvasIntent::RemoveNode { node }]);

    assert_eq!(workspace.graph.node_count(), 0);
    assert!(!workspace.captures.is_captured(node_id));
    // The stale lease must not revive or double-release the entry.
    drop(lease);
    assert!(workspace.captures.is_empty());
}

#[test]
fn keyboard_delete_scenario() {
    let mut workspace = Workspace::new();
    workspace.apply_intents([CanvasIntent::AddNode {
        content: NodeContent::Text {
            text: "Doomed".to_string(),
        },
        parent: None,
    }]);
    // AddNode selects the new node, so Delete can act on it directly.
    assert_eq!(workspace.selected_nodes.len(), 1);

    let actions = KeyboardActions {
        delete_selected: true,
        ..Default::default()
    };
    workspace.apply_intents(intents_from_actions(&actions));

    assert_eq!(workspace.graph.node_count(), 0);
    assert!(workspace.selected_nodes.is_empty());
}

#[tokio::test]
async fn project_roundtrip_scenario() {
    let client = ScriptedClient::new(vec![
        call_reply(vec![("createNode", json!({ "content": "Saved idea" }))]),
        text_reply("Done."),
    ]);
    let generator = ScriptedGenerator::unused();
    let orchestrator = Orchestrator::new(&client, &generator, AssistantConfig::default());
    let mut workspace = Workspace::new();

    orchestrator
        .run_exchange(&mut workspace, "note this down", None, None)
        .await;
    assert_eq!(workspace.graph.node_count(), 1);
    assert_eq!(workspace.conversation.len(), 4);

    let dir = TempDir::new().unwrap();
    let store = ProjectStore::open(dir.path().to_path_buf()).unwrap();
    let mut project = store.create().unwrap();
    project.capture(&workspace.graph, &workspace.conversation);
    store.save(&mut project).unwrap();

    let loaded = store.load(project.id).unwrap();
    let mut reopened = Workspace::new();
    reopened.restore(&loaded.graph_snapshot(), loaded.conversation.clone());

    assert_eq!(reopened.graph.node_count(), 1);
    assert_eq!(reopened.conversation.len(), 4);
    assert_eq!(reopened.conversation, workspace.conversation);
    assert!(reopened.selected_nodes.is_empty());
    assert_eq!(reopened.viewport.scale, 1.0);
    assert_eq!(reopened.viewport.x, 0.0);

    // Node identity survives the round trip.
    let original_id = workspace.graph.nodes().next().map(|(_, n)| n.id).unwrap();
    assert!(reopened.graph.get_node_by_id(original_id).is_some());
}

#[test]
fn list_projects_scenario() {
    let dir = TempDir::new().unwrap();
    let store = ProjectStore::open(dir.path().to_path_buf()).unwrap();
    let first = store.create().unwrap();
    let second = store.create().unwrap();

    let names: Vec<String> = store.list().into_iter().map(|p| p.name).collect();
    assert!(names.contains(&"Untitled Project".to_string()));
    assert!(names.contains(&"Untitled Project 2".to_string()));

    let renamed = store.rename(second.id, "Research").unwrap();
    assert_eq!(renamed.name, "Research");
    store.delete(first.id).unwrap();

    let remaining = store.list();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Research");

    let missing = Uuid::new_v4();
    assert!(store.load(missing).is_err());
}
