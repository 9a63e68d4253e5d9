/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Project persistence as plain JSON files.
//!
//! One file per project id under the platform data directory. A project
//! stores the serialized graph, the conversation transcript and a
//! modification stamp; hosts rebuild the live workspace from a loaded
//! project via `Workspace::restore`. The store never touches workspace
//! state itself.

use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::model::conversation::Conversation;
use crate::model::graph::{Graph, GraphSnapshot, PersistedEdge, PersistedNode};

const UNTITLED_NAME: &str = "Untitled Project";

/// One saved canvas: graph, transcript and bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub nodes: Vec<PersistedNode>,
    pub edges: Vec<PersistedEdge>,
    pub conversation: Conversation,
    /// RFC 3339 stamp, refreshed on every save.
    pub updated_at: String,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            conversation: Conversation::new(),
            updated_at: now_rfc3339(),
        }
    }

    /// Capture the live graph and transcript into this project.
    pub fn capture(&mut self, graph: &Graph, conversation: &Conversation) {
        let snapshot = graph.to_snapshot();
        self.nodes = snapshot.nodes;
        self.edges = snapshot.edges;
        self.conversation = conversation.clone();
    }

    /// Snapshot view of the stored graph, for rebuilding a workspace.
    pub fn graph_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}

/// Directory listing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub updated_at: String,
}

/// Project files under one root directory.
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    /// Open or create a project store at the given directory.
    pub fn open(root: PathBuf) -> Result<Self, ProjectStoreError> {
        std::fs::create_dir_all(&root)
            .map_err(|e| ProjectStoreError::Io(format!("Failed to create dir: {e}")))?;
        Ok(Self { root })
    }

    /// Default projects directory for this platform, when one exists.
    pub fn default_data_dir() -> Option<PathBuf> {
        let mut dir = dirs::data_dir()?;
        dir.push("mindcanvas");
        dir.push("projects");
        Some(dir)
    }

    /// Create and persist an empty project with the next free default name.
    pub fn create(&self) -> Result<Project, ProjectStoreError> {
        let mut project = Project::new(self.next_untitled_name());
        self.save(&mut project)?;
        Ok(project)
    }

    /// Write a project to disk, refreshing its modification stamp.
    pub fn save(&self, project: &mut Project) -> Result<(), ProjectStoreError> {
        project.updated_at = now_rfc3339();
        let json = serde_json::to_string_pretty(project)
            .map_err(|e| ProjectStoreError::Serde(format!("{e}")))?;
        let path = self.project_path(project.id);
        std::fs::write(&path, json).map_err(|e| {
            ProjectStoreError::Io(format!("Failed to write {}: {e}", path.display()))
        })?;
        Ok(())
    }

    pub fn load(&self, id: Uuid) -> Result<Project, ProjectStoreError> {
        let path = self.project_path(id);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProjectStoreError::NotFound(id.to_string()));
            },
            Err(e) => {
                return Err(ProjectStoreError::Io(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            },
        };
        serde_json::from_str(&raw).map_err(|e| ProjectStoreError::Serde(format!("{e}")))
    }

    /// Rename a stored project. The new name must not be blank.
    pub fn rename(&self, id: Uuid, name: &str) -> Result<Project, ProjectStoreError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ProjectStoreError::Io(
                "Project name must not be empty".to_string(),
            ));
        }
        let mut project = self.load(id)?;
        project.name = trimmed.to_string();
        self.save(&mut project)?;
        Ok(project)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ProjectStoreError> {
        let path = self.project_path(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ProjectStoreError::NotFound(id.to_string()))
            },
            Err(e) => Err(ProjectStoreError::Io(format!(
                "Failed to delete {}: {e}",
                path.display()
            ))),
        }
    }

    /// List stored projects, most recently updated first. Unreadable files
    /// are reported and skipped rather than failing the whole listing.
    pub fn list(&self) -> Vec<ProjectSummary> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Ok(raw) = std::fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str::<Project>(&raw) {
                Ok(project) => summaries.push(ProjectSummary {
                    id: project.id,
                    name: project.name,
                    updated_at: project.updated_at,
                }),
                Err(e) => {
                    warn!("Ignoring unreadable project file {}: {e}", path.display());
                },
            }
        }
        // Rfc3339 formatting trims trailing fractional zeros, so string
        // order is not chronological; compare parsed stamps and fall back
        // to string order only for stamps that do not parse.
        summaries.sort_by(|a, b| {
            match (parse_rfc3339(&a.updated_at), parse_rfc3339(&b.updated_at)) {
                (Some(a_at), Some(b_at)) => b_at.cmp(&a_at),
                _ => b.updated_at.cmp(&a.updated_at),
            }
        });
        summaries
    }

    fn next_untitled_name(&self) -> String {
        let existing: Vec<String> = self
            .list()
            .into_iter()
            .map(|summary| summary.name)
            .collect();
        if !existing.iter().any(|name| name == UNTITLED_NAME) {
            return UNTITLED_NAME.to_string();
        }
        let mut counter = 2u32;
        loop {
            let candidate = format!("{UNTITLED_NAME} {counter}");
            if !existing.iter().any(|name| name == &candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    fn project_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn parse_rfc3339(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

/// Errors from the project store.
#[derive(Debug)]
pub enum ProjectStoreError {
    Io(String),
    Serde(String),
    NotFound(String),
}

impl std::fmt::Display for ProjectStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStoreError::Io(e) => write!(f, "IO error: {e}"),
            ProjectStoreError::Serde(e) => write!(f, "Serialization error: {e}"),
            ProjectStoreError::NotFound(id) => write!(f, "No project with id {id}"),
        }
    }
}

impl std::error::Error for ProjectStoreError {}
