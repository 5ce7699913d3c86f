use super::conversion::IntoFlow;
use super::definition::{
    END_NODE_ID, FlowDefinition, FlowEdgeDefinition, FlowNodeDefinition, START_NODE_ID,
};
use super::ids::now_millis;
use crate::error::{FlowConversionError, TemplateError};
use crate::ui::UiFlowDocument;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FEISHU_DOMAIN: &str = "delonix.feishu.cn";
const FEISHU_ATTACHMENT_NODE: &str = "88ABDCF3";
const FEISHU_ATTACHMENT_XPATH: &str = "/html/body/div[2]/div[3]/div[1]/div[1]/div[2]/div[1]/div[1]/div[1]/div[1]/div[2]/div[1]/div[1]/div[1]/div[1]/div[1]/div[2]/div[5]/div[@id=\"63aade9c0d2620c73c7dcfce:issue:DETAIL:detail:multi_attachment:1672142503230031816:0\"]/div[1]/div[1]/div[1]/div[1]/div[1]/div[1]/div[1]";

/// How a template's `command` is turned into a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// `command` is the URL of the tracker's new-issue page; the flow is canned.
    Feishu,
    /// `command` is a complete flow document exported from the flow editor.
    Custom,
}

/// A named bug-report template from the options page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    pub command: String,
}

impl IntoFlow for &BugTemplate {
    fn into_flow(self) -> Result<FlowDefinition, FlowConversionError> {
        match self.kind {
            TemplateKind::Feishu => Ok(feishu_flow(&self.command)),
            TemplateKind::Custom => {
                let document: UiFlowDocument = serde_json::from_str(&self.command)
                    .map_err(|e| FlowConversionError::JsonParseError(e.to_string()))?;
                document.into_flow()
            }
        }
    }
}

/// Opens the issue page in a new tab, clicks its attachment area, then pastes.
fn feishu_flow(bug_url: &str) -> FlowDefinition {
    FlowDefinition {
        name: Some("feishu-bug".to_string()),
        domain: Some(FEISHU_DOMAIN.to_string()),
        nodes: vec![
            FlowNodeDefinition {
                id: START_NODE_ID.to_string(),
                new_tab: Some("1".to_string()),
                new_tab_url: Some(bug_url.to_string()),
                ..Default::default()
            },
            FlowNodeDefinition {
                id: END_NODE_ID.to_string(),
                ..Default::default()
            },
            FlowNodeDefinition {
                id: FEISHU_ATTACHMENT_NODE.to_string(),
                handle_type: Some("click".to_string()),
                xpath: Some(FEISHU_ATTACHMENT_XPATH.to_string()),
                input_value: Some(String::new()),
                ..Default::default()
            },
        ],
        edges: vec![
            FlowEdgeDefinition::new("99BF7C20", START_NODE_ID, FEISHU_ATTACHMENT_NODE),
            FlowEdgeDefinition::new("34347E8C", FEISHU_ATTACHMENT_NODE, END_NODE_ID),
        ],
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTemplates {
    #[serde(rename = "bugConfigs", default)]
    bug_configs: Vec<BugTemplate>,
}

/// File-backed list of bug-report templates.
#[derive(Debug)]
pub struct TemplateStore {
    path: PathBuf,
    templates: Vec<BugTemplate>,
}

impl TemplateStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref().to_path_buf();
        let templates = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let stored: StoredTemplates = serde_json::from_str(&content)
                .map_err(|e| TemplateError::Corrupt(e.to_string()))?;
            stored.bug_configs
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), count = templates.len(), "opened template store");
        Ok(Self { path, templates })
    }

    pub fn list(&self) -> &[BugTemplate] {
        &self.templates
    }

    pub fn get(&self, id_or_name: &str) -> Result<&BugTemplate, TemplateError> {
        self.templates
            .iter()
            .find(|t| t.id == id_or_name)
            .or_else(|| self.templates.iter().find(|t| t.name == id_or_name))
            .ok_or_else(|| TemplateError::NotFound(id_or_name.to_string()))
    }

    /// Adds a template and writes the store. Name and command must be non-empty.
    pub fn add(
        &mut self,
        name: &str,
        kind: TemplateKind,
        command: &str,
    ) -> Result<BugTemplate, TemplateError> {
        if name.trim().is_empty() {
            return Err(TemplateError::Incomplete("name"));
        }
        if command.trim().is_empty() {
            return Err(TemplateError::Incomplete("command"));
        }
        let mut id = now_millis().to_string();
        while self.templates.iter().any(|t| t.id == id) {
            id = format!("{}-{}", id, self.templates.len());
        }
        let template = BugTemplate {
            id,
            name: name.to_string(),
            kind,
            command: command.to_string(),
        };
        self.templates.push(template.clone());
        self.save()?;
        info!(id = %template.id, name = %template.name, "template added");
        Ok(template)
    }

    /// Removes a template by id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, TemplateError> {
        let before = self.templates.len();
        self.templates.retain(|t| t.id != id);
        let removed = self.templates.len() != before;
        if removed {
            self.save()?;
            info!(id, "template removed");
        }
        Ok(removed)
    }

    fn save(&self) -> Result<(), TemplateError> {
        let stored = StoredTemplates {
            bug_configs: self.templates.clone(),
        };
        let content = serde_json::to_string_pretty(&stored)
            .map_err(|e| TemplateError::Corrupt(e.to_string()))?;
        fs::write(&self.path, content).map_err(|source| TemplateError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}
