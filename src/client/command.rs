use serde_json::{Value, json};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    Deploy { tag: String },
    SetAutoDeploy(bool),
    Reset,
}

impl fmt::Display for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandAction::Deploy { tag } => write!(f, "deploy {tag}"),
            CommandAction::SetAutoDeploy(true) => write!(f, "auto-deploy on"),
            CommandAction::SetAutoDeploy(false) => write!(f, "auto-deploy off"),
            CommandAction::Reset => write!(f, "reset"),
        }
    }
}

/// A command against a single repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCommand {
    pub repo: String,
    pub action: CommandAction,
}

impl RepoCommand {
    pub fn deploy(repo: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            action: CommandAction::Deploy { tag: tag.into() },
        }
    }

    pub fn auto_deploy(repo: impl Into<String>, enabled: bool) -> Self {
        Self {
            repo: repo.into(),
            action: CommandAction::SetAutoDeploy(enabled),
        }
    }

    pub fn reset(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            action: CommandAction::Reset,
        }
    }

    pub fn path(&self) -> String {
        match self.action {
            CommandAction::Reset => format!("/tags/{}/reset", self.repo),
            _ => format!("/tags/{}", self.repo),
        }
    }

    pub fn body(&self) -> Value {
        match &self.action {
            CommandAction::Deploy { tag } => json!({ "pinned_tag": tag }),
            CommandAction::SetAutoDeploy(enabled) => json!({ "auto_deploy": enabled }),
            CommandAction::Reset => json!({}),
        }
    }
}
