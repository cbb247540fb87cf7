use std::sync::mpsc::Sender;
use tracing::debug;

use crate::client::{RegistryClient, RepoCommand};
use crate::tui::state::AppEvent;

/// Runs repository commands off the UI thread and reports each outcome
/// back through the inbox.
#[derive(Clone)]
pub struct CommandDispatcher {
    client: RegistryClient,
    tx: Sender<AppEvent>,
}

impl CommandDispatcher {
    pub fn new(client: RegistryClient, tx: Sender<AppEvent>) -> Self {
        Self { client, tx }
    }

    pub fn dispatch(&self, id: u64, cmd: RepoCommand) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            debug!(id, repo = %cmd.repo, action = %cmd.action, "dispatching command");
            let result = client.execute(&cmd).await;
            if tx.send(AppEvent::CommandFinished { id, result }).is_err() {
                debug!(id, "ui gone before command finished");
            }
        });
    }
}
