use chrono::{DateTime, Local};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::client::{ClientError, CommandAction, RepoCommand};
use crate::poller::PollEvent;
use crate::repos::{
    RepositoryIndex, RepositoryRecord, SearchQuery, filter_repo_map, flatten_repo_map,
};
use crate::tui::tag_selector::TagSelector;

/// Messages delivered to the UI loop from background tasks.
#[derive(Debug)]
pub enum AppEvent {
    Poll(PollEvent),
    CommandFinished {
        id: u64,
        result: Result<(), ClientError>,
    },
}

impl From<PollEvent> for AppEvent {
    fn from(ev: PollEvent) -> Self {
        AppEvent::Poll(ev)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PollStatus {
    #[default]
    Waiting,
    Ok,
    Failed(String),
}

#[derive(Debug, Clone)]
struct PendingCommand {
    cmd: RepoCommand,
    previous: RepositoryRecord,
    optimistic: RepositoryRecord,
}

/// Everything the dashboard shows. `display` is always
/// `filter_repo_map(original, query.terms())`.
#[derive(Debug, Default)]
pub struct DashboardState {
    loading: bool,
    original: RepositoryIndex,
    display: RepositoryIndex,
    query: SearchQuery,
    cursor: usize,
    /// Name under the cursor; the position follows it across refilters.
    cursor_repo: Option<String>,
    selectors: HashMap<String, TagSelector>,
    pending: HashMap<u64, PendingCommand>,
    next_command_id: u64,
    poll_status: PollStatus,
    last_updated: Option<DateTime<Local>>,
    errors: HashMap<String, String>,
    notice: Option<String>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn original(&self) -> &RepositoryIndex {
        &self.original
    }

    pub fn display(&self) -> &RepositoryIndex {
        &self.display
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn poll_status(&self) -> &PollStatus {
        &self.poll_status
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn error_for(&self, repo: &str) -> Option<&str> {
        self.errors.get(repo).map(String::as_str)
    }

    pub fn selector(&self, repo: &str) -> Option<&TagSelector> {
        self.selectors.get(repo)
    }

    pub fn is_pending(&self, repo: &str) -> bool {
        self.pending.values().any(|p| p.cmd.repo == repo)
    }

    /// Autocomplete source: every name and tag of the unfiltered index.
    pub fn search_terms(&self) -> Vec<String> {
        flatten_repo_map(&self.original)
    }

    pub fn set_free_text(&mut self, text: &str) {
        if self.query.free_text() == text {
            return;
        }
        self.query.set_free_text(text);
        self.refilter();
    }

    pub fn add_term(&mut self, term: &str) -> bool {
        let added = self.query.add_term(term);
        if added {
            self.refilter();
        }
        added
    }

    pub fn remove_term(&mut self, term: &str) -> bool {
        let removed = self.query.remove_term(term);
        if removed {
            self.refilter();
        }
        removed
    }

    pub fn pop_term(&mut self) -> Option<String> {
        let popped = self.query.pop_term();
        if popped.is_some() {
            self.refilter();
        }
        popped
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
        self.refilter();
    }

    /// Always filters from the unfiltered index so edits never compound.
    fn refilter(&mut self) {
        self.display = filter_repo_map(&self.original, &self.query.terms());
        let anchored = self
            .cursor_repo
            .as_ref()
            .and_then(|name| self.display.keys().position(|k| k == name));
        match anchored {
            Some(pos) => self.cursor = pos,
            None => {
                if self.cursor >= self.display.len() {
                    self.cursor = self.display.len().saturating_sub(1);
                }
                // Keep the old name while nothing is shown so clearing the
                // filter lands back on it.
                if let Some(name) = self.display.keys().nth(self.cursor) {
                    self.cursor_repo = Some(name.clone());
                }
            }
        }
        debug!(
            terms = ?self.query.terms().iter().collect::<Vec<_>>(),
            shown = self.display.len(),
            total = self.original.len(),
            "refiltered"
        );
    }

    pub fn handle_poll(&mut self, event: PollEvent) {
        match event {
            PollEvent::Updated(index) => self.apply_poll(index),
            PollEvent::Failed(err) => self.apply_poll_error(&err),
        }
    }

    pub fn apply_poll(&mut self, index: RepositoryIndex) {
        self.original = index;
        self.loading = false;
        self.selectors.retain(|name, _| self.original.contains_key(name));
        self.errors.retain(|name, _| self.original.contains_key(name));
        for (name, record) in &self.original {
            self.selectors
                .entry(name.clone())
                .or_insert_with(|| TagSelector::new(record));
        }
        self.poll_status = PollStatus::Ok;
        self.last_updated = Some(Local::now());
        self.refilter();
    }

    /// The last good index stays on screen.
    pub fn apply_poll_error(&mut self, err: &ClientError) {
        self.poll_status = PollStatus::Failed(err.short());
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.display.is_empty() {
            self.cursor = 0;
            return;
        }
        let max = self.display.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
        self.cursor_repo = self.display.keys().nth(self.cursor).cloned();
    }

    /// Repository under the cursor, from the filtered view.
    pub fn selected(&self) -> Option<(&String, &RepositoryRecord)> {
        self.display.iter().nth(self.cursor)
    }

    pub fn selected_name(&self) -> Option<String> {
        self.selected().map(|(name, _)| name.clone())
    }

    /// Cycles the selected repository's tag through its visible tags.
    pub fn cycle_tag(&mut self, delta: isize) {
        let Some((name, record)) = self.selected() else {
            return;
        };
        let name = name.clone();
        let tags = record.tags.clone();
        if let Some(sel) = self.selectors.get_mut(&name) {
            sel.cycle(&tags, delta);
        }
    }

    pub fn select_tag(&mut self, repo: &str, tag: &str) {
        if let Some(sel) = self.selectors.get_mut(repo) {
            sel.select(tag);
        }
    }

    pub fn set_tag_input(&mut self, repo: &str, text: &str) {
        let Some(record) = self.original.get(repo) else {
            return;
        };
        if let Some(sel) = self.selectors.get_mut(repo) {
            sel.set_input(text, record);
        }
    }

    /// Command for the selected repository's deploy button.
    pub fn deploy_command(&self) -> Option<RepoCommand> {
        let (name, _) = self.selected()?;
        let tag = self.selectors.get(name)?.selected();
        if tag.is_empty() {
            return None;
        }
        Some(RepoCommand::deploy(name.clone(), tag))
    }

    pub fn toggle_auto_deploy_command(&self) -> Option<RepoCommand> {
        let (name, record) = self.selected()?;
        Some(RepoCommand::auto_deploy(name.clone(), !record.auto_deploy))
    }

    pub fn reset_command(&self) -> Option<RepoCommand> {
        let (name, _) = self.selected()?;
        Some(RepoCommand::reset(name.clone()))
    }

    /// Applies the command's expected effect locally and returns an id for
    /// [`finish_command`](Self::finish_command).
    pub fn begin_command(&mut self, cmd: RepoCommand) -> Option<u64> {
        let previous = self.original.get(&cmd.repo)?.clone();
        let mut optimistic = previous.clone();
        match &cmd.action {
            CommandAction::Deploy { tag } => {
                optimistic.pinned_tag = tag.clone();
                optimistic.pinned_tag_value = tag.clone();
            }
            CommandAction::SetAutoDeploy(enabled) => optimistic.auto_deploy = *enabled,
            CommandAction::Reset => {
                optimistic.pinned_tag.clear();
                optimistic.auto_deploy = true;
            }
        }
        self.original.insert(cmd.repo.clone(), optimistic.clone());
        self.errors.remove(&cmd.repo);
        self.notice = Some(format!("{} {}…", cmd.repo, cmd.action));

        let id = self.next_command_id;
        self.next_command_id += 1;
        self.pending.insert(
            id,
            PendingCommand {
                cmd,
                previous,
                optimistic,
            },
        );
        self.refilter();
        Some(id)
    }

    /// Returns the finished command, if it was still pending.
    pub fn finish_command(
        &mut self,
        id: u64,
        result: Result<(), ClientError>,
    ) -> Option<RepoCommand> {
        let pending = self.pending.remove(&id)?;
        let repo = pending.cmd.repo.clone();
        match result {
            Ok(()) => {
                self.notice = Some(format!("{repo}: {} accepted", pending.cmd.action));
            }
            Err(err) => {
                warn!(repo = %repo, action = %pending.cmd.action, error = %err, "command failed");
                // A poll may already have replaced the record; only undo our own change.
                if self.original.get(&repo) == Some(&pending.optimistic) {
                    self.original.insert(repo.clone(), pending.previous.clone());
                    self.refilter();
                }
                self.errors.insert(
                    repo.clone(),
                    format!("{} failed: {}", pending.cmd.action, err.short()),
                );
                self.notice = None;
            }
        }
        Some(pending.cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn rec(tags: &[&str], pinned_value: &str, auto: bool) -> RepositoryRecord {
        RepositoryRecord {
            tags: tags.iter().map(|s| s.to_string()).collect(),
            pinned_tag: String::new(),
            pinned_tag_value: pinned_value.to_string(),
            auto_deploy: auto,
        }
    }

    fn index() -> RepositoryIndex {
        let mut m = RepositoryIndex::new();
        m.insert("api".into(), rec(&["v1", "v2"], "v2", true));
        m.insert("billing".into(), rec(&["v1.0", "v1.1", "v2.0"], "v2.0", false));
        m.insert("web".into(), rec(&["r-1", "r-2"], "r-2", true));
        m
    }

    fn loaded() -> DashboardState {
        let mut s = DashboardState::new();
        s.apply_poll(index());
        s
    }

    fn server_error() -> ClientError {
        ClientError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        }
    }

    #[test]
    fn loading_until_first_poll() {
        let mut s = DashboardState::new();
        assert!(s.is_loading());
        assert_eq!(s.poll_status(), &PollStatus::Waiting);
        s.apply_poll(index());
        assert!(!s.is_loading());
        assert_eq!(s.display(), &index());
        assert!(s.last_updated().is_some());
        assert_eq!(s.selector("api").unwrap().selected(), "v2");
    }

    #[test]
    fn display_always_derives_from_original() {
        let mut s = loaded();
        s.set_free_text("v1");
        assert_eq!(s.display().len(), 2);
        assert_eq!(s.display()["billing"].tags, vec!["v1.0", "v1.1"]);

        s.set_free_text("v1.1");
        assert_eq!(s.display()["billing"].tags, vec!["v1.1"]);

        s.set_free_text("v");
        assert_eq!(s.display()["billing"].tags, vec!["v1.0", "v1.1", "v2.0"]);
        assert_eq!(s.original(), &index());

        s.set_free_text("");
        assert_eq!(s.display(), &index());
    }

    #[test]
    fn selected_terms_and_free_text_combine() {
        let mut s = loaded();
        assert!(s.add_term("web"));
        s.set_free_text("API");
        let keys: Vec<&str> = s.display().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["api", "web"]);

        assert_eq!(s.pop_term().as_deref(), Some("web"));
        assert_eq!(s.display().len(), 1);
        s.clear_query();
        assert_eq!(s.display().len(), 3);
    }

    #[test]
    fn poll_reapplies_current_query() {
        let mut s = loaded();
        s.add_term("r-");
        let mut next = index();
        next.get_mut("web").unwrap().tags.push("r-3".into());
        next.insert("worker".into(), rec(&["r-9"], "r-9", true));
        s.apply_poll(next);

        assert_eq!(s.display()["web"].tags, vec!["r-1", "r-2", "r-3"]);
        assert!(s.display().contains_key("worker"));
        assert!(s.selector("worker").is_some());
    }

    #[test]
    fn poll_failure_keeps_last_index() {
        let mut s = loaded();
        s.apply_poll_error(&server_error());
        assert!(matches!(s.poll_status(), PollStatus::Failed(msg) if msg.contains("500")));
        assert_eq!(s.original(), &index());
        assert_eq!(s.display().len(), 3);
    }

    #[test]
    fn vanished_repositories_drop_their_selectors() {
        let mut s = loaded();
        let mut next = index();
        next.remove("web");
        s.apply_poll(next);
        assert!(s.selector("web").is_none());
    }

    #[test]
    fn cursor_stays_within_filtered_list() {
        let mut s = loaded();
        s.move_cursor(10);
        assert_eq!(s.cursor(), 2);
        assert_eq!(s.selected_name().as_deref(), Some("web"));
        s.set_free_text("api");
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.selected_name().as_deref(), Some("api"));
        s.move_cursor(-5);
        assert_eq!(s.cursor(), 0);
        s.set_free_text("nothing-matches");
        assert!(s.selected().is_none());
        assert!(s.deploy_command().is_none());
    }

    #[test]
    fn cursor_follows_repository_when_poll_inserts_before_it() {
        let mut s = loaded();
        s.move_cursor(2);
        assert_eq!(s.selected_name().as_deref(), Some("web"));

        let mut next = index();
        next.insert("auth".into(), rec(&["a1"], "a1", false));
        s.apply_poll(next);

        assert_eq!(s.cursor(), 3);
        assert_eq!(s.reset_command().unwrap().repo, "web");
    }

    #[test]
    fn cursor_returns_to_repository_after_filter_clears() {
        let mut s = loaded();
        s.move_cursor(1);
        s.set_free_text("nothing-matches");
        assert!(s.selected().is_none());
        s.set_free_text("");
        assert_eq!(s.selected_name().as_deref(), Some("billing"));

        s.set_free_text("r-");
        assert_eq!(s.selected_name().as_deref(), Some("web"));
        s.clear_query();
        assert_eq!(s.selected_name().as_deref(), Some("web"));
    }

    #[test]
    fn revert_keeps_cursor_on_repository() {
        let mut s = loaded();
        s.add_term("r-2");
        assert_eq!(s.selected_name().as_deref(), Some("web"));
        let id = s.begin_command(RepoCommand::deploy("web", "r-1")).unwrap();
        s.finish_command(id, Err(server_error()));
        assert_eq!(s.selected_name().as_deref(), Some("web"));
    }

    #[test]
    fn cycling_uses_visible_tags() {
        let mut s = loaded();
        s.move_cursor(1);
        s.set_free_text("v1.");
        s.cycle_tag(1);
        assert_eq!(s.selector("billing").unwrap().selected(), "v1.0");
        s.cycle_tag(1);
        assert_eq!(s.selector("billing").unwrap().selected(), "v1.1");

        let cmd = s.deploy_command().unwrap();
        assert_eq!(cmd, RepoCommand::deploy("billing", "v1.1"));
    }

    #[test]
    fn tag_input_reset_restores_pinned_value() {
        let mut s = loaded();
        s.select_tag("api", "v1");
        s.set_tag_input("api", "v");
        assert_eq!(s.selector("api").unwrap().selected(), "v1");
        s.set_tag_input("api", "");
        assert_eq!(s.selector("api").unwrap().selected(), "v2");
    }

    #[test]
    fn deploy_is_optimistic_and_confirmed() {
        let mut s = loaded();
        s.select_tag("api", "v1");
        let id = s.begin_command(s.deploy_command().unwrap()).unwrap();

        assert!(s.is_pending("api"));
        assert_eq!(s.original()["api"].pinned_tag, "v1");
        assert_eq!(s.display()["api"].pinned_tag_value, "v1");
        assert!(s.selector("api").unwrap().is_redeploy(&s.original()["api"]));

        let done = s.finish_command(id, Ok(())).unwrap();
        assert_eq!(done, RepoCommand::deploy("api", "v1"));
        assert!(!s.is_pending("api"));
        assert_eq!(s.original()["api"].pinned_tag_value, "v1");
        assert!(s.notice().unwrap().contains("accepted"));
    }

    #[test]
    fn failed_command_reverts_and_reports() {
        let mut s = loaded();
        let cmd = s.toggle_auto_deploy_command().unwrap();
        assert_eq!(cmd, RepoCommand::auto_deploy("api", false));
        let id = s.begin_command(cmd).unwrap();
        assert!(!s.original()["api"].auto_deploy);

        s.finish_command(id, Err(server_error()));
        assert!(s.original()["api"].auto_deploy);
        assert_eq!(s.display(), &index());
        assert!(s.error_for("api").unwrap().contains("auto-deploy off failed"));
    }

    #[test]
    fn failure_after_newer_poll_keeps_poll_data() {
        let mut s = loaded();
        let id = s.begin_command(RepoCommand::reset("web")).unwrap();
        let mut next = index();
        next.get_mut("web").unwrap().pinned_tag = "r-1".into();
        s.apply_poll(next.clone());

        s.finish_command(id, Err(server_error()));
        assert_eq!(s.original()["web"], next["web"]);
        assert!(s.error_for("web").is_some());
    }

    #[test]
    fn reset_clears_pin_and_enables_auto_deploy() {
        let mut s = loaded();
        let id = s.begin_command(RepoCommand::reset("billing")).unwrap();
        assert!(s.original()["billing"].auto_deploy);
        assert!(s.original()["billing"].pinned_tag.is_empty());
        assert!(s.finish_command(id, Ok(())).is_some());
        assert!(s.finish_command(id, Ok(())).is_none());
    }

    #[test]
    fn unknown_repository_command_is_ignored() {
        let mut s = loaded();
        assert!(s.begin_command(RepoCommand::reset("ghost")).is_none());
    }

    #[test]
    fn search_terms_come_from_unfiltered_index() {
        let mut s = loaded();
        s.set_free_text("web");
        let terms = s.search_terms();
        assert!(terms.contains(&"api".to_string()));
        assert!(terms.contains(&"v1.1".to_string()));
    }
}
