use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;
use tui_textarea::TextArea;

use crate::tui::view::{InputMode, TuiApp};

fn clear_input(t: &mut TextArea<'static>) {
    t.delete_line_by_head();
    t.delete_line_by_end();
}

fn input_text(t: &TextArea<'static>) -> String {
    t.lines().join(" ")
}

impl TuiApp {
    /// Returns true when the app should exit.
    pub fn handle_key(&mut self, k: KeyEvent) -> bool {
        let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            return true;
        }
        match self.input_mode {
            InputMode::Search => self.handle_search_key(k, ctrl),
            InputMode::Tag => self.handle_tag_key(k),
        }
        false
    }

    fn handle_search_key(&mut self, k: KeyEvent, ctrl: bool) {
        match k.code {
            KeyCode::Char('a') if ctrl => {
                if let Some(cmd) = self.state.toggle_auto_deploy_command() {
                    self.submit(cmd);
                }
            }
            KeyCode::Char('r') if ctrl => {
                if let Some(cmd) = self.state.reset_command() {
                    self.submit(cmd);
                }
            }
            KeyCode::Char('t') if ctrl => self.enter_tag_mode(),
            KeyCode::Char('n') if ctrl => self.completion.next(),
            KeyCode::Char('p') if ctrl => self.completion.prev(),
            KeyCode::F(5) => self.refresh(),
            KeyCode::Enter => {
                if let Some(cmd) = self.state.deploy_command() {
                    self.submit(cmd);
                }
            }
            KeyCode::Tab => self.accept_search_completion(),
            KeyCode::Esc => {
                if self.completion.visible {
                    self.completion.reset();
                } else {
                    clear_input(&mut self.search_input);
                    self.state.clear_query();
                }
            }
            KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Down => self.state.move_cursor(1),
            KeyCode::PageUp => self.state.move_cursor(-10),
            KeyCode::PageDown => self.state.move_cursor(10),
            KeyCode::Left => self.state.cycle_tag(-1),
            KeyCode::Right => self.state.cycle_tag(1),
            KeyCode::Backspace if input_text(&self.search_input).is_empty() => {
                if let Some(term) = self.state.pop_term() {
                    debug!(term = %term, "removed search term");
                }
            }
            _ => {
                self.search_input.input(k);
                let text = input_text(&self.search_input);
                self.state.set_free_text(&text);
                self.refresh_completion();
            }
        }
    }

    /// Tab adds the highlighted suggestion; with no suggestion, typing an
    /// already selected term and pressing Tab removes that chip.
    fn accept_search_completion(&mut self) {
        if let Some(term) = self.completion.current().map(str::to_string) {
            self.state.add_term(&term);
        } else {
            let typed = input_text(&self.search_input);
            if !self.state.remove_term(&typed) {
                return;
            }
            debug!(term = %typed.trim(), "removed search term");
        }
        clear_input(&mut self.search_input);
        self.state.set_free_text("");
        self.completion.reset();
    }

    fn enter_tag_mode(&mut self) {
        let Some(repo) = self.state.selected_name() else {
            return;
        };
        let current = self
            .state
            .selector(&repo)
            .map(|s| s.input().to_string())
            .unwrap_or_default();
        clear_input(&mut self.tag_input);
        self.tag_input.insert_str(&current);
        self.tag_repo = Some(repo);
        self.input_mode = InputMode::Tag;
        self.refresh_completion();
    }

    fn leave_tag_mode(&mut self) {
        self.input_mode = InputMode::Search;
        self.tag_repo = None;
        self.completion.reset();
    }

    fn handle_tag_key(&mut self, k: KeyEvent) {
        let Some(repo) = self.tag_repo.clone() else {
            self.leave_tag_mode();
            return;
        };
        match k.code {
            KeyCode::Esc => self.leave_tag_mode(),
            KeyCode::Up => self.completion.prev(),
            KeyCode::Down => self.completion.next(),
            KeyCode::Enter | KeyCode::Tab => {
                let typed = input_text(&self.tag_input);
                let known = self
                    .state
                    .original()
                    .get(&repo)
                    .is_some_and(|r| r.tags.contains(&typed));
                let chosen = self
                    .completion
                    .current()
                    .map(str::to_string)
                    .or(known.then_some(typed));
                if let Some(tag) = chosen {
                    self.state.select_tag(&repo, &tag);
                }
                self.leave_tag_mode();
            }
            _ => {
                self.tag_input.input(k);
                let text = input_text(&self.tag_input);
                self.state.set_tag_input(&repo, &text);
                if text.is_empty() {
                    // Clearing the box snaps back to the pinned value; show it.
                    let pinned = self
                        .state
                        .selector(&repo)
                        .map(|s| s.input().to_string())
                        .unwrap_or_default();
                    self.tag_input.insert_str(&pinned);
                }
                self.refresh_completion();
            }
        }
    }

    /// Recomputes autocomplete for whichever input is active.
    pub fn refresh_completion(&mut self) {
        match self.input_mode {
            InputMode::Search => {
                let text = input_text(&self.search_input);
                let candidates = self.state.search_terms();
                self.completion
                    .update(&candidates, &text, self.state.query().selected_terms());
            }
            InputMode::Tag => {
                let text = input_text(&self.tag_input);
                let tags = self
                    .tag_repo
                    .as_ref()
                    .and_then(|r| self.state.original().get(r))
                    .map(|r| r.tags.clone())
                    .unwrap_or_default();
                self.completion.update(&tags, &text, &[]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RegistryClient;
    use crate::poller::PollEvent;
    use crate::repos::{RepositoryIndex, RepositoryRecord};
    use crate::tui::state::AppEvent;
    use httptest::{Expectation, Server, matchers::*, responders::*};
    use serde_json::json;
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(app: &mut TuiApp, s: &str) {
        for c in s.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn index() -> RepositoryIndex {
        let mut m = RepositoryIndex::new();
        m.insert(
            "api".into(),
            RepositoryRecord {
                tags: vec!["v1".into(), "v2".into()],
                pinned_tag: String::new(),
                pinned_tag_value: "v2".into(),
                auto_deploy: true,
            },
        );
        m.insert(
            "billing".into(),
            RepositoryRecord {
                tags: vec!["v1.0".into(), "rc-7".into()],
                pinned_tag: "v1.0".into(),
                pinned_tag_value: "v1.0".into(),
                auto_deploy: false,
            },
        );
        m
    }

    fn app() -> TuiApp {
        let mut app = TuiApp::new("rdash", "http://test", "dark");
        app.inbox_tx
            .send(AppEvent::Poll(PollEvent::Updated(index())))
            .unwrap();
        app.drain_inbox();
        app
    }

    async fn settle(app: &mut TuiApp, repo: &str) {
        for _ in 0..500 {
            app.drain_inbox();
            if !app.state.is_pending(repo) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("command for {repo} never finished");
    }

    #[test]
    fn typing_filters_live() {
        let mut app = app();
        type_str(&mut app, "RC");
        assert_eq!(app.state.query().free_text(), "RC");
        assert_eq!(app.state.display().len(), 1);
        assert_eq!(app.state.display()["billing"].tags, vec!["rc-7"]);
        assert!(app.completion.visible);
        assert_eq!(app.completion.current(), Some("rc-7"));
    }

    #[test]
    fn tab_turns_suggestion_into_term() {
        let mut app = app();
        type_str(&mut app, "bil");
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.state.query().selected_terms(), ["billing".to_string()]);
        assert_eq!(app.state.query().free_text(), "");
        assert!(!app.completion.visible);
        assert_eq!(app.state.display().len(), 1);

        app.handle_key(key(KeyCode::Backspace));
        assert!(app.state.query().selected_terms().is_empty());
        assert_eq!(app.state.display().len(), 2);
    }

    #[test]
    fn cleared_tag_input_shows_pinned_value_again() {
        let mut app = app();
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.state.selector("api").unwrap().selected(), "v1");
        app.handle_key(ctrl('t'));
        assert_eq!(app.tag_input.lines()[0], "v1");

        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.tag_input.lines()[0], "v2");
        assert_eq!(app.state.selector("api").unwrap().input(), "v2");
        assert_eq!(app.state.selector("api").unwrap().selected(), "v2");
    }

    #[test]
    fn tab_on_selected_term_removes_it() {
        let mut app = app();
        type_str(&mut app, "bil");
        app.handle_key(key(KeyCode::Tab));
        type_str(&mut app, "api");
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(
            app.state.query().selected_terms(),
            ["billing".to_string(), "api".to_string()]
        );

        type_str(&mut app, "BILLING");
        assert_eq!(app.completion.current(), None);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.state.query().selected_terms(), ["api".to_string()]);
        assert!(app.search_input.lines().join("").is_empty());
        assert_eq!(app.state.display().len(), 1);

        type_str(&mut app, "zzz");
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.state.query().selected_terms(), ["api".to_string()]);
        assert_eq!(app.state.query().free_text(), "zzz");
    }

    #[test]
    fn escape_hides_popup_then_clears() {
        let mut app = app();
        type_str(&mut app, "api");
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.completion.visible);
        assert_eq!(app.state.display().len(), 1);
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.state.display().len(), 2);
        assert!(app.search_input.lines().join("").is_empty());
    }

    #[test]
    fn arrows_move_cursor_and_cycle_tags() {
        let mut app = app();
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.state.selected_name().as_deref(), Some("billing"));
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.state.selector("billing").unwrap().selected(), "rc-7");
        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.state.selector("api").unwrap().selected(), "v1");
    }

    #[test]
    fn tag_mode_picks_from_repository_tags() {
        let mut app = app();
        app.handle_key(ctrl('t'));
        assert_eq!(app.input_mode, InputMode::Tag);
        assert_eq!(app.tag_input.lines()[0], "v2");

        app.handle_key(key(KeyCode::Char('9')));
        assert_eq!(app.tag_input.lines()[0], "v29");
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.state.selector("api").unwrap().selected(), "v2");
        assert_eq!(app.tag_input.lines()[0], "v2");
        app.handle_key(key(KeyCode::Backspace));
        type_str(&mut app, "1");
        assert_eq!(app.completion.current(), Some("v1"));
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.input_mode, InputMode::Search);
        assert_eq!(app.state.selector("api").unwrap().selected(), "v1");
        assert!(app.state.deploy_command().is_some());
    }

    #[test]
    fn tag_mode_escape_keeps_selection() {
        let mut app = app();
        app.handle_key(ctrl('t'));
        type_str(&mut app, "x");
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Search);
        assert_eq!(app.state.selector("api").unwrap().selected(), "v2");
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        assert!(!app.handle_key(key(KeyCode::Char('q'))));
        assert!(app.handle_key(ctrl('q')));
        assert!(app.handle_key(ctrl('c')));
    }

    #[tokio::test]
    async fn enter_deploys_selected_tag() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/tags/api"),
                request::body(json_decoded(eq(json!({"pinned_tag": "v1"})))),
            ])
            .respond_with(status_code(200)),
        );
        let client = RegistryClient::new(server.url_str("")).unwrap();
        let mut app = app().with_client(client);

        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.state.is_pending("api"));
        assert_eq!(app.state.original()["api"].pinned_tag, "v1");

        settle(&mut app, "api").await;
        assert_eq!(app.state.original()["api"].pinned_tag_value, "v1");
        assert!(app.state.error_for("api").is_none());
    }

    #[tokio::test]
    async fn rejected_toggle_is_rolled_back() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/tags/billing"),
                request::body(json_decoded(eq(json!({"auto_deploy": true})))),
            ])
            .respond_with(status_code(500)),
        );
        let client = RegistryClient::new(server.url_str("")).unwrap();
        let mut app = app().with_client(client);

        app.handle_key(key(KeyCode::Down));
        app.handle_key(ctrl('a'));
        assert!(app.state.original()["billing"].auto_deploy);

        settle(&mut app, "billing").await;
        assert!(!app.state.original()["billing"].auto_deploy);
        assert!(app.state.error_for("billing").is_some());
    }

    #[tokio::test]
    async fn reset_posts_to_reset_endpoint() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/tags/billing/reset"))
                .respond_with(status_code(200)),
        );
        let client = RegistryClient::new(server.url_str("")).unwrap();
        let mut app = app().with_client(client);

        app.handle_key(key(KeyCode::Down));
        app.handle_key(ctrl('r'));
        assert!(app.state.original()["billing"].pinned_tag.is_empty());
        settle(&mut app, "billing").await;
        assert!(app.state.original()["billing"].auto_deploy);
    }
}
