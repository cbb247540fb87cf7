use anyhow::Result;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::{
    cursor,
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;
use tracing::{debug, info, warn};
use tui_textarea::TextArea;

use crate::client::{RegistryClient, RepoCommand};
use crate::poller::{PollerHandle, spawn_poller};
use crate::tui::commands::CommandDispatcher;
use crate::tui::completion::Completion;
use crate::tui::state::{AppEvent, DashboardState};
use crate::tui::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Search,
    /// Typing into the selected repository's tag picker.
    Tag,
}

pub struct TuiApp {
    pub title: String,
    pub server_url: String,
    pub state: DashboardState,
    pub theme: Theme,
    pub input_mode: InputMode,
    pub search_input: TextArea<'static>,
    pub tag_input: TextArea<'static>,
    pub tag_repo: Option<String>,
    pub completion: Completion,
    pub(crate) inbox_rx: Receiver<AppEvent>,
    pub(crate) inbox_tx: Sender<AppEvent>,
    dispatcher: Option<CommandDispatcher>,
    poller: Option<PollerHandle>,
    pub dirty: bool,
}

impl TuiApp {
    pub fn new(title: impl Into<String>, server_url: impl Into<String>, theme: &str) -> Self {
        let (tx, rx) = channel();
        Self {
            title: title.into(),
            server_url: server_url.into(),
            state: DashboardState::new(),
            theme: Theme::by_name(theme),
            input_mode: InputMode::Search,
            search_input: TextArea::default(),
            tag_input: TextArea::default(),
            tag_repo: None,
            completion: Completion::default(),
            inbox_rx: rx,
            inbox_tx: tx,
            dispatcher: None,
            poller: None,
            dirty: true,
        }
    }

    /// Commands go to `client`.
    pub fn with_client(mut self, client: RegistryClient) -> Self {
        self.dispatcher = Some(CommandDispatcher::new(client, self.inbox_tx.clone()));
        self
    }

    pub fn sender(&self) -> Sender<AppEvent> {
        self.inbox_tx.clone()
    }

    /// Must be called from inside a tokio runtime.
    pub fn start_polling(&mut self, client: RegistryClient, period: Duration) {
        info!(period_ms = period.as_millis() as u64, "starting poller");
        self.poller = Some(spawn_poller(client, period, self.inbox_tx.clone()));
    }

    pub fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
            debug!("poller cancelled");
        }
    }

    pub fn refresh(&self) {
        if let Some(poller) = &self.poller {
            poller.refresh();
        }
    }

    /// Applies everything background tasks have sent so far.
    pub fn drain_inbox(&mut self) -> usize {
        let mut drained = Vec::new();
        while let Ok(ev) = self.inbox_rx.try_recv() {
            drained.push(ev);
        }
        let n = drained.len();
        for ev in drained {
            self.handle_event(ev);
        }
        n
    }

    pub fn handle_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Poll(poll) => {
                self.state.handle_poll(poll);
                self.refresh_completion();
            }
            AppEvent::CommandFinished { id, result } => {
                let ok = result.is_ok();
                if self.state.finish_command(id, result).is_some() && ok {
                    self.refresh();
                }
            }
        }
        self.dirty = true;
    }

    /// Optimistically applies `cmd` and sends it to the backend.
    pub fn submit(&mut self, cmd: RepoCommand) {
        let Some(id) = self.state.begin_command(cmd.clone()) else {
            warn!(repo = %cmd.repo, "command for unknown repository");
            return;
        };
        match &self.dispatcher {
            Some(d) => d.dispatch(id, cmd),
            None => warn!(repo = %cmd.repo, "no backend client; command kept local"),
        }
        self.dirty = true;
    }

    pub fn run(&mut self) -> Result<()> {
        struct TuiGuard;
        impl Drop for TuiGuard {
            fn drop(&mut self) {
                let mut stdout = io::stdout();
                let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
                let _ = terminal::disable_raw_mode();
            }
        }
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen)?;
        let _guard = TuiGuard;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        let res = self.event_loop(&mut terminal);
        self.stop_polling();
        res
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            if self.drain_inbox() > 0 {
                self.dirty = true;
            }

            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(k) if k.kind == KeyEventKind::Press => {
                        if self.handle_key(k) {
                            info!("quit requested");
                            return Ok(());
                        }
                        self.dirty = true;
                    }
                    Event::Resize(_, _) => self.dirty = true,
                    _ => {}
                }
            }

            if self.dirty {
                terminal.draw(|f| self.view(f))?;
                self.dirty = false;
            }
        }
    }
}
