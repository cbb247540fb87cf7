use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use unicode_width::UnicodeWidthChar;

use crate::tui::state::{DashboardState, PollStatus};
use crate::tui::tag_selector::subtitle;
use crate::tui::view::{InputMode, TuiApp};

pub const KEY_HELP: &str = "↑↓ select  ←→ tag  Enter deploy  ^A auto-deploy  ^R reset  ^T pick tag  Tab add term  Esc clear  ^Q quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPlan {
    pub name: String,
    pub subtitle: String,
    pub tag_line: String,
    pub action: String,
    pub pending: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPlan {
    Loading,
    Empty(String),
    Rows(Vec<RowPlan>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub header: String,
    pub status: String,
    pub chips: Vec<String>,
    pub body: BodyPlan,
    pub footer: String,
}

pub fn truncate_display(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut width = 0usize;
    let mut out = String::new();
    for ch in s.chars() {
        let ch_w = ch.width().unwrap_or(0);
        if width + ch_w > max {
            break;
        }
        out.push(ch);
        width += ch_w;
    }
    out
}

fn status_text(state: &DashboardState) -> String {
    let at = state
        .last_updated()
        .map(|t| t.format("%H:%M:%S").to_string());
    match (state.poll_status(), at) {
        (PollStatus::Waiting, _) => "connecting…".to_string(),
        (PollStatus::Ok, Some(at)) => format!("updated {at}"),
        (PollStatus::Ok, None) => "updated".to_string(),
        (PollStatus::Failed(msg), Some(at)) => format!("poll failed: {msg} (data from {at})"),
        (PollStatus::Failed(msg), None) => format!("poll failed: {msg}"),
    }
}

pub fn build_render_plan(
    title: &str,
    server_url: &str,
    state: &DashboardState,
    width: u16,
) -> RenderPlan {
    let w = width as usize;
    let shown = state.display().len();
    let total = state.original().len();
    let header = truncate_display(
        &format!("{title} | {server_url} | {shown}/{total} repositories"),
        w,
    );

    let body = if state.is_loading() {
        BodyPlan::Loading
    } else if state.display().is_empty() {
        if state.query().is_empty() {
            BodyPlan::Empty("No repositories".to_string())
        } else {
            BodyPlan::Empty("No repositories match the current search".to_string())
        }
    } else {
        let rows = state
            .display()
            .iter()
            .map(|(name, record)| {
                let (selected_tag, action) = match state.selector(name) {
                    Some(sel) => (sel.selected().to_string(), sel.action_label(record)),
                    None => (
                        record.pinned_tag_value.clone(),
                        format!("Redeploy {}", record.pinned_tag_value),
                    ),
                };
                let auto = if record.auto_deploy { "on" } else { "off" };
                RowPlan {
                    name: name.clone(),
                    subtitle: subtitle(record),
                    tag_line: format!(
                        "tag ◂ {selected_tag} ▸  {} tags  auto-deploy: {auto}",
                        record.tags.len()
                    ),
                    action: format!("[{action}]"),
                    pending: state.is_pending(name),
                    error: state.error_for(name).map(str::to_string),
                }
            })
            .collect();
        BodyPlan::Rows(rows)
    };

    let footer = truncate_display(state.notice().unwrap_or(KEY_HELP), w);

    RenderPlan {
        header,
        status: truncate_display(&status_text(state), w),
        chips: state.query().selected_terms().to_vec(),
        body,
        footer,
    }
}

impl TuiApp {
    pub fn view(&mut self, f: &mut Frame) {
        let size = f.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Length(1), // Status + chips
                Constraint::Min(3),    // Repositories
                Constraint::Length(1), // Footer
                Constraint::Length(3), // Input
            ])
            .split(size);

        let plan = build_render_plan(&self.title, &self.server_url, &self.state, size.width);

        f.render_widget(
            Paragraph::new(plan.header.clone()).style(self.theme.header_style),
            chunks[0],
        );
        self.render_status_line(f, chunks[1], &plan);
        self.render_repositories(f, chunks[2], &plan);
        f.render_widget(
            Paragraph::new(plan.footer.clone()).style(self.theme.footer_style),
            chunks[3],
        );
        self.render_input_area(f, chunks[4]);
    }

    fn render_status_line(&self, f: &mut Frame, area: Rect, plan: &RenderPlan) {
        let status_style = match self.state.poll_status() {
            PollStatus::Failed(_) => self.theme.error_style,
            _ => self.theme.subtitle_style,
        };
        let mut spans = vec![Span::styled(plan.status.clone(), status_style)];
        for chip in &plan.chips {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!(" {chip} "), self.theme.chip_style));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_repositories(&self, f: &mut Frame, area: Rect, plan: &RenderPlan) {
        let block = Block::default().borders(Borders::ALL).title("Repositories");
        let rows = match &plan.body {
            BodyPlan::Loading => {
                f.render_widget(Paragraph::new("Loading...").block(block), area);
                return;
            }
            BodyPlan::Empty(msg) => {
                f.render_widget(
                    Paragraph::new(msg.clone())
                        .style(self.theme.subtitle_style)
                        .block(block),
                    area,
                );
                return;
            }
            BodyPlan::Rows(rows) => rows,
        };

        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| {
                let mut head = vec![
                    Span::styled(row.name.clone(), self.theme.repo_name_style),
                    Span::raw("  "),
                    Span::styled(row.subtitle.clone(), self.theme.subtitle_style),
                ];
                if row.pending {
                    head.push(Span::styled("  (sending…)", self.theme.pending_style));
                }
                let mut action = vec![Span::raw("  "), Span::raw(row.action.clone())];
                if let Some(err) = &row.error {
                    action.push(Span::raw("  "));
                    action.push(Span::styled(err.clone(), self.theme.error_style));
                }
                ListItem::new(vec![
                    Line::from(head),
                    Line::from(format!("  {}", row.tag_line)),
                    Line::from(action),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.selected_row_style);
        let mut list_state = ListState::default().with_selected(Some(self.state.cursor()));
        f.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_input_area(&mut self, f: &mut Frame, area: Rect) {
        let title = match (self.input_mode, &self.tag_repo) {
            (InputMode::Tag, Some(repo)) => format!("Tag for {repo} (Enter select, Esc back)"),
            _ => "Search".to_string(),
        };
        let input = match self.input_mode {
            InputMode::Search => &mut self.search_input,
            InputMode::Tag => &mut self.tag_input,
        };
        input.set_style(self.theme.input_style);
        input.set_cursor_line_style(Style::default());
        input.set_block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(&*input, area);

        if self.completion.visible && !self.completion.items.is_empty() {
            let height = (self.completion.items.len() as u16 + 2).min(area.y);
            let width = self
                .completion
                .items
                .iter()
                .map(|s| s.chars().count())
                .max()
                .unwrap_or(10) as u16
                + 4;
            let popup = Rect {
                x: area.x + 1,
                y: area.y.saturating_sub(height),
                width: width.min(area.width.saturating_sub(1)),
                height,
            };
            let items: Vec<ListItem> = self
                .completion
                .items
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let style = if i == self.completion.selected {
                        self.theme.completion_selected_style
                    } else {
                        self.theme.completion_style
                    };
                    ListItem::new(s.clone()).style(style)
                })
                .collect();
            f.render_widget(Clear, popup);
            f.render_widget(
                List::new(items).block(Block::default().borders(Borders::ALL)),
                popup,
            );
        }
    }
}
