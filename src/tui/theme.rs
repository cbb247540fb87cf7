use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub header_style: Style,
    pub footer_style: Style,
    pub repo_name_style: Style,
    pub subtitle_style: Style,
    pub selected_row_style: Style,
    pub chip_style: Style,
    pub input_style: Style,
    pub error_style: Style,
    pub pending_style: Style,
    pub completion_style: Style,
    pub completion_selected_style: Style,
}

impl Theme {
    pub fn by_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            header_style: Style::default().fg(Color::Cyan),
            footer_style: Style::default().fg(Color::Cyan),
            repo_name_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            subtitle_style: Style::default().fg(Color::Gray),
            selected_row_style: Style::default().bg(Color::DarkGray),
            chip_style: Style::default().fg(Color::Black).bg(Color::Cyan),
            input_style: Style::default().fg(Color::White),
            error_style: Style::default().fg(Color::Red),
            pending_style: Style::default().fg(Color::Yellow),
            completion_style: Style::default().fg(Color::Gray),
            completion_selected_style: Style::default().bg(Color::DarkGray).fg(Color::White),
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            header_style: Style::default().fg(Color::Blue),
            footer_style: Style::default().fg(Color::Blue),
            repo_name_style: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            subtitle_style: Style::default().fg(Color::DarkGray),
            selected_row_style: Style::default().bg(Color::Gray),
            chip_style: Style::default().fg(Color::White).bg(Color::Blue),
            input_style: Style::default().fg(Color::Black),
            error_style: Style::default().fg(Color::Red),
            pending_style: Style::default().fg(Color::Magenta),
            completion_style: Style::default().fg(Color::DarkGray),
            completion_selected_style: Style::default().bg(Color::Gray).fg(Color::Black),
        }
    }
}
