pub const MAX_SUGGESTIONS: usize = 8;

/// Candidates containing `input` (ignoring case), minus `exclude`.
pub fn suggest(candidates: &[String], input: &str, exclude: &[String], limit: usize) -> Vec<String> {
    let needle = input.trim().to_lowercase();
    candidates
        .iter()
        .filter(|c| !exclude.iter().any(|e| e.eq_ignore_ascii_case(c)))
        .filter(|c| needle.is_empty() || c.to_lowercase().contains(&needle))
        .take(limit)
        .cloned()
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct Completion {
    pub items: Vec<String>,
    pub selected: usize,
    pub visible: bool,
}

impl Completion {
    pub fn reset(&mut self) {
        self.items.clear();
        self.selected = 0;
        self.visible = false;
    }

    /// Popup shows only while something is typed.
    pub fn update(&mut self, candidates: &[String], input: &str, exclude: &[String]) {
        if input.trim().is_empty() {
            self.reset();
            return;
        }
        let previous = self.current().map(str::to_string);
        self.items = suggest(candidates, input, exclude, MAX_SUGGESTIONS);
        self.selected = previous
            .and_then(|p| self.items.iter().position(|i| *i == p))
            .unwrap_or(0);
        self.visible = !self.items.is_empty();
    }

    pub fn current(&self) -> Option<&str> {
        if !self.visible {
            return None;
        }
        self.items.get(self.selected).map(String::as_str)
    }

    pub fn next(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        }
    }
}
