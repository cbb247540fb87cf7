use crate::repos::RepositoryRecord;

/// Local, optimistic state of one repository's tag picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSelector {
    selected_tag: String,
    input_tag: String,
}

impl TagSelector {
    pub fn new(record: &RepositoryRecord) -> Self {
        Self {
            selected_tag: record.pinned_tag_value.clone(),
            input_tag: record.pinned_tag_value.clone(),
        }
    }

    pub fn selected(&self) -> &str {
        &self.selected_tag
    }

    pub fn input(&self) -> &str {
        &self.input_tag
    }

    pub fn select(&mut self, tag: impl Into<String>) {
        self.selected_tag = tag.into();
        self.input_tag = self.selected_tag.clone();
    }

    /// Clearing the input snaps the selection back to the record's current tag.
    pub fn set_input(&mut self, text: &str, record: &RepositoryRecord) {
        if text.is_empty() {
            self.selected_tag = record.pinned_tag_value.clone();
            self.input_tag = record.pinned_tag_value.clone();
        } else {
            self.input_tag = text.to_string();
        }
    }

    /// Steps through `tags`, wrapping at either end.
    pub fn cycle(&mut self, tags: &[String], delta: isize) {
        if tags.is_empty() {
            return;
        }
        let len = tags.len() as isize;
        let next = match tags.iter().position(|t| *t == self.selected_tag) {
            Some(i) => (i as isize + delta).rem_euclid(len),
            None if delta < 0 => len - 1,
            None => 0,
        };
        self.select(tags[next as usize].clone());
    }

    pub fn is_redeploy(&self, record: &RepositoryRecord) -> bool {
        self.selected_tag == record.pinned_tag_value
    }

    pub fn action_label(&self, record: &RepositoryRecord) -> String {
        if self.is_redeploy(record) {
            format!("Redeploy {}", self.selected_tag)
        } else {
            format!("Deploy {}", self.selected_tag)
        }
    }
}

pub fn subtitle(record: &RepositoryRecord) -> String {
    if record.is_pinned() {
        record.pinned_tag.clone()
    } else {
        format!("Latest version: {}", record.pinned_tag_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RepositoryRecord {
        RepositoryRecord {
            tags: vec!["v1".into(), "v2".into(), "v3".into()],
            pinned_tag: String::new(),
            pinned_tag_value: "v2".into(),
            auto_deploy: true,
        }
    }

    #[test]
    fn starts_on_pinned_value() {
        let s = TagSelector::new(&record());
        assert_eq!(s.selected(), "v2");
        assert_eq!(s.input(), "v2");
        assert!(s.is_redeploy(&record()));
        assert_eq!(s.action_label(&record()), "Redeploy v2");
    }

    #[test]
    fn selecting_another_tag_offers_deploy() {
        let mut s = TagSelector::new(&record());
        s.select("v1");
        assert!(!s.is_redeploy(&record()));
        assert_eq!(s.action_label(&record()), "Deploy v1");
    }

    #[test]
    fn typing_keeps_selection_and_clearing_resets() {
        let mut s = TagSelector::new(&record());
        s.select("v3");
        s.set_input("v", &record());
        assert_eq!(s.input(), "v");
        assert_eq!(s.selected(), "v3");

        let mut moved = record();
        moved.pinned_tag_value = "v3".into();
        s.select("v1");
        s.set_input("", &moved);
        assert_eq!(s.selected(), "v3");
        assert_eq!(s.input(), "v3");
    }

    #[test]
    fn cycle_wraps_both_ways() {
        let tags = record().tags;
        let mut s = TagSelector::new(&record());
        s.cycle(&tags, 1);
        assert_eq!(s.selected(), "v3");
        s.cycle(&tags, 1);
        assert_eq!(s.selected(), "v1");
        s.cycle(&tags, -1);
        assert_eq!(s.selected(), "v3");
    }

    #[test]
    fn cycle_from_unknown_tag() {
        let tags: Vec<String> = vec!["a".into(), "b".into()];
        let mut s = TagSelector::new(&record());
        s.cycle(&tags, -1);
        assert_eq!(s.selected(), "b");

        let mut s = TagSelector::new(&record());
        s.cycle(&tags, 1);
        assert_eq!(s.selected(), "a");

        s.cycle(&[], 1);
        assert_eq!(s.selected(), "a");
    }

    #[test]
    fn subtitle_prefers_pin() {
        assert_eq!(subtitle(&record()), "Latest version: v2");
        let mut pinned = record();
        pinned.pinned_tag = "v1".into();
        assert_eq!(subtitle(&pinned), "v1");
    }
}
