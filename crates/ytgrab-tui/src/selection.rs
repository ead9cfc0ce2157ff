//! Paginated format selection state machine.
//!
//! Owns the ranked format list for one probe session. Navigation keeps
//! `page == choice / items_per_page` after every transition; once a download
//! is confirmed the highlighted choice is frozen and further confirms are
//! no-ops until the outcome arrives.

use ytgrab_core::format::Format;

/// Where this selection session currently is. Done and Error are terminal;
/// only back-navigation leaves them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Browsing,
    Downloading,
    Done,
    Error(String),
}

pub struct SelectionState {
    formats: Vec<Format>,
    choice: usize,
    page: usize,
    items_per_page: usize,
    phase: Phase,
}

impl SelectionState {
    /// `formats` must be non-empty; the ranker guarantees that by injecting
    /// fallback entries when the parser recognized nothing.
    pub fn new(formats: Vec<Format>, items_per_page: usize) -> Self {
        debug_assert!(!formats.is_empty());
        Self {
            formats,
            choice: 0,
            page: 0,
            items_per_page: items_per_page.max(1),
            phase: Phase::Browsing,
        }
    }

    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    pub fn choice(&self) -> usize {
        self.choice
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn total_pages(&self) -> usize {
        self.formats.len().div_ceil(self.items_per_page)
    }

    /// The slice of formats on the current page, with the absolute index of
    /// its first entry.
    pub fn page_window(&self) -> (usize, &[Format]) {
        let start = self.page * self.items_per_page;
        let end = (start + self.items_per_page).min(self.formats.len());
        (start, &self.formats[start..end])
    }

    pub fn selected(&self) -> &Format {
        &self.formats[self.choice]
    }

    pub fn move_down(&mut self) {
        if self.phase != Phase::Browsing {
            return;
        }
        self.choice = (self.choice + 1).min(self.formats.len() - 1);
        self.page = self.choice / self.items_per_page;
    }

    pub fn move_up(&mut self) {
        if self.phase != Phase::Browsing {
            return;
        }
        self.choice = self.choice.saturating_sub(1);
        self.page = self.choice / self.items_per_page;
    }

    /// Flip one page forward and land on its first entry.
    pub fn page_right(&mut self) {
        if self.phase != Phase::Browsing {
            return;
        }
        if self.page + 1 < self.total_pages() {
            self.page += 1;
            self.choice = self.page * self.items_per_page;
        }
    }

    pub fn page_left(&mut self) {
        if self.phase != Phase::Browsing {
            return;
        }
        if self.page > 0 {
            self.page -= 1;
            self.choice = self.page * self.items_per_page;
        }
    }

    /// Confirm the highlighted format. Returns its id the first time only;
    /// while already downloading (or done) this is a no-op, which is what
    /// guarantees at most one in-flight download per session.
    pub fn confirm(&mut self) -> Option<String> {
        if self.phase != Phase::Browsing {
            return None;
        }
        self.phase = Phase::Downloading;
        Some(self.formats[self.choice].id.clone())
    }

    /// Fold the download outcome in. Ignored unless a download is in flight.
    pub fn finish(&mut self, result: Result<(), String>) {
        if self.phase != Phase::Downloading {
            return;
        }
        self.phase = match result {
            Ok(()) => Phase::Done,
            Err(msg) => Phase::Error(msg),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytgrab_core::format::FormatDetail;

    fn fmt(id: &str) -> Format {
        Format {
            id: id.to_string(),
            detail: FormatDetail::Audio {
                container: "M4A (AAC)".to_string(),
                quality: "128 kbps".to_string(),
                filesize: "3.5MiB".to_string(),
            },
        }
    }

    fn twelve() -> SelectionState {
        let formats = (0..12).map(|i| fmt(&format!("f{i}"))).collect();
        SelectionState::new(formats, 5)
    }

    fn assert_page_invariant(s: &SelectionState) {
        assert_eq!(s.page(), s.choice() / 5, "choice={}", s.choice());
    }

    #[test]
    fn moves_clamp_at_both_ends() {
        let mut s = twelve();
        s.move_up();
        assert_eq!(s.choice(), 0);
        for _ in 0..50 {
            s.move_down();
        }
        assert_eq!(s.choice(), 11);
        s.move_down();
        assert_eq!(s.choice(), 11);
    }

    #[test]
    fn page_tracks_choice_after_every_transition() {
        let mut s = twelve();
        for _ in 0..11 {
            s.move_down();
            assert_page_invariant(&s);
        }
        for _ in 0..11 {
            s.move_up();
            assert_page_invariant(&s);
        }
        s.page_right();
        assert_page_invariant(&s);
        s.page_left();
        assert_page_invariant(&s);
    }

    #[test]
    fn page_flip_lands_on_first_entry_of_destination() {
        let mut s = twelve();
        s.page_right();
        assert_eq!((s.page(), s.choice()), (1, 5));
        s.page_right();
        assert_eq!((s.page(), s.choice()), (2, 10));
        // 12 items at 5/page: page 2 is the last
        s.page_right();
        assert_eq!((s.page(), s.choice()), (2, 10));
        s.page_left();
        assert_eq!((s.page(), s.choice()), (1, 5));
    }

    #[test]
    fn page_window_covers_partial_last_page() {
        let mut s = twelve();
        s.page_right();
        s.page_right();
        let (start, window) = s.page_window();
        assert_eq!(start, 10);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn confirm_dispatches_exactly_once() {
        let mut s = twelve();
        s.move_down();
        assert_eq!(s.confirm().as_deref(), Some("f1"));
        assert_eq!(*s.phase(), Phase::Downloading);
        // second confirm while downloading is a no-op
        assert_eq!(s.confirm(), None);
        assert_eq!(*s.phase(), Phase::Downloading);
    }

    #[test]
    fn navigation_is_frozen_while_downloading() {
        let mut s = twelve();
        s.confirm();
        s.move_down();
        s.page_right();
        assert_eq!(s.choice(), 0);
        assert_eq!(s.page(), 0);
    }

    #[test]
    fn finish_moves_to_terminal_phase() {
        let mut s = twelve();
        s.confirm();
        s.finish(Ok(()));
        assert_eq!(*s.phase(), Phase::Done);

        let mut s = twelve();
        s.confirm();
        s.finish(Err("boom".to_string()));
        assert_eq!(*s.phase(), Phase::Error("boom".to_string()));
        // a stray second outcome changes nothing
        s.finish(Ok(()));
        assert_eq!(*s.phase(), Phase::Error("boom".to_string()));
    }

    #[test]
    fn finish_before_confirm_is_ignored() {
        let mut s = twelve();
        s.finish(Ok(()));
        assert_eq!(*s.phase(), Phase::Browsing);
    }

    #[test]
    fn items_per_page_zero_is_treated_as_one() {
        let s = SelectionState::new(vec![fmt("a"), fmt("b")], 0);
        assert_eq!(s.total_pages(), 2);
    }
}
