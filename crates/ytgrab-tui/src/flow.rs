//! Per-kind flow session: URL entry, probing, then format selection.
//!
//! The stage enum makes illegal combinations unrepresentable; there is no
//! "selecting with no list" and no selection surviving a back-navigation.

use ytgrab_core::format::TrackKind;

use crate::selection::SelectionState;
use crate::widgets::url_input::UrlInput;

pub enum Stage {
    EnteringUrl(UrlInput),
    Probing { url: String },
    Selecting { url: String, selection: SelectionState },
}

pub struct FlowSession {
    pub kind: TrackKind,
    pub stage: Stage,
    /// Probe failure carried back to the URL entry screen.
    pub last_error: Option<String>,
}

impl FlowSession {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            stage: Stage::EnteringUrl(UrlInput::new("https://...")),
            last_error: None,
        }
    }

    /// Drop any selection or in-progress probe and return to URL entry,
    /// keeping the entered text so the user can correct a typo.
    pub fn rewind_to_entry(&mut self, url: String) {
        let mut input = UrlInput::new("https://...");
        input.set_value(&url);
        self.stage = Stage::EnteringUrl(input);
    }
}
