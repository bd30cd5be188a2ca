//! Draft/apply staging for the small-viewport filter sheet.
//!
//! On phones and tablets every slider drag must not trigger a refetch, so the
//! sheet edits a scratch copy of the committed state. "Apply" commits the
//! draft; "Cancel" throws it away. What an outside-click dismiss means is
//! deliberately configurable: the two legacy filter surfaces disagreed (one
//! applied, one discarded), so the behavior is a knob rather than a rule.

use super::state::{apply_action, BrandSelectionMode, FilterAction, FilterState, FilterStore};

/// What closing the sheet without an explicit button press does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissBehavior {
    /// Outside-click counts as an implicit Apply.
    Apply,
    /// Outside-click counts as Cancel.
    Discard,
}

#[derive(Debug, Clone)]
pub struct DraftSession {
    baseline: FilterState,
    draft: FilterState,
    mode: BrandSelectionMode,
    dismiss: DismissBehavior,
}

impl DraftSession {
    /// Snapshot the committed state when the sheet opens.
    pub fn open(store: &FilterStore, dismiss: DismissBehavior) -> Self {
        Self {
            baseline: store.state().clone(),
            draft: store.state().clone(),
            mode: store.mode(),
            dismiss,
        }
    }

    /// Mutate only the draft; the committed state is untouched until apply.
    pub fn edit(&mut self, action: FilterAction) {
        apply_action(&mut self.draft, action, self.mode);
    }

    pub fn draft(&self) -> &FilterState {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.baseline
    }

    /// Explicit Apply: the state to commit to the store.
    pub fn apply(self) -> FilterState {
        self.draft
    }

    /// Explicit Cancel: the unchanged committed state.
    pub fn cancel(self) -> FilterState {
        self.baseline
    }

    /// Sheet dismissed without a button press; `Some` means commit.
    pub fn dismiss(self) -> Option<FilterState> {
        match self.dismiss {
            DismissBehavior::Apply => Some(self.draft),
            DismissBehavior::Discard => None,
        }
    }
}
