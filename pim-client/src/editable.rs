//! Create/edit panel toggle
//!
//! Tracks whether a list view shows its create form or the edit form of one
//! record, and reloads the list when a panel closes after a save.

use parking_lot::Mutex;

use crate::searchable::LoadHook;

#[derive(Debug, Default)]
struct Panels {
    show_create: bool,
    show_edit_for: Option<String>,
}

pub struct CreateEditToggle {
    panels: Mutex<Panels>,
    reload: LoadHook,
}

impl CreateEditToggle {
    pub fn new(reload: LoadHook) -> Self {
        Self {
            panels: Mutex::new(Panels::default()),
            reload,
        }
    }

    pub fn show_create(&self) -> bool {
        self.panels.lock().show_create
    }

    pub fn show_edit_for(&self) -> Option<String> {
        self.panels.lock().show_edit_for.clone()
    }

    pub fn open_create(&self) {
        let mut panels = self.panels.lock();
        panels.show_create = true;
        panels.show_edit_for = None;
    }

    pub fn open_edit(&self, id: impl Into<String>) {
        let mut panels = self.panels.lock();
        panels.show_create = false;
        panels.show_edit_for = Some(id.into());
    }

    /// Close both panels, then run the reload hook if `reload` is set
    pub async fn hide_create_edit(&self, reload: bool) {
        {
            let mut panels = self.panels.lock();
            panels.show_create = false;
            panels.show_edit_for = None;
        }
        if reload {
            (self.reload)().await;
        }
    }
}
