//! Purpose: Client-side note collection, draft form, and edit-mode state.
//! Exports: `NoteCollection`, `NoteSync`, `FormMode`, `Submitted`.
//! Role: Folds each server round trip back into local state.
//! Invariants: Local state changes only after the server confirms; failures only raise `error`.
//! Invariants: `selected == None` means create mode.
#![allow(clippy::result_large_err)]

use crate::core::error::Error;
use crate::core::note::{Note, NoteDraft, NoteId};

/// Server operations the collection depends on.
pub trait NoteSync {
    fn list_notes(&self) -> Result<Vec<Note>, Error>;
    fn create_note(&self, draft: &NoteDraft) -> Result<Note, Error>;
    fn update_note(&self, id: NoteId, draft: &NoteDraft) -> Result<Note, Error>;
    fn delete_note(&self, id: NoteId) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormMode {
    Create,
    Edit(NoteId),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Submitted {
    Created(NoteId),
    Updated(NoteId),
    /// Title or content was blank; nothing was sent.
    Incomplete,
    Failed,
}

#[derive(Clone, Debug, Default)]
pub struct NoteCollection {
    notes: Vec<Note>,
    title: String,
    content: String,
    selected: Option<Note>,
    error: bool,
}

impl NoteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn selected(&self) -> Option<&Note> {
        self.selected.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn mode(&self) -> FormMode {
        match &self.selected {
            Some(note) => FormMode::Edit(note.id),
            None => FormMode::Create,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Replaces the notes with the server's list; returns false on failure.
    pub fn load(&mut self, sync: &impl NoteSync) -> bool {
        match sync.list_notes() {
            Ok(notes) => {
                self.notes = notes;
                true
            }
            Err(_) => {
                self.error = true;
                false
            }
        }
    }

    /// Enters edit mode for `id`, copying its fields into the draft.
    pub fn select(&mut self, id: NoteId) -> bool {
        let Some(note) = self.notes.iter().find(|note| note.id == id) else {
            return false;
        };
        self.title = note.title.clone();
        self.content = note.content.clone();
        self.selected = Some(note.clone());
        true
    }

    pub fn submit(&mut self, sync: &impl NoteSync) -> Submitted {
        let draft = NoteDraft::new(self.title.clone(), self.content.clone());
        if !draft.is_complete() {
            return Submitted::Incomplete;
        }
        match self.selected.as_ref().map(|note| note.id) {
            None => match sync.create_note(&draft) {
                Ok(note) => {
                    let id = note.id;
                    self.notes.push(note);
                    self.clear_form();
                    Submitted::Created(id)
                }
                Err(_) => self.fail(),
            },
            Some(id) => match sync.update_note(id, &draft) {
                Ok(updated) => {
                    if let Some(slot) = self.notes.iter_mut().find(|note| note.id == id) {
                        *slot = updated;
                    }
                    self.clear_form();
                    Submitted::Updated(id)
                }
                Err(_) => self.fail(),
            },
        }
    }

    /// Leaves edit mode, discarding the draft; does nothing in create mode.
    pub fn cancel(&mut self) -> bool {
        if self.selected.is_none() {
            return false;
        }
        self.clear_form();
        true
    }

    /// Deletes `id` regardless of mode; clears the form if that note was selected.
    pub fn delete(&mut self, sync: &impl NoteSync, id: NoteId) -> bool {
        if sync.delete_note(id).is_err() {
            self.error = true;
            return false;
        }
        self.notes.retain(|note| note.id != id);
        if self.selected.as_ref().is_some_and(|note| note.id == id) {
            self.clear_form();
        }
        true
    }

    pub fn dismiss_error(&mut self) {
        self.error = false;
    }

    fn clear_form(&mut self) {
        self.title.clear();
        self.content.clear();
        self.selected = None;
    }

    fn fail(&mut self) -> Submitted {
        self.error = true;
        Submitted::Failed
    }
}
