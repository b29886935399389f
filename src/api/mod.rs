//! Purpose: Public client-side surface of notebox.
//! Exports: HTTP client (`NotesClient`), collection state (`NoteCollection`), shared types.
//! Role: What front ends (`notebox shell`, one-shot commands) build on.
//! Invariants: All server traffic goes through `NotesClient::fetch`.

mod client;
mod collection;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::note::{Note, NoteDraft, NoteId};
pub use crate::core::store::{NoteStore, SqliteStore};
pub use client::{FetchRequest, Fetched, Method, NOTES_PATH, NotesClient};
pub use collection::{FormMode, NoteCollection, NoteSync, Submitted};
