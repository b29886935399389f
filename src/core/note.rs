//! Purpose: Note entity and the title/content draft submitted to create or update one.
//! Exports: `Note`, `NoteId`, `NoteDraft`.
//! Invariants: A draft accepted by `validated` has non-empty title and content.
//! Invariants: Ids are assigned by the store and never minted client-side.
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

pub type NoteId = i64;

const FIELDS_REQUIRED: &str = "title and content fields required";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

// Wire shape: either field may be absent.
#[derive(Deserialize)]
struct DraftBody {
    title: Option<String>,
    content: Option<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.content.is_empty()
    }

    pub fn validated(self) -> Result<Self, Error> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(Error::new(ErrorKind::Usage).with_message(FIELDS_REQUIRED))
        }
    }

    /// Parses a request body; an empty or malformed body counts as missing fields.
    pub fn from_json_body(body: &[u8]) -> Result<Self, Error> {
        let parsed: DraftBody = serde_json::from_slice(body).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(FIELDS_REQUIRED)
                .with_source(err)
        })?;
        Self::new(
            parsed.title.unwrap_or_default(),
            parsed.content.unwrap_or_default(),
        )
        .validated()
    }
}
