//! Purpose: Blocking HTTP client for the notes API.
//! Exports: `NotesClient`, `FetchRequest`, `Fetched`, `Method`, `NOTES_PATH`.
//! Role: The single request path every note operation goes through.
//! Invariants: Failures are logged here and returned as `Err`; callers never see a panic.
//! Invariants: DELETE responses are not parsed; a 2xx status is the success signal.
#![allow(clippy::result_large_err)]

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::collection::NoteSync;
use crate::core::error::{Error, ErrorKind};
use crate::core::note::{Note, NoteDraft, NoteId};

type ApiResult<T> = Result<T, Error>;

pub const NOTES_PATH: &str = "/api/notes";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FetchRequest<'a> {
    path: &'a str,
    method: Method,
    payload: Option<Value>,
    id: Option<NoteId>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            method: Method::default(),
            payload: None,
            id: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Fetched {
    Json(Value),
    Empty { status: u16 },
}

#[derive(Clone)]
pub struct NotesClient {
    inner: Arc<NotesClientInner>,
}

struct NotesClientInner {
    base_url: Url,
    agent: ureq::Agent,
}

impl NotesClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(NotesClientInner { base_url, agent }),
        })
    }

    /// Issues one request; `{path}/{id}` when an id is given, JSON body when a payload is.
    pub fn fetch(&self, request: FetchRequest<'_>) -> ApiResult<Fetched> {
        let result = self.send(&request);
        if let Err(err) = &result {
            tracing::warn!(
                method = request.method.as_str(),
                path = request.path,
                id = ?request.id,
                error = %err,
                "note request failed"
            );
        }
        result
    }

    fn send(&self, request: &FetchRequest<'_>) -> ApiResult<Fetched> {
        let url = resource_url(&self.inner.base_url, request.path, request.id)?;
        let call = self
            .inner
            .agent
            .request(request.method.as_str(), url.as_str())
            .set("Accept", "application/json");
        let response = match &request.payload {
            Some(payload) => {
                let body = serde_json::to_string(payload).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                call.set("Content-Type", "application/json")
                    .send_string(&body)
            }
            None => call.call(),
        };

        let response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => return Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("request failed")
                    .with_source(err));
            }
        };

        if request.method == Method::Delete {
            return Ok(Fetched::Empty {
                status: response.status(),
            });
        }
        read_json_response(response).map(Fetched::Json)
    }

    fn fetch_json<R>(&self, request: FetchRequest<'_>) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        let method = request.method;
        match self.fetch(request)? {
            Fetched::Json(value) => serde_json::from_value(value).map_err(|err| {
                tracing::warn!(method = method.as_str(), error = %err, "unexpected note payload");
                Error::new(ErrorKind::Internal)
                    .with_message("unexpected response shape")
                    .with_source(err)
            }),
            Fetched::Empty { status } => Err(Error::new(ErrorKind::Internal)
                .with_message("expected a json response body")
                .with_status(status)),
        }
    }
}

impl NoteSync for NotesClient {
    fn list_notes(&self) -> ApiResult<Vec<Note>> {
        self.fetch_json(FetchRequest::new(NOTES_PATH))
    }

    fn create_note(&self, draft: &NoteDraft) -> ApiResult<Note> {
        self.fetch_json(
            FetchRequest::new(NOTES_PATH)
                .with_method(Method::Post)
                .with_payload(draft_payload(draft)?),
        )
    }

    fn update_note(&self, id: NoteId, draft: &NoteDraft) -> ApiResult<Note> {
        self.fetch_json(
            FetchRequest::new(NOTES_PATH)
                .with_method(Method::Put)
                .with_payload(draft_payload(draft)?)
                .with_id(id),
        )
    }

    fn delete_note(&self, id: NoteId) -> ApiResult<()> {
        self.fetch(
            FetchRequest::new(NOTES_PATH)
                .with_method(Method::Delete)
                .with_id(id),
        )
        .map(|_| ())
    }
}

fn draft_payload(draft: &NoteDraft) -> ApiResult<Value> {
    serde_json::to_value(draft).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode request json")
            .with_source(err)
    })
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid server url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("server url must use http or https scheme"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("server url must not include a path")
            .with_hint("Pass only scheme, host, and port, e.g. http://127.0.0.1:5000."));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn resource_url(base_url: &Url, path: &str, id: Option<NoteId>) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::new(ErrorKind::Usage).with_message("server url cannot be a base"))?;
        segments.clear();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            segments.push(segment);
        }
        if let Some(id) = id {
            segments.push(&id.to_string());
        }
    }
    Ok(url)
}

fn read_json_response(response: ureq::Response) -> ApiResult<Value> {
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

// The server answers failures in plain text.
fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    let body = body.trim();
    let message = if body.is_empty() {
        format!("server error status {status}")
    } else {
        body.to_string()
    };
    Error::new(error_kind_from_status(status))
        .with_message(message)
        .with_status(status)
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 | 415 | 422 => ErrorKind::Usage,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}
