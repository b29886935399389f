//! Purpose: End-to-end tests for the notes server and the client sync layer.
//! Exports: None (integration test module).
//! Role: Validate CRUD round trips, status mapping, and collection reconciliation over TCP.
//! Invariants: Uses a loopback-only server with a temp database file.
//! Invariants: Bounded waits avoid test flakiness; server processes are killed on drop.

use notebox::api::{
    ErrorKind, FetchRequest, Fetched, FormMode, Method, NOTES_PATH, NoteCollection, NoteDraft,
    NoteSync, NotesClient, Submitted,
};
use serde_json::json;
use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

static SERVER_LOCK: Mutex<()> = Mutex::new(());

struct TestServer {
    child: Child,
    base_url: String,
    _server_guard: MutexGuard<'static, ()>,
}

impl TestServer {
    fn start(db_dir: &std::path::Path) -> TestResult<Self> {
        let guard = SERVER_LOCK
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut last_err: Option<Box<dyn std::error::Error>> = None;
        for _attempt in 0..3 {
            let port = pick_port()?;
            let addr: SocketAddr = format!("127.0.0.1:{port}").parse()?;
            let mut child = Command::new(env!("CARGO_BIN_EXE_notebox"))
                .arg("serve")
                .arg("--port")
                .arg(port.to_string())
                .arg("--db")
                .arg(db_dir.join("notes.db"))
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()?;

            match wait_for_server(&mut child, addr) {
                Ok(()) => {
                    return Ok(Self {
                        child,
                        base_url: format!("http://{addr}"),
                        _server_guard: guard,
                    });
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_err = Some(err);
                    sleep(Duration::from_millis(30));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| "server failed to start".into()))
    }

    fn client(&self) -> TestResult<NotesClient> {
        Ok(NotesClient::new(self.base_url.clone())?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn raw(method: &str, url: &str, body: Option<&str>) -> TestResult<(u16, String)> {
    let request = ureq::request(method, url);
    let result = match body {
        Some(body) => request
            .set("Content-Type", "application/json")
            .send_string(body),
        None => request.call(),
    };
    match result {
        Ok(resp) => Ok((resp.status(), resp.into_string()?)),
        Err(ureq::Error::Status(code, resp)) => Ok((code, resp.into_string()?)),
        Err(err) => Err(err.into()),
    }
}

#[test]
fn crud_scenario_from_empty_store() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp_dir.path())?;
    let client = server.client()?;

    assert!(client.list_notes()?.is_empty());

    let created = client.create_note(&NoteDraft::new("A", "B"))?;
    assert_eq!(serde_json::to_value(&created)?, json!({"id": 1, "title": "A", "content": "B"}));
    assert_eq!(client.list_notes()?, vec![created.clone()]);

    let updated = client.update_note(1, &NoteDraft::new("A2", "B"))?;
    assert_eq!(updated.id, 1);
    assert_eq!(updated.title, "A2");
    assert_eq!(updated.content, "B");

    client.delete_note(1)?;
    assert!(client.list_notes()?.is_empty());
    Ok(())
}

#[test]
fn missing_fields_are_rejected_and_nothing_is_stored() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp_dir.path())?;
    let client = server.client()?;
    client.create_note(&NoteDraft::new("keep", "me"))?;
    let before = client.list_notes()?;

    let (status, body) = raw("POST", &server.url("/api/notes"), Some(r#"{"title":"A"}"#))?;
    assert_eq!(status, 400);
    assert_eq!(body, "title and content fields required");

    let err = client
        .create_note(&NoteDraft::new("", "B"))
        .expect_err("empty title");
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(err.status(), Some(400));

    assert_eq!(client.list_notes()?, before);
    Ok(())
}

#[test]
fn put_with_non_numeric_id_is_bad_request() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp_dir.path())?;
    let (status, body) = raw(
        "PUT",
        &server.url("/api/notes/abc"),
        Some(r#"{"title":"A","content":"B"}"#),
    )?;
    assert_eq!(status, 400);
    assert_eq!(body, "ID must be a valid integer");
    Ok(())
}

#[test]
fn update_of_unknown_id_is_server_error_and_flags_collection() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp_dir.path())?;
    let client = server.client()?;
    client.create_note(&NoteDraft::new("A", "B"))?;

    let mut collection = NoteCollection::new();
    assert!(collection.load(&client));
    let before = collection.notes().to_vec();

    // Another writer removes the row behind the collection's back.
    client.delete_note(1)?;
    assert!(collection.select(1));
    collection.set_title("A2");
    assert_eq!(collection.submit(&client), Submitted::Failed);
    assert!(collection.has_error());
    assert_eq!(collection.notes(), before.as_slice());

    let err = client
        .update_note(1, &NoteDraft::new("A2", "B"))
        .expect_err("missing row");
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.message(), Some("Oops, something went wrong!"));
    Ok(())
}

#[test]
fn collection_tracks_server_through_create_edit_delete() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp_dir.path())?;
    let client = server.client()?;
    for title in ["one", "two", "three"] {
        client.create_note(&NoteDraft::new(title, "body"))?;
    }

    let mut collection = NoteCollection::new();
    assert!(collection.load(&client));
    assert_eq!(collection.notes().len(), 3);

    collection.set_title("four");
    collection.set_content("body");
    assert_eq!(collection.submit(&client), Submitted::Created(4));

    assert!(collection.select(2));
    collection.set_content("edited");
    assert_eq!(collection.submit(&client), Submitted::Updated(2));
    assert_eq!(collection.mode(), FormMode::Create);

    assert!(collection.delete(&client, 3));
    let ids: Vec<_> = collection.notes().iter().map(|note| note.id).collect();
    assert_eq!(ids, [1, 2, 4]);

    assert_eq!(collection.notes(), client.list_notes()?.as_slice());
    Ok(())
}

#[test]
fn edit_then_cancel_leaves_store_untouched() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp_dir.path())?;
    let client = server.client()?;
    client.create_note(&NoteDraft::new("A", "B"))?;
    let stored_before = serde_json::to_string(&client.list_notes()?)?;

    let mut collection = NoteCollection::new();
    collection.load(&client);
    let local_before = collection.notes().to_vec();
    collection.select(1);
    collection.set_title("changed");
    assert!(collection.cancel());

    assert_eq!(collection.notes(), local_before.as_slice());
    assert_eq!(serde_json::to_string(&client.list_notes()?)?, stored_before);
    Ok(())
}

#[test]
fn failed_delete_keeps_note_locally() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp_dir.path())?;
    let client = server.client()?;
    client.create_note(&NoteDraft::new("A", "B"))?;

    let mut collection = NoteCollection::new();
    collection.load(&client);
    client.delete_note(1)?;

    assert!(!collection.delete(&client, 1));
    assert!(collection.has_error());
    assert_eq!(collection.notes().len(), 1);
    Ok(())
}

#[test]
fn fetch_exposes_raw_delete_status() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    let server = TestServer::start(temp_dir.path())?;
    let client = server.client()?;
    let note = client.create_note(&NoteDraft::new("A", "B"))?;

    let fetched = client.fetch(
        FetchRequest::new(NOTES_PATH)
            .with_method(Method::Delete)
            .with_id(note.id),
    )?;
    assert_eq!(fetched, Fetched::Empty { status: 204 });

    let fetched = client.fetch(FetchRequest::new(NOTES_PATH))?;
    assert_eq!(fetched, Fetched::Json(json!([])));
    Ok(())
}

#[test]
fn notes_survive_server_restart() -> TestResult<()> {
    let temp_dir = tempfile::tempdir()?;
    {
        let server = TestServer::start(temp_dir.path())?;
        server.client()?.create_note(&NoteDraft::new("A", "B"))?;
    }
    let server = TestServer::start(temp_dir.path())?;
    let notes = server.client()?.list_notes()?;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "A");
    Ok(())
}

#[test]
fn load_against_stopped_server_sets_error() -> TestResult<()> {
    let port = pick_port()?;
    let client = NotesClient::new(format!("http://127.0.0.1:{port}"))?;
    let mut collection = NoteCollection::new();
    assert!(!collection.load(&client));
    assert!(collection.has_error());
    assert!(collection.notes().is_empty());
    Ok(())
}

fn pick_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

fn wait_for_server(child: &mut Child, addr: SocketAddr) -> TestResult<()> {
    let url = format!("http://{addr}/");
    let start = Instant::now();
    loop {
        if let Ok(resp) = ureq::get(&url).call() {
            if resp.status() == 200 {
                return Ok(());
            }
        }
        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            let detail = stderr.trim();
            return Err(format!(
                "server exited before ready (status: {status}, stderr: {})",
                if detail.is_empty() { "<empty>" } else { detail }
            )
            .into());
        }
        if start.elapsed() > Duration::from_secs(8) {
            return Err("server did not start in time".into());
        }
        sleep(Duration::from_millis(20));
    }
}
