//! Purpose: Hold top-level CLI command dispatch for `notebox`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: One-shot client commands make exactly one request.

use super::*;
use notebox::api::{NoteDraft, NoteSync, NotesClient};

pub(super) fn dispatch_command(command: Command, url: String) -> Result<RunOutcome, Error> {
    match command {
        Command::Serve { bind, port, db } => {
            let config = serve::ServeConfig {
                bind: SocketAddr::new(bind, port),
                db_path: db,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        Command::List => {
            let notes = NotesClient::new(url)?.list_notes()?;
            emit_json(json!(notes));
            Ok(RunOutcome::ok())
        }
        Command::Add { title, content } => {
            let draft = NoteDraft::new(title, content).validated()?;
            let note = NotesClient::new(url)?.create_note(&draft)?;
            emit_json(json!(note));
            Ok(RunOutcome::ok())
        }
        Command::Edit { id, title, content } => {
            let draft = NoteDraft::new(title, content).validated()?;
            let note = NotesClient::new(url)?.update_note(id, &draft)?;
            emit_json(json!(note));
            Ok(RunOutcome::ok())
        }
        Command::Delete { id } => {
            NotesClient::new(url)?.delete_note(id)?;
            emit_json(json!({ "deleted": id }));
            Ok(RunOutcome::ok())
        }
        Command::Shell => {
            let client = NotesClient::new(url)?;
            let stdin = io::stdin();
            shell::run_shell(&client, stdin.lock(), io::stdout().lock())?;
            Ok(RunOutcome::ok())
        }
    }
}
