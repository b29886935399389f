//! Purpose: Line-oriented front end for `notebox shell`.
//! Exports: `run_shell`.
//! Role: Drives a `NoteCollection` from stdin commands and redraws it after each one.
//! Invariants: Notes are loaded once at startup; there is no automatic reload or retry.

use std::io::{BufRead, Write};

use notebox::api::{Error, ErrorKind, FormMode, NoteCollection, NoteId, NoteSync, Submitted};

const HELP: &str = "commands: list | select <id> | title <text> | content <text> | submit | cancel | delete <id> | dismiss | help | quit";

#[derive(Debug, Eq, PartialEq)]
enum ShellCommand {
    List,
    Select(NoteId),
    Title(String),
    Content(String),
    Submit,
    Cancel,
    Delete(NoteId),
    Dismiss,
    Help,
    Quit,
}

pub(super) fn run_shell<R, W>(sync: &impl NoteSync, input: R, mut out: W) -> Result<(), Error>
where
    R: BufRead,
    W: Write,
{
    let mut collection = NoteCollection::new();
    collection.load(sync);
    render(&collection, &mut out)?;

    for line in input.lines() {
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read input")
                .with_source(err)
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(reason) => {
                write_line(&mut out, &format!("{reason}; type `help`"))?;
                continue;
            }
        };
        match command {
            ShellCommand::Quit => break,
            ShellCommand::Help => {
                write_line(&mut out, HELP)?;
                continue;
            }
            ShellCommand::List => {}
            ShellCommand::Select(id) => {
                if !collection.select(id) {
                    write_line(&mut out, &format!("no note #{id}"))?;
                }
            }
            ShellCommand::Title(text) => collection.set_title(text),
            ShellCommand::Content(text) => collection.set_content(text),
            ShellCommand::Submit => match collection.submit(sync) {
                Submitted::Created(id) => write_line(&mut out, &format!("created #{id}"))?,
                Submitted::Updated(id) => write_line(&mut out, &format!("updated #{id}"))?,
                Submitted::Incomplete => write_line(&mut out, "title and content are required")?,
                Submitted::Failed => {}
            },
            ShellCommand::Cancel => {
                if !collection.cancel() {
                    write_line(&mut out, "nothing to cancel")?;
                }
            }
            ShellCommand::Delete(id) => {
                if collection.delete(sync, id) {
                    write_line(&mut out, &format!("deleted #{id}"))?;
                }
            }
            ShellCommand::Dismiss => collection.dismiss_error(),
        }
        render(&collection, &mut out)?;
    }
    out.flush().map_err(write_error)
}

fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word {
        "list" | "ls" => ShellCommand::List,
        "select" | "edit" => ShellCommand::Select(parse_id(rest)?),
        "title" => ShellCommand::Title(rest.to_string()),
        "content" => ShellCommand::Content(rest.to_string()),
        "submit" | "save" => ShellCommand::Submit,
        "cancel" => ShellCommand::Cancel,
        "delete" | "rm" => ShellCommand::Delete(parse_id(rest)?),
        "dismiss" => ShellCommand::Dismiss,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(command)
}

fn parse_id(raw: &str) -> Result<NoteId, String> {
    raw.parse::<NoteId>()
        .map_err(|_| format!("expected a numeric note id, got `{raw}`"))
}

fn render<W: Write>(collection: &NoteCollection, out: &mut W) -> Result<(), Error> {
    if collection.has_error() {
        write_line(out, "error: the last request failed (`dismiss` to clear)")?;
    }
    write_line(out, &format!("notes ({}):", collection.notes().len()))?;
    let selected = collection.selected().map(|note| note.id);
    for note in collection.notes() {
        let marker = if selected == Some(note.id) { '*' } else { ' ' };
        write_line(
            out,
            &format!("{marker} #{} {} | {}", note.id, note.title, note.content),
        )?;
    }
    let mode = match collection.mode() {
        FormMode::Create => "create".to_string(),
        FormMode::Edit(id) => format!("edit #{id}"),
    };
    write_line(
        out,
        &format!(
            "form [{mode}] title={:?} content={:?}",
            collection.title(),
            collection.content()
        ),
    )
}

fn write_line<W: Write>(out: &mut W, line: &str) -> Result<(), Error> {
    writeln!(out, "{line}").map_err(write_error)
}

fn write_error(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write output")
        .with_source(err)
}
