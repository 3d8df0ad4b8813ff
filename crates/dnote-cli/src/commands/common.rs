use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use dnote_core::db::{notes, Database};
use dnote_core::Note;

use crate::error::CliError;

/// Pick the database location: flag, then environment, then the
/// platform data directory.
pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_db_path {
        return path;
    }
    if let Some(path) = env::var_os("DNOTE_DB_PATH") {
        return PathBuf::from(path);
    }

    let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data_dir.join("dnote").join("dnote.db")
}

pub fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::debug!(path = %path.display(), "opening database");
    Ok(Database::open(path)?)
}

/// Resolve a note by full uuid or unique uuid prefix.
pub fn resolve_note(db: &Database, note_query: &str) -> Result<Note, CliError> {
    let query = note_query.trim();
    if query.is_empty() {
        return Err(CliError::NoteNotFound(note_query.to_string()));
    }

    if let Some(note) = notes::get(db.connection(), query)? {
        return Ok(note);
    }

    let matching = notes::find_uuids_by_prefix(db.connection(), query, 3)?;
    match matching.len() {
        0 => Err(CliError::NoteNotFound(query.to_string())),
        1 => notes::get(db.connection(), &matching[0])?
            .ok_or_else(|| CliError::NoteNotFound(query.to_string())),
        _ => {
            let options = matching
                .iter()
                .map(|uuid| short_id(uuid))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(uuid: &str) -> String {
    uuid.chars().take(8).collect()
}

/// One-line summary of a note: its first line, whitespace collapsed,
/// truncated to `max_chars` with an ellipsis.
pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let first_line = note.body.lines().next().unwrap_or_default();
    let mut collapsed = String::new();
    for word in first_line.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }

    if collapsed.chars().count() > max_chars {
        let kept: String = collapsed
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect();
        return format!("{kept}...");
    }
    collapsed
}

pub fn format_relative_time(timestamp_secs: i64, now_secs: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const TIERS: [(i64, &str); 6] = [
        (365 * DAY, "y"),
        (30 * DAY, "mo"),
        (7 * DAY, "w"),
        (DAY, "d"),
        (HOUR, "h"),
        (MINUTE, "m"),
    ];

    let elapsed = now_secs.saturating_sub(timestamp_secs);
    for (span, suffix) in TIERS {
        if elapsed >= span {
            return format!("{}{suffix} ago", elapsed / span);
        }
    }
    "just now".to_string()
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now = chrono::Utc::now().timestamp();
    notes
        .iter()
        .map(|note| {
            let stamp = if note.edited_on > 0 {
                note.edited_on
            } else {
                note.added_on
            };
            format!(
                "{:<8}  {:<50}  {}",
                short_id(&note.uuid),
                note_preview(note, 50),
                format_relative_time(stamp, now)
            )
        })
        .collect()
}

/// Resolve note content from inline arguments, piped stdin, or the editor.
pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    let inline = content_parts.join(" ");
    if let Some(content) = normalize_content(&inline) {
        return Ok(content);
    }

    let content = match read_piped_stdin()? {
        piped @ Some(_) => piped,
        None => capture_editor_input("")?,
    };
    content.ok_or(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    match content.trim() {
        "" => None,
        trimmed => Some(trimmed.to_string()),
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut buffer = String::new();
        stdin.lock().read_to_string(&mut buffer)?;
        return Ok(normalize_content(&buffer));
    }
    Ok(None)
}

#[cfg(windows)]
pub const FALLBACK_EDITOR: &str = "notepad";
#[cfg(not(windows))]
pub const FALLBACK_EDITOR: &str = "vi";

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Collect note content through the user's editor, starting from the
/// given text. Returns `None` when the user leaves the buffer empty.
pub fn capture_editor_input(initial_content: &str) -> Result<Option<String>, CliError> {
    let scratch = scratch_note_path();
    std::fs::write(&scratch, initial_content)?;

    let outcome = run_editor(&scratch);
    let content = std::fs::read_to_string(&scratch);
    let _ = std::fs::remove_file(&scratch);

    outcome?;
    Ok(normalize_content(&content?))
}

/// Run the configured editor on the given file and wait for it.
///
/// The `VISUAL`/`EDITOR` value may carry arguments, e.g. "code --wait",
/// so it is split into a program and its argument list up front.
fn run_editor(file_path: &Path) -> Result<(), CliError> {
    let editor = editor_command();
    let mut words = editor.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| CliError::EditorFailed("empty EDITOR command".into()))?;

    let status = Command::new(program)
        .args(words)
        .arg(file_path)
        .status()
        .map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                CliError::EditorFailed(format!("`{program}` not found"))
            } else {
                CliError::Io(err)
            }
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

fn editor_command() -> String {
    for variable in ["VISUAL", "EDITOR"] {
        if let Ok(value) = env::var(variable) {
            if !value.trim().is_empty() {
                return value;
            }
        }
    }
    FALLBACK_EDITOR.to_string()
}

fn scratch_note_path() -> PathBuf {
    let serial = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    env::temp_dir().join(format!("dnote-edit-{}-{serial}.md", std::process::id()))
}
