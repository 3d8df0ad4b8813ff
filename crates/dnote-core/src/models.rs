//! Book and note entities

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A collection of notes.
///
/// `uuid` is assigned by the server; a locally created book carries a
/// placeholder v4 uuid until its first upload replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub uuid: String,
    /// User-visible name, unique among live books
    pub label: String,
    /// Highest server revision integrated locally; 0 means never uploaded
    pub usn: i64,
    /// Local changes await upload
    pub dirty: bool,
    /// Soft-delete tombstone
    pub deleted: bool,
}

impl Book {
    pub fn new(uuid: impl Into<String>, label: impl Into<String>, usn: i64) -> Self {
        Self {
            uuid: uuid.into(),
            label: label.into(),
            usn,
            dirty: false,
            deleted: false,
        }
    }

    /// Creates a book that exists only locally and awaits its first upload.
    #[must_use]
    pub fn local(label: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            label: label.into(),
            usn: 0,
            dirty: true,
            deleted: false,
        }
    }
}

/// A single note inside a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub uuid: String,
    /// Owning book's uuid
    pub book_uuid: String,
    /// Plaintext content; ciphertext on the wire
    pub body: String,
    /// Creation time (Unix seconds)
    pub added_on: i64,
    /// Last edit time (Unix seconds); 0 if never edited
    pub edited_on: i64,
    pub public: bool,
    pub usn: i64,
    pub dirty: bool,
    pub deleted: bool,
}

impl Note {
    /// Creates a note that exists only locally and awaits its first upload.
    #[must_use]
    pub fn local(book_uuid: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            book_uuid: book_uuid.into(),
            body: body.into(),
            added_on: chrono::Utc::now().timestamp(),
            edited_on: 0,
            public: false,
            usn: 0,
            dirty: true,
            deleted: false,
        }
    }
}

/// Book labels forbidden because surrounding tooling uses them as sentinels.
pub const RESERVED_BOOK_LABELS: [&str; 2] = ["trash", "conflicts"];

/// Checks whether the given label is reserved.
#[must_use]
pub fn is_reserved_label(label: &str) -> bool {
    RESERVED_BOOK_LABELS.contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_book_starts_dirty_and_unsynced() {
        let book = Book::local("js");
        assert_eq!(book.usn, 0);
        assert!(book.dirty);
        assert!(!book.deleted);
        assert!(!book.uuid.is_empty());
    }

    #[test]
    fn local_note_starts_dirty_and_unsynced() {
        let note = Note::local("book-1", "hello");
        assert_eq!(note.usn, 0);
        assert!(note.dirty);
        assert_eq!(note.edited_on, 0);
        assert!(note.added_on > 0);
    }

    #[test]
    fn local_uuids_are_unique() {
        assert_ne!(Book::local("a").uuid, Book::local("a").uuid);
    }

    #[test]
    fn reserved_labels_are_detected() {
        assert!(is_reserved_label("trash"));
        assert!(is_reserved_label("conflicts"));
        assert!(!is_reserved_label("js"));
    }
}
