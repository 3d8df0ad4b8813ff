//! Sync-list assembly.
//!
//! Pulls the server delta page by page, decrypts payloads, and folds the
//! fragments into one deduplicated aggregate the merge engine consumes.

use std::collections::{HashMap, HashSet};

use crate::client::{Remote, SyncFragBook, SyncFragNote, SyncFragment};
use crate::crypt;
use crate::error::{Error, Result};

/// Deduplicated aggregate of every fragment received during one pull.
///
/// Bodies and labels are plaintext here; decryption happened during
/// assembly. Per uuid, the last-seen fragment entry wins.
#[derive(Debug, Default)]
pub struct SyncList {
    pub notes: HashMap<String, SyncFragNote>,
    pub books: HashMap<String, SyncFragBook>,
    pub expunged_notes: HashSet<String>,
    pub expunged_books: HashSet<String>,
    pub max_usn: i64,
    pub max_current_time: i64,
}

impl SyncList {
    /// Total number of entities represented, for progress reporting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len() + self.books.len() + self.expunged_notes.len() + self.expunged_books.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the list accounts for the note, live or expunged.
    #[must_use]
    pub fn contains_note(&self, uuid: &str) -> bool {
        self.notes.contains_key(uuid) || self.expunged_notes.contains(uuid)
    }

    /// Whether the list accounts for the book, live or expunged.
    #[must_use]
    pub fn contains_book(&self, uuid: &str) -> bool {
        self.books.contains_key(uuid) || self.expunged_books.contains(uuid)
    }
}

/// Pull every fragment above `after_usn` and fold them into a [`SyncList`].
pub fn get_sync_list(remote: &dyn Remote, cipher_key: &[u8], after_usn: i64) -> Result<SyncList> {
    let fragments = get_sync_fragments(remote, after_usn)?;
    process_fragments(fragments, cipher_key)
}

/// Page through the server delta until the end-of-stream sentinel.
///
/// Each response's `frag_max_usn` becomes the next request's cursor; the
/// server reports 0 when no pages remain.
fn get_sync_fragments(remote: &dyn Remote, after_usn: i64) -> Result<Vec<SyncFragment>> {
    let mut fragments = Vec::new();
    let mut next_after_usn = after_usn;

    loop {
        let fragment = remote.get_sync_fragment(next_after_usn)?;
        tracing::debug!(
            frag_max_usn = fragment.frag_max_usn,
            notes = fragment.notes.len(),
            books = fragment.books.len(),
            "received sync fragment"
        );

        next_after_usn = fragment.frag_max_usn;
        fragments.push(fragment);

        if next_after_usn == 0 {
            break;
        }
    }

    Ok(fragments)
}

/// Fold fragments into a sync list, decrypting payloads along the way.
///
/// A decryption failure aborts the whole pull; partial lists are never
/// surfaced.
fn process_fragments(fragments: Vec<SyncFragment>, cipher_key: &[u8]) -> Result<SyncList> {
    let mut list = SyncList::default();

    for fragment in fragments {
        for mut note in fragment.notes {
            tracing::debug!(uuid = %note.uuid, "decrypting note");
            note.body = crypt::decrypt(cipher_key, &note.body).map_err(|reason| {
                Error::Decrypt {
                    context: format!("body for note {}", note.uuid),
                    reason,
                }
            })?;
            list.notes.insert(note.uuid.clone(), note);
        }

        for mut book in fragment.books {
            tracing::debug!(uuid = %book.uuid, "decrypting book");
            book.label = crypt::decrypt(cipher_key, &book.label).map_err(|reason| {
                Error::Decrypt {
                    context: format!("label for book {}", book.uuid),
                    reason,
                }
            })?;
            list.books.insert(book.uuid.clone(), book);
        }

        list.expunged_notes.extend(fragment.expunged_notes);
        list.expunged_books.extend(fragment.expunged_books);

        list.max_usn = list.max_usn.max(fragment.frag_max_usn);
        list.max_current_time = list.max_current_time.max(fragment.current_time);
    }

    Ok(list)
}
