//! Scripted in-memory server for sync-engine tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::client::{
    BookItem, BookResult, NoteResult, Remote, SyncFragBook, SyncFragNote, SyncFragment, SyncState,
};
use crate::crypt;
use crate::error::Result;

pub(crate) const TEST_KEY: [u8; 32] = [7u8; 32];

fn encrypt(plaintext: &str) -> String {
    crypt::encrypt(&TEST_KEY, plaintext).expect("test encryption")
}

/// A fragment note whose body is encrypted under [`TEST_KEY`], as served
/// by the wire.
pub(crate) fn frag_note(uuid: &str, book_uuid: &str, body: &str, usn: i64) -> SyncFragNote {
    SyncFragNote {
        uuid: uuid.to_string(),
        book_uuid: book_uuid.to_string(),
        body: encrypt(body),
        added_on: 1,
        edited_on: 0,
        public: false,
        usn,
        deleted: false,
    }
}

/// A fragment book whose label is encrypted under [`TEST_KEY`].
pub(crate) fn frag_book(uuid: &str, label: &str, usn: i64) -> SyncFragBook {
    SyncFragBook {
        uuid: uuid.to_string(),
        label: encrypt(label),
        usn,
        deleted: false,
    }
}

/// A fragment note in already-decrypted form, for exercising the merge
/// engine directly.
pub(crate) fn plain_note(uuid: &str, book_uuid: &str, body: &str, usn: i64) -> SyncFragNote {
    SyncFragNote {
        uuid: uuid.to_string(),
        book_uuid: book_uuid.to_string(),
        body: body.to_string(),
        added_on: 1,
        edited_on: 0,
        public: false,
        usn,
        deleted: false,
    }
}

/// A fragment book in already-decrypted form.
pub(crate) fn plain_book(uuid: &str, label: &str, usn: i64) -> SyncFragBook {
    SyncFragBook {
        uuid: uuid.to_string(),
        label: label.to_string(),
        usn,
        deleted: false,
    }
}

/// A mutating server call the mock observed, with plaintext payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    CreateBook {
        label: String,
    },
    UpdateBook {
        uuid: String,
        label: String,
    },
    DeleteBook {
        uuid: String,
    },
    CreateNote {
        book_uuid: String,
        body: String,
    },
    UpdateNote {
        uuid: String,
        book_uuid: String,
        body: String,
        public: bool,
    },
    DeleteNote {
        uuid: String,
    },
}

/// Scripted [`Remote`]: fragments and push results are queued up front,
/// requests and mutating calls are recorded for assertions.
pub(crate) struct MockRemote {
    state: Cell<SyncState>,
    fragments: RefCell<VecDeque<SyncFragment>>,
    fragment_requests: RefCell<Vec<i64>>,
    book_results: RefCell<VecDeque<BookResult>>,
    note_results: RefCell<VecDeque<NoteResult>>,
    book_listing: RefCell<Vec<BookItem>>,
    calls: RefCell<Vec<Call>>,
}

impl MockRemote {
    pub(crate) fn new() -> Self {
        Self {
            state: Cell::new(SyncState {
                max_usn: 0,
                full_sync_before: 0,
                current_time: 0,
            }),
            fragments: RefCell::new(VecDeque::new()),
            fragment_requests: RefCell::new(Vec::new()),
            book_results: RefCell::new(VecDeque::new()),
            note_results: RefCell::new(VecDeque::new()),
            book_listing: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn set_state(&self, state: SyncState) {
        self.state.set(state);
    }

    pub(crate) fn push_fragment(&self, fragment: SyncFragment) {
        self.fragments.borrow_mut().push_back(fragment);
    }

    pub(crate) fn push_book_result(&self, result: BookResult) {
        self.book_results.borrow_mut().push_back(result);
    }

    pub(crate) fn push_note_result(&self, result: NoteResult) {
        self.note_results.borrow_mut().push_back(result);
    }

    pub(crate) fn fragment_requests(&self) -> Vec<i64> {
        self.fragment_requests.borrow().clone()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn next_book_result(&self) -> BookResult {
        self.book_results
            .borrow_mut()
            .pop_front()
            .expect("no scripted book result left")
    }

    fn next_note_result(&self) -> NoteResult {
        self.note_results
            .borrow_mut()
            .pop_front()
            .expect("no scripted note result left")
    }
}

impl Remote for MockRemote {
    fn get_sync_state(&self) -> Result<SyncState> {
        Ok(self.state.get())
    }

    fn get_sync_fragment(&self, after_usn: i64) -> Result<SyncFragment> {
        self.fragment_requests.borrow_mut().push(after_usn);
        Ok(self
            .fragments
            .borrow_mut()
            .pop_front()
            .unwrap_or_default())
    }

    fn get_books(&self) -> Result<Vec<BookItem>> {
        Ok(self.book_listing.borrow().clone())
    }

    fn create_book(&self, label: &str) -> Result<BookResult> {
        self.record(Call::CreateBook {
            label: label.to_string(),
        });
        Ok(self.next_book_result())
    }

    fn update_book(&self, uuid: &str, label: &str) -> Result<BookResult> {
        self.record(Call::UpdateBook {
            uuid: uuid.to_string(),
            label: label.to_string(),
        });
        Ok(self.next_book_result())
    }

    fn delete_book(&self, uuid: &str) -> Result<BookResult> {
        self.record(Call::DeleteBook {
            uuid: uuid.to_string(),
        });
        Ok(self.next_book_result())
    }

    fn create_note(&self, book_uuid: &str, body: &str) -> Result<NoteResult> {
        self.record(Call::CreateNote {
            book_uuid: book_uuid.to_string(),
            body: body.to_string(),
        });
        Ok(self.next_note_result())
    }

    fn update_note(
        &self,
        uuid: &str,
        book_uuid: &str,
        body: &str,
        public: bool,
    ) -> Result<NoteResult> {
        self.record(Call::UpdateNote {
            uuid: uuid.to_string(),
            book_uuid: book_uuid.to_string(),
            body: body.to_string(),
            public,
        });
        Ok(self.next_note_result())
    }

    fn delete_note(&self, uuid: &str) -> Result<NoteResult> {
        self.record(Call::DeleteNote {
            uuid: uuid.to_string(),
        });
        Ok(self.next_note_result())
    }
}
