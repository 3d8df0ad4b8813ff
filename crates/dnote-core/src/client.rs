//! Remote client interface.
//!
//! `Remote` is the thin contract for the server operations the sync and
//! migration engines consume; `HttpRemote` implements it over a blocking
//! HTTP client. No sync logic lives here. Outgoing note bodies and book
//! labels are encrypted before they leave; fragment payloads come back
//! still encrypted and are decrypted by the sync-list assembler.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::config::Session;
use crate::crypt;
use crate::error::{Error, Result};

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Server's view of the user's stream: `{ MaxUSN, FullSyncBefore, CurrentTime }`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SyncState {
    pub max_usn: i64,
    /// Clients that last synced before this wall clock must full-sync.
    pub full_sync_before: i64,
    pub current_time: i64,
}

/// One page of the server delta. `frag_max_usn == 0` signals end-of-stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncFragment {
    pub frag_max_usn: i64,
    pub current_time: i64,
    #[serde(default)]
    pub notes: Vec<SyncFragNote>,
    #[serde(default)]
    pub books: Vec<SyncFragBook>,
    #[serde(default)]
    pub expunged_notes: Vec<String>,
    #[serde(default)]
    pub expunged_books: Vec<String>,
}

/// A note as it appears in a fragment; `body` is ciphertext.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncFragNote {
    pub uuid: String,
    pub book_uuid: String,
    pub body: String,
    pub added_on: i64,
    #[serde(default)]
    pub edited_on: i64,
    #[serde(default)]
    pub public: bool,
    pub usn: i64,
    #[serde(default)]
    pub deleted: bool,
}

/// A book as it appears in a fragment; `label` is ciphertext.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncFragBook {
    pub uuid: String,
    pub label: String,
    pub usn: i64,
    #[serde(default)]
    pub deleted: bool,
}

/// Identity and revision the server assigned to a book operation.
#[derive(Debug, Clone, Deserialize)]
pub struct BookResult {
    #[serde(default)]
    pub uuid: String,
    pub usn: i64,
}

/// Identity and revision the server assigned to a note operation.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteResult {
    #[serde(default)]
    pub uuid: String,
    pub usn: i64,
}

/// A book summary from the legacy listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BookItem {
    pub uuid: String,
    pub label: String,
}

/// The server operations the engines consume.
pub trait Remote {
    fn get_sync_state(&self) -> Result<SyncState>;
    fn get_sync_fragment(&self, after_usn: i64) -> Result<SyncFragment>;
    fn get_books(&self) -> Result<Vec<BookItem>>;
    fn create_book(&self, label: &str) -> Result<BookResult>;
    fn update_book(&self, uuid: &str, label: &str) -> Result<BookResult>;
    fn delete_book(&self, uuid: &str) -> Result<BookResult>;
    fn create_note(&self, book_uuid: &str, body: &str) -> Result<NoteResult>;
    fn update_note(&self, uuid: &str, book_uuid: &str, body: &str, public: bool)
        -> Result<NoteResult>;
    fn delete_note(&self, uuid: &str) -> Result<NoteResult>;
}

#[derive(Deserialize)]
struct FragmentResponse {
    fragment: SyncFragment,
}

#[derive(Deserialize)]
struct BookResponse {
    book: BookResult,
}

#[derive(Deserialize)]
struct NoteResponse {
    result: NoteResult,
}

#[derive(Serialize)]
struct BookPayload<'a> {
    label: &'a str,
}

#[derive(Serialize)]
struct CreateNotePayload<'a> {
    book_uuid: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct UpdateNotePayload<'a> {
    book_uuid: &'a str,
    body: &'a str,
    public: bool,
}

/// Blocking HTTP implementation of [`Remote`].
pub struct HttpRemote {
    client: Client,
    session: Session,
}

impl HttpRemote {
    pub fn new(session: Session) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|source| Error::Transport {
                op: "building HTTP client",
                source,
            })?;
        Ok(Self { client, session })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.session.endpoint)
    }

    fn send(&self, op: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.session.session_key)
            .header("Accept", "application/json")
            .send()
            .map_err(|source| Error::Transport { op, source })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(Error::Api {
                op,
                status,
                message: body.trim().chars().take(180).collect(),
            });
        }

        Ok(response)
    }

    fn parse<T: serde::de::DeserializeOwned>(op: &'static str, response: Response) -> Result<T> {
        response
            .json::<T>()
            .map_err(|source| Error::Transport { op, source })
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        crypt::encrypt(&self.session.cipher_key, plaintext)
            .map_err(|reason| Error::Protocol(format!("encrypting outgoing payload: {reason}")))
    }
}

impl Remote for HttpRemote {
    fn get_sync_state(&self) -> Result<SyncState> {
        let op = "getting sync state";
        let response = self.send(op, self.client.get(self.url("/v3/sync/state")))?;
        Self::parse(op, response)
    }

    fn get_sync_fragment(&self, after_usn: i64) -> Result<SyncFragment> {
        let op = "getting sync fragment";
        let url = format!("{}?after_usn={after_usn}", self.url("/v3/sync/fragment"));
        let response = self.send(op, self.client.get(url))?;
        let parsed: FragmentResponse = Self::parse(op, response)?;
        Ok(parsed.fragment)
    }

    fn get_books(&self) -> Result<Vec<BookItem>> {
        let op = "getting books";
        let response = self.send(op, self.client.get(self.url("/v3/books")))?;
        Self::parse(op, response)
    }

    fn create_book(&self, label: &str) -> Result<BookResult> {
        let op = "creating a book";
        let label = self.encrypt(label)?;
        let request = self
            .client
            .post(self.url("/v3/books"))
            .json(&BookPayload { label: &label });
        let parsed: BookResponse = Self::parse(op, self.send(op, request)?)?;
        Ok(parsed.book)
    }

    fn update_book(&self, uuid: &str, label: &str) -> Result<BookResult> {
        let op = "updating a book";
        let label = self.encrypt(label)?;
        let request = self
            .client
            .patch(self.url(&format!("/v3/books/{uuid}")))
            .json(&BookPayload { label: &label });
        let parsed: BookResponse = Self::parse(op, self.send(op, request)?)?;
        Ok(parsed.book)
    }

    fn delete_book(&self, uuid: &str) -> Result<BookResult> {
        let op = "deleting a book";
        let request = self.client.delete(self.url(&format!("/v3/books/{uuid}")));
        let parsed: BookResponse = Self::parse(op, self.send(op, request)?)?;
        Ok(parsed.book)
    }

    fn create_note(&self, book_uuid: &str, body: &str) -> Result<NoteResult> {
        let op = "creating a note";
        let body = self.encrypt(body)?;
        let request = self.client.post(self.url("/v3/notes")).json(&CreateNotePayload {
            book_uuid,
            body: &body,
        });
        let parsed: NoteResponse = Self::parse(op, self.send(op, request)?)?;
        Ok(parsed.result)
    }

    fn update_note(
        &self,
        uuid: &str,
        book_uuid: &str,
        body: &str,
        public: bool,
    ) -> Result<NoteResult> {
        let op = "updating a note";
        let body = self.encrypt(body)?;
        let request = self
            .client
            .patch(self.url(&format!("/v3/notes/{uuid}")))
            .json(&UpdateNotePayload {
                book_uuid,
                body: &body,
                public,
            });
        let parsed: NoteResponse = Self::parse(op, self.send(op, request)?)?;
        Ok(parsed.result)
    }

    fn delete_note(&self, uuid: &str) -> Result<NoteResult> {
        let op = "deleting a note";
        let request = self.client.delete(self.url(&format!("/v3/notes/{uuid}")));
        let parsed: NoteResponse = Self::parse(op, self.send(op, request)?)?;
        Ok(parsed.result)
    }
}
