//! In-process stand-in for the Arkacdn blob store.
//!
//! Answers with the same status codes the real store uses, so the session
//! layer's retry and garbage-collection paths can be driven without a
//! network:
//!
//! | Situation                             | Status |
//! |---------------------------------------|--------|
//! | bearer missing or not the current one | 401    |
//! | blob id unknown                       | 404    |
//! | blob marked pending                   | 400    |
//! | upload accepted                       | 201    |
//!
//! Knobs (`expire_access`, `mark_pending`, `remove`, `set_offline`, …) let
//! tests put the store into each of those situations.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Value, json};

use crate::{RemoteError, RemoteResponse, RemoteStore, Upload};

#[derive(Debug, Clone)]
struct StoredBlob {
    filename: String,
    description: String,
    data: String,
}

#[derive(Debug, Default)]
struct State {
    blobs: HashMap<String, StoredBlob>,
    /// Remaining reads that will answer 400 for a blob.
    pending: HashMap<String, u32>,
    next_blob: u64,
    next_access: u64,
    access_token: Option<String>,
    refresh_token: String,
    refresh_failing: bool,
    forced_upload: Option<(u16, String)>,
    queued_uploads: VecDeque<(u16, String)>,
    offline: bool,
}

/// A [`RemoteStore`] that keeps blobs in memory.
#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<State>,
    upload_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

impl MemoryRemote {
    /// Creates an empty store that accepts `refresh_token` on
    /// `/auth/refresh`. No access credential is valid until one has been
    /// issued by a refresh (or set with [`with_access_token`](Self::with_access_token)).
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(State {
                refresh_token: refresh_token.into(),
                ..State::default()
            }),
            upload_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    /// Makes `token` the currently valid access credential.
    pub fn with_access_token(self, token: impl Into<String>) -> Self {
        self.lock().access_token = Some(token.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Knobs ------------------------------------------------------------

    /// Invalidates the current access credential; the next authenticated
    /// call answers 401 until a refresh happens.
    pub fn expire_access(&self) {
        self.lock().access_token = None;
    }

    /// Makes `/auth/refresh` reject every request.
    pub fn set_refresh_failing(&self, failing: bool) {
        self.lock().refresh_failing = failing;
    }

    /// Makes every upload answer `status` with `message`, regardless of
    /// credential. `None` restores normal behavior.
    pub fn force_upload_status(&self, forced: Option<(u16, &str)>) {
        self.lock().forced_upload = forced.map(|(s, m)| (s, m.to_string()));
    }

    /// Queues a one-shot answer for the next upload. Queued answers are
    /// used up in order before normal handling resumes.
    pub fn queue_upload_status(&self, status: u16, message: &str) {
        self.lock()
            .queued_uploads
            .push_back((status, message.to_string()));
    }

    /// Makes every call fail at the transport level.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// The next `reads` fetches of `file_id` answer 400 (not ready).
    pub fn mark_pending(&self, file_id: &str, reads: u32) {
        self.lock().pending.insert(file_id.to_string(), reads);
    }

    /// Deletes a blob, as if it expired on the remote side.
    pub fn remove(&self, file_id: &str) -> bool {
        self.lock().blobs.remove(file_id).is_some()
    }

    /// Replaces a blob's content.
    pub fn overwrite(&self, file_id: &str, data: impl Into<String>) -> bool {
        match self.lock().blobs.get_mut(file_id) {
            Some(blob) => {
                blob.data = data.into();
                true
            }
            None => false,
        }
    }

    // -- Inspection -------------------------------------------------------

    /// The access credential the store currently accepts.
    pub fn valid_access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    /// Raw stored content of a blob.
    pub fn stored_data(&self, file_id: &str) -> Option<String> {
        self.lock().blobs.get(file_id).map(|b| b.data.clone())
    }

    /// Number of stored blobs.
    pub fn blob_count(&self) -> usize {
        self.lock().blobs.len()
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Total remote calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.upload_calls() + self.fetch_calls() + self.refresh_calls()
    }

    // -- Shared request checks --------------------------------------------

    fn check_online(state: &State) -> Result<(), RemoteError> {
        if state.offline {
            return Err(RemoteError::Unreachable("memory remote is offline".into()));
        }
        Ok(())
    }

    fn authorized(state: &State, credential: Option<&str>) -> bool {
        matches!(
            (state.access_token.as_deref(), credential),
            (Some(valid), Some(given)) if valid == given
        )
    }

    fn unauthorized() -> RemoteResponse {
        RemoteResponse::new(401, json!({"message": "Unauthorized"}))
    }

    /// Common path for both GET endpoints: auth, existence, readiness.
    fn lookup(
        &self,
        credential: Option<&str>,
        file_id: &str,
    ) -> Result<Result<StoredBlob, RemoteResponse>, RemoteError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        Self::check_online(&state)?;

        if !Self::authorized(&state, credential) {
            return Ok(Err(Self::unauthorized()));
        }
        let Some(blob) = state.blobs.get(file_id).cloned() else {
            return Ok(Err(RemoteResponse::new(
                404,
                json!({"message": format!("file {file_id} not found")}),
            )));
        };
        if let Some(remaining) = state.pending.get_mut(file_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(Err(RemoteResponse::new(
                    400,
                    json!({"message": "file is still processing"}),
                )));
            }
        }
        Ok(Ok(blob))
    }
}

impl RemoteStore for MemoryRemote {
    async fn upload(
        &self,
        credential: Option<&str>,
        upload: &Upload,
    ) -> Result<RemoteResponse, RemoteError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        Self::check_online(&state)?;

        if let Some((status, message)) = state.queued_uploads.pop_front() {
            return Ok(RemoteResponse::new(status, json!({"message": message})));
        }
        if let Some((status, message)) = &state.forced_upload {
            return Ok(RemoteResponse::new(*status, json!({"message": message})));
        }
        if !Self::authorized(&state, credential) {
            return Ok(Self::unauthorized());
        }

        state.next_blob += 1;
        let id = format!("file-{}", state.next_blob);
        state.blobs.insert(
            id.clone(),
            StoredBlob {
                filename: upload.filename.clone(),
                description: upload.description.clone(),
                data: upload.data.clone(),
            },
        );

        Ok(RemoteResponse::new(
            201,
            json!({
                "message": "uploaded",
                "data": {
                    "id": id,
                    "filename": upload.filename,
                    "size": upload.data.len(),
                }
            }),
        ))
    }

    async fn fetch_meta(
        &self,
        credential: Option<&str>,
        file_id: &str,
    ) -> Result<RemoteResponse, RemoteError> {
        Ok(match self.lookup(credential, file_id)? {
            Ok(blob) => RemoteResponse::new(
                200,
                json!({
                    "data": {
                        "id": file_id,
                        "filename": blob.filename,
                        "description": blob.description,
                        "size": blob.data.len(),
                    }
                }),
            ),
            Err(response) => response,
        })
    }

    async fn fetch_content(
        &self,
        credential: Option<&str>,
        file_id: &str,
    ) -> Result<RemoteResponse, RemoteError> {
        Ok(match self.lookup(credential, file_id)? {
            Ok(blob) => {
                let body = serde_json::from_str(&blob.data)
                    .unwrap_or(Value::String(blob.data));
                RemoteResponse::new(200, body)
            }
            Err(response) => response,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RemoteResponse, RemoteError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        Self::check_online(&state)?;

        if state.refresh_failing || refresh_token != state.refresh_token {
            return Ok(RemoteResponse::new(
                401,
                json!({"message": "invalid refresh token"}),
            ));
        }

        state.next_access += 1;
        let access = format!("access-{}", state.next_access);
        state.access_token = Some(access.clone());
        Ok(RemoteResponse::new(200, json!({"accessToken": access})))
    }
}
