//! Common test helpers for the session integration tests
//!
//! - `ZeroSource`: a large source that produces its bytes lazily
//! - `MockTransfer`: an in-memory coordinator recording every call

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use partup::{
    coordinator::{ByteProgress, Transfer},
    upload::{
        ByteSource, ChunkStream, Part, PartTarget, Session, UploadError, UploadedPart,
    },
};
use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::{BTreeMap, HashMap},
    io,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Semaphore;

pub const MIB: u64 = 1024 * 1024;

const FRAME: u64 = 64 * 1024;

/// Source of `len` zero bytes, nothing is allocated up front
#[derive(Debug)]
pub struct ZeroSource {
    len: u64,
    extension: Option<String>,
}

impl ZeroSource {
    pub const fn new(len: u64) -> Self {
        Self {
            len,
            extension: None,
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.to_string());
        self
    }
}

impl ByteSource for ZeroSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn extension(&self) -> Option<String> {
        self.extension.clone()
    }

    async fn slice(&self, offset: u64, length: u64) -> io::Result<ChunkStream> {
        if offset + length > self.len {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "out of range"));
        }

        let frames = (0..length.div_ceil(FRAME)).map(move |i| {
            let size = FRAME.min(length - i * FRAME);
            Ok::<_, io::Error>(Bytes::from(vec![0u8; usize::try_from(size).unwrap()]))
        });

        Ok(stream::iter(frames).boxed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize(String),
    Targets(u16),
    Upload(u16),
    Finalize(Vec<UploadedPart>, Option<String>),
}

/// Coordinator double, parts succeed unless configured otherwise
#[derive(Debug, Default)]
pub struct MockTransfer {
    calls: Mutex<Vec<Call>>,
    received: Mutex<BTreeMap<u16, u64>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    // number of targets returned, defaults to the requested count
    targets: Option<u16>,
    // parts that fail, with the number of failures before succeeding
    failures: Mutex<HashMap<u16, usize>>,
    delays: HashMap<u16, Duration>,
    default_delay: Duration,
    gate: Option<Semaphore>,
    fail_finalize: bool,
}

impl MockTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(mut self, targets: u16) -> Self {
        self.targets = Some(targets);
        self
    }

    /// `part` fails `times` times before succeeding
    pub fn failing(self, part: u16, times: usize) -> Self {
        self.failures.lock().unwrap().insert(part, times);
        self
    }

    pub fn with_delay(mut self, part: u16, delay: Duration) -> Self {
        self.delays.insert(part, delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Part transfers block until [`release`](Self::release) is called
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<u16> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Upload(number) => Some(number),
                _ => None,
            })
            .collect()
    }

    pub fn finalized(&self) -> Vec<(Vec<UploadedPart>, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Finalize(parts, token) => Some((parts, token)),
                _ => None,
            })
            .collect()
    }

    /// bytes received per part number
    pub fn received(&self) -> BTreeMap<u16, u64> {
        self.received.lock().unwrap().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn should_fail(&self, number: u16) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&number) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

// keeps the in-flight counter right when a transfer is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Transfer for MockTransfer {
    async fn initialize(&self, name: &str) -> Result<Session, UploadError> {
        self.record(Call::Initialize(name.to_string()));

        Ok(Session {
            file_id: "upload-1".to_string(),
            file_key: format!("uploads/{name}"),
        })
    }

    async fn request_part_targets(
        &self,
        _session: &Session,
        parts: u16,
    ) -> Result<Vec<PartTarget>, UploadError> {
        self.record(Call::Targets(parts));

        Ok((1..=self.targets.unwrap_or(parts))
            .map(|number| PartTarget {
                number,
                url: format!("https://bucket.s3/part-{number}"),
            })
            .collect())
    }

    async fn upload_part(
        &self,
        _session: &Session,
        part: &Part,
        payload: ChunkStream,
        on_progress: ByteProgress,
    ) -> Result<UploadedPart, UploadError> {
        let number = part.get_number();
        self.record(Call::Upload(number));

        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);

        let mut loaded = 0;
        let mut payload = payload;
        while let Some(chunk) = payload
            .try_next()
            .await
            .map_err(|e| UploadError::part(number, e))?
        {
            loaded += chunk.len() as u64;
            on_progress(loaded);
        }

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let delay = self.delays.get(&number).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail(number) {
            return Err(UploadError::part(number, "HTTP Status Code: 500"));
        }

        self.received.lock().unwrap().insert(number, loaded);

        Ok(UploadedPart::new(number, format!("etag-{number}")))
    }

    async fn finalize(
        &self,
        _session: &Session,
        parts: &[UploadedPart],
        session_token: Option<&SecretString>,
    ) -> Result<(), UploadError> {
        self.record(Call::Finalize(
            parts.to_vec(),
            session_token.map(|token| token.expose_secret().to_string()),
        ));

        if self.fail_finalize {
            return Err(UploadError::Finalization("HTTP Status Code: 500".to_string()));
        }

        Ok(())
    }
}
