//! Upload session: initialize, plan, schedule every part, finalize.
//!
//! All bookkeeping (pending queue, in-flight set, progress cache) is owned by
//! a single control task. Part transfers run as separate tasks and report
//! back through a channel, so state only changes in reaction to those
//! signals and never from two places at once.

use crate::{
    coordinator::{ByteProgress, Transfer},
    upload::{
        error::UploadError,
        part::{Part, PartRange, PartTarget, Session, UploadedPart},
        planner::plan,
        progress::{ByteEvent, ProgressSnapshot, ProgressTracker},
        scheduler::{Dispatch, Scheduler},
        source::ByteSource,
        spec::UploadSpec,
    },
};
use std::{collections::HashMap, fmt, future::Future, sync::Arc};
use tokio::{
    sync::{mpsc, watch},
    task::{AbortHandle, JoinHandle},
    time::{Duration, sleep},
};
use tokio_util::sync::CancellationToken;

/// Lifecycle of an upload session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    Initializing,
    Planning,
    Scheduling,
    Finalizing,
    Completed,
    Failed,
    Aborted,
}

impl State {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Planning => "planning",
            Self::Scheduling => "scheduling",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        write!(f, "{state}")
    }
}

/// Everything a caller can observe about a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Progress(ProgressSnapshot),
    Failed(UploadError),
    Completed,
    Aborted,
}

pub type ProgressObserver = Box<dyn Fn(ProgressSnapshot) + Send + Sync>;
pub type ErrorObserver = Box<dyn Fn(&UploadError) + Send + Sync>;

/// Final outcome of a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub state: State,
    /// set once the coordinator opened the upload
    pub session: Option<Session>,
    /// confirmed parts, ordered by part number
    pub uploaded: Vec<UploadedPart>,
    /// parts that never got confirmed, including a failed one
    pub pending: Vec<u16>,
    pub progress: ProgressSnapshot,
    /// `false` when finalization failed, it is logged but not an error
    pub finalized: bool,
    pub error: Option<UploadError>,
}

// messages from part transfers to the control task
enum Signal {
    Progress {
        number: u16,
        loaded: u64,
    },
    Settled {
        number: u16,
        result: Result<UploadedPart, UploadError>,
    },
}

// why the control task stopped early
enum Halt {
    Aborted,
    Failed(UploadError),
}

impl From<UploadError> for Halt {
    fn from(error: UploadError) -> Self {
        Self::Failed(error)
    }
}

/// One upload of one object. Register observers, then [`start`](Self::start).
pub struct UploadSession<T, S> {
    transfer: Arc<T>,
    spec: UploadSpec<S>,
    on_progress: Option<ProgressObserver>,
    on_error: Option<ErrorObserver>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: Option<mpsc::UnboundedReceiver<Event>>,
    cancel: CancellationToken,
    state: watch::Sender<State>,
}

impl<T: Transfer, S: ByteSource> UploadSession<T, S> {
    #[must_use]
    pub fn new(transfer: Arc<T>, spec: UploadSpec<S>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(State::Idle);

        Self {
            transfer,
            spec,
            on_progress: None,
            on_error: None,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
            state,
        }
    }

    /// Called on every byte-level event; replaces any previous observer
    pub fn on_progress<F>(&mut self, observer: F) -> &mut Self
    where
        F: Fn(ProgressSnapshot) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(observer));
        self
    }

    /// Called once when the session fails; replaces any previous observer
    pub fn on_error<F>(&mut self, observer: F) -> &mut Self
    where
        F: Fn(&UploadError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(observer));
        self
    }

    /// Takes the event receiver. Can only be called once.
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.events_rx.take()
    }

    /// Abort before starting, the session ends `Aborted` without any request
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Spawn the control task and return immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime
    #[must_use]
    pub fn start(self) -> UploadHandle {
        let Self {
            transfer,
            spec,
            on_progress,
            on_error,
            events_tx,
            events_rx: _,
            cancel,
            state,
        } = self;

        state.send_replace(State::Initializing);
        let receiver = state.subscribe();

        let driver = Driver {
            transfer,
            spec,
            on_progress,
            on_error,
            events: events_tx,
            cancel: cancel.clone(),
            state,
        };

        UploadHandle {
            cancel,
            state: receiver,
            task: tokio::spawn(driver.run()),
        }
    }
}

/// Handle of a started session
#[derive(Debug)]
pub struct UploadHandle {
    cancel: CancellationToken,
    state: watch::Receiver<State>,
    task: JoinHandle<Report>,
}

impl UploadHandle {
    /// Cancel in-flight transfers and stop scheduling; never finalizes.
    /// Already uploaded parts are not rolled back remotely.
    pub fn abort(&self) {
        if !self.cancel.is_cancelled() {
            log::info!("Aborting upload");
        }
        self.cancel.cancel();
    }

    #[must_use]
    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to reach a terminal state
    ///
    /// # Errors
    ///
    /// Will return `Err` if the control task panicked
    pub async fn wait(self) -> Result<Report, UploadError> {
        self.task
            .await
            .map_err(|e| UploadError::Task(e.to_string()))
    }
}

struct Driver<T, S> {
    transfer: Arc<T>,
    spec: UploadSpec<S>,
    on_progress: Option<ProgressObserver>,
    on_error: Option<ErrorObserver>,
    events: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
    state: watch::Sender<State>,
}

impl<T: Transfer, S: ByteSource> Driver<T, S> {
    async fn run(self) -> Report {
        let mut report = Report::default();
        let mut tracker = ProgressTracker::new(self.spec.source().len());

        if self.cancel.is_cancelled() {
            return self.aborted(report);
        }

        let (session, parts) = match self.prepare().await {
            Ok(prepared) => prepared,
            Err(halt) => return self.halt(report, halt),
        };

        self.set_state(State::Scheduling);

        report.session = Some(session.clone());
        let session = Arc::new(session);
        let mut scheduler = Scheduler::new(parts, self.spec.max_concurrency());
        let outcome = self.schedule(&session, &mut scheduler, &mut tracker).await;

        report.uploaded = scheduler.uploaded().to_vec();
        report.uploaded.sort_by_key(|part| part.number);
        report.pending = scheduler.pending_numbers();
        report.progress = tracker.snapshot();

        if let Err(halt) = outcome {
            return self.halt(report, halt);
        }

        if self.cancel.is_cancelled() {
            return self.aborted(report);
        }

        self.set_state(State::Finalizing);

        let finalize =
            self.transfer
                .finalize(&session, &report.uploaded, self.spec.session_token());

        match self.until_aborted(finalize).await {
            Err(halt) => return self.halt(report, halt),
            Ok(Err(e)) => log::error!("Failed to finalize multipart upload: {e}"),
            Ok(Ok(())) => report.finalized = true,
        }

        log::info!(
            "Upload finished, fileId: {}, parts: {}",
            session.file_id,
            report.uploaded.len()
        );

        self.set_state(State::Completed);
        self.emit(Event::Completed);

        report.state = State::Completed;
        report
    }

    // initialize, plan and pair every part with its upload target
    async fn prepare(&self) -> Result<(Session, Vec<Part>), Halt> {
        let count = self.spec.validate()?;
        let name = self.spec.upload_name();

        log::debug!(
            "Starting multi part upload:
        name: {name}
        size: {}
        parts: {count}
        part size: {}
        max concurrency: {}",
            self.spec.source().len(),
            self.spec.chunk_size(),
            self.spec.max_concurrency()
        );

        let session = self.until_aborted(self.transfer.initialize(&name)).await??;

        log::debug!("fileId: {}, fileKey: {}", session.file_id, session.file_key);

        self.set_state(State::Planning);

        let ranges = plan(self.spec.source().len(), self.spec.chunk_size())?;

        let targets = self
            .until_aborted(self.transfer.request_part_targets(&session, count))
            .await??;

        let parts = assign_targets(ranges, targets)?;

        Ok((session, parts))
    }

    async fn schedule(
        &self,
        session: &Arc<Session>,
        scheduler: &mut Scheduler<AbortHandle>,
        tracker: &mut ProgressTracker,
    ) -> Result<(), Halt> {
        let (signals_tx, mut signals_rx) = mpsc::unbounded_channel::<Signal>();

        log::info!("Max concurrent requests: {}", self.spec.max_concurrency());

        loop {
            // fill every free slot before waiting
            loop {
                match scheduler.next() {
                    Dispatch::Start(part) => {
                        let handle = self.spawn_transfer(session, &part, &signals_tx);
                        scheduler.activate(part, handle);
                    }
                    Dispatch::Saturated | Dispatch::Waiting => break,
                    Dispatch::Finished => return Ok(()),
                }
            }

            log::debug!("Running tasks: {}", scheduler.active_len());

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    for handle in scheduler.halt() {
                        handle.abort();
                    }
                    scheduler.discard_pending();
                    return Err(Halt::Aborted);
                }

                signal = signals_rx.recv() => match signal {
                    Some(Signal::Progress { number, loaded }) => {
                        if scheduler.is_active(number) {
                            let index = number.saturating_sub(1);
                            let snapshot = tracker.record(index, ByteEvent::Progress(loaded));
                            self.emit(Event::Progress(snapshot));
                        }
                    }

                    Some(Signal::Settled { number, result: Ok(uploaded) }) => {
                        if scheduler.complete(uploaded) {
                            let index = number.saturating_sub(1);
                            let snapshot = tracker.record(index, ByteEvent::Uploaded);
                            self.emit(Event::Progress(snapshot));
                        }
                    }

                    Some(Signal::Settled { number, result: Err(e) }) => {
                        scheduler.fail(number);
                        for handle in scheduler.halt() {
                            handle.abort();
                        }
                        return Err(Halt::Failed(e));
                    }

                    None => {
                        return Err(Halt::Failed(UploadError::Task(
                            "transfer channel closed".to_string(),
                        )));
                    }
                }
            }
        }
    }

    fn spawn_transfer(
        &self,
        session: &Arc<Session>,
        part: &Part,
        signals: &mpsc::UnboundedSender<Signal>,
    ) -> AbortHandle {
        let transfer = Arc::clone(&self.transfer);
        let source = Arc::clone(self.spec.source());
        let session = Arc::clone(session);
        let signals = signals.clone();
        let part = part.clone();
        let retries = self.spec.retries();

        log::info!("Task push part: {}", part.get_number());

        tokio::spawn(async move {
            let result = upload_part(
                transfer.as_ref(),
                source.as_ref(),
                &session,
                &part,
                retries,
                &signals,
            )
            .await;

            let _ = signals.send(Signal::Settled {
                number: part.get_number(),
                result,
            });
        })
        .abort_handle()
    }

    async fn until_aborted<F: Future>(&self, future: F) -> Result<F::Output, Halt> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Halt::Aborted),
            output = future => Ok(output),
        }
    }

    fn set_state(&self, state: State) {
        log::debug!("state: {state}");
        self.state.send_replace(state);
    }

    fn emit(&self, event: Event) {
        match &event {
            Event::Progress(snapshot) => {
                if let Some(observer) = &self.on_progress {
                    observer(*snapshot);
                }
            }
            Event::Failed(error) => {
                if let Some(observer) = &self.on_error {
                    observer(error);
                }
            }
            Event::Completed | Event::Aborted => {}
        }

        // nobody listening is fine
        let _ = self.events.send(event);
    }

    fn halt(&self, report: Report, halt: Halt) -> Report {
        match halt {
            Halt::Aborted => self.aborted(report),
            Halt::Failed(error) => self.failed(report, error),
        }
    }

    fn failed(&self, mut report: Report, error: UploadError) -> Report {
        log::error!("Upload failed: {error}");

        self.set_state(State::Failed);
        self.emit(Event::Failed(error.clone()));

        report.state = State::Failed;
        report.error = Some(error);
        report
    }

    fn aborted(&self, mut report: Report) -> Report {
        log::warn!("Upload aborted");

        self.set_state(State::Aborted);
        self.emit(Event::Aborted);

        report.state = State::Aborted;
        report
    }
}

// pair every planned range with the target issued for its part number
fn assign_targets(
    ranges: Vec<PartRange>,
    targets: Vec<PartTarget>,
) -> Result<Vec<Part>, UploadError> {
    if targets.len() != ranges.len() {
        return Err(UploadError::TargetAcquisition(format!(
            "requested {} upload targets, got {}",
            ranges.len(),
            targets.len()
        )));
    }

    let mut urls: HashMap<u16, String> = targets
        .into_iter()
        .map(|target| (target.number, target.url))
        .collect();

    ranges
        .into_iter()
        .map(|range| {
            urls.remove(&range.number)
                .map(|url| Part::new(range, url))
                .ok_or_else(|| {
                    UploadError::TargetAcquisition(format!(
                        "no upload target for part {}",
                        range.number
                    ))
                })
        })
        .collect()
}

// retry with exponential backoff, one attempt when `retries` is 1
async fn upload_part<T: Transfer, S: ByteSource>(
    transfer: &T,
    source: &S,
    session: &Session,
    part: &Part,
    retries: u32,
    signals: &mpsc::UnboundedSender<Signal>,
) -> Result<UploadedPart, UploadError> {
    let number = part.get_number();

    for attempt in 1..=retries {
        let backoff_time = 2u64.saturating_pow(attempt - 1);
        if attempt > 1 {
            log::warn!("Error uploading part: {number}, retrying in {backoff_time} seconds");

            sleep(Duration::from_secs(backoff_time)).await;
        }

        match try_upload_part(transfer, source, session, part, signals).await {
            Ok(uploaded) => {
                log::info!("Uploaded part: {}, etag: {}", number, uploaded.etag);

                return Ok(uploaded);
            }

            Err(e) => {
                log::error!("Error uploading part: {number}, attempt {attempt}/{retries} failed: {e}");

                if attempt == retries {
                    return Err(e);
                }
            }
        }
    }

    Err(UploadError::part(number, "no upload attempt was made"))
}

async fn try_upload_part<T: Transfer, S: ByteSource>(
    transfer: &T,
    source: &S,
    session: &Session,
    part: &Part,
    signals: &mpsc::UnboundedSender<Signal>,
) -> Result<UploadedPart, UploadError> {
    let number = part.get_number();

    let payload = source
        .slice(part.get_seek(), part.get_chunk())
        .await
        .map_err(|e| UploadError::Source(format!("part {number}: {e}")))?;

    let progress = signals.clone();
    let on_progress: ByteProgress = Arc::new(move |loaded| {
        let _ = progress.send(Signal::Progress { number, loaded });
    });

    let uploaded = transfer
        .upload_part(session, part, payload, on_progress)
        .await?;

    if uploaded.number != number || uploaded.etag.is_empty() {
        return Err(UploadError::part(number, "part was not confirmed by the backend"));
    }

    Ok(uploaded)
}
