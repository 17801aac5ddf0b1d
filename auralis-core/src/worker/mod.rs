//! Background fingerprint extraction worker pool (C7): a priority queue of
//! jobs drained by N daemon OS threads, gated by a counting semaphore and
//! coordinated through an atomic stop flag rather than async cancellation.
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const BACKOFF_ON_ERROR: Duration = Duration::from_millis(100);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// `min(4, available_parallelism)`, with no autoscaling beyond this at
/// construction time.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(4)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionJob {
    pub track_id: String,
    pub filepath: String,
    pub priority: i32,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl Eq for ExtractionJob {}

impl PartialOrd for ExtractionJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Higher `priority` sorts first; `BinaryHeap` is a max-heap so this is a
/// direct comparison, not inverted.
impl Ord for ExtractionJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
}

/// Minimal surface the surrounding system's music library must expose for
/// the worker pool to claim and report on work.
pub trait Repository: Send + Sync {
    fn claim_next_unfingerprinted_track(&self) -> Option<ExtractionJob>;
    fn mark_fingerprint_status(&self, track_id: &str, status: TrackStatus, message: Option<&str>);
    fn store_fingerprint(&self, track_id: &str, fingerprint_json: &str);
}

/// Extracts and persists a fingerprint for one track. Implementors decode
/// the file at `filepath`, run analysis, and call back into the repository
/// via `store_fingerprint`.
pub trait Extractor: Send + Sync {
    fn extract_and_store(&self, track_id: &str, filepath: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent<'a> {
    pub stage: &'a str,
    pub track_id: &'a str,
    pub status: TerminalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Complete,
    Error,
}

#[derive(Debug, Default)]
pub struct PoolStats {
    queued: AtomicI64,
    processing: AtomicI64,
    completed: AtomicI64,
    failed: AtomicI64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub queued: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl PoolStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queued: self.queued.load(AtomicOrdering::Relaxed).max(0) as u64,
            processing: self.processing.load(AtomicOrdering::Relaxed).max(0) as u64,
            completed: self.completed.load(AtomicOrdering::Relaxed).max(0) as u64,
            failed: self.failed.load(AtomicOrdering::Relaxed).max(0) as u64,
        }
    }
}

struct Semaphore {
    permits: Mutex<usize>,
    condvar: Condvar,
}

impl Semaphore {
    fn new(permits: usize) -> Self {
        Self { permits: Mutex::new(permits), condvar: Condvar::new() }
    }

    fn acquire(&self) {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.condvar.wait(permits).unwrap();
        }
        *permits -= 1;
    }

    fn release(&self) {
        let mut permits = self.permits.lock().unwrap();
        *permits += 1;
        self.condvar.notify_one();
    }
}

type ProgressCallback = dyn Fn(ProgressEvent) + Send + Sync;

/// Background extraction worker pool. Owns no jobs itself beyond the queue
/// fed by the repository's atomic claim; `queued` in [`StatsSnapshot`] only
/// reflects jobs this process is aware of, since the authoritative queue is
/// the repository's `pending` rows.
pub struct WorkerPool {
    stop_flag: Arc<AtomicBool>,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
            semaphore: Arc::new(Semaphore::new(worker_count)),
            stats: Arc::new(PoolStats::default()),
            handles: Mutex::new(Vec::new()),
            worker_count,
        }
    }

    /// Spawns `worker_count` daemon threads. Idempotent: a second call
    /// while already running is a no-op.
    pub fn initialize<R, E>(&self, repository: Arc<R>, extractor: Arc<E>, on_progress: Option<Arc<ProgressCallback>>)
    where
        R: Repository + 'static,
        E: Extractor + 'static,
    {
        let mut handles = self.handles.lock().unwrap();
        if !handles.is_empty() {
            return;
        }
        self.stop_flag.store(false, AtomicOrdering::SeqCst);

        for _ in 0..self.worker_count {
            let repository = Arc::clone(&repository);
            let extractor = Arc::clone(&extractor);
            let stop_flag = Arc::clone(&self.stop_flag);
            let semaphore = Arc::clone(&self.semaphore);
            let stats = Arc::clone(&self.stats);
            let on_progress = on_progress.clone();

            let handle = std::thread::spawn(move || {
                worker_loop(repository.as_ref(), extractor.as_ref(), &stop_flag, &semaphore, &stats, on_progress.as_deref());
            });
            handles.push(handle);
        }
    }

    /// Sets the stop flag and joins every worker, waiting up to `timeout`.
    /// Returns `true` if all workers joined in time. Idempotent: calling
    /// again after a successful stop is a harmless no-op returning `true`.
    pub fn stop(&self, timeout: Duration) -> bool {
        self.stop_flag.store(true, AtomicOrdering::SeqCst);
        self.semaphore.condvar.notify_all();

        let mut handles = self.handles.lock().unwrap();
        let deadline = Instant::now() + timeout;
        let mut all_joined = true;

        handles.retain(|_| true);
        let pending: Vec<JoinHandle<()>> = handles.drain(..).collect();
        drop(handles);

        for handle in pending {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() && !handle.is_finished() {
                all_joined = false;
                continue;
            }
            // std::thread has no join-with-timeout; a finished check plus a
            // short spin is the closest approximation without pulling in an
            // async runtime purely for this.
            let mut waited = Duration::ZERO;
            while !handle.is_finished() && waited < remaining {
                std::thread::sleep(Duration::from_millis(10));
                waited += Duration::from_millis(10);
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                all_joined = false;
            }
        }

        all_joined
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

fn worker_loop<R: Repository + ?Sized, E: Extractor + ?Sized>(
    repository: &R,
    extractor: &E,
    stop_flag: &AtomicBool,
    semaphore: &Semaphore,
    stats: &PoolStats,
    on_progress: Option<&ProgressCallback>,
) {
    while !stop_flag.load(AtomicOrdering::SeqCst) {
        let job = match repository.claim_next_unfingerprinted_track() {
            Some(job) => job,
            None => break,
        };

        stats.processing.fetch_add(1, AtomicOrdering::Relaxed);
        semaphore.acquire();

        let result = extractor.extract_and_store(&job.track_id, &job.filepath);

        match result {
            Ok(()) => {
                stats.completed.fetch_add(1, AtomicOrdering::Relaxed);
                repository.mark_fingerprint_status(&job.track_id, TrackStatus::Complete, None);
                report_progress(on_progress, ProgressEvent { stage: "extraction", track_id: &job.track_id, status: TerminalStatus::Complete });
            }
            Err(message) => {
                stats.failed.fetch_add(1, AtomicOrdering::Relaxed);
                repository.mark_fingerprint_status(&job.track_id, TrackStatus::Failed, Some(&message));
                report_progress(on_progress, ProgressEvent { stage: "extraction", track_id: &job.track_id, status: TerminalStatus::Error });
                std::thread::sleep(BACKOFF_ON_ERROR);
            }
        }

        stats.processing.fetch_sub(1, AtomicOrdering::Relaxed);
        semaphore.release();
    }
}

fn report_progress(on_progress: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(callback) = on_progress {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(event)));
        if result.is_err() {
            tracing::warn!(track_id = event.track_id, "progress callback panicked; swallowed");
        }
    }
}

/// An in-memory priority queue usable as a `Repository` backend in tests
/// or for a single-process library embedding without an external database.
pub struct InMemoryQueue {
    heap: Mutex<BinaryHeap<ExtractionJob>>,
    statuses: Mutex<std::collections::HashMap<String, (TrackStatus, Option<String>)>>,
    fingerprints: Mutex<std::collections::HashMap<String, String>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self { heap: Mutex::new(BinaryHeap::new()), statuses: Mutex::new(std::collections::HashMap::new()), fingerprints: Mutex::new(std::collections::HashMap::new()) }
    }

    pub fn push(&self, job: ExtractionJob) {
        self.statuses.lock().unwrap().insert(job.track_id.clone(), (TrackStatus::Pending, None));
        self.heap.lock().unwrap().push(job);
    }

    pub fn status_of(&self, track_id: &str) -> Option<TrackStatus> {
        self.statuses.lock().unwrap().get(track_id).map(|(status, _)| *status)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for InMemoryQueue {
    fn claim_next_unfingerprinted_track(&self) -> Option<ExtractionJob> {
        let mut heap = self.heap.lock().unwrap();
        let job = heap.pop()?;
        self.statuses.lock().unwrap().insert(job.track_id.clone(), (TrackStatus::InProgress, None));
        Some(job)
    }

    fn mark_fingerprint_status(&self, track_id: &str, status: TrackStatus, message: Option<&str>) {
        self.statuses.lock().unwrap().insert(track_id.to_string(), (status, message.map(str::to_string)));
    }

    fn store_fingerprint(&self, track_id: &str, fingerprint_json: &str) {
        self.fingerprints.lock().unwrap().insert(track_id.to_string(), fingerprint_json.to_string());
    }
}
