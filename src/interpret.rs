//! Loose date interpretation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::{InterpretError, Timestamp};

/// An absolute instant as reported by a [`LooseDateInterpreter`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LooseInstant {
    /// Seconds since the Unix epoch.
    pub secs: i64,
    /// Sub-second component in microseconds.
    pub micros: i64,
}

impl LooseInstant {
    /// Converts to a normalized timestamp.
    ///
    /// Returns `None` if the instant is outside the representable range.
    pub fn to_timestamp(self) -> Option<Timestamp> {
        let nanos = self.micros.checked_mul(1_000)?;

        Timestamp::from_parts(self.secs, nanos)
    }
}

/// A natural-language date parser used as the last decoding resort.
///
/// Implementations receive a string already stripped of any envelope quoting
/// and return the absolute instant it designates. Closures with the matching
/// signature implement this trait, which makes mocking straightforward.
///
/// # Examples
///
/// ```
/// use flex_time::{InterpretError, LooseInstant, Resolver, Timestamp};
///
/// let resolver = Resolver::new(|input: &str| match input {
///     "launch day" => Ok(LooseInstant { secs: 1_438_883_568, micros: 0 }),
///     _ => Err(InterpretError::Unrecognized(input.to_owned())),
/// });
///
/// assert_eq!(
///     resolver.resolve_text(r#""launch day""#),
///     Ok(Some(Timestamp::new(1_438_883_568, 0)))
/// );
/// assert!(resolver.resolve_text("someday").is_err());
/// ```
pub trait LooseDateInterpreter {
    /// Interprets a date string.
    fn interpret(&self, input: &str) -> Result<LooseInstant, InterpretError>;
}

impl<F> LooseDateInterpreter for F
where
    F: Fn(&str) -> Result<LooseInstant, InterpretError>,
{
    fn interpret(&self, input: &str) -> Result<LooseInstant, InterpretError> {
        self(input)
    }
}

/// An interpreter wrapper that bounds the time spent waiting for an answer.
///
/// Each call runs the inner interpreter on a dedicated thread. If no answer
/// arrives within the timeout, [`InterpretError::TimedOut`] is returned; the
/// worker thread is then detached and its eventual result discarded.
///
/// Detached workers still count against a limit on live worker threads,
/// shared between clones ([`DEFAULT_MAX_WORKERS`](Self::DEFAULT_MAX_WORKERS)
/// unless set with [`with_max_workers`](Self::with_max_workers)). Calls made
/// while the limit is reached fail at once with
/// [`InterpretError::Unavailable`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use flex_time::{Approxidate, Deadline, Resolver};
///
/// let resolver = Resolver::new(Deadline::new(Approxidate, Duration::from_millis(250)));
/// assert!(resolver.resolve_text("2014/12/05 09:51:20").unwrap().is_some());
/// ```
#[derive(Debug)]
pub struct Deadline<I> {
    inner: Arc<I>,
    timeout: Duration,
    max_workers: usize,
    workers: Arc<AtomicUsize>,
}

impl<I> Deadline<I> {
    /// Default limit on live worker threads.
    pub const DEFAULT_MAX_WORKERS: usize = 16;

    /// Wraps an interpreter with a timeout.
    pub fn new(inner: I, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
            max_workers: Self::DEFAULT_MAX_WORKERS,
            workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets the limit on live worker threads.
    ///
    /// A limit of zero rejects every call.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Returns the timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the limit on live worker threads.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}

impl<I> Clone for Deadline<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
            max_workers: self.max_workers,
            workers: Arc::clone(&self.workers),
        }
    }
}

/// A reserved worker slot, released on drop.
struct WorkerSlot(Arc<AtomicUsize>);

impl WorkerSlot {
    fn acquire(workers: &Arc<AtomicUsize>, max_workers: usize) -> Option<Self> {
        workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < max_workers).then_some(live + 1)
            })
            .ok()
            .map(|_| Self(Arc::clone(workers)))
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<I> LooseDateInterpreter for Deadline<I>
where
    I: LooseDateInterpreter + Send + Sync + 'static,
{
    fn interpret(&self, input: &str) -> Result<LooseInstant, InterpretError> {
        let Some(slot) = WorkerSlot::acquire(&self.workers, self.max_workers) else {
            warn!(
                max_workers = self.max_workers,
                "too many loose date workers still running"
            );
            return Err(InterpretError::Unavailable);
        };

        let (tx, rx) = mpsc::sync_channel(1);
        let inner = Arc::clone(&self.inner);
        let owned = input.to_owned();

        thread::Builder::new()
            .name("loose-date".into())
            .spawn(move || {
                let tx = tx;
                // Released before the sender so that a disconnect implies a
                // free slot.
                let _slot = slot;
                // The receiver is gone if the deadline already expired.
                let _ = tx.send(inner.interpret(&owned));
            })
            .map_err(|_| InterpretError::Unavailable)?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    input_len = input.len(),
                    "loose date interpretation timed out"
                );
                Err(InterpretError::TimedOut(self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(InterpretError::Unavailable),
        }
    }
}
