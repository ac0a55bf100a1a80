use futures::Stream;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use super::decode::RecordDecoder;
use super::error::LdifError;
use super::reader::LdifReaderOptions;
use super::record::LdifRecord;
use super::tokenizer::{LdifTokenizer, UnparsedLdifRecord};
use crate::{LdifBerError, Result};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Post-processing applied by the workers to every decoded record.
///
/// Returning `Ok(None)` drops the record; it keeps its place in the ordering
/// but is never delivered.
pub trait RecordTranslator: Send + Sync {
    fn translate(&self, record: LdifRecord, first_line_number: u64) -> TranslateResult;
}

pub type TranslateResult = std::result::Result<Option<LdifRecord>, LdifError>;

impl<F> RecordTranslator for F
where
    F: Fn(LdifRecord, u64) -> TranslateResult + Send + Sync,
{
    fn translate(&self, record: LdifRecord, first_line_number: u64) -> TranslateResult {
        self(record, first_line_number)
    }
}

struct Submission {
    sequence: u64,
    record: UnparsedLdifRecord,
}

enum Outcome {
    Record(LdifRecord),
    Dropped,
    Failed(LdifBerError),
    EndOfInput,
    Aborted(LdifBerError),
}

struct Completion {
    sequence: u64,
    outcome: Outcome,
}

/// Async LDIF reader that decodes records on a worker pool.
///
/// Records are handed out in source order whatever the worker count. At most
/// `queue_capacity * 2` records are in flight between the reader task and
/// the consumer, so a slow record holds back the input instead of letting
/// the reorder buffer grow.
///
/// Must be created inside a tokio runtime. Dropping it stops the reader task
/// and lets the workers exit once their current record is done.
pub struct ParallelLdifReader {
    results: mpsc::Receiver<Completion>,
    reorder: BTreeMap<u64, Completion>,
    window: Arc<Semaphore>,
    next_sequence: u64,
    complete: bool,
    poll_interval: Duration,
    reader_task: JoinHandle<()>,
}

impl ParallelLdifReader {
    pub fn spawn<R>(input: R, options: LdifReaderOptions) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        Self::spawn_with_translator(input, options, None)
    }

    pub fn spawn_with_translator<R>(
        input: R,
        options: LdifReaderOptions,
        translator: Option<Arc<dyn RecordTranslator>>,
    ) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let queue_capacity = options.queue_capacity.max(1);
        let workers = options.parse_threads.max(1);

        let (submit_tx, submit_rx) = mpsc::channel::<Submission>(queue_capacity);
        let (result_tx, result_rx) = mpsc::channel::<Completion>(queue_capacity * 2);

        let window = Arc::new(Semaphore::new(queue_capacity * 2));
        let reader_task = tokio::spawn(read_lines(
            input,
            options.tokenizer(),
            submit_tx,
            window.clone(),
        ));

        let submissions = Arc::new(Mutex::new(submit_rx));
        for id in 0..workers {
            let submissions = submissions.clone();
            let results = result_tx.clone();
            let decoder = options.record_decoder();
            let translator = translator.clone();
            tokio::task::spawn_blocking(move || {
                run_worker(id, submissions, results, decoder, translator)
            });
        }
        debug!(
            "Started parallel LDIF reader: {} workers, queue capacity {}",
            workers, queue_capacity
        );

        Self {
            results: result_rx,
            reorder: BTreeMap::new(),
            window,
            next_sequence: 0,
            complete: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            reader_task,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// True once the end of input (or a terminal failure) has been delivered.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Next record in source order, `Ok(None)` at the end of input.
    ///
    /// A record that failed to decode comes back as `Err` in its own
    /// position and reading can go on. An I/O failure or an unrecoverable
    /// LDIF error is returned once, after which the reader is complete.
    pub async fn read_record(&mut self) -> Result<Option<LdifRecord>> {
        loop {
            if let Some(completion) = self.reorder.remove(&self.next_sequence) {
                self.next_sequence += 1;
                self.window.add_permits(1);
                match completion.outcome {
                    Outcome::Record(record) => return Ok(Some(record)),
                    Outcome::Dropped => continue,
                    Outcome::Failed(e) => return Err(e),
                    Outcome::EndOfInput => {
                        self.complete = true;
                        return Ok(None);
                    }
                    Outcome::Aborted(e) => {
                        self.complete = true;
                        return Err(e);
                    }
                }
            }

            if self.complete {
                return Ok(None);
            }

            match timeout(self.poll_interval, self.results.recv()).await {
                Ok(Some(completion)) => {
                    self.reorder.insert(completion.sequence, completion);
                }
                Ok(None) => {
                    self.complete = true;
                    return Err(LdifError::detached(
                        "LDIF parsing stopped before the end of input",
                        false,
                    )
                    .into());
                }
                Err(_) => {
                    trace!(
                        "Waiting for record {} ({} buffered out of order)",
                        self.next_sequence,
                        self.reorder.len()
                    );
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<LdifRecord>> {
        futures::stream::unfold(self, |mut reader| async move {
            match reader.read_record().await {
                Ok(Some(record)) => Some((Ok(record), reader)),
                Ok(None) => None,
                Err(e) => Some((Err(e), reader)),
            }
        })
    }
}

impl Drop for ParallelLdifReader {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn read_lines<R>(
    input: R,
    mut tokenizer: LdifTokenizer,
    submissions: mpsc::Sender<Submission>,
    window: Arc<Semaphore>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.split(b'\n');
    let mut sequence = 0u64;
    let mut pending_end = false;

    loop {
        let record = if pending_end {
            UnparsedLdifRecord::end_of_input()
        } else {
            match lines.next_segment().await {
                Ok(Some(line)) => match tokenizer.push_bytes(&line) {
                    Ok(Some(record)) => record,
                    Ok(None) => continue,
                    Err(e) => UnparsedLdifRecord::failed(e.into()),
                },
                Ok(None) => {
                    pending_end = true;
                    match tokenizer.finish() {
                        Some(record) => record,
                        None => continue,
                    }
                }
                Err(e) => {
                    warn!("Error reading LDIF input: {}", e);
                    UnparsedLdifRecord::failed(LdifBerError::Io(e))
                }
            }
        };

        // Returned by the consumer once this sequence has been delivered.
        match window.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return,
        }

        let terminal = record.is_end_of_input();
        if submissions.send(Submission { sequence, record }).await.is_err() {
            debug!("LDIF consumer went away, stopping reader");
            return;
        }
        sequence += 1;
        if terminal {
            trace!("Submitted {} records", sequence);
            return;
        }
    }
}

fn run_worker(
    id: usize,
    submissions: Arc<Mutex<mpsc::Receiver<Submission>>>,
    results: mpsc::Sender<Completion>,
    decoder: RecordDecoder,
    translator: Option<Arc<dyn RecordTranslator>>,
) {
    loop {
        let submission = match submissions.lock() {
            Ok(mut queue) => queue.blocking_recv(),
            Err(_) => return,
        };
        let Some(Submission { sequence, mut record }) = submission else {
            trace!("LDIF worker {} finished", id);
            return;
        };

        let outcome = if record.is_end_of_input() {
            match record.take_failure() {
                Some(e) => Outcome::Aborted(e),
                None => Outcome::EndOfInput,
            }
        } else {
            decode_one(&decoder, translator.as_deref(), &record)
        };

        if results.blocking_send(Completion { sequence, outcome }).is_err() {
            return;
        }
    }
}

fn decode_one(
    decoder: &RecordDecoder,
    translator: Option<&dyn RecordTranslator>,
    record: &UnparsedLdifRecord,
) -> Outcome {
    let decoded = match decoder.decode(record) {
        Ok(decoded) => decoded,
        Err(e) => return Outcome::Failed(e.into()),
    };
    let Some(translator) = translator else {
        return Outcome::Record(decoded);
    };
    match translator.translate(decoded, record.first_line_number()) {
        Ok(Some(translated)) => Outcome::Record(translated),
        Ok(None) => Outcome::Dropped,
        Err(e) => Outcome::Failed(e.into()),
    }
}
