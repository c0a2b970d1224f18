//! Dump-to-shards extraction
//!
//! One run reads a provider dump line by line, normalizes each record and
//! writes the resulting [`SmallProduct`](pantry_common::SmallProduct)s into
//! one shard per requested language. The run returns the manifest fragment
//! for the shards it produced.

mod progress;

pub use progress::{Progress, ProgressObserver, TracingProgress};

use crate::line_stream::{LineStream, DEFAULT_CHUNK_SIZE};
use crate::normalize::{DecodeError, RecordNormalizer};
use crate::writer::{ChunkedWriter, HashingWriter, ShardFile, ShardSink, WriterError};
use flate2::read::MultiGzDecoder;
use pantry_common::{Datasource, DestinationError, JsonFile, Language, LanguagePackage};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Extracted records between two progress snapshots
pub const DEFAULT_PROGRESS_EVERY: u64 = 10_000;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Destination(#[from] DestinationError),

    #[error("Failed to read source: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Writer(#[from] WriterError),

    #[error("Normalizer invariant violated: {0}")]
    Invariant(DecodeError),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub processed: u64,
    pub extracted: u64,
    pub skipped: u64,
    /// Records written per language shard
    pub written: BTreeMap<Language, u64>,
}

impl ExtractionStats {
    fn progress(&self) -> Progress {
        Progress {
            processed: self.processed,
            extracted: self.extracted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    /// One package per requested language, in [`Language`] order
    pub packages: Vec<LanguagePackage>,
    pub stats: ExtractionStats,
}

/// Sequential extraction driven by the normalizer `N`.
pub struct ExtractionPipeline<N> {
    progress_every: u64,
    chunk_size: usize,
    _normalizer: PhantomData<fn() -> N>,
}

impl<N: RecordNormalizer> Default for ExtractionPipeline<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: RecordNormalizer> ExtractionPipeline<N> {
    pub fn new() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            _normalizer: PhantomData,
        }
    }

    /// Emit progress every `n` extracted records; `0` disables progress
    pub fn with_progress_every(mut self, n: u64) -> Self {
        self.progress_every = n;
        self
    }

    /// Read size of the underlying [`LineStream`]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Extract `source` into one file per language in `target_dir`
    pub fn run(
        &self,
        source: impl AsRef<Path>,
        target_dir: impl AsRef<Path>,
        datasource: Datasource,
        languages: &[Language],
        observer: &impl ProgressObserver,
    ) -> Result<ExtractionReport> {
        self.run_with(source.as_ref(), target_dir.as_ref(), datasource, languages, observer, |path| {
            HashingWriter::new(path)
        })
    }

    /// Like [`run`](Self::run), splitting shards into parts of at most
    /// `max_part_size` bytes
    pub fn run_chunked(
        &self,
        source: impl AsRef<Path>,
        target_dir: impl AsRef<Path>,
        datasource: Datasource,
        languages: &[Language],
        observer: &impl ProgressObserver,
        max_part_size: u64,
    ) -> Result<ExtractionReport> {
        self.run_with(source.as_ref(), target_dir.as_ref(), datasource, languages, observer, |path| {
            ChunkedWriter::new(path, max_part_size)
        })
    }

    fn run_with<S: ShardSink>(
        &self,
        source: &Path,
        target_dir: &Path,
        datasource: Datasource,
        languages: &[Language],
        observer: &impl ProgressObserver,
        make_sink: impl Fn(PathBuf) -> S,
    ) -> Result<ExtractionReport> {
        DestinationError::check_directory(target_dir)?;
        let mut stream = LineStream::with_options(open_source(source)?, "\n", self.chunk_size)?;

        info!(
            source = %source.display(),
            target = %target_dir.display(),
            %datasource,
            "Starting extraction"
        );
        let started = Instant::now();

        let languages: BTreeSet<Language> = languages.iter().copied().collect();
        let mut sinks: Vec<(Language, S)> = languages
            .into_iter()
            .map(|language| (language, make_sink(target_dir.join(datasource.shard_file_name(language)))))
            .collect();

        let stats = self.extract(&mut stream, &mut sinks, datasource, observer)?;

        let mut packages = Vec::with_capacity(sinks.len());
        for (language, sink) in sinks {
            let files = sink.into_files()?;
            packages.push(LanguagePackage {
                language,
                files: files.into_iter().map(|file| json_file(file, datasource)).collect(),
            });
        }

        info!(
            %datasource,
            processed = stats.processed,
            extracted = stats.extracted,
            skipped = stats.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extraction complete"
        );
        Ok(ExtractionReport { packages, stats })
    }

    /// Drain `stream` into `sinks`. Sinks are left open.
    pub fn extract<R: Read, S: ShardSink>(
        &self,
        stream: &mut LineStream<R>,
        sinks: &mut [(Language, S)],
        datasource: Datasource,
        observer: &impl ProgressObserver,
    ) -> Result<ExtractionStats> {
        let mut stats = ExtractionStats::default();

        while let Some(line) = stream.next_line()? {
            stats.processed += 1;

            let record = match N::decode(&line) {
                Ok(record) => record,
                Err(e) if e.is_fatal() => return Err(ExtractError::Invariant(e)),
                Err(e) => {
                    trace!(line = stats.processed, error = %e, "Skipping record");
                    stats.skipped += 1;
                    continue;
                },
            };

            if record.quantity().is_none() && record.serving_size().is_none() {
                trace!(line = stats.processed, "Skipping record without quantity or serving");
                stats.skipped += 1;
                continue;
            }
            stats.extracted += 1;

            for (language, sink) in sinks.iter_mut() {
                if let Some(product) = record.to_small_product(*language, datasource) {
                    sink.write_record(&serde_json::to_vec(&product)?)?;
                    *stats.written.entry(*language).or_default() += 1;
                }
            }

            if self.progress_every > 0 && stats.extracted % self.progress_every == 0 {
                observer.on_progress(stats.progress());
            }
        }

        debug!(?stats, "Source drained");
        Ok(stats)
    }
}

/// Open a dump, decompressing `.gz` files on the fly
fn open_source(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz")) {
        debug!(path = %path.display(), "Reading gzip-compressed source");
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

fn json_file(file: ShardFile, source: Datasource) -> JsonFile {
    let name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    JsonFile {
        name,
        source,
        sha256: file.sha256,
    }
}
