//! Batch processing: request in, stored images out.
//!
//! For each image reference in a [`BatchRequest`], in input order:
//!
//! ```text
//! fetch (store or data: URI) → decode → resolve parameters → transform → encode
//! ```
//!
//! Then, only once every image has rendered:
//!
//! ```text
//! store each result under {key_prefix}{filename} → record filenames for the upload
//! ```
//!
//! ## Failure Policy
//!
//! A batch is all-or-nothing. A render failure on image k stops the batch
//! before anything is stored. Before a key is first written, whatever it
//! held is captured. A storage or metadata failure then puts every touched
//! key back: captured objects are re-stored, keys that were empty are
//! deleted. A metadata failure also deletes the (possibly partial) record.
//! Cleanup failures are logged, never raised.
//!
//! ## Scheduling
//!
//! [`ProcessingMode::Sequential`] renders images strictly in order and stops
//! at the first failure. [`ProcessingMode::Parallel`] renders them on the
//! rayon pool; results are collected by index, so output order and the
//! reported error (lowest failing index) match the sequential run.
//!
//! An optional [`Deadline`] is checked before each image starts.

use crate::config::{AppConfig, ProcessingMode};
use crate::imaging::{
    BackendError, ImageBackend, ProcessedResult, RenderConfig, RustBackend, render_image,
};
use crate::naming::{public_url, storage_key};
use crate::request::{BatchRequest, BatchResponse};
use crate::resolve::{ResolverDefaults, resolve};
use crate::storage::{MetadataStore, ObjectStore, StoreError, resolve_source};
use rayon::prelude::*;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),
    #[error("Source image unavailable ({reference}): {message}")]
    SourceUnavailable {
        reference: String,
        message: String,
        /// The store itself failed, as opposed to a bad or missing reference.
        store_failure: bool,
    },
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to persist results: {0}")]
    Persistence(String),
    #[error("Deadline exceeded before image {index} of {total}")]
    Cancelled { index: usize, total: usize },
    #[error("Image processing failed: {0}")]
    Imaging(String),
}

impl PipelineError {
    /// HTTP-style status for the boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Validation(_) | PipelineError::UnsupportedFormat(_) => 400,
            PipelineError::SourceUnavailable { store_failure, .. } => {
                if *store_failure {
                    500
                } else {
                    400
                }
            }
            PipelineError::Persistence(_)
            | PipelineError::Cancelled { .. }
            | PipelineError::Imaging(_) => 500,
        }
    }

    /// Stable machine-readable name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::SourceUnavailable { .. } => "source_unavailable",
            PipelineError::UnsupportedFormat(_) => "unsupported_format",
            PipelineError::Persistence(_) => "persistence",
            PipelineError::Cancelled { .. } => "cancelled",
            PipelineError::Imaging(_) => "imaging",
        }
    }

    fn from_store(reference: &str, err: StoreError) -> Self {
        PipelineError::SourceUnavailable {
            reference: reference.to_string(),
            store_failure: !err.is_caller_error(),
            message: err.to_string(),
        }
    }

    fn from_backend(reference: &str, err: BackendError) -> Self {
        match err {
            BackendError::UnsupportedFormat(what) => PipelineError::UnsupportedFormat(what),
            BackendError::Decode(message) => PipelineError::SourceUnavailable {
                reference: reference.to_string(),
                message,
                store_failure: false,
            },
            other => PipelineError::Imaging(other.to_string()),
        }
    }
}

/// Point in time after which no new image is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: instant }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    pub resolver: ResolverDefaults,
    pub render: RenderConfig,
    pub key_prefix: String,
    pub public_url_base: String,
    pub mode: ProcessingMode,
    pub timeout: Option<Duration>,
}

impl ProcessConfig {
    /// Build a ProcessConfig from AppConfig values.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            resolver: config.defaults.resolver_defaults(),
            render: RenderConfig {
                quality: config.encoding.quality(),
                collision: config.naming.collision,
            },
            key_prefix: config.storage.key_prefix.clone(),
            public_url_base: config.storage.public_url_base.clone(),
            mode: config.processing.mode,
            timeout: config.processing.timeout(),
        }
    }

    /// Deadline from the configured timeout, measured from now.
    pub fn deadline(&self) -> Option<Deadline> {
        self.timeout.map(Deadline::after)
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// The external pieces a batch talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub backend: &'a dyn ImageBackend,
    pub store: &'a dyn ObjectStore,
    pub metadata: &'a dyn MetadataStore,
}

/// Progress reported while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    BatchStarted {
        upload_id: String,
        image_count: usize,
    },
    ImageRendered {
        index: usize,
        reference: String,
        filename: String,
        width: u32,
        height: u32,
        bytes: usize,
    },
    ImageStored {
        index: usize,
        key: String,
    },
    RolledBack {
        restored: usize,
        removed: usize,
    },
}

/// One result after it has been written to the object store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
    pub result: ProcessedResult,
}

/// Everything a successful batch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub response: BatchResponse,
    pub images: Vec<StoredImage>,
}

fn send(events: Option<&Sender<ProcessEvent>>, event: ProcessEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching.
        let _ = tx.send(event);
    }
}

/// Fetch, decode, resolve and render image `index`.
fn render_one(
    collab: &Collaborators<'_>,
    request: &BatchRequest,
    index: usize,
    config: &ProcessConfig,
    deadline: Option<Deadline>,
) -> Result<ProcessedResult, PipelineError> {
    let total = request.image_name.len();
    if deadline.is_some_and(|d| d.expired()) {
        return Err(PipelineError::Cancelled {
            index: index + 1,
            total,
        });
    }

    let reference = request.image_name[index].as_str();
    let bytes = resolve_source(collab.store, reference)
        .map_err(|e| PipelineError::from_store(reference, e))?;
    if bytes.is_empty() {
        return Err(PipelineError::SourceUnavailable {
            reference: reference.to_string(),
            message: "empty content".to_string(),
            store_failure: false,
        });
    }

    let asset = collab
        .backend
        .decode(&bytes)
        .map_err(|e| PipelineError::from_backend(reference, e))?;
    let params = resolve(
        &request.image_parameters,
        index,
        reference,
        asset.source_format,
        &config.resolver,
    );
    debug!(index, ?params, "resolved parameters");

    render_image(collab.backend, asset, &params, &config.render)
        .map_err(|e| PipelineError::from_backend(reference, e))
}

/// Render every image of a batch, in input order, without storing anything.
pub fn render_batch(
    collab: &Collaborators<'_>,
    request: &BatchRequest,
    config: &ProcessConfig,
    deadline: Option<Deadline>,
    events: Option<&Sender<ProcessEvent>>,
) -> Result<Vec<ProcessedResult>, PipelineError> {
    let count = request.image_name.len();
    let report = |index: usize, result: &ProcessedResult| {
        info!(
            index,
            filename = %result.filename,
            width = result.width,
            height = result.height,
            "rendered image"
        );
        send(
            events,
            ProcessEvent::ImageRendered {
                index,
                reference: request.image_name[index].clone(),
                filename: result.filename.clone(),
                width: result.width,
                height: result.height,
                bytes: result.bytes.len(),
            },
        );
    };

    match config.mode {
        ProcessingMode::Sequential => {
            let mut results = Vec::with_capacity(count);
            for index in 0..count {
                let result = render_one(collab, request, index, config, deadline)?;
                report(index, &result);
                results.push(result);
            }
            Ok(results)
        }
        ProcessingMode::Parallel => {
            let rendered: Vec<(usize, Result<ProcessedResult, PipelineError>)> = (0..count)
                .into_par_iter()
                .map(|index| (index, render_one(collab, request, index, config, deadline)))
                .collect();
            rendered
                .into_iter()
                .map(|(index, result)| {
                    let result = result?;
                    report(index, &result);
                    Ok(result)
                })
                .collect()
        }
    }
}

/// What a key held before the batch first wrote to it.
enum PriorObject {
    Absent,
    Present(Vec<u8>),
}

/// Keys touched by a batch, with their pre-batch contents, in write order.
#[derive(Default)]
struct WriteJournal {
    entries: Vec<(String, &'static str, PriorObject)>,
}

impl WriteJournal {
    /// Capture `key` before its first write. Later writes to the same key
    /// keep the original capture.
    fn capture(
        &mut self,
        store: &dyn ObjectStore,
        key: &str,
        content_type: &'static str,
    ) -> Result<(), StoreError> {
        if self.entries.iter().any(|(k, _, _)| k == key) {
            return Ok(());
        }
        let prior = match store.fetch(key) {
            Ok(bytes) => PriorObject::Present(bytes),
            Err(StoreError::NotFound(_)) => PriorObject::Absent,
            Err(e) => return Err(e),
        };
        self.entries.push((key.to_string(), content_type, prior));
        Ok(())
    }

    /// Put every touched key back, newest first. Failures are logged and skipped.
    ///
    /// Restored objects are written with the content type of the batch's
    /// write to that key.
    fn roll_back(&self, store: &dyn ObjectStore, events: Option<&Sender<ProcessEvent>>) {
        let (mut restored, mut removed) = (0, 0);
        for (key, content_type, prior) in self.entries.iter().rev() {
            let outcome = match prior {
                PriorObject::Present(bytes) => store.store(key, bytes, content_type),
                PriorObject::Absent => store.delete(key),
            };
            match (outcome, prior) {
                (Ok(()), PriorObject::Present(_)) => restored += 1,
                (Ok(()), PriorObject::Absent) => removed += 1,
                (Err(e), _) => warn!(key = %key, error = %e, "rollback: failed to revert object"),
            }
        }
        send(events, ProcessEvent::RolledBack { restored, removed });
    }
}

/// Process a batch with the pure Rust backend.
pub fn process_batch(
    store: &dyn ObjectStore,
    metadata: &dyn MetadataStore,
    request: &BatchRequest,
    config: &ProcessConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BatchOutcome, PipelineError> {
    let backend = RustBackend::new();
    let collab = Collaborators {
        backend: &backend,
        store,
        metadata,
    };
    process_batch_with_backend(&collab, request, config, config.deadline(), events)
}

/// Process a batch using specific collaborators (allows testing with mocks).
pub fn process_batch_with_backend(
    collab: &Collaborators<'_>,
    request: &BatchRequest,
    config: &ProcessConfig,
    deadline: Option<Deadline>,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BatchOutcome, PipelineError> {
    let upload_id = request
        .upload_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PipelineError::Validation("Missing uploadId".to_string()))?;
    if request.image_name.is_empty() {
        return Err(PipelineError::Validation("No images provided".to_string()));
    }

    let events = events.as_ref();
    info!(
        upload_id,
        images = request.image_name.len(),
        mode = ?config.mode,
        "processing batch"
    );
    send(
        events,
        ProcessEvent::BatchStarted {
            upload_id: upload_id.to_string(),
            image_count: request.image_name.len(),
        },
    );

    let results = render_batch(collab, request, config, deadline, events)?;

    let mut journal = WriteJournal::default();
    let mut images = Vec::with_capacity(results.len());
    for (index, result) in results.into_iter().enumerate() {
        let key = storage_key(&config.key_prefix, &result.filename);
        let written = journal
            .capture(collab.store, &key, result.content_type)
            .and_then(|()| collab.store.store(&key, &result.bytes, result.content_type));
        if let Err(e) = written {
            warn!(key = %key, error = %e, "store failed, rolling back batch");
            journal.roll_back(collab.store, events);
            return Err(PipelineError::Persistence(e.to_string()));
        }
        send(
            events,
            ProcessEvent::ImageStored {
                index,
                key: key.clone(),
            },
        );
        images.push(StoredImage {
            url: public_url(&config.public_url_base, &key),
            key,
            result,
        });
    }

    let filenames: Vec<String> = images.iter().map(|i| i.result.filename.clone()).collect();
    if let Err(e) = collab.metadata.record_uploaded_files(upload_id, &filenames) {
        warn!(upload_id, error = %e, "metadata failed, rolling back batch");
        journal.roll_back(collab.store, events);
        if let Err(cleanup) = collab.metadata.delete_record(upload_id) {
            warn!(upload_id, error = %cleanup, "rollback: failed to delete record");
        }
        return Err(PipelineError::Persistence(e.to_string()));
    }

    info!(upload_id, stored = images.len(), "batch complete");
    Ok(BatchOutcome {
        response: BatchResponse {
            message: "Files uploaded successfully".to_string(),
            filenames,
            urls: images.iter().map(|i| i.url.clone()).collect(),
        },
        images,
    })
}
