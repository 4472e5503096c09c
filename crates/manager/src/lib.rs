//! Weir - Stream manager
//!
//! A process-wide registry of named streams with create / read / update /
//! delete / stop operations and the HTTP control surface that drives
//! them. All map mutations serialize on one mutex; the blocking shutdown
//! work of a removed stream always runs with the mutex released, so a
//! slow stop never stalls unrelated operations.

mod api;
mod error;

pub use api::router;
pub use error::ManagerError;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info};

use weir_core::{Cache, Resources};
use weir_metrics::SharedMetrics;
use weir_stream::{Hooks, PipelineConstructor, ProcessorConstructor, Stream, StreamConfig};

/// Default deadline for control-plane shutdown work.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(5);

/// Point-in-time view of one registered stream.
#[derive(Debug, Clone)]
pub struct StreamStatus {
    /// False once the stream began stopping.
    pub active: bool,
    /// Time since the stream was built.
    pub uptime: Duration,
    /// The configuration the stream runs.
    pub config: StreamConfig,
}

/// Registry of named streams.
pub struct StreamManager {
    streams: Mutex<HashMap<String, Stream>>,
    closed: AtomicBool,
    hooks: Hooks,
    resources: Arc<Resources>,
    metrics: SharedMetrics,
    api_timeout: Duration,
}

impl StreamManager {
    /// A manager with no hooks, empty resources and the default API
    /// timeout.
    pub fn new(metrics: SharedMetrics) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            hooks: Hooks::default(),
            resources: Arc::new(Resources::new()),
            metrics,
            api_timeout: DEFAULT_API_TIMEOUT,
        }
    }

    /// Override the control-plane shutdown deadline.
    pub fn with_api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = timeout;
        self
    }

    /// Use an existing resource registry instead of an empty one.
    pub fn with_resources(mut self, resources: Arc<Resources>) -> Self {
        self.resources = resources;
        self
    }

    /// Register a named cache resource.
    pub fn add_cache(self, name: impl Into<String>, cache: Arc<dyn Cache>) -> Self {
        self.resources.add_cache(name, cache);
        self
    }

    /// Add a pipeline stage constructed before the buffer of every
    /// stream.
    pub fn add_input_pipeline(mut self, constructor: PipelineConstructor) -> Self {
        self.hooks.input_pipelines.push(constructor);
        self
    }

    /// Add a processor appended to every stream's configured chain.
    pub fn add_processor(mut self, constructor: ProcessorConstructor) -> Self {
        self.hooks.processors.push(constructor);
        self
    }

    /// Add a pipeline stage constructed after the processors of every
    /// stream.
    pub fn add_output_pipeline(mut self, constructor: PipelineConstructor) -> Self {
        self.hooks.output_pipelines.push(constructor);
        self
    }

    /// The deadline bulk operations share.
    pub fn api_timeout(&self) -> Duration {
        self.api_timeout
    }

    /// Build and register a new stream under `id`.
    pub fn create(&self, id: &str, config: StreamConfig) -> Result<(), ManagerError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(ManagerError::Closed);
        }

        let mut streams = self.streams.lock();
        if streams.contains_key(id) {
            return Err(ManagerError::StreamExists);
        }
        let stream = Stream::new(id, config, &self.hooks, &self.resources, &self.metrics)?;
        streams.insert(id.to_owned(), stream);
        info!(stream = id, "stream created");
        Ok(())
    }

    /// The status of the stream registered under `id`.
    pub fn read(&self, id: &str) -> Result<StreamStatus, ManagerError> {
        let streams = self.streams.lock();
        let stream = streams.get(id).ok_or(ManagerError::StreamDoesNotExist)?;
        Ok(StreamStatus {
            active: stream.is_running(),
            uptime: stream.uptime(),
            config: stream.config().clone(),
        })
    }

    /// Ids and liveness of every registered stream.
    pub fn list(&self) -> HashMap<String, (bool, Duration)> {
        self.streams
            .lock()
            .iter()
            .map(|(id, stream)| (id.clone(), (stream.is_running(), stream.uptime())))
            .collect()
    }

    /// Replace the stream under `id`: stop the old one within `timeout`,
    /// then build the new one.
    pub async fn update(
        &self,
        id: &str,
        config: StreamConfig,
        timeout: Duration,
    ) -> Result<(), ManagerError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(ManagerError::Closed);
        }
        self.delete(id, timeout).await?;
        self.create(id, config)
    }

    /// Remove and stop the stream under `id` within `timeout`.
    pub async fn delete(&self, id: &str, timeout: Duration) -> Result<(), ManagerError> {
        let stream = self
            .streams
            .lock()
            .remove(id)
            .ok_or(ManagerError::StreamDoesNotExist)?;

        // Shutdown happens with the registry unlocked.
        stream.stop(timeout).await?;
        info!(stream = id, "stream deleted");
        Ok(())
    }

    /// Stop every stream in parallel and close the manager. Each stream
    /// gets the full `timeout`; any overrun is reported as timeout after
    /// all stops have settled.
    pub async fn stop(&self, timeout: Duration) -> Result<(), ManagerError> {
        self.closed.store(true, Ordering::Relaxed);

        let streams: Vec<(String, Stream)> = self.streams.lock().drain().collect();
        let stops = streams.into_iter().map(|(id, stream)| async move {
            let result = stream.stop(timeout).await;
            if let Err(err) = &result {
                error!(stream = id, error = %err, "failed to stop stream");
            }
            result
        });

        let results = futures::future::join_all(stops).await;
        if results.iter().any(|r| r.is_err()) {
            return Err(weir_core::Error::Timeout.into());
        }
        info!("stream manager stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
