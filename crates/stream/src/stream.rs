//! Stream assembly and lifecycle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use weir_core::{Error, Input, Output, Pipeline, Processor, Resources};
use weir_metrics::SharedMetrics;
use weir_pipeline::ProcessorStage;

use crate::StreamConfig;

/// Factory producing a pipeline stage bound to a stream id.
pub type PipelineConstructor =
    Arc<dyn Fn(&str) -> Result<Box<dyn Pipeline>, Error> + Send + Sync>;

/// Factory producing a processor bound to a stream id.
pub type ProcessorConstructor =
    Arc<dyn Fn(&str) -> Result<Arc<dyn Processor>, Error> + Send + Sync>;

/// Constructor hooks injected into every stream a manager builds.
///
/// Hooked input pipelines run before the buffer, hooked processors after
/// the configured chain, hooked output pipelines last.
#[derive(Clone, Default)]
pub struct Hooks {
    pub input_pipelines: Vec<PipelineConstructor>,
    pub processors: Vec<ProcessorConstructor>,
    pub output_pipelines: Vec<PipelineConstructor>,
}

/// One running dataflow, wired end-to-end at construction.
pub struct Stream {
    id: String,
    config: StreamConfig,

    input: Box<dyn Input>,
    stages: Vec<Box<dyn Pipeline>>,
    output: Box<dyn Output>,

    created_at: Instant,
    running: AtomicBool,
}

impl Stream {
    /// Build and start a stream: construct every component, then wire the
    /// transaction channels input → stages → output.
    pub fn new(
        id: &str,
        config: StreamConfig,
        hooks: &Hooks,
        resources: &Resources,
        metrics: &SharedMetrics,
    ) -> Result<Self, Error> {
        let mut input = weir_input::build(&config.input, metrics)?;

        let mut stages: Vec<Box<dyn Pipeline>> = Vec::new();
        for constructor in &hooks.input_pipelines {
            stages.push(constructor(id)?);
        }
        if let Some(buffer_conf) = &config.buffer {
            stages.push(Box::new(weir_buffer::build(buffer_conf, metrics)));
        }
        for processor_conf in &config.pipeline.processors {
            let processor = weir_processor::build(processor_conf, resources, metrics)?;
            stages.push(Box::new(ProcessorStage::new(processor, metrics)));
        }
        for constructor in &hooks.processors {
            stages.push(Box::new(ProcessorStage::new(constructor(id)?, metrics)));
        }
        for constructor in &hooks.output_pipelines {
            stages.push(constructor(id)?);
        }

        let mut output = weir_output::build(&config.output, metrics)?;

        let mut transactions = input.transactions()?;
        for stage in stages.iter_mut() {
            stage.start_receiving(transactions)?;
            transactions = stage.transactions()?;
        }
        output.start_receiving(transactions)?;

        info!(stream = id, stages = stages.len(), "stream running");
        Ok(Self {
            id: id.to_owned(),
            config,
            input,
            stages,
            output,
            created_at: Instant::now(),
            running: AtomicBool::new(true),
        })
    }

    /// The configuration this stream was built from.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Time since construction.
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// False once a stop has begun.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop gracefully: close the input and wait for each component's
    /// close in wiring order, each getting an equal share of `timeout`.
    /// Any overrun escalates to forced shutdown and reports
    /// [`Error::Timeout`].
    pub async fn stop(self, timeout: Duration) -> Result<(), Error> {
        self.running.store(false, Ordering::Relaxed);

        let component_count = self.stages.len() as u32 + 2;
        let share = timeout / component_count;

        self.input.close_async();
        if self.input.wait_for_close(share).await.is_err() {
            return self.force_stop().await;
        }
        for stage in &self.stages {
            if stage.wait_for_close(share).await.is_err() {
                return self.force_stop().await;
            }
        }
        if self.output.wait_for_close(share).await.is_err() {
            return self.force_stop().await;
        }

        info!(stream = self.id, "stream stopped");
        Ok(())
    }

    /// Cancel every component and give the loops a moment to unwind.
    async fn force_stop(&self) -> Result<(), Error> {
        warn!(stream = self.id, "graceful stop overran, forcing shutdown");
        self.input.close_async();
        for stage in &self.stages {
            stage.close_async();
        }
        self.output.close_async();

        let grace = Duration::from_millis(100);
        let _ = self.input.wait_for_close(grace).await;
        for stage in &self.stages {
            let _ = stage.wait_for_close(grace).await;
        }
        let _ = self.output.wait_for_close(grace).await;

        Err(Error::Timeout)
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;
