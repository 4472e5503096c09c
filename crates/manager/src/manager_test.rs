use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use weir_core::Processor;
use weir_input::{FileInputConfig, InputConfig, TcpInputConfig};
use weir_message::{Message, Response};
use weir_output::OutputConfig;
use weir_pipeline::ProcessorStage;
use weir_processor::ProcessorConfig;
use weir_stream::{PipelineConfig, StreamConfig};

use super::{ManagerError, StreamManager};

fn harmless_conf() -> StreamConfig {
    StreamConfig {
        input: InputConfig::Tcp(TcpInputConfig {
            addr: "127.0.0.1:0".into(),
        }),
        buffer: None,
        pipeline: PipelineConfig::default(),
        output: OutputConfig::Drop,
    }
}

fn file_conf(path: &str) -> StreamConfig {
    StreamConfig {
        input: InputConfig::File(FileInputConfig { path: path.into() }),
        ..harmless_conf()
    }
}

#[tokio::test]
async fn test_basic_operations() {
    let manager = StreamManager::new(weir_metrics::noop());

    assert_eq!(
        manager
            .update("foo", harmless_conf(), Duration::from_secs(1))
            .await,
        Err(ManagerError::StreamDoesNotExist)
    );
    assert!(matches!(
        manager.read("foo"),
        Err(ManagerError::StreamDoesNotExist)
    ));

    manager.create("foo", harmless_conf()).unwrap();
    assert_eq!(
        manager.create("foo", harmless_conf()),
        Err(ManagerError::StreamExists)
    );

    let status = manager.read("foo").unwrap();
    assert!(status.active);
    assert_eq!(status.config, harmless_conf());

    let mut updated = harmless_conf();
    updated.pipeline.processors = vec![ProcessorConfig::Noop];
    manager
        .update("foo", updated.clone(), Duration::from_secs(1))
        .await
        .unwrap();

    let status = manager.read("foo").unwrap();
    assert!(status.active);
    assert_eq!(status.config, updated);

    manager.delete("foo", Duration::from_secs(1)).await.unwrap();
    assert_eq!(
        manager.delete("foo", Duration::from_secs(1)).await,
        Err(ManagerError::StreamDoesNotExist)
    );

    manager.stop(Duration::from_secs(1)).await.unwrap();
    assert_eq!(
        manager.create("foo", harmless_conf()),
        Err(ManagerError::Closed)
    );
}

#[tokio::test]
async fn test_stop_closes_running_streams() {
    let manager = StreamManager::new(weir_metrics::noop());
    manager.create("a", harmless_conf()).unwrap();
    manager.create("b", harmless_conf()).unwrap();

    manager.stop(Duration::from_secs(1)).await.unwrap();
    assert!(manager.list().is_empty());
}

#[tokio::test]
async fn test_parallel_create_of_same_id() {
    let manager = Arc::new(StreamManager::new(weir_metrics::noop()));

    let left = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.create("dup", harmless_conf()) })
    };
    let right = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.create("dup", harmless_conf()) })
    };

    let results = [left.await.unwrap(), right.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(ManagerError::StreamExists)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 1);

    manager.stop(Duration::from_secs(1)).await.unwrap();
}

/// Identity processor that reports which hook position saw the message.
struct TaggingProcessor {
    tag: &'static str,
    seen: mpsc::UnboundedSender<&'static str>,
}

impl Processor for TaggingProcessor {
    fn process(&self, msg: Message) -> (Vec<Message>, Option<Response>) {
        let _ = self.seen.send(self.tag);
        (vec![msg], None)
    }
}

#[tokio::test]
async fn test_hooked_pipelines_and_processors_see_traffic() {
    let mut input_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(input_file, "one message").unwrap();
    input_file.flush().unwrap();

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let tags = [
        "input_pipe_1",
        "input_pipe_2",
        "proc_1",
        "proc_2",
        "output_pipe_1",
        "output_pipe_2",
    ];

    fn stage_ctor(
        tag: &'static str,
        seen: mpsc::UnboundedSender<&'static str>,
    ) -> weir_stream::PipelineConstructor {
        Arc::new(move |id| {
            assert_eq!(id, "foo");
            let processor = Arc::new(TaggingProcessor {
                tag,
                seen: seen.clone(),
            });
            Ok(Box::new(ProcessorStage::new(processor, &weir_metrics::noop())))
        })
    }
    fn proc_ctor(
        tag: &'static str,
        seen: mpsc::UnboundedSender<&'static str>,
    ) -> weir_stream::ProcessorConstructor {
        Arc::new(move |id| {
            assert_eq!(id, "foo");
            Ok(Arc::new(TaggingProcessor {
                tag,
                seen: seen.clone(),
            }))
        })
    }

    let manager = StreamManager::new(weir_metrics::noop())
        .add_input_pipeline(stage_ctor(tags[0], seen_tx.clone()))
        .add_input_pipeline(stage_ctor(tags[1], seen_tx.clone()))
        .add_processor(proc_ctor(tags[2], seen_tx.clone()))
        .add_processor(proc_ctor(tags[3], seen_tx.clone()))
        .add_output_pipeline(stage_ctor(tags[4], seen_tx.clone()))
        .add_output_pipeline(stage_ctor(tags[5], seen_tx));

    manager
        .create("foo", file_conf(&input_file.path().display().to_string()))
        .unwrap();

    for expected in tags {
        let seen = tokio::time::timeout(Duration::from_secs(1), seen_rx.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {expected}"))
            .unwrap();
        assert_eq!(seen, expected);
    }

    manager.stop(Duration::from_secs(1)).await.unwrap();
}
