//! Part compression processor

use std::io::Write;

use bytes::Bytes;
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};

use weir_core::{Error, Processor};
use weir_message::{DataflowError, Message, Response};
use weir_metrics::{Counter, SharedMetrics};

/// Compression algorithms applied per part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressAlgorithm {
    Gzip,
    Zlib,
    Deflate,
}

fn default_level() -> u32 {
    6
}

/// Settings for the compress processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressConfig {
    /// Algorithm applied to each selected part.
    pub algorithm: CompressAlgorithm,

    /// Compression level, 0-9.
    #[serde(default = "default_level")]
    pub level: u32,

    /// Part indices to compress; negative indices count from the end.
    /// Empty selects every part.
    #[serde(default)]
    pub parts: Vec<isize>,
}

/// Replaces selected part payloads with their compressed encoding. Part
/// count and order are preserved; messages without parts are dropped.
pub struct Compress {
    conf: CompressConfig,

    count: Counter,
    skipped: Counter,
    sent: Counter,
}

impl Compress {
    /// Build a compressor, validating the level.
    pub fn new(conf: &CompressConfig, metrics: &SharedMetrics) -> Result<Self, Error> {
        if conf.level > 9 {
            return Err(Error::config(format!(
                "compression level out of range: {}",
                conf.level
            )));
        }
        Ok(Self {
            conf: conf.clone(),
            count: metrics.counter("processor.compress.count"),
            skipped: metrics.counter("processor.compress.skipped"),
            sent: metrics.counter("processor.compress.sent"),
        })
    }

    fn encode(&self, payload: &[u8]) -> std::io::Result<Vec<u8>> {
        let level = Compression::new(self.conf.level);
        match self.conf.algorithm {
            CompressAlgorithm::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(payload)?;
                encoder.finish()
            }
            CompressAlgorithm::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(payload)?;
                encoder.finish()
            }
            CompressAlgorithm::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), level);
                encoder.write_all(payload)?;
                encoder.finish()
            }
        }
    }
}

impl Processor for Compress {
    fn process(&self, mut msg: Message) -> (Vec<Message>, Option<Response>) {
        self.count.incr(1);

        if msg.is_empty() {
            self.skipped.incr(1);
            return (Vec::new(), Some(Response::Ack));
        }

        let targets: Vec<usize> = if self.conf.parts.is_empty() {
            (0..msg.len()).collect()
        } else {
            match self
                .conf
                .parts
                .iter()
                .map(|&i| msg.resolve_index(i))
                .collect::<Option<Vec<usize>>>()
            {
                Some(resolved) => resolved,
                None => {
                    self.skipped.incr(1);
                    return (
                        Vec::new(),
                        Some(Response::Nack(DataflowError::processor(
                            "part index out of bounds",
                        ))),
                    );
                }
            }
        };

        for index in targets {
            let part = &mut msg.parts_mut()[index];
            match self.encode(part.data().as_ref()) {
                Ok(encoded) => part.set_data(Bytes::from(encoded)),
                Err(err) => {
                    self.skipped.incr(1);
                    return (
                        Vec::new(),
                        Some(Response::Nack(DataflowError::processor(format!(
                            "compression failed: {err}"
                        )))),
                    );
                }
            }
        }

        self.sent.incr(1);
        (vec![msg], None)
    }
}

#[cfg(test)]
#[path = "compress_test.rs"]
mod compress_test;
