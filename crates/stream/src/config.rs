//! Stream configuration
//!
//! The `{input, buffer?, pipeline{processors[]}, output}` shape accepted
//! by the control plane in YAML or JSON. Stored configs round-trip
//! unchanged; configs returned over HTTP pass through [`StreamConfig::sanitised`]
//! first, which scrubs credential-bearing fields.

use serde::{Deserialize, Serialize};

use weir_buffer::BufferConfig;
use weir_core::Error;
use weir_input::InputConfig;
use weir_output::OutputConfig;
use weir_processor::ProcessorConfig;

/// Placeholder written over scrubbed credential values.
pub const SCRUBBED_PLACEHOLDER: &str = "!!!SECRET_SCRUBBED!!!";

/// Map keys treated as credentials by the sanitiser.
const SECRET_KEYS: [&str; 6] = [
    "password",
    "secret",
    "token",
    "auth_token",
    "api_key",
    "credentials",
];

/// One stream's full configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// The input driver.
    pub input: InputConfig,

    /// Optional buffer between input and processors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<BufferConfig>,

    /// Processor chain applied between buffer and output.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// The output driver, possibly a broker over several.
    pub output: OutputConfig,
}

/// The processor chain section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Processors applied in order, one stage each.
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
}

impl StreamConfig {
    /// The config as a value tree with credential fields replaced by
    /// [`SCRUBBED_PLACEHOLDER`], safe for external display.
    pub fn sanitised(&self) -> Result<serde_yaml::Value, Error> {
        let mut value = serde_yaml::to_value(self)
            .map_err(|err| Error::config(format!("serialising config: {err}")))?;
        scrub(&mut value);
        Ok(value)
    }
}

fn scrub(value: &mut serde_yaml::Value) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, entry) in map.iter_mut() {
                let is_secret = key
                    .as_str()
                    .is_some_and(|k| SECRET_KEYS.contains(&k));
                if is_secret {
                    *entry = serde_yaml::Value::String(SCRUBBED_PLACEHOLDER.to_owned());
                } else {
                    scrub(entry);
                }
            }
        }
        serde_yaml::Value::Sequence(entries) => {
            for entry in entries {
                scrub(entry);
            }
        }
        _ => {}
    }
}
