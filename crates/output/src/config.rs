//! Output configuration

use serde::{Deserialize, Serialize};

/// Output selection for a stream. Broker variants nest child outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputConfig {
    /// Write each part as a line to standard output.
    Stdout,

    /// Acknowledge and discard everything.
    Drop,

    /// Append each part as a line to a file.
    File(FileOutputConfig),

    /// Write line-delimited frames over a TCP connection.
    Tcp(TcpOutputConfig),

    /// Broadcast to every child, acknowledging once all accepted.
    FanOut { outputs: Vec<OutputConfig> },

    /// Rotate transactions across children.
    RoundRobin { outputs: Vec<OutputConfig> },
}

/// File output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutputConfig {
    /// Path appended to; created if absent.
    pub path: String,
}

/// TCP output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpOutputConfig {
    /// Remote address, e.g. `10.0.0.5:4196`.
    pub addr: String,

    /// Credential line written after each (re)connect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_nested_broker() {
        let conf: OutputConfig = serde_yaml::from_str(
            "type: fan_out\noutputs:\n  - type: stdout\n  - type: file\n    path: out.log",
        )
        .unwrap();
        assert_eq!(
            conf,
            OutputConfig::FanOut {
                outputs: vec![
                    OutputConfig::Stdout,
                    OutputConfig::File(FileOutputConfig {
                        path: "out.log".into()
                    }),
                ],
            }
        );
    }

    #[test]
    fn test_tcp_token_survives_round_trip() {
        let conf = OutputConfig::Tcp(TcpOutputConfig {
            addr: "10.0.0.5:4196".into(),
            auth_token: Some("hunter2".into()),
        });
        let encoded = serde_yaml::to_string(&conf).unwrap();
        let decoded: OutputConfig = serde_yaml::from_str(&encoded).unwrap();
        assert_eq!(decoded, conf);
    }
}
