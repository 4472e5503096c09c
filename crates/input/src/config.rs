//! Input configuration

use serde::{Deserialize, Serialize};

/// Input selection for a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputConfig {
    /// Accept line-delimited frames over TCP connections.
    Tcp(TcpInputConfig),

    /// Read a file line by line, closing at EOF.
    File(FileInputConfig),

    /// Read lines from standard input.
    Stdin,
}

/// TCP input settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpInputConfig {
    /// Listen address, e.g. `127.0.0.1:4196`.
    pub addr: String,
}

/// File input settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInputConfig {
    /// Path of the file to read.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tagged_variants() {
        let conf: InputConfig = serde_yaml::from_str("type: file\npath: in.log").unwrap();
        assert_eq!(
            conf,
            InputConfig::File(FileInputConfig {
                path: "in.log".into()
            })
        );

        let conf: InputConfig = serde_yaml::from_str("type: stdin").unwrap();
        assert_eq!(conf, InputConfig::Stdin);
    }
}
