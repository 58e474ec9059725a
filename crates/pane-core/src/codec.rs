//! Transport encoding of the [`RunnerConfig`] envelope.
//!
//! Plain form is the JSON document itself. Compressed form is the same JSON,
//! zlib-deflated and then base64 encoded so it survives command lines and env vars.
use std::io::{Read, Write};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use thiserror::Error;

use pane_model::RunnerConfig;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("invalid config document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize a config into its transport form.
pub fn encode(config: &RunnerConfig, compressed: bool) -> Result<Vec<u8>, CodecError> {
    let json = serde_json::to_vec(config)?;
    if !compressed {
        return Ok(json);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let deflated = encoder.finish()?;
    Ok(BASE64.encode(deflated).into_bytes())
}

/// Parse a transport payload back into a config.
///
/// Surrounding whitespace is ignored for the compressed form (payloads often arrive with a trailing newline).
pub fn decode(payload: &[u8], compressed: bool) -> Result<RunnerConfig, CodecError> {
    if !compressed {
        return Ok(serde_json::from_slice(payload)?);
    }

    let deflated = BASE64.decode(payload.trim_ascii())?;
    let mut json = Vec::new();
    ZlibDecoder::new(deflated.as_slice()).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> RunnerConfig {
        RunnerConfig::new("ZBAmDk1")
            .with_param("p1", json!("HELLO"))
            .with_param("p2", json!({"nested": [1, 2.5, null, true]}))
            .with_param("p3", json!(false))
            .with_env("ENV_VAR", "env value")
            .with_format("p4", "date")
    }

    #[test]
    fn roundtrip_plain_and_compressed() {
        let cfg = sample();
        for compressed in [false, true] {
            let bytes = encode(&cfg, compressed).unwrap();
            let back = decode(&bytes, compressed).unwrap();
            assert_eq!(back, cfg, "roundtrip failed (compressed={compressed})");
        }
    }

    #[test]
    fn roundtrip_empty_config() {
        let cfg = RunnerConfig::default();
        for compressed in [false, true] {
            let back = decode(&encode(&cfg, compressed).unwrap(), compressed).unwrap();
            assert_eq!(back, cfg);
        }
    }

    #[test]
    fn plain_form_is_json() {
        let bytes = encode(&sample(), false).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["script_id"], "ZBAmDk1");
        assert_eq!(doc["env"]["ENV_VAR"], "env value");
    }

    #[test]
    fn compressed_form_is_ascii_and_tolerates_newline() {
        let mut bytes = encode(&sample(), true).unwrap();
        assert!(bytes.is_ascii());

        bytes.push(b'\n');
        assert_eq!(decode(&bytes, true).unwrap(), sample());
    }

    #[test]
    fn malformed_payloads_fail() {
        assert!(matches!(
            decode(b"not base64 !!", true),
            Err(CodecError::Base64(_))
        ));
        assert!(matches!(
            decode(BASE64.encode(b"not zlib").as_bytes(), true),
            Err(CodecError::Compression(_))
        ));
        assert!(matches!(decode(b"{", false), Err(CodecError::Json(_))));
        assert!(matches!(
            decode(br#"{"config": {}}"#, false),
            Err(CodecError::Json(_))
        ));
    }
}
