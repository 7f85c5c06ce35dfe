//! `gzip+base64` envelope the backend may wrap large mappings in.
//!
//! `GET /mapping/load` answers either with a plain snapshot or with
//! `{ "mapping": "<base64(gzip(json))>", "compression": "gzip+base64" }`.

use crate::models::mapping::MappingSnapshot;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use core::fmt;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::io::{Read, Write};

pub const GZIP_BASE64: &str = "gzip+base64";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedMapping {
    pub mapping: String,
    pub compression: String,
}

#[derive(Debug)]
pub enum EnvelopeError {
    UnsupportedCompression(String),
    Base64(base64::DecodeError),
    Gzip(std::io::Error),
    Json(serde_path_to_error::Error<serde_json::Error>),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeError::UnsupportedCompression(c) => write!(f, "unsupported mapping compression: {}", c),
            EnvelopeError::Base64(e) => write!(f, "invalid base64 payload: {}", e),
            EnvelopeError::Gzip(e) => write!(f, "gzip error: {}", e),
            EnvelopeError::Json(e) => write!(f, "invalid mapping json at {}: {}", e.path(), e.inner()),
        }
    }
}

impl Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EnvelopeError::UnsupportedCompression(_) => None,
            EnvelopeError::Base64(e) => Some(e),
            EnvelopeError::Gzip(e) => Some(e),
            EnvelopeError::Json(e) => Some(e),
        }
    }
}

/// Parse a snapshot from JSON, reporting the failing field path.
pub fn parse_snapshot(json: &str) -> Result<MappingSnapshot, EnvelopeError> {
    let de = &mut serde_json::Deserializer::from_str(json);
    serde_path_to_error::deserialize(de).map_err(EnvelopeError::Json)
}

pub fn encode_snapshot(snapshot: &MappingSnapshot) -> Result<CompressedMapping, EnvelopeError> {
    let json = serde_json::to_vec(snapshot)
        .map_err(|e| EnvelopeError::Gzip(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(EnvelopeError::Gzip)?;
    let gz = encoder.finish().map_err(EnvelopeError::Gzip)?;
    Ok(CompressedMapping {
        mapping: BASE64.encode(gz),
        compression: GZIP_BASE64.to_string(),
    })
}

pub fn decode_envelope(envelope: &CompressedMapping) -> Result<MappingSnapshot, EnvelopeError> {
    if envelope.compression != GZIP_BASE64 {
        return Err(EnvelopeError::UnsupportedCompression(envelope.compression.clone()));
    }
    let gz = BASE64.decode(envelope.mapping.trim()).map_err(EnvelopeError::Base64)?;
    let mut json = String::new();
    GzDecoder::new(gz.as_slice())
        .read_to_string(&mut json)
        .map_err(EnvelopeError::Gzip)?;
    parse_snapshot(&json)
}

/// Decode a `/mapping/load` body, unwrapping the envelope when present.
///
/// A body with a `compression` key is an envelope and must decode as one; its
/// `mapping` field errors carry their path like any other JSON error.
pub fn decode_load_body(body: &str) -> Result<MappingSnapshot, EnvelopeError> {
    #[derive(Deserialize)]
    struct Compressed {
        compression: Option<serde_json::Value>,
    }

    let compressed = serde_json::from_str::<Compressed>(body).is_ok_and(|c| c.compression.is_some());
    if !compressed {
        return parse_snapshot(body);
    }
    let de = &mut serde_json::Deserializer::from_str(body);
    let envelope: CompressedMapping = serde_path_to_error::deserialize(de).map_err(EnvelopeError::Json)?;
    decode_envelope(&envelope)
}
