//! Record codecs and shard log framing.
//!
//! A codec turns one [`Record`] into a payload and back. Framing is separate:
//! JSON payloads are stored one per line, binary payloads behind a two byte
//! big-endian length. Either stream may be gzip compressed.

pub mod binary;
pub mod frame;
pub mod json;

pub use binary::BinaryCodec;
pub use frame::{FrameReader, FrameWriter, Framing, MAX_FRAME_LEN};
pub use json::JsonCodec;

use crate::types::{Codec, Record};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary codec error: {0}")]
    Binary(#[from] bincode::Error),
}

/// Encodes and decodes single records, independent of framing.
pub trait RecordCodec: Send + Sync {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Record, CodecError>;
}

static JSON: JsonCodec = JsonCodec;
static BINARY: BinaryCodec = BinaryCodec;

impl Codec {
    pub fn record_codec(&self) -> &'static dyn RecordCodec {
        match self {
            Codec::Json => &JSON,
            Codec::Binary => &BINARY,
        }
    }

    pub fn framing(&self) -> Framing {
        match self {
            Codec::Json => Framing::Lines,
            Codec::Binary => Framing::LengthPrefixed,
        }
    }
}
