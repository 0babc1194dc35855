//! Line-oriented JSON codec with short field keys.

use super::{CodecError, RecordCodec};
use crate::types::Record;

/// JSON codec. Empty optional fields are left out of the payload and fall
/// back to their defaults on decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
