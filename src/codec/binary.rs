//! Compact binary codec.
//!
//! bincode cannot skip fields, so records are packed into a positional
//! struct where every field is always present.

use super::{CodecError, RecordCodec};
use crate::types::{ImageSize, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

#[derive(Serialize, Deserialize)]
struct PackedRecord {
    hash: String,
    relative_path: String,
    size: u64,
    last_modified: u64,
    missing: bool,
    mime_type: Option<String>,
    fingerprint: Option<String>,
    attributes: BTreeMap<String, String>,
    image_size: Option<(u32, u32)>,
}

impl From<&Record> for PackedRecord {
    fn from(record: &Record) -> Self {
        PackedRecord {
            hash: record.hash.clone(),
            relative_path: record.relative_path.clone(),
            size: record.size,
            last_modified: record.last_modified,
            missing: record.missing,
            mime_type: record.mime_type.clone(),
            fingerprint: record.fingerprint.clone(),
            attributes: record.attributes.clone(),
            image_size: record.image_size.map(|d| (d.width, d.height)),
        }
    }
}

impl From<PackedRecord> for Record {
    fn from(packed: PackedRecord) -> Self {
        Record {
            hash: packed.hash,
            relative_path: packed.relative_path,
            size: packed.size,
            last_modified: packed.last_modified,
            missing: packed.missing,
            mime_type: packed.mime_type,
            fingerprint: packed.fingerprint,
            attributes: packed.attributes,
            image_size: packed
                .image_size
                .map(|(width, height)| ImageSize { width, height }),
        }
    }
}

impl RecordCodec for BinaryCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(&PackedRecord::from(record))?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record, CodecError> {
        let packed: PackedRecord = bincode::deserialize(bytes)?;
        Ok(packed.into())
    }
}
