//! MIME detection and content enrichment hooks.

use crate::error::Result;
use crate::types::{ImageSize, Record};
use std::collections::BTreeMap;
use std::path::Path;

/// Extra metadata a provider can attach to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub fingerprint: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub image_size: Option<ImageSize>,
}

impl Enrichment {
    pub fn apply(self, record: &mut Record) {
        record.fingerprint = self.fingerprint;
        record.attributes = self.attributes;
        record.image_size = self.image_size;
    }
}

pub trait MetadataProvider: Send + Sync {
    fn detect(&self, path: &Path) -> Option<String>;

    /// Perceptual fingerprint and attributes. Errors are treated as "no
    /// enrichment" by callers.
    fn enrich(&self, _path: &Path, _mime_type: Option<&str>) -> Result<Enrichment> {
        Ok(Enrichment::default())
    }
}

/// Detects MIME types from the file extension. Does no enrichment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMimeProvider;

const MIME_TABLE: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("heic", "image/heic"),
    ("svg", "image/svg+xml"),
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
];

impl MetadataProvider for ExtensionMimeProvider {
    fn detect(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        MIME_TABLE
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, mime)| mime.to_string())
    }
}
