use serde::{Deserialize, Serialize};

/// Byte range `[offset, offset + length)` of the object, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    pub number: u16,
    pub offset: u64,
    pub length: u64,
}

impl PartRange {
    #[must_use]
    pub const fn new(number: u16, offset: u64, length: u64) -> Self {
        Self {
            number,
            offset,
            length,
        }
    }

    /// Exclusive end of the range
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Zero based index used to key progress
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.number.saturating_sub(1)
    }
}

/// Upload target issued by the coordination service for one part
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartTarget {
    #[serde(rename = "PartNumber")]
    pub number: u16,
    #[serde(rename = "signedUrl")]
    pub url: String,
}

/// A planned part paired with its upload target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    range: PartRange,
    target: String,
}

impl Part {
    #[must_use]
    pub const fn new(range: PartRange, target: String) -> Self {
        Self { range, target }
    }

    #[must_use]
    pub const fn get_number(&self) -> u16 {
        self.range.number
    }

    #[must_use]
    pub const fn get_seek(&self) -> u64 {
        self.range.offset
    }

    #[must_use]
    pub const fn get_chunk(&self) -> u64 {
        self.range.length
    }

    #[must_use]
    pub const fn get_range(&self) -> PartRange {
        self.range
    }

    #[must_use]
    pub fn get_target(&self) -> &str {
        &self.target
    }
}

/// Proof that the backend stored a part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedPart {
    #[serde(rename = "PartNumber")]
    pub number: u16,
    #[serde(rename = "ETag")]
    pub etag: String,
}

impl UploadedPart {
    #[must_use]
    pub const fn new(number: u16, etag: String) -> Self {
        Self { number, etag }
    }
}

/// Identifiers returned by `initializeMultipartUpload`, valid for one upload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub file_id: String,
    pub file_key: String,
}
