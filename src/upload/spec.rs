use crate::upload::{
    error::UploadError,
    limits::{
        DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENCY, MAX_PARTS_PER_UPLOAD, MIN_PART_SIZE_BYTES,
        clamp_concurrency,
    },
    planner::part_count,
    source::ByteSource,
};
use secrecy::SecretString;
use std::{path::Path, sync::Arc};

/// Immutable input of one upload
#[derive(Debug)]
pub struct UploadSpec<S> {
    source: Arc<S>,
    file_name: String,
    chunk_size: u64,
    max_concurrency: usize,
    session_token: Option<SecretString>,
    retries: u32,
}

impl<S: ByteSource> UploadSpec<S> {
    #[must_use]
    pub fn new(source: S, file_name: impl Into<String>) -> Self {
        Self {
            source: Arc::new(source),
            file_name: file_name.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            session_token: None,
            retries: 1,
        }
    }

    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// 0 selects the default, anything above the ceiling is clamped
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = clamp_concurrency(max_concurrency);
        self
    }

    #[must_use]
    pub fn with_session_token(mut self, session_token: Option<SecretString>) -> Self {
        self.session_token = session_token;
        self
    }

    /// Attempts per part, 1 disables retries
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub const fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    #[must_use]
    pub const fn session_token(&self) -> Option<&SecretString> {
        self.session_token.as_ref()
    }

    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Name sent to the coordination service, the file name plus the source extension
    #[must_use]
    pub fn upload_name(&self) -> String {
        name_with_extension(&self.file_name, self.source.extension().as_deref())
    }

    /// Check the spec against the backend limits and return the part count
    ///
    /// # Errors
    ///
    /// Will return `Err` if the source is empty, the chunk is below the backend
    /// minimum or the object needs more parts than allowed
    pub fn validate(&self) -> Result<u16, UploadError> {
        if self.file_name.trim().is_empty() {
            return Err(UploadError::InvalidSpec("file name is empty".to_string()));
        }

        if self.source.is_empty() {
            return Err(UploadError::InvalidSpec(
                "source is empty, nothing to upload".to_string(),
            ));
        }

        if self.chunk_size < MIN_PART_SIZE_BYTES {
            return Err(UploadError::InvalidSpec(format!(
                "chunk size {} is below the minimum part size of {} bytes",
                self.chunk_size, MIN_PART_SIZE_BYTES
            )));
        }

        let parts = part_count(self.source.len(), self.chunk_size);

        usize::try_from(parts)
            .ok()
            .filter(|&n| n <= MAX_PARTS_PER_UPLOAD)
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| {
                UploadError::InvalidSpec(format!(
                    "{parts} parts exceed the maximum of {MAX_PARTS_PER_UPLOAD}, use a bigger chunk size"
                ))
            })
    }
}

// append the extension unless the name already carries it
fn name_with_extension(name: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext)
            if !ext.is_empty()
                && !Path::new(name)
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext)) =>
        {
            format!("{name}.{ext}")
        }
        _ => name.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::upload::source::ChunkStream;
    use bytes::Bytes;

    // reports a length without holding any data
    struct Phantom(u64);

    impl ByteSource for Phantom {
        fn len(&self) -> u64 {
            self.0
        }

        async fn slice(&self, _offset: u64, _length: u64) -> std::io::Result<ChunkStream> {
            Err(std::io::Error::other("phantom source"))
        }
    }

    fn spec(len: usize) -> UploadSpec<Bytes> {
        UploadSpec::new(Bytes::from(vec![0u8; len]), "video")
    }

    #[test]
    fn test_name_with_extension() {
        let test_cases = vec![
            ("video", Some("mp4"), "video.mp4"),
            ("video", None, "video"),
            ("video", Some(""), "video"),
            ("video.mp4", Some("mp4"), "video.mp4"),
            ("video.MP4", Some("mp4"), "video.MP4"),
            ("video.mov", Some("mp4"), "video.mov.mp4"),
            ("videomp4", Some("mp4"), "videomp4.mp4"),
        ];
        for (name, ext, expected) in test_cases {
            assert_eq!(name_with_extension(name, ext), expected);
        }
    }

    #[test]
    fn test_defaults() {
        let spec = spec(10);
        assert_eq!(spec.chunk_size(), 5_242_880);
        assert_eq!(spec.max_concurrency(), 5);
        assert_eq!(spec.retries(), 1);
        assert!(spec.session_token().is_none());
        assert_eq!(spec.upload_name(), "video");
    }

    #[test]
    fn test_concurrency_and_retries_are_clamped() {
        let spec = spec(10).with_max_concurrency(40).with_retries(0);
        assert_eq!(spec.max_concurrency(), 15);
        assert_eq!(spec.retries(), 1);
        assert_eq!(spec.with_max_concurrency(0).max_concurrency(), 5);
    }

    #[test]
    fn test_validate_part_count() {
        let mib = 1024 * 1024;
        assert_eq!(spec(12 * mib).validate().unwrap(), 3);
        assert_eq!(spec(5 * mib).validate().unwrap(), 1);
        assert_eq!(spec(1).validate().unwrap(), 1);
    }

    #[test]
    fn test_validate_rejects_empty_source() {
        assert!(matches!(
            spec(0).validate(),
            Err(UploadError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_validate_rejects_small_chunks() {
        assert!(matches!(
            spec(10).with_chunk_size(1024).validate(),
            Err(UploadError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_validate_rejects_too_many_parts() {
        let chunk = 5_242_880;
        let max = UploadSpec::new(Phantom(chunk * 10_000), "big");
        assert_eq!(max.validate().unwrap(), 10_000);

        let over = UploadSpec::new(Phantom(chunk * 10_000 + 1), "big");
        assert!(matches!(over.validate(), Err(UploadError::InvalidSpec(_))));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let spec = UploadSpec::new(Bytes::from_static(b"x"), " ");
        assert!(matches!(spec.validate(), Err(UploadError::InvalidSpec(_))));
    }
}
