//! Multipart upload limits
//!
//! The coordination service stores parts in an S3 compatible backend, so the
//! part size and part count limits are the backend ones.
//!
//! # References
//! - [S3 Quotas](https://docs.aws.amazon.com/AmazonS3/latest/userguide/qfacts.html)
//! - [Multipart Upload Overview](https://docs.aws.amazon.com/AmazonS3/latest/userguide/mpuoverview.html)

/// Minimum size of a multipart upload part (5 MiB)
///
/// The backend answers "Your proposed upload is smaller than the minimum
/// allowed size" for smaller parts. The last part can be smaller.
pub const MIN_PART_SIZE_BYTES: u64 = 5_242_880; // 5 MB

/// Chunk size used when the caller does not pick one
pub const DEFAULT_CHUNK_SIZE: u64 = MIN_PART_SIZE_BYTES;

/// Maximum number of parts in a multipart upload (10,000)
///
/// Part numbers are `u16`, see `test_part_number_type_sufficient`.
pub const MAX_PARTS_PER_UPLOAD: usize = 10_000;

/// Concurrent part transfers when the caller does not pick a number
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Hard ceiling for concurrent part transfers
pub const MAX_CONCURRENCY: usize = 15;

/// Clamp a requested concurrency, 0 means "use the default"
#[must_use]
pub fn clamp_concurrency(requested: usize) -> usize {
    let requested = if requested == 0 {
        DEFAULT_MAX_CONCURRENCY
    } else {
        requested
    };

    requested.min(MAX_CONCURRENCY)
}
