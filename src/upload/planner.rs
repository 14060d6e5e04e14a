use crate::upload::{error::UploadError, limits::MAX_PARTS_PER_UPLOAD, part::PartRange};
use std::{cmp::min, iter::Iterator};

/// Walks `[0, file_size)` in `chunk_size` steps, yielding `(number, seek, chunk)`
/// with 1-based dense part numbers.
///
/// Part numbers are `u16`: the iterator ends after part `u16::MAX` instead of
/// repeating a number. Use [`plan`] to get the full cover or an error.
pub struct PartIterator {
    seek: u64,
    chunk_size: u64,
    file_size: u64,
    number: Option<u16>,
}

impl PartIterator {
    #[must_use]
    pub const fn new(file_size: u64, chunk_size: u64) -> Self {
        Self {
            seek: 0,
            chunk_size,
            file_size,
            number: Some(1),
        }
    }
}

impl Iterator for PartIterator {
    type Item = (u16, u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.seek >= self.file_size || self.chunk_size == 0 {
            return None;
        }

        let number = self.number?;
        let chunk = min(self.chunk_size, self.file_size - self.seek);

        let result = Some((number, self.seek, chunk));

        log::debug!(
            "PartIterator::next() -> number: {}, seek: {}, chunk: {}",
            number,
            self.seek,
            chunk
        );

        self.seek += chunk;
        self.number = number.checked_add(1);

        result
    }
}

/// Number of parts needed to cover `total_size` bytes, `ceil(total / chunk)`
#[must_use]
pub const fn part_count(total_size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    total_size.div_ceil(chunk_size)
}

/// Ordered, contiguous byte ranges covering the whole object.
///
/// A zero sized object yields no parts.
///
/// # Errors
///
/// `InvalidSpec` if covering the object takes more than
/// [`MAX_PARTS_PER_UPLOAD`] parts.
pub fn plan(total_size: u64, chunk_size: u64) -> Result<Vec<PartRange>, UploadError> {
    let parts = part_count(total_size, chunk_size);

    if usize::try_from(parts).map_or(true, |n| n > MAX_PARTS_PER_UPLOAD) {
        return Err(UploadError::InvalidSpec(format!(
            "{parts} parts exceed the maximum of {MAX_PARTS_PER_UPLOAD}, use a bigger chunk size"
        )));
    }

    Ok(PartIterator::new(total_size, chunk_size)
        .map(|(number, seek, chunk)| PartRange::new(number, seek, chunk))
        .collect())
}
