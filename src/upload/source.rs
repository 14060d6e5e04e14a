//! Random access byte sources the parts are sliced from.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::{
    cmp::min,
    future::Future,
    io::{Error, ErrorKind, Result, SeekFrom},
    path::{Path, PathBuf},
};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};
use tokio_util::codec::{BytesCodec, FramedRead};

/// Frame size used when streaming an in-memory source
const MEMORY_FRAME_SIZE: usize = 64 * 1024;

/// Stream of bytes for one part, consumed as the request body
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// A source with a known length that can hand out byte ranges
pub trait ByteSource: Send + Sync + 'static {
    /// Total length in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extension of the underlying file, if any
    fn extension(&self) -> Option<String> {
        None
    }

    /// Stream `length` bytes starting at `offset`
    fn slice(&self, offset: u64, length: u64) -> impl Future<Output = Result<ChunkStream>> + Send;
}

/// A local file read with seek + take
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    len: u64,
}

impl FileSource {
    /// # Errors
    ///
    /// Will return `Err` if the path is not a readable file
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;

        if !metadata.is_file() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("not a file: {}", path.display()),
            ));
        }

        Ok(Self {
            path,
            len: metadata.len(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(ToString::to_string)
    }

    async fn slice(&self, offset: u64, length: u64) -> Result<ChunkStream> {
        check_range(self.len, offset, length)?;

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let file = file.take(length);

        Ok(FramedRead::new(file, BytesCodec::new())
            .map_ok(BytesMut::freeze)
            .boxed())
    }
}

impl ByteSource for Bytes {
    fn len(&self) -> u64 {
        self.len() as u64
    }

    async fn slice(&self, offset: u64, length: u64) -> Result<ChunkStream> {
        check_range(ByteSource::len(self), offset, length)?;

        let start = usize::try_from(offset).map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;
        let end = usize::try_from(offset + length)
            .map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;

        let mut frames = Vec::new();
        let mut seek = start;
        while seek < end {
            let next = min(seek + MEMORY_FRAME_SIZE, end);
            frames.push(Ok(Bytes::slice(self, seek..next)));
            seek = next;
        }

        Ok(stream::iter(frames).boxed())
    }
}

fn check_range(len: u64, offset: u64, length: u64) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::new(
            ErrorKind::UnexpectedEof,
            format!("range {offset}+{length} is outside a source of {len} bytes"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn collect(stream: ChunkStream) -> Vec<u8> {
        stream
            .try_fold(Vec::new(), |mut acc, bytes| async move {
                acc.extend_from_slice(&bytes);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_file_source_slice() {
        let mut tmp_file = NamedTempFile::with_suffix(".mp4").unwrap();
        tmp_file.write_all(b"0123456789abcdef").unwrap();
        tmp_file.flush().unwrap();

        let source = FileSource::open(tmp_file.path()).await.unwrap();
        assert_eq!(ByteSource::len(&source), 16);
        assert_eq!(source.extension(), Some("mp4".to_string()));

        let chunk = collect(source.slice(10, 6).await.unwrap()).await;
        assert_eq!(chunk, b"abcdef");

        let chunk = collect(source.slice(0, 4).await.unwrap()).await;
        assert_eq!(chunk, b"0123");
    }

    #[tokio::test]
    async fn test_file_source_out_of_range() {
        let mut tmp_file = NamedTempFile::new().unwrap();
        tmp_file.write_all(b"0123").unwrap();
        tmp_file.flush().unwrap();

        let source = FileSource::open(tmp_file.path()).await.unwrap();
        assert!(source.slice(2, 3).await.is_err());
    }

    #[tokio::test]
    async fn test_file_source_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileSource::open(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_bytes_source_frames() {
        let data = Bytes::from(vec![7u8; MEMORY_FRAME_SIZE * 2 + 10]);
        assert_eq!(ByteSource::len(&data), (MEMORY_FRAME_SIZE * 2 + 10) as u64);
        assert_eq!(data.extension(), None);

        let frames: Vec<Bytes> = ByteSource::slice(&data, 5, (MEMORY_FRAME_SIZE * 2) as u64)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames.iter().map(Bytes::len).sum::<usize>(), MEMORY_FRAME_SIZE * 2);

        let too_long = (MEMORY_FRAME_SIZE * 2) as u64 + 1;
        assert!(ByteSource::slice(&data, 10, too_long).await.is_err());
    }
}
