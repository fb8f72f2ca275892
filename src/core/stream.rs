use crate::domain::model::Encoding;
use crate::utils::error::{EtlError, Result};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;
pub type ByteSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Same high-water mark as a typical file read stream.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub encoding: Encoding,
    pub chunk_size: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Pull-based chunk reader. Each call to [`ReadStream::next_chunk`] performs at most
/// one read of up to `chunk_size` bytes from the underlying source.
pub struct ReadStream {
    inner: ByteSource,
    encoding: Encoding,
    buf: Vec<u8>,
    // Trailing bytes of a UTF-8 sequence cut off by the previous read.
    pending: Vec<u8>,
    chunks_read: usize,
    bytes_read: u64,
    ended: bool,
}

impl ReadStream {
    pub fn new(inner: ByteSource, options: ReadOptions) -> Self {
        Self {
            inner,
            encoding: options.encoding,
            buf: vec![0; options.chunk_size.max(1)],
            pending: Vec::new(),
            chunks_read: 0,
            bytes_read: 0,
            ended: false,
        }
    }

    pub fn from_reader<R>(reader: R, options: ReadOptions) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::new(Box::new(reader), options)
    }

    /// Returns `Ok(None)` once the source is exhausted. Chunks are never empty.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if self.ended {
                return Ok(None);
            }

            let n = self.inner.read(&mut self.buf).await?;
            if n == 0 {
                self.ended = true;
                if !self.pending.is_empty() {
                    return Err(EtlError::parse(
                        format!("byte {}", self.bytes_read),
                        "input ends in the middle of a UTF-8 sequence",
                    ));
                }
                return Ok(None);
            }
            let start_offset = self.bytes_read;
            self.bytes_read += n as u64;

            let chunk = match self.encoding {
                Encoding::Binary => self.buf[..n].to_vec(),
                Encoding::Utf8 => {
                    let mut data = std::mem::take(&mut self.pending);
                    let carried = data.len() as u64;
                    data.extend_from_slice(&self.buf[..n]);

                    if let Err(e) = std::str::from_utf8(&data) {
                        if e.error_len().is_some() {
                            return Err(EtlError::parse(
                                format!("byte {}", start_offset - carried + e.valid_up_to() as u64),
                                "invalid UTF-8",
                            ));
                        }
                        self.pending = data.split_off(e.valid_up_to());
                    }

                    if data.is_empty() {
                        continue;
                    }
                    data
                }
            };

            self.chunks_read += 1;
            return Ok(Some(chunk));
        }
    }

    pub fn chunks_read(&self) -> usize {
        self.chunks_read
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl fmt::Debug for ReadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadStream")
            .field("encoding", &self.encoding)
            .field("chunk_size", &self.buf.len())
            .field("chunks_read", &self.chunks_read)
            .field("bytes_read", &self.bytes_read)
            .finish()
    }
}

pub struct WriteStream {
    inner: ByteSink,
    bytes_written: u64,
}

impl WriteStream {
    pub fn new(inner: ByteSink) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    pub fn from_writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::new(Box::new(writer))
    }

    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.inner.write_all(data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        Ok(())
    }

    /// Flushes and shuts the sink down. Returns the total number of bytes written.
    pub async fn close(mut self) -> Result<u64> {
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        Ok(self.bytes_written)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl fmt::Debug for WriteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteStream")
            .field("bytes_written", &self.bytes_written)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn utf8(chunk_size: usize) -> ReadOptions {
        ReadOptions {
            encoding: Encoding::Utf8,
            chunk_size,
        }
    }

    #[tokio::test]
    async fn test_chunks_follow_source_reads() {
        let mock = Builder::new().read(b"[1,").read(b"2]").build();
        let mut stream = ReadStream::from_reader(mock, utf8(1024));

        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"[1,".to_vec()));
        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"2]".to_vec()));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
        assert_eq!(stream.chunks_read(), 2);
        assert_eq!(stream.bytes_read(), 5);
    }

    #[tokio::test]
    async fn test_chunk_size_limits_each_read() {
        let data: &[u8] = b"abcdefg";
        let mut stream = ReadStream::from_reader(data, utf8(3));

        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            chunks.push(String::from_utf8(chunk).unwrap());
        }
        assert_eq!(chunks, vec!["abc", "def", "g"]);
    }

    #[tokio::test]
    async fn test_utf8_sequence_is_not_split() {
        // "é" is 0xC3 0xA9; the first read stops between the two bytes.
        let mock = Builder::new().read(b"\"caf\xC3").read(b"\xA9\"").build();
        let mut stream = ReadStream::from_reader(mock, utf8(1024));

        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"\"caf".to_vec()));
        assert_eq!(
            stream.next_chunk().await.unwrap(),
            Some("é\"".as_bytes().to_vec())
        );
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_binary_encoding_keeps_raw_boundaries() {
        let mock = Builder::new().read(b"\"caf\xC3").read(b"\xA9\"").build();
        let options = ReadOptions {
            encoding: Encoding::Binary,
            chunk_size: 1024,
        };
        let mut stream = ReadStream::from_reader(mock, options);

        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"\"caf\xC3".to_vec()));
        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"\xA9\"".to_vec()));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
        assert_eq!(stream.bytes_read(), 7);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_parse_error() {
        let data: &[u8] = b"[\xFF]";
        let mut stream = ReadStream::from_reader(data, utf8(1024));

        let err = stream.next_chunk().await.unwrap_err();
        assert!(matches!(err, EtlError::ParseError { .. }));
    }

    #[tokio::test]
    async fn test_truncated_utf8_at_eof_is_parse_error() {
        let data: &[u8] = b"\"caf\xC3";
        let mut stream = ReadStream::from_reader(data, utf8(1024));

        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"\"caf".to_vec()));
        assert!(matches!(
            stream.next_chunk().await,
            Err(EtlError::ParseError { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_error_surfaces_as_io_error() {
        let mock = Builder::new()
            .read(b"[1,")
            .read_error(std::io::Error::other("device gone"))
            .build();
        let mut stream = ReadStream::from_reader(mock, utf8(1024));

        assert!(stream.next_chunk().await.unwrap().is_some());
        assert!(matches!(stream.next_chunk().await, Err(EtlError::IoError(_))));
    }

    #[tokio::test]
    async fn test_write_stream_counts_bytes() {
        let mock = Builder::new().write(b"[1]").write(b"\n").build();
        let mut sink = WriteStream::from_writer(mock);

        sink.write_chunk(b"[1]").await.unwrap();
        sink.write_chunk(b"").await.unwrap();
        sink.write_chunk(b"\n").await.unwrap();
        assert_eq!(sink.close().await.unwrap(), 4);
    }
}
