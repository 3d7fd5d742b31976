use std::future::Future;
use std::path::Path;

use crate::context::IoContext;
use crate::error::FileError;
use crate::fs::file::File;
use crate::fs::open_options::{Access, BufferingMode, OpenMode, ShareMode};
use crate::io::AsyncWriteAt;

/// A file whose only I/O capability is asynchronous writing.
///
/// `open` always requests write-only OS access rights; everything else is
/// delegated to the shared file core.
#[derive(Debug)]
pub struct WriteOnlyFile {
    inner: File,
}

impl WriteOnlyFile {
    pub async fn open(
        ctx: &IoContext,
        path: impl AsRef<Path>,
        open_mode: OpenMode,
        share_mode: ShareMode,
        buffering_mode: BufferingMode,
    ) -> Result<Self, FileError> {
        let inner = File::open(
            ctx,
            path,
            Access::Write,
            open_mode,
            share_mode,
            buffering_mode,
        )
        .await?;
        Ok(Self { inner })
    }

    pub(crate) fn from_file(inner: File) -> Self {
        Self { inner }
    }

    /// Write `buf` at absolute byte `offset`; resolves to the bytes
    /// written (possibly short) and the buffer.
    pub async fn write_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> (Result<usize, FileError>, Vec<u8>) {
        self.inner.write_at(buf, offset).await
    }

    /// Write at the cursor, advancing it by the bytes written.
    pub async fn write(&self, buf: Vec<u8>) -> (Result<usize, FileError>, Vec<u8>) {
        self.inner.write(buf).await
    }

    pub fn size(&self) -> Result<u64, FileError> {
        self.inner.size()
    }

    pub fn seek(&self, pos: u64) {
        self.inner.seek(pos)
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn close(&mut self) {
        self.inner.close()
    }
}

impl AsyncWriteAt for WriteOnlyFile {
    fn write_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> impl Future<Output = (Result<usize, FileError>, Vec<u8>)> {
        WriteOnlyFile::write_at(self, buf, offset)
    }
}
