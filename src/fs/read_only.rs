use std::future::Future;
use std::path::Path;

use crate::context::IoContext;
use crate::error::FileError;
use crate::fs::file::File;
use crate::fs::open_options::{Access, BufferingMode, OpenMode, ShareMode};
use crate::io::AsyncReadAt;

/// A file whose only I/O capability is asynchronous reading.
#[derive(Debug)]
pub struct ReadOnlyFile {
    inner: File,
}

impl ReadOnlyFile {
    pub async fn open(
        ctx: &IoContext,
        path: impl AsRef<Path>,
        share_mode: ShareMode,
        buffering_mode: BufferingMode,
    ) -> Result<Self, FileError> {
        // Reading never creates; the open mode is pinned alongside the
        // access rights.
        let inner = File::open(
            ctx,
            path,
            Access::Read,
            OpenMode::OpenExisting,
            share_mode,
            buffering_mode,
        )
        .await?;
        Ok(Self { inner })
    }

    pub(crate) fn from_file(inner: File) -> Self {
        Self { inner }
    }

    /// Read up to `buf.len()` bytes at absolute byte `offset`.
    pub async fn read_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> (Result<usize, FileError>, Vec<u8>) {
        self.inner.read_at(buf, offset).await
    }

    /// Read at the cursor, advancing it by the bytes read.
    pub async fn read(&self, buf: Vec<u8>) -> (Result<usize, FileError>, Vec<u8>) {
        self.inner.read(buf).await
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

impl AsyncReadAt for ReadOnlyFile {
    fn read_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> impl Future<Output = (Result<usize, FileError>, Vec<u8>)> {
        ReadOnlyFile::read_at(self, buf, offset)
    }
}
