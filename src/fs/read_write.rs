use std::future::Future;
use std::path::Path;

use crate::context::IoContext;
use crate::error::FileError;
use crate::fs::file::File;
use crate::fs::open_options::{Access, BufferingMode, OpenMode, ShareMode};
use crate::fs::read_only::ReadOnlyFile;
use crate::fs::write_only::WriteOnlyFile;
use crate::io::{AsyncReadAt, AsyncWriteAt};

/// A file open for both asynchronous reading and writing.
#[derive(Debug)]
pub struct ReadWriteFile {
    inner: File,
}

impl ReadWriteFile {
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
            Access::ReadWrite,
            open_mode,
            share_mode,
            buffering_mode,
        )
        .await?;
        Ok(Self { inner })
    }

    /// Restrict this file to the write capability.
    ///
    /// Moves the already-open handle; the file is not re-opened and its
    /// context registration carries over untouched. Returns
    /// [`FileError::InvalidHandle`] if the file was already closed.
    pub fn into_write_only(self) -> Result<WriteOnlyFile, FileError> {
        match self.inner.into_parts() {
            Some((handle, driver)) => Ok(WriteOnlyFile::from_file(File::from_parts(handle, driver))),
            None => Err(FileError::InvalidHandle),
        }
    }

    /// Restrict this file to the read capability.
    pub fn into_read_only(self) -> Result<ReadOnlyFile, FileError> {
        match self.inner.into_parts() {
            Some((handle, driver)) => Ok(ReadOnlyFile::from_file(File::from_parts(handle, driver))),
            None => Err(FileError::InvalidHandle),
        }
    }

    pub async fn write_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> (Result<usize, FileError>, Vec<u8>) {
        self.inner.write_at(buf, offset).await
    }

    pub async fn read_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> (Result<usize, FileError>, Vec<u8>) {
        self.inner.read_at(buf, offset).await
    }

    pub async fn write(&self, buf: Vec<u8>) -> (Result<usize, FileError>, Vec<u8>) {
        self.inner.write(buf).await
    }

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

impl AsyncWriteAt for ReadWriteFile {
    fn write_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> impl Future<Output = (Result<usize, FileError>, Vec<u8>)> {
        ReadWriteFile::write_at(self, buf, offset)
    }
}

impl AsyncReadAt for ReadWriteFile {
    fn read_at(
        &self,
        buf: Vec<u8>,
        offset: u64,
    ) -> impl Future<Output = (Result<usize, FileError>, Vec<u8>)> {
        ReadWriteFile::read_at(self, buf, offset)
    }
}
