//! Reader chains that own everything they were built from.
//!
//! A layer is read through several stacked readers: a decoder over a window
//! on a tar entry over the archive stream itself.  [`OwnedStream`] keeps that
//! stack as a single value and releases it from the outside in.

use std::io::{self, BufReader, Read, Take};

use flate2::read::MultiGzDecoder;
use log::warn;

use crate::blob::BlobReader;

/// A readable stream built from a root reader and the stages wrapped around it.
///
/// Closing releases the outermost stage first and then each wrapped reader in
/// turn down to the root.  Every reader gets closed even if an earlier one
/// fails; the first failure is the one reported.  A stream that is dropped
/// without being closed is closed on drop.
pub struct OwnedStream {
    top: Option<Box<dyn BlobReader>>,
}

impl std::fmt::Debug for OwnedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl OwnedStream {
    pub fn new(root: Box<dyn BlobReader>) -> Self {
        Self { top: Some(root) }
    }

    /// Adds a stage on top of the current chain.
    pub fn wrap(mut self, stage: impl FnOnce(Box<dyn BlobReader>) -> Box<dyn BlobReader>) -> Self {
        self.top = self.top.take().map(stage);
        self
    }

    /// Adds a stage whose construction can fail.
    ///
    /// On failure the chain built so far has been handed to `stage` and is
    /// released when `stage` drops it.
    pub fn try_wrap(
        mut self,
        stage: impl FnOnce(Box<dyn BlobReader>) -> io::Result<Box<dyn BlobReader>>,
    ) -> io::Result<Self> {
        self.top = self.top.take().map(stage).transpose()?;
        Ok(self)
    }

    pub fn is_closed(&self) -> bool {
        self.top.is_none()
    }

    /// Releases the whole chain.  Closing an already closed stream does nothing.
    pub fn close(&mut self) -> io::Result<()> {
        let mut result = Ok(());
        let mut next = self.top.take();

        while let Some(mut reader) = next {
            if let Err(err) = reader.close() {
                if result.is_ok() {
                    result = Err(err);
                } else {
                    warn!("Additional failure while closing stream: {err}");
                }
            }
            next = reader.into_inner();
        }

        result
    }
}

impl Read for OwnedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.top {
            Some(reader) => reader.read(buf),
            None => Err(io::Error::other("read from a closed stream")),
        }
    }
}

impl BlobReader for OwnedStream {
    fn close(&mut self) -> io::Result<()> {
        OwnedStream::close(self)
    }
}

impl Drop for OwnedStream {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("Failed to close stream on drop: {err}");
        }
    }
}

/// The data of a single tar entry, read in place from the archive stream.
struct EntryReader {
    inner: Take<Box<dyn BlobReader>>,
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BlobReader for EntryReader {
    fn into_inner(self: Box<Self>) -> Option<Box<dyn BlobReader>> {
        Some(self.inner.into_inner())
    }
}

/// Stage limiting reads to the next `size` bytes of the wrapped reader.
pub(crate) fn entry_stage(size: u64) -> impl FnOnce(Box<dyn BlobReader>) -> Box<dyn BlobReader> {
    move |reader| -> Box<dyn BlobReader> {
        Box::new(EntryReader {
            inner: reader.take(size),
        })
    }
}

struct GzipReader {
    decoder: MultiGzDecoder<Box<dyn BlobReader>>,
}

impl Read for GzipReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
}

impl BlobReader for GzipReader {
    fn into_inner(self: Box<Self>) -> Option<Box<dyn BlobReader>> {
        Some(self.decoder.into_inner())
    }
}

pub(crate) fn gzip_stage(reader: Box<dyn BlobReader>) -> Box<dyn BlobReader> {
    Box::new(GzipReader {
        decoder: MultiGzDecoder::new(reader),
    })
}

struct ZstdReader {
    decoder: zstd::stream::read::Decoder<'static, BufReader<Box<dyn BlobReader>>>,
}

impl Read for ZstdReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
}

impl BlobReader for ZstdReader {
    fn into_inner(self: Box<Self>) -> Option<Box<dyn BlobReader>> {
        Some(self.decoder.finish().into_inner())
    }
}

pub(crate) fn zstd_stage(reader: Box<dyn BlobReader>) -> io::Result<Box<dyn BlobReader>> {
    let decoder = zstd::stream::read::Decoder::new(reader)?;
    Ok(Box::new(ZstdReader { decoder }))
}
