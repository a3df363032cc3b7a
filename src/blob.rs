//! Blob sources: things that can be opened, repeatedly, into a fresh stream of
//! the whole archive.

use std::{
    fs::File,
    io::{self, BufReader, Cursor, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

/// A readable stream that can be explicitly released.
///
/// Dropping a reader must also release whatever it holds; `close` exists so
/// that release failures can be observed.  Readers that decode or window
/// another reader hand the wrapped reader back through
/// [`into_inner`](BlobReader::into_inner) so it can be closed in turn.
pub trait BlobReader: Read + Send {
    /// Releases the resources owned directly by this reader.
    ///
    /// Calling this more than once must be harmless.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Returns the reader this one is layered over, if any.
    fn into_inner(self: Box<Self>) -> Option<Box<dyn BlobReader>> {
        None
    }
}

impl BlobReader for File {}

impl<R: Read + Send> BlobReader for BufReader<R> {}

impl<T: AsRef<[u8]> + Send> BlobReader for Cursor<T> {}

/// A source of archive bytes.
///
/// Every call to [`open`](Blob::open) yields an independent stream positioned
/// at the start of the archive.  Nothing here assumes the stream can seek.
pub trait Blob {
    /// Opens a new stream over the full archive.
    fn open(&self) -> io::Result<Box<dyn BlobReader>>;
}

impl<B: Blob + ?Sized> Blob for &B {
    fn open(&self) -> io::Result<Box<dyn BlobReader>> {
        (**self).open()
    }
}

impl<B: Blob + ?Sized> Blob for Arc<B> {
    fn open(&self) -> io::Result<Box<dyn BlobReader>> {
        (**self).open()
    }
}

impl<B: Blob + ?Sized> Blob for Box<B> {
    fn open(&self) -> io::Result<Box<dyn BlobReader>> {
        (**self).open()
    }
}

/// An archive stored in a file on disk.
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
}

impl FileBlob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Blob for FileBlob {
    fn open(&self) -> io::Result<Box<dyn BlobReader>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// An archive held in memory.  Clones share the same bytes.
#[derive(Debug, Clone)]
pub struct MemoryBlob {
    bytes: Arc<[u8]>,
}

impl MemoryBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl Blob for MemoryBlob {
    fn open(&self) -> io::Result<Box<dyn BlobReader>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.bytes))))
    }
}
