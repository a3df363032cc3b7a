//! Error types for reading OCI layout archives.
//!
//! All fallible operations in this crate return [`Result<T>`], an alias for
//! `Result<T, Error>`.
//!
//! # Error Categories
//!
//! - **Source access**: [`Open`], [`Scan`], [`Close`]
//! - **Malformed documents**: [`Parse`]
//! - **Missing references**: [`EntryNotFound`], [`ManifestNotFound`],
//!   [`LayerNotFound`], [`LayerBlobNotFound`], [`LayerIndexOutOfRange`]
//!
//! A label that does not exist is not an error; see
//! [`OciLayoutPackage::label`](crate::OciLayoutPackage::label).
//!
//! [`Open`]: Error::Open
//! [`Scan`]: Error::Scan
//! [`Close`]: Error::Close
//! [`Parse`]: Error::Parse
//! [`EntryNotFound`]: Error::EntryNotFound
//! [`ManifestNotFound`]: Error::ManifestNotFound
//! [`LayerNotFound`]: Error::LayerNotFound
//! [`LayerBlobNotFound`]: Error::LayerBlobNotFound
//! [`LayerIndexOutOfRange`]: Error::LayerIndexOutOfRange

use std::io;

/// Result type alias for operations that may return an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while inspecting an OCI layout archive.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The blob source could not be opened.
    #[error("failed to open archive to read {what}")]
    Open {
        /// What was about to be read from the archive.
        what: String,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Reading the archive failed while looking for an entry.
    #[error("failed to read archive while looking for '{path}'")]
    Scan {
        /// The normalized entry path being looked for.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Releasing an archive stream failed.
    #[error("failed to close archive stream")]
    Close(#[source] io::Error),

    /// No entry exists in the archive at the given path.
    #[error("entry '{0}' not found in archive")]
    EntryNotFound(String),

    /// A JSON document in the archive could not be decoded.
    #[error("failed to parse '{path}'")]
    Parse {
        /// The archive path of the document.
        path: String,
        /// The decoding failure.
        #[source]
        source: oci_spec::OciSpecError,
    },

    /// The index lists no manifest of the expected media type.
    #[error("unable to find manifest of type '{0}'")]
    ManifestNotFound(String),

    /// The requested diffID is not part of the image's root filesystem.
    #[error("layer '{0}' not found in rootfs")]
    LayerNotFound(String),

    /// The manifest has no layer descriptor at the diffID's position.
    #[error("manifest has no layer at position {index} for '{diff_id}'")]
    LayerIndexOutOfRange {
        /// The requested diffID.
        diff_id: String,
        /// The diffID's position in the root filesystem.
        index: usize,
    },

    /// The layer's blob is not present in the archive.
    #[error("layer blob '{0}' not found")]
    LayerBlobNotFound(String),
}

impl Error {
    /// Returns true if this error reports a missing archive entry rather than a
    /// failure to read the archive.
    pub fn is_entry_not_found(&self) -> bool {
        matches!(self, Error::EntryNotFound(_))
    }
}
