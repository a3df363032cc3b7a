//! Read-only access to container images packaged as OCI layout archives.
//!
//! An OCI layout archive is a single tar stream holding an `oci-layout`
//! marker, an `index.json` and content-addressed blobs under
//! `blobs/<algorithm>/<hex>`.  [`OciLayoutPackage`] resolves the image
//! manifest and configuration from such an archive and then serves label
//! lookups and the uncompressed content of individual layers by diffID.
//!
//! The archive comes from a [`Blob`], which is reopened for every scan; the
//! archive is never seeked, only read from the start.

pub mod archive;
pub mod blob;
pub mod error;
pub mod layout;
pub mod package;
pub mod stream;
pub mod util;


pub use blob::{Blob, BlobReader, FileBlob, MemoryBlob};
pub use error::{Error, Result};
pub use layout::{is_oci_layout_blob, Compression};
pub use package::{config_from_oci_layout_blob, OciLayoutPackage};
pub use stream::OwnedStream;
