//! Fixed locations and naming conventions of an OCI layout archive.

use std::io;

use log::debug;
use oci_spec::image::{Descriptor, Digest, ImageIndex, MediaType};

use crate::{
    archive,
    blob::{Blob, BlobReader},
    error::{Error, Result},
    stream::{gzip_stage, zstd_stage, OwnedStream},
};

/// Marker entry whose presence identifies an OCI layout archive.
pub const OCI_LAYOUT_PATH: &str = "/oci-layout";

/// The top-level index document.
pub const INDEX_PATH: &str = "/index.json";

/// Media type of the index entry selected as the image manifest.
pub const DOCKER_MANIFEST_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Archive path of the blob with the given digest: `/blobs/<algorithm>/<encoded>`.
pub fn blob_path(digest: &Digest) -> String {
    format!("/blobs/{}/{}", digest.algorithm(), digest.digest())
}

/// Archive path of the blob a descriptor points at.
pub fn descriptor_path(descriptor: &Descriptor) -> String {
    blob_path(descriptor.digest())
}

/// Compression applied to a layer blob, as signalled by its media type suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Docker media types end in `.gzip`, OCI ones in `+gzip` (and likewise
    /// for zstd).
    pub fn from_media_type(media_type: &MediaType) -> Self {
        let media_type = media_type.to_string();
        if media_type.ends_with(".gzip") || media_type.ends_with("+gzip") {
            Compression::Gzip
        } else if media_type.ends_with(".zstd") || media_type.ends_with("+zstd") {
            Compression::Zstd
        } else {
            Compression::None
        }
    }

    /// Adds the matching decoding stage to `stream`.
    pub fn decode(self, stream: OwnedStream) -> io::Result<OwnedStream> {
        match self {
            Compression::None => Ok(stream),
            Compression::Gzip => Ok(stream.wrap(gzip_stage)),
            Compression::Zstd => stream.try_wrap(zstd_stage),
        }
    }
}

/// Selects the image manifest from the index: the first descriptor of the
/// docker distribution manifest media type.  Any later matches are ignored.
pub fn select_manifest(index: &ImageIndex) -> Option<&Descriptor> {
    index
        .manifests()
        .iter()
        .find(|descriptor| descriptor.media_type().to_string() == DOCKER_MANIFEST_MEDIA_TYPE)
}

/// Opens the blob, runs `f` over the stream and closes the stream again.
///
/// A failure from `f` takes precedence over a failure to close.
pub(crate) fn with_archive<B, T>(
    blob: &B,
    what: &str,
    f: impl FnOnce(&mut Box<dyn BlobReader>) -> Result<T>,
) -> Result<T>
where
    B: Blob + ?Sized,
{
    let mut reader = blob.open().map_err(|source| Error::Open {
        what: what.to_string(),
        source,
    })?;

    let result = f(&mut reader);
    let closed = reader.close();

    let value = result?;
    closed.map_err(Error::Close)?;
    Ok(value)
}

/// Checks whether a blob is in OCI layout format.
///
/// An archive without the layout marker is simply not OCI layout; only a
/// failure to open or read the archive is an error.
pub fn is_oci_layout_blob<B: Blob + ?Sized>(blob: &B) -> Result<bool> {
    with_archive(blob, OCI_LAYOUT_PATH, |reader| {
        match archive::seek_entry(reader, OCI_LAYOUT_PATH) {
            Ok(found) => {
                debug!("OCI layout marker present: {}", found.is_some());
                Ok(found.is_some())
            }
            Err(source) => Err(Error::Scan {
                path: OCI_LAYOUT_PATH.to_string(),
                source,
            }),
        }
    })
}
