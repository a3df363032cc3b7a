//! Read-only access to an image packaged as an OCI layout archive.
//!
//! Construction scans the archive three times from the start: once each for
//! the index, the selected manifest and the image configuration.  Every layer
//! request scans it once more.  Nothing is cached between scans; the archive
//! is expected to be inspected once per consumer.

use std::collections::HashMap;

use log::{debug, warn};
use oci_spec::image::{Config, Descriptor, ImageConfiguration, ImageIndex, ImageManifest};

use crate::{
    archive,
    blob::Blob,
    error::{Error, Result},
    layout::{
        descriptor_path, select_manifest, with_archive, Compression, DOCKER_MANIFEST_MEDIA_TYPE,
        INDEX_PATH,
    },
    stream::{entry_stage, OwnedStream},
};

/// Reads and decodes the JSON document at `path` in a fresh scan of the archive.
fn read_document<B, T>(
    blob: &B,
    path: &str,
    parse: fn(&[u8]) -> std::result::Result<T, oci_spec::OciSpecError>,
) -> Result<T>
where
    B: Blob + ?Sized,
{
    let contents = with_archive(blob, path, |reader| archive::read_entry(reader, path))?;
    parse(&contents).map_err(|source| Error::Parse {
        path: path.to_string(),
        source,
    })
}

/// An image read from an OCI layout archive.
///
/// The manifest and image configuration are parsed once, up front.  The
/// package never changes afterwards, so it can be queried from several
/// threads at once as long as the blob source can be opened concurrently.
#[derive(Debug)]
pub struct OciLayoutPackage<B> {
    config: ImageConfiguration,
    manifest: ImageManifest,
    blob: B,
}

impl<B: Blob> OciLayoutPackage<B> {
    /// Resolves the index, the image manifest and the image configuration.
    pub fn new(blob: B) -> Result<Self> {
        let index = read_document(&blob, INDEX_PATH, |bytes| ImageIndex::from_reader(bytes))?;

        let descriptor = select_manifest(&index)
            .ok_or_else(|| Error::ManifestNotFound(DOCKER_MANIFEST_MEDIA_TYPE.to_string()))?;
        debug!("Selected manifest {}", descriptor.digest());

        let manifest = read_document(&blob, &descriptor_path(descriptor), |bytes| {
            ImageManifest::from_reader(bytes)
        })?;

        let config = read_document(&blob, &descriptor_path(manifest.config()), |bytes| {
            ImageConfiguration::from_reader(bytes)
        })?;
        debug!(
            "Image config {} lists {} layers",
            manifest.config().digest(),
            config.rootfs().diff_ids().len()
        );

        Ok(Self {
            config,
            manifest,
            blob,
        })
    }

    /// Opens the uncompressed content of the layer with the given diffID.
    ///
    /// The archive is scanned from the start for the layer's blob.  The
    /// returned stream owns that scan; closing or dropping it releases the
    /// archive stream.
    pub fn get_layer(&self, diff_id: &str) -> Result<OwnedStream> {
        let descriptor = self.layer_descriptor(diff_id)?;
        let path = descriptor_path(descriptor);

        let mut reader = self.blob.open().map_err(|source| Error::Open {
            what: path.clone(),
            source,
        })?;

        let size = match archive::seek_entry(&mut reader, &path) {
            Ok(Some(size)) => size,
            Ok(None) => {
                reader.close().map_err(Error::Close)?;
                return Err(Error::LayerBlobNotFound(path));
            }
            Err(source) => {
                if let Err(err) = reader.close() {
                    warn!("Failed to close archive stream after read error: {err}");
                }
                return Err(Error::Scan { path, source });
            }
        };

        let compression = Compression::from_media_type(descriptor.media_type());
        debug!("Layer {diff_id} found at {path} ({size} bytes, {compression:?})");

        let stream = OwnedStream::new(reader).wrap(entry_stage(size));
        compression
            .decode(stream)
            .map_err(|source| Error::Scan { path, source })
    }
}

impl<B> OciLayoutPackage<B> {
    /// Returns the value of the label, or the empty string if it isn't set.
    pub fn label(&self, name: &str) -> &str {
        self.labels()
            .and_then(|labels| labels.get(name))
            .map_or("", String::as_str)
    }

    /// All labels of the image, if it has any.
    pub fn labels(&self) -> Option<&HashMap<String, String>> {
        self.runtime_config()?.labels().as_ref()
    }

    /// The layer diffIDs of the root filesystem, bottom layer first.
    pub fn diff_ids(&self) -> &[String] {
        self.config.rootfs().diff_ids()
    }

    /// The manifest layer descriptor for a diffID.
    ///
    /// The manifest's layers and the configuration's diffIDs are positionally
    /// aligned; this is the only place that relationship is relied on.
    pub fn layer_descriptor(&self, diff_id: &str) -> Result<&Descriptor> {
        let index = self
            .diff_ids()
            .iter()
            .position(|id| id == diff_id)
            .ok_or_else(|| Error::LayerNotFound(diff_id.to_string()))?;

        self.manifest
            .layers()
            .get(index)
            .ok_or_else(|| Error::LayerIndexOutOfRange {
                diff_id: diff_id.to_string(),
                index,
            })
    }

    /// The runtime section of the image configuration.
    pub fn runtime_config(&self) -> Option<&Config> {
        self.config.config().as_ref()
    }

    pub fn config(&self) -> &ImageConfiguration {
        &self.config
    }

    pub fn manifest(&self) -> &ImageManifest {
        &self.manifest
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }
}

/// Reads just the runtime configuration of an OCI layout archive.
pub fn config_from_oci_layout_blob<B: Blob>(blob: B) -> Result<Config> {
    let package = OciLayoutPackage::new(blob)?;
    Ok(package.runtime_config().cloned().unwrap_or_default())
}
