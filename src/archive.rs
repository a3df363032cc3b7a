//! Locating entries inside a tar stream by path.
//!
//! The archive is only ever read front to back.  We interpret the headers
//! ourselves rather than going through `tar::Archive` so that a located entry
//! can be handed out as a window over the caller's reader without borrowing
//! any archive state.  Header checksums are verified.  GNU long-name records
//! and PAX `path` and `size` records are honoured; everything else about an
//! entry besides its name and size is ignored.

use std::io::{self, Read};

use log::trace;
use tar::{EntryType, Header, PaxExtensions};

use crate::{
    error::{Error, Result},
    util::{clean_path, read_exactish, skip_exact},
};

const TAR_BLOCK_SIZE: u64 = 512;

fn read_header(reader: &mut impl Read) -> io::Result<Option<Header>> {
    let mut header = Header::new_gnu();
    if read_exactish(reader, header.as_mut_bytes())? {
        Ok(Some(header))
    } else {
        Ok(None)
    }
}

fn verify_checksum(header: &Header) -> io::Result<()> {
    let mut expected = header.clone();
    expected.set_cksum();
    if header.cksum()? != expected.cksum()? {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "archive header checksum mismatch",
        ));
    }
    Ok(())
}

/// Reads the full data of an extension record, dropping its block padding.
fn read_record(reader: &mut impl Read, size: u64) -> io::Result<Vec<u8>> {
    let mut content = vec![];
    if reader.take(size).read_to_end(&mut content)? as u64 != size {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    skip_exact(reader, size.next_multiple_of(TAR_BLOCK_SIZE) - size)?;
    Ok(content)
}

/// The PAX records that apply to the entry following an extended header.
#[derive(Debug, Default)]
struct PaxOverrides {
    path: Option<Vec<u8>>,
    size: Option<u64>,
}

fn pax_overrides(content: &[u8]) -> io::Result<PaxOverrides> {
    let mut overrides = PaxOverrides::default();
    for extension in PaxExtensions::new(content) {
        let extension = extension?;
        match extension.key() {
            Ok("path") => overrides.path = Some(extension.value_bytes().to_vec()),
            Ok("size") => {
                let size = extension
                    .value()
                    .ok()
                    .and_then(|value| value.parse().ok())
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidData, "invalid PAX size record")
                    })?;
                overrides.size = Some(size);
            }
            _ => {}
        }
    }
    Ok(overrides)
}

/// Advances `reader` to the data of the entry whose normalized path equals
/// `path`.
///
/// Returns the entry's size with the reader positioned at its first data byte,
/// or `None` if the archive ends without such an entry.  The archive ends at
/// the end of the stream or at the first all-zero header block.
pub fn seek_entry(reader: &mut impl Read, path: &str) -> io::Result<Option<u64>> {
    let wanted = clean_path(path);

    let mut gnu_longname: Vec<u8> = vec![];
    let mut pax = PaxOverrides::default();

    while let Some(header) = read_header(reader)? {
        if header.as_bytes() == &[0u8; 512] {
            return Ok(None);
        }
        verify_checksum(&header)?;

        let size = header.entry_size()?;

        match header.entry_type() {
            EntryType::GNULongName => {
                gnu_longname = read_record(reader, size)?;
                while gnu_longname.last() == Some(&b'\0') {
                    gnu_longname.pop();
                }
                continue;
            }
            EntryType::XHeader => {
                let content = read_record(reader, size)?;
                pax = pax_overrides(&content)?;
                continue;
            }
            EntryType::XGlobalHeader | EntryType::GNULongLink => {
                read_record(reader, size)?;
                continue;
            }
            _ => {}
        }

        let size = pax.size.take().unwrap_or(size);
        let name = if let Some(name) = pax.path.take() {
            name
        } else if !gnu_longname.is_empty() {
            std::mem::take(&mut gnu_longname)
        } else {
            header.path_bytes().into_owned()
        };
        gnu_longname.clear();

        let name = clean_path(&String::from_utf8_lossy(&name));
        trace!("archive entry {name} ({size} bytes)");

        if name == wanted {
            return Ok(Some(size));
        }

        skip_exact(reader, size.next_multiple_of(TAR_BLOCK_SIZE))?;
    }

    Ok(None)
}

/// Reads the complete contents of the entry at `path`.
///
/// A missing entry is reported as [`Error::EntryNotFound`], which callers can
/// tell apart from failures to read the archive.
pub fn read_entry(reader: &mut impl Read, path: &str) -> Result<Vec<u8>> {
    let scan_error = |source| Error::Scan {
        path: clean_path(path),
        source,
    };

    let Some(size) = seek_entry(reader, path).map_err(scan_error)? else {
        return Err(Error::EntryNotFound(clean_path(path)));
    };

    let mut contents = vec![];
    let read = reader
        .take(size)
        .read_to_end(&mut contents)
        .map_err(scan_error)?;
    if read as u64 != size {
        return Err(scan_error(io::ErrorKind::UnexpectedEof.into()));
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::test::{append_file, tar_with};

    #[test]
    fn test_empty_archive() {
        let tar = tar_with(|_| {});
        assert_eq!(seek_entry(&mut &tar[..], "/index.json").unwrap(), None);
        // a stream with no terminator at all also ends the scan cleanly
        assert_eq!(seek_entry(&mut &b""[..], "/index.json").unwrap(), None);
    }

    #[test]
    fn test_seek_positions_at_data() {
        let tar = tar_with(|builder| {
            append_file(builder, "oci-layout", b"marker");
            append_file(builder, "./index.json", b"{}");
            append_file(builder, "trailing", b"after");
        });

        let mut reader = &tar[..];
        assert_eq!(seek_entry(&mut reader, "index.json").unwrap(), Some(2));
        let mut data = [0u8; 2];
        reader.read_exact(&mut data).unwrap();
        assert_eq!(&data, b"{}");
    }

    #[test]
    fn test_read_entry() {
        let tar = tar_with(|builder| {
            append_file(builder, "a", b"first");
            append_file(builder, "blobs/sha256/b", &[7u8; 1000]);
            append_file(builder, "c", b"third");
        });

        assert_eq!(read_entry(&mut &tar[..], "/a").unwrap(), b"first");
        assert_eq!(
            read_entry(&mut &tar[..], "/blobs/sha256/b").unwrap(),
            vec![7u8; 1000]
        );
        assert_eq!(read_entry(&mut &tar[..], "c").unwrap(), b"third");
    }

    #[test]
    fn test_read_entry_not_found() {
        let tar = tar_with(|builder| append_file(builder, "a", b"first"));

        let err = read_entry(&mut &tar[..], "missing").unwrap_err();
        assert!(err.is_entry_not_found());
        assert_eq!(err.to_string(), "entry '/missing' not found in archive");
    }

    #[test]
    fn test_truncated_archive() {
        let tar = tar_with(|builder| {
            append_file(builder, "a", &[1u8; 2000]);
            append_file(builder, "b", b"second");
        });

        // cut into the middle of the first entry's data
        let err = read_entry(&mut &tar[..1024], "b").unwrap_err();
        assert!(!err.is_entry_not_found());
        assert!(matches!(err, Error::Scan { ref path, .. } if path == "/b"));
    }

    #[test]
    fn test_gnu_long_name() {
        let long_path = format!("blobs/sha256/{}", "ab".repeat(64));
        let tar = tar_with(|builder| {
            append_file(builder, "short", b"short");
            append_file(builder, &long_path, b"long");
        });

        assert_eq!(read_entry(&mut &tar[..], &long_path).unwrap(), b"long");
        // the long name must not leak onto the following lookup
        assert_eq!(read_entry(&mut &tar[..], "short").unwrap(), b"short");
    }

    /// Formats one PAX record, whose length prefix counts itself.
    fn pax_record(key: &str, value: &str) -> String {
        let body = format!(" {key}={value}\n");
        let mut len = body.len() + 1;
        while body.len() + len.to_string().len() != len {
            len += 1;
        }
        format!("{len}{body}")
    }

    fn append_pax(builder: &mut tar::Builder<&mut Vec<u8>>, records: &str) {
        let mut pax = Header::new_ustar();
        pax.set_entry_type(EntryType::XHeader);
        pax.set_size(records.len() as u64);
        builder
            .append_data(&mut pax, "PaxHeaders/entry", records.as_bytes())
            .unwrap();
    }

    #[test]
    fn test_pax_path() {
        let long_path = format!("blobs/sha512/{}", "cd".repeat(64));

        let mut tar = vec![];
        {
            let mut builder = tar::Builder::new(&mut tar);
            append_pax(&mut builder, &pax_record("path", &long_path));

            let mut header = Header::new_ustar();
            header.set_entry_type(EntryType::Regular);
            header.set_size(3);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, "truncated-name", &b"pax"[..])
                .unwrap();
            builder.finish().unwrap();
        }

        assert_eq!(read_entry(&mut &tar[..], &long_path).unwrap(), b"pax");
        assert!(read_entry(&mut &tar[..], "truncated-name")
            .unwrap_err()
            .is_entry_not_found());
    }

    #[test]
    fn test_pax_size() {
        // sizes too large for the header field are carried in a PAX record,
        // with the header field left at zero
        let mut tar = vec![];
        {
            let mut builder = tar::Builder::new(&mut tar);
            append_pax(&mut builder, &pax_record("size", "5"));

            let mut header = Header::new_ustar();
            header.set_entry_type(EntryType::Regular);
            header.set_size(0);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, "blob", &b"hello"[..])
                .unwrap();
            append_file(&mut builder, "after", b"after");
            builder.finish().unwrap();
        }

        assert_eq!(read_entry(&mut &tar[..], "blob").unwrap(), b"hello");
        assert_eq!(read_entry(&mut &tar[..], "after").unwrap(), b"after");
    }

    #[test]
    fn test_pax_size_invalid() {
        let tar = tar_with(|builder| {
            append_pax(builder, &pax_record("size", "lots"));
            append_file(builder, "blob", b"hello");
        });

        let err = seek_entry(&mut &tar[..], "blob").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_header_checksum_mismatch() {
        let mut tar = tar_with(|builder| {
            append_file(builder, "oci-layout", b"marker");
            append_file(builder, "index.json", b"{}");
        });
        // rename the first entry without fixing up its checksum
        tar[0] = b'x';

        let err = seek_entry(&mut &tar[..], "index.json").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(err.to_string(), "archive header checksum mismatch");

        let err = read_entry(&mut &tar[..], "index.json").unwrap_err();
        assert!(matches!(err, Error::Scan { .. }));
    }

    #[test]
    fn test_truncated_extension_record() {
        let mut tar = vec![];
        {
            let mut builder = tar::Builder::new(&mut tar);
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::GNULongName);
            // declares far more name data than the stream holds
            header.set_size(1 << 40);
            builder.append_data(&mut header, "././@LongLink", &b"name"[..]).unwrap();
        }

        let err = seek_entry(&mut &tar[..], "name").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
