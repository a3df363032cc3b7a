use std::io::{Error, ErrorKind, Read, Result};

/// This function reads the exact amount of bytes required to fill the buffer, possibly performing
/// multiple reads to do so (and also retrying if required to deal with EINTR).
///
/// Unlike the standard Read::read_exact() method, it's possible to tell an incomplete read (some
/// bytes were read, but the buffer wasn't filled) apart from a "clean" EOF where the stream ended
/// before any data was read at all.  The latter is still considered to be a success.
///
/// # Return value
///
///  - Ok(true) if the buffer was filled
///  - Ok(false) on a clean EOF
///  - an Error with ErrorKind::UnexpectedEof after a partial read
///  - errors from the Read implementation are returned directly
pub(crate) fn read_exactish(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    let buflen = buf.len();
    let mut todo: &mut [u8] = buf;

    while !todo.is_empty() {
        match reader.read(todo) {
            Ok(0) => {
                return match todo.len() {
                    s if s == buflen => Ok(false), // clean EOF
                    _ => Err(Error::from(ErrorKind::UnexpectedEof)),
                };
            }
            Ok(n) => todo = &mut todo[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(true)
}

/// Discards exactly `count` bytes from the reader.
pub(crate) fn skip_exact(reader: &mut impl Read, count: u64) -> Result<()> {
    let skipped = std::io::copy(&mut reader.by_ref().take(count), &mut std::io::sink())?;
    if skipped != count {
        return Err(Error::from(ErrorKind::UnexpectedEof));
    }
    Ok(())
}

/// Lexically normalizes an archive path into absolute form.
///
/// The result always starts with '/', contains no empty, "." or ".." components and has no
/// trailing slash.  ".." at the root stays at the root.
pub fn clean_path(path: &str) -> String {
    let mut components: Vec<&str> = vec![];
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            name => components.push(name),
        }
    }
    format!("/{}", components.join("/"))
}
