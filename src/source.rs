//! Module byte acquisition.
//!
//! The player only ever consumes raw bytes. These helpers read them from the
//! filesystem or any reader and map failures to
//! [`PlayerError::Acquisition`].

use crate::error::{PlayerError, Result};
use std::io::Read;
use std::path::Path;

/// Read a whole module file into memory.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| PlayerError::acquisition(path, e))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "module loaded");
    Ok(bytes)
}

/// Drain a reader into memory.
pub fn load_reader<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| PlayerError::acquisition("<stream>", e))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Extended Module: ").unwrap();

        let bytes = load_file(file.path()).unwrap();
        assert_eq!(bytes, b"Extended Module: ");
    }

    #[test]
    fn test_missing_file() {
        let err = load_file("/definitely/not/here.mod").unwrap_err();
        assert!(matches!(err, PlayerError::Acquisition { .. }));
    }

    #[test]
    fn test_load_reader() {
        let bytes = load_reader(&b"IMPM"[..]).unwrap();
        assert_eq!(bytes, b"IMPM");
    }

    #[test]
    fn test_failing_reader() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "socket closed"))
            }
        }
        let err = load_reader(Broken).unwrap_err();
        assert!(err.to_string().contains("socket closed"));
    }
}
