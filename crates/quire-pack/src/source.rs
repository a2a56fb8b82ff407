use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;

use crate::error::{PackError, PackResult};

/// A finite, randomly sliceable byte source.
///
/// The segmenter only ever asks for one segment-sized range at a time, so a
/// source backed by a file or a remote object never has to be materialized in
/// full.
pub trait SliceSource {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Returns `true` if the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes in `start..end`.
    fn read_range(&self, start: u64, end: u64) -> PackResult<Bytes>;
}

fn check_range(start: u64, end: u64, len: u64) -> PackResult<()> {
    if start > end || end > len {
        return Err(PackError::OutOfBounds { start, end, len });
    }
    Ok(())
}

impl SliceSource for Bytes {
    fn len(&self) -> u64 {
        Bytes::len(self) as u64
    }

    fn read_range(&self, start: u64, end: u64) -> PackResult<Bytes> {
        check_range(start, end, SliceSource::len(self))?;
        Ok(self.slice(start as usize..end as usize))
    }
}

impl SliceSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_range(&self, start: u64, end: u64) -> PackResult<Bytes> {
        check_range(start, end, SliceSource::len(self))?;
        Ok(Bytes::copy_from_slice(&self[start as usize..end as usize]))
    }
}

impl SliceSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_range(&self, start: u64, end: u64) -> PackResult<Bytes> {
        self.as_slice().read_range(start, end)
    }
}

impl<S: SliceSource + ?Sized> SliceSource for &S {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_range(&self, start: u64, end: u64) -> PackResult<Bytes> {
        (**self).read_range(start, end)
    }
}

/// A file read one range at a time.
///
/// The length is fixed when the file is opened. Each `read_range` seeks and
/// reads only the requested bytes, so a large file is never loaded whole. A
/// file that shrinks while the source is alive yields an I/O error for the
/// missing range.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    /// Open the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> PackResult<Self> {
        Self::from_file(File::open(path.as_ref())?)
    }

    /// Wrap an already-open file.
    pub fn from_file(file: File) -> PackResult<Self> {
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl SliceSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, start: u64, end: u64) -> PackResult<Bytes> {
        check_range(start, end, self.len)?;
        let mut buf = vec![0u8; (end - start) as usize];
        let mut file = self.file.lock().expect("lock poisoned");
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn slice_ranges() {
        let data: &[u8] = b"hello world";
        assert_eq!(SliceSource::len(data), 11);
        assert_eq!(data.read_range(6, 11).unwrap(), Bytes::from_static(b"world"));
        assert!(data.read_range(0, 0).unwrap().is_empty());
    }

    #[test]
    fn bytes_ranges_share_storage() {
        let data = Bytes::from_static(b"abcdef");
        assert_eq!(data.read_range(2, 4).unwrap(), Bytes::from_static(b"cd"));
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let data = vec![0u8; 4];
        assert!(matches!(
            data.read_range(2, 5),
            Err(PackError::OutOfBounds { start: 2, end: 5, len: 4 })
        ));
        assert!(data.read_range(3, 2).is_err());
    }

    #[test]
    fn file_source_reads_file_ranges() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ranged file contents").unwrap();
        file.flush().unwrap();

        let source = FileSource::open(file.path()).unwrap();
        assert_eq!(source.len(), 20);
        assert_eq!(source.read_range(7, 11).unwrap(), Bytes::from_static(b"file"));
        assert_eq!(source.read_range(0, 6).unwrap(), Bytes::from_static(b"ranged"));
        assert!(source.read_range(10, 21).is_err());
    }

    #[test]
    fn file_source_handles_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = FileSource::open(file.path()).unwrap();
        assert!(source.is_empty());
        assert!(source.read_range(0, 0).unwrap().is_empty());
    }

    #[test]
    fn truncated_file_is_an_io_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 64]).unwrap();
        file.flush().unwrap();

        let source = FileSource::open(file.path()).unwrap();
        file.as_file().set_len(16).unwrap();
        assert!(matches!(source.read_range(0, 64), Err(PackError::Io(_))));
        assert_eq!(source.read_range(0, 16).unwrap().len(), 16);
    }
}
