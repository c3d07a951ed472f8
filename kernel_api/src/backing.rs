//! Byte-addressable backing stores.
//!
//! A [`Backing`] is where program descriptor bytes come from. The kernel
//! only ever asks for its length and for exact reads at an offset, so a
//! container entry, a file on disk and an in-memory buffer all look alike.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackingError {
    /// Requested range does not lie inside the backing
    #[error("Read of {len} bytes at offset 0x{offset:X} exceeds backing size 0x{size:X}")]
    OutOfBounds { offset: u64, len: usize, size: u64 },

    /// Underlying storage failed
    #[error("Backing I/O error: {0}")]
    Io(String),
}

/// Random-access, read-only byte source
pub trait Backing {
    /// Declared size in bytes
    fn len(&self) -> u64;

    /// Fills `buf` with the bytes at `offset`, or fails without partial reads
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), BackingError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_range(offset: u64, len: usize, size: u64) -> Result<(), BackingError> {
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(BackingError::OutOfBounds { offset, len, size }),
    }
}

impl Backing for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), BackingError> {
        check_range(offset, buf.len(), Backing::len(self))?;
        let start = offset as usize;
        buf.copy_from_slice(&self[start..start + buf.len()]);
        Ok(())
    }
}

impl Backing for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), BackingError> {
        self.as_slice().read_at(offset, buf)
    }
}

/// Backing over a file on the host filesystem
///
/// The length is captured at open time; reads are serialized through the
/// file cursor.
#[derive(Debug)]
pub struct FileBacking {
    file: Mutex<File>,
    len: u64,
}

impl FileBacking {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackingError> {
        let file = File::open(path).map_err(|e| BackingError::Io(e.to_string()))?;
        Self::from_file(file)
    }

    pub fn from_file(file: File) -> Result<Self, BackingError> {
        let len = file
            .metadata()
            .map_err(|e| BackingError::Io(e.to_string()))?
            .len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl Backing for FileBacking {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), BackingError> {
        check_range(offset, buf.len(), self.len)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| BackingError::Io("file lock poisoned".to_string()))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| BackingError::Io(e.to_string()))?;
        file.read_exact(buf)
            .map_err(|e| BackingError::Io(e.to_string()))
    }
}
