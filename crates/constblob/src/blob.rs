//! Locating the constants blob and checking its integrity.
//!
//! Layout:
//!
//! ```text
//! u32 crc32(payload)    little-endian
//! u32 payload_size      little-endian
//! payload:
//!     repeated { cstring name, u32 size, size bytes of segment body }
//! ```

use std::{
    borrow::Cow,
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    error::{BlobError, BlobResult},
    reader::BlobReader,
    value::BlobSpan,
};

/// Size of the checksum + payload-size header.
pub const HEADER_LEN: usize = 8;

/// Segment holding the constants of the compiled program's bytecode. It is
/// decoded without dedup.
pub const BYTECODE_SEGMENT: &str = ".bytecode";

/// CRC-32 (ISO-HDLC) of a payload, as stored in the blob header.
#[must_use]
pub fn payload_checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Source of the blob bytes.
///
/// Located once per runtime; the bytes are kept for the runtime's lifetime.
pub trait BlobLocator {
    fn locate(&self) -> BlobResult<Cow<'static, [u8]>>;

    /// Short description for log messages.
    fn describe(&self) -> String;
}

/// Blob compiled into the program, e.g. via `include_bytes!`.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedBlob(pub &'static [u8]);

impl BlobLocator for EmbeddedBlob {
    fn locate(&self) -> BlobResult<Cow<'static, [u8]>> {
        Ok(Cow::Borrowed(self.0))
    }

    fn describe(&self) -> String {
        format!("embedded ({} bytes)", self.0.len())
    }
}

/// Blob stored as a separate file.
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
}

impl FileBlob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Blob file named `file_name` in the directory of the running executable.
    pub fn beside_executable(file_name: impl AsRef<Path>) -> BlobResult<Self> {
        let exe = std::env::current_exe().map_err(|source| BlobError::Io {
            path: PathBuf::from("<current executable>"),
            source,
        })?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::new(dir.join(file_name)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlobLocator for FileBlob {
    fn locate(&self) -> BlobResult<Cow<'static, [u8]>> {
        std::fs::read(&self.path).map(Cow::Owned).map_err(|source| BlobError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Blob already held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryBlob(pub Vec<u8>);

impl BlobLocator for InMemoryBlob {
    fn locate(&self) -> BlobResult<Cow<'static, [u8]>> {
        Ok(Cow::Owned(self.0.clone()))
    }

    fn describe(&self) -> String {
        format!("in-memory ({} bytes)", self.0.len())
    }
}

/// A blob whose header has been checked against its payload.
pub struct ConstantsBlob {
    data: Cow<'static, [u8]>,
    payload_len: usize,
    checksum: u32,
}

impl fmt::Debug for ConstantsBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantsBlob")
            .field("payload_len", &self.payload_len)
            .field("checksum", &format_args!("{:#010x}", self.checksum))
            .finish_non_exhaustive()
    }
}

impl ConstantsBlob {
    /// Validates the header and checksum of raw blob bytes.
    pub fn verify(data: Cow<'static, [u8]>) -> BlobResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(BlobError::TooSmall {
                got: data.len(),
                min: HEADER_LEN,
            });
        }
        let mut header = BlobReader::new(&data[..HEADER_LEN]);
        let expected = header.read_u32()?;
        let declared = header.read_u32()? as usize;
        let available = data.len() - HEADER_LEN;
        if declared > available {
            return Err(BlobError::SizeMismatch {
                declared,
                actual: available,
            });
        }
        let actual = payload_checksum(&data[HEADER_LEN..HEADER_LEN + declared]);
        if actual != expected {
            return Err(BlobError::ChecksumMismatch { expected, actual });
        }
        Ok(Self {
            data,
            payload_len: declared,
            checksum: actual,
        })
    }

    /// The payload, without header or trailing bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[HEADER_LEN..HEADER_LEN + self.payload_len]
    }

    #[must_use]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Iterates over the segment records in payload order.
    #[must_use]
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            reader: BlobReader::new(self.payload()),
            failed: false,
        }
    }

    /// Finds the segment with the given name.
    pub fn find_segment(&self, name: &str) -> BlobResult<Segment<'_>> {
        for segment in self.segments() {
            let segment = segment?;
            if segment.name == name {
                return Ok(segment);
            }
        }
        Err(BlobError::SegmentNotFound(name.to_owned()))
    }

    /// Bytes of a raw-data span, or `None` if it lies outside the payload.
    #[must_use]
    pub fn raw(&self, span: BlobSpan) -> Option<&[u8]> {
        let end = span.offset.checked_add(span.len)?;
        self.payload().get(span.offset..end)
    }
}

/// One named segment of the payload.
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    pub name: &'a str,
    /// Offset of the segment body from the start of the payload.
    pub offset: usize,
    pub data: &'a [u8],
}

/// Iterator over the segment records of a blob.
///
/// Stops after the first malformed record.
#[derive(Debug)]
pub struct Segments<'a> {
    reader: BlobReader<'a>,
    failed: bool,
}

impl<'a> Segments<'a> {
    fn read_segment(&mut self) -> BlobResult<Segment<'a>> {
        let name_offset = self.reader.offset();
        let name = self.reader.read_cstr()?;
        let name = std::str::from_utf8(name).map_err(|_| BlobError::InvalidText { offset: name_offset })?;
        let size = self.reader.read_u32()? as usize;
        let offset = self.reader.offset();
        let data = self.reader.read_bytes(size)?;
        Ok(Segment { name, offset, data })
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = BlobResult<Segment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        let result = self.read_segment();
        self.failed = result.is_err();
        Some(result)
    }
}
