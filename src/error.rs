//! The `error` module defines the [`HexRecError`] enum that describes the errors that
//! can occur when parsing, editing, or serializing record files.
//! It carries three pieces of information:
//! 1. Where the error occurred, e.g. during parsing, record handling, or a memory operation.
//! 2. What kind of error was encountered (via [`RecordErrorKind`] or [`ImageErrorKind`]).
//! 3. The line number (if applicable), e.g. at which line of a record file the parsing failed.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HexRecError {
    /// Error raised while parsing a record, with the 1-based line number.
    Parse(RecordErrorKind, usize),
    /// Error raised while creating, validating, or regenerating records.
    Record(RecordErrorKind),
    /// Error raised by a sparse image operation.
    Image(ImageErrorKind),
    /// Unknown or ambiguous record format name / file extension.
    UnknownFormat(String),
}

impl HexRecError {
    /// Tells whether this error may be demoted to a warning by the
    /// `ignore_errors` parse option. Checksum, count, and record validation
    /// failures are dismissible; image and format errors never are.
    #[must_use]
    pub fn is_dismissible(&self) -> bool {
        match self {
            Self::Parse(kind, _) | Self::Record(kind) => kind.is_dismissible(),
            Self::Image(_) | Self::UnknownFormat(_) => false,
        }
    }
}

impl fmt::Display for HexRecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(kind, line) => {
                write!(f, "Error while parsing record at line #{line}:\n{kind}")
            }
            Self::Record(kind) => {
                write!(f, "Record error:\n{kind}")
            }
            Self::Image(kind) => {
                write!(f, "Memory image error:\n{kind}")
            }
            Self::UnknownFormat(name) => {
                write!(f, "Unknown record format: {name:?}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordErrorKind {
    /// Line does not match the record grammar of the format
    SyntaxError,
    /// Record checksum differs from the derived one
    ChecksumMismatch { expected: u64, actual: u64 },
    /// Record count field differs from the derived one
    CountMismatch { expected: u64, actual: u64 },
    /// Address does not fit the width permitted by the record tag
    AddressOverflow(u64),
    /// Data length exceeds the cap permitted by the record tag
    DataSizeOverflow(usize),
    /// Data carried by a record whose tag forbids it
    UnexpectedData,
    /// Wire tag value outside the format's enumeration
    InvalidTag(u16),
    /// Non-whitespace junk before the record body
    JunkBefore,
    /// Non-whitespace junk after the record body
    JunkAfter,
    /// No termination record found
    MissingTermination,
    /// Termination record is not in its mandated position
    TerminationNotLast,
    /// Data records mix address widths within one file
    MixedDataWidths,
    /// More than one record of a kind that permits at most one
    MultipleRecords(&'static str),
    /// Terminator record count differs from the number of data records
    WrongRecordCount { expected: u64, actual: u64 },
    /// Header record is not the first record
    HeaderNotFirst,
    /// Count record is not the penultimate record
    CountNotPenultimate,
    /// Serialized address length outside the permitted range
    InvalidAddressLength(usize),
    /// Data length invalid for the format (e.g. not a whole word)
    InvalidDataLength(usize),
    /// Word-oriented format got an odd byte address
    MisalignedWord(u64),
    /// Format requires a single contiguous block
    NotContiguous,
    /// Format requires data to start at address zero
    StartNotZero(u64),
    /// Operation needs the records role, but no records are stored
    RecordsRequired,
    /// Operation needs the memory role, but no memory is stored
    MemoryRequired,
    /// Maximum record data length out of range
    InvalidMaxDataLen(usize),
}

impl RecordErrorKind {
    #[must_use]
    pub fn is_dismissible(&self) -> bool {
        !matches!(self, Self::RecordsRequired | Self::MemoryRequired)
    }
}

impl fmt::Display for RecordErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntaxError => {
                write!(f, "Record syntax error")
            }
            Self::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "Record checksum mismatch - expected: 0x{expected:02X}, found: 0x{actual:02X}"
                )
            }
            Self::CountMismatch { expected, actual } => {
                write!(f, "Record count mismatch - expected: {expected}, found: {actual}")
            }
            Self::AddressOverflow(address) => {
                write!(f, "Address overflow: 0x{address:X}")
            }
            Self::DataSizeOverflow(size) => {
                write!(f, "Data size overflow: {size} bytes")
            }
            Self::UnexpectedData => {
                write!(f, "Unexpected data for this record type")
            }
            Self::InvalidTag(tag) => {
                write!(f, "Invalid record tag: 0x{tag:X}")
            }
            Self::JunkBefore => {
                write!(f, "Junk before record")
            }
            Self::JunkAfter => {
                write!(f, "Junk after record")
            }
            Self::MissingTermination => {
                write!(f, "Missing termination record")
            }
            Self::TerminationNotLast => {
                write!(f, "Termination record not in final position")
            }
            Self::MixedDataWidths => {
                write!(f, "Data records mix address widths")
            }
            Self::MultipleRecords(what) => {
                write!(f, "Multiple {what} records")
            }
            Self::WrongRecordCount { expected, actual } => {
                write!(f, "Wrong data record count - expected: {expected}, found: {actual}")
            }
            Self::HeaderNotFirst => {
                write!(f, "Header record not first")
            }
            Self::CountNotPenultimate => {
                write!(f, "Count record not penultimate")
            }
            Self::InvalidAddressLength(len) => {
                write!(f, "Invalid address length: {len}")
            }
            Self::InvalidDataLength(len) => {
                write!(f, "Invalid data length: {len}")
            }
            Self::MisalignedWord(address) => {
                write!(f, "Byte address not word aligned: 0x{address:X}")
            }
            Self::NotContiguous => {
                write!(f, "Data is not contiguous")
            }
            Self::StartNotZero(address) => {
                write!(f, "First record address not zero: 0x{address:X}")
            }
            Self::RecordsRequired => {
                write!(f, "Records required")
            }
            Self::MemoryRequired => {
                write!(f, "Memory instance required")
            }
            Self::InvalidMaxDataLen(len) => {
                write!(f, "Invalid maximum data length: {len}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageErrorKind {
    /// Write or shift would place data outside the image bounds
    OutOfBounds { address: u64 },
    /// Read without a fill byte hit an unpopulated address
    Hole { address: u64 },
    /// `find` scanned the whole range without a match
    PatternNotFound,
    /// `find` or `fill` called with an empty pattern
    EmptyPattern,
    /// Range start is greater than range end
    InvalidRange { start: u64, end: u64 },
    /// Address arithmetic exceeded the 64-bit address space
    AddressOverflow,
}

impl fmt::Display for ImageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { address } => {
                write!(f, "Address out of bounds: 0x{address:X}")
            }
            Self::Hole { address } => {
                write!(f, "Unpopulated address: 0x{address:X}")
            }
            Self::PatternNotFound => {
                write!(f, "Pattern not found")
            }
            Self::EmptyPattern => {
                write!(f, "Empty pattern")
            }
            Self::InvalidRange { start, end } => {
                write!(f, "Invalid range: 0x{start:X}..0x{end:X}")
            }
            Self::AddressOverflow => {
                write!(f, "Address space overflow")
            }
        }
    }
}

impl Error for HexRecError {}
impl Error for RecordErrorKind {}
impl Error for ImageErrorKind {}

impl From<ImageErrorKind> for HexRecError {
    fn from(kind: ImageErrorKind) -> Self {
        Self::Image(kind)
    }
}

impl From<RecordErrorKind> for HexRecError {
    fn from(kind: RecordErrorKind) -> Self {
        Self::Record(kind)
    }
}
