//! # `hexreclib`
//!
//! `hexreclib` is a Rust library for parsing, editing, converting, and
//! writing hexadecimal record files as used to carry firmware images:
//! Intel HEX, Motorola S-record, TI-TXT, Tektronix (standard and
//! extended), MOS Technology, ASCII-hex, Atmel Generic, and raw binary.
//!
//! The library provides:
//! - [`SparseImage`], an address-indexed sparse byte container with range
//!   read/write/fill/flood/crop/merge/find operations.
//! - [`RecordFile`], a generic record file keeping an ordered record
//!   sequence in sync with its sparse image projection, instantiated per
//!   format (e.g. [`IhexFile`], [`SrecFile`]).
//! - [`AnyFile`] and the [`load`]/[`convert`]/[`merge`] helpers for
//!   runtime format selection and cross-format operations.
//! - Error handling with [`HexRecError`].
//!
//! ## Example
//!
//! ```
//! use hexreclib::{FormatKind, IhexFile, AnyFile};
//!
//! let mut file = IhexFile::parse(b":0B0010006164647265737320676170A7\r\n:00000001FF\r\n").unwrap();
//! assert_eq!(file.read(None, None, None).unwrap(), b"address gap");
//!
//! let mut srec = AnyFile::Ihex(file).convert(FormatKind::Srec);
//! assert!(srec.to_bytes().unwrap().starts_with(b"S0"));
//! ```

mod error;
mod file;
pub mod formats;
mod image;
mod registry;
mod util;

// Public APIs
pub use error::{HexRecError, ImageErrorKind, RecordErrorKind};
pub use file::{
    FileMeta, Format, FormatRecord, ParseOptions, RecordFile, Tag, ValidateOptions,
};
pub use formats::{
    AsciiHexFile, AvrFile, IhexFile, MosFile, RawFile, SrecFile, TekFile, TiTxtFile, XtekFile,
};
pub use image::{Chunks, SparseImage};
pub use registry::{AnyFile, FormatKind, convert, guess_format_name, load, merge, save};
