//! Record format implementations.
//!
//! Each submodule provides one wire format: its tag enumeration, record
//! type, metadata, and the [`Format`](crate::Format) implementation tying
//! them together.

pub mod asciihex;
pub mod avr;
pub mod ihex;
pub mod mos;
pub mod raw;
pub mod srec;
pub mod tek;
pub mod titxt;
pub mod xtek;

pub use asciihex::{AsciiHex, AsciiHexFile, AsciiHexMeta, AsciiHexRecord, AsciiHexTag};
pub use avr::{Avr, AvrFile, AvrMeta, AvrRecord, AvrTag};
pub use ihex::{Ihex, IhexFile, IhexMeta, IhexRecord, IhexTag};
pub use mos::{Mos, MosFile, MosMeta, MosRecord, MosTag};
pub use raw::{Raw, RawFile, RawMeta, RawRecord, RawTag};
pub use srec::{Srec, SrecFile, SrecMeta, SrecRecord, SrecTag};
pub use tek::{Tek, TekFile, TekMeta, TekRecord, TekTag};
pub use titxt::{TiTxt, TiTxtFile, TiTxtMeta, TiTxtRecord, TiTxtTag};
pub use xtek::{Xtek, XtekFile, XtekMeta, XtekRecord, XtekTag};
