//! The `file` module defines the polymorphic record file framework: the
//! [`Format`] capability trait implemented once per record format, and the
//! generic [`RecordFile`] container holding an ordered record sequence
//! together with its [`SparseImage`] projection.
//!
//! A `RecordFile` is always in at least one of two roles:
//! * *records role* — the parsed/generated record sequence is authoritative;
//! * *memory role* — the sparse image is authoritative.
//!
//! Editing the image discards the records (they regenerate lazily via
//! [`Format::update_records`]); accessing the image while only records are
//! stored projects them via [`Format::apply_records`].

use std::error::Error;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{HexRecError, RecordErrorKind};
use crate::image::SparseImage;

/// Record tag capabilities common to every format.
pub trait Tag: Copy + Eq + fmt::Debug {
    /// Tells whether this tag marks a record carrying plain memory data.
    fn is_data(self) -> bool;

    /// Tells whether this tag terminates a record file.
    fn is_file_termination(self) -> bool {
        false
    }
}

/// Record capabilities common to every format.
pub trait FormatRecord: Clone + fmt::Debug {
    type Tag: Tag;

    fn tag(&self) -> Self::Tag;

    fn address(&self) -> u64;

    fn data(&self) -> &[u8];

    /// Serializes the exact on-wire bytes of the record, including any
    /// preserved `before`/`after` bytes and the line terminator.
    fn to_bytes(&self) -> Vec<u8>;

    /// Checks the record invariants: address width, data length caps, and
    /// the `count`/`checksum` fields against their derived values.
    fn validate(&self) -> Result<(), RecordErrorKind>;
}

/// Per-format metadata carried beside the image (start address, header, ...).
///
/// The accessors cover the keys shared across formats so that conversion can
/// transfer them; formats without a concept simply keep the defaults.
pub trait FileMeta: Default + Clone + fmt::Debug + PartialEq {
    fn start_address(&self) -> Option<u64> {
        None
    }

    fn set_start_address(&mut self, _address: Option<u64>) {}

    fn header(&self) -> Option<&[u8]> {
        None
    }

    fn set_header(&mut self, _header: Option<Vec<u8>>) {}
}

/// Options for [`RecordFile::parse_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Demote dismissible record errors (checksum, count, validation) to the
    /// warning list, skipping the offending line.
    pub ignore_errors: bool,
    /// Stop reading once the format's termination record was parsed.
    pub ignore_after_termination: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            ignore_errors: false,
            ignore_after_termination: true,
        }
    }
}

/// Options for [`RecordFile::validate_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Tolerate record sequences that are accepted in the wild but violate
    /// the strict format rules (e.g. SREC files mixing address widths).
    pub lax: bool,
}

/// Capability trait implemented once per record format.
pub trait Format: Sized {
    type Tag: Tag;
    type Record: FormatRecord<Tag = Self::Tag>;
    type Meta: FileMeta;

    /// Canonical registry name.
    const NAME: &'static str;

    /// File extensions (with leading dot) typically mapped to this format.
    const FILE_EXTENSIONS: &'static [&'static str];

    /// Default maximum data field size of an emitted data record.
    const DEFAULT_DATALEN: usize;

    /// Parses a byte stream into records, collecting demoted errors.
    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<Self::Record>, Vec<HexRecError>), HexRecError>;

    /// Projects records onto a fresh image and format metadata.
    fn apply_records(records: &[Self::Record]) -> (SparseImage, Self::Meta);

    /// Derives a record sequence reconstructing `image` byte-for-byte,
    /// honoring `meta` and the `maxdatalen` chunking cap.
    fn update_records(
        image: &SparseImage,
        meta: &Self::Meta,
        maxdatalen: usize,
    ) -> Result<Vec<Self::Record>, HexRecError>;

    /// Checks the record-sequence invariants of the format.
    fn validate_records(
        records: &[Self::Record],
        options: &ValidateOptions,
    ) -> Result<(), HexRecError>;

    /// Serializes the records back to wire bytes.
    fn serialize_records(records: &[Self::Record], out: &mut Vec<u8>) {
        for record in records {
            out.extend_from_slice(&record.to_bytes());
        }
    }
}

/// Ordered record sequence plus its sparse image projection, generic over
/// the record [`Format`].
///
/// # Examples
/// ```
/// use hexreclib::IhexFile;
///
/// let mut file = IhexFile::parse(b":0300300002337A1E\r\n:00000001FF\r\n").unwrap();
/// assert_eq!(file.image().to_blocks(), vec![(0x30, vec![0x02, 0x33, 0x7A])]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordFile<F: Format> {
    records: Option<Vec<F::Record>>,
    image: Option<SparseImage>,
    meta: F::Meta,
    maxdatalen: usize,
    warnings: Vec<HexRecError>,
}

impl<F: Format> Default for RecordFile<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Format> RecordFile<F> {
    /// Creates an empty file in memory role.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: None,
            image: Some(SparseImage::new()),
            meta: F::Meta::default(),
            maxdatalen: F::DEFAULT_DATALEN,
            warnings: Vec::new(),
        }
    }

    /// Creates a file from an existing image.
    #[must_use]
    pub fn from_image(image: SparseImage) -> Self {
        let mut file = Self::new();
        file.image = Some(image);
        file
    }

    /// Creates a file holding `data` as a single block at `offset`.
    #[must_use]
    pub fn from_bytes(data: &[u8], offset: u64) -> Self {
        Self::from_image(SparseImage::from_bytes(data, offset))
    }

    /// Creates a file from `(address, bytes)` pairs.
    #[must_use]
    pub fn from_blocks<I, D>(blocks: I) -> Self
    where
        I: IntoIterator<Item = (u64, D)>,
        D: AsRef<[u8]>,
    {
        Self::from_image(SparseImage::from_blocks(blocks))
    }

    /// Creates a file in records role. The maximum data length is inferred
    /// from the largest data record, falling back to the format default.
    #[must_use]
    pub fn from_records(records: Vec<F::Record>) -> Self {
        let maxdatalen = records
            .iter()
            .filter(|record| record.tag().is_data())
            .map(|record| record.data().len())
            .max()
            .filter(|&len| len > 0)
            .unwrap_or(F::DEFAULT_DATALEN);

        Self {
            records: Some(records),
            image: None,
            meta: F::Meta::default(),
            maxdatalen,
            warnings: Vec::new(),
        }
    }

    /// Parses a byte stream with default options.
    pub fn parse(bytes: &[u8]) -> Result<Self, HexRecError> {
        Self::parse_with(bytes, &ParseOptions::default())
    }

    /// Parses a byte stream. With [`ParseOptions::ignore_errors`] set, the
    /// demoted errors are collected into [`warnings`](Self::warnings).
    pub fn parse_with(bytes: &[u8], options: &ParseOptions) -> Result<Self, HexRecError> {
        let (records, warnings) = F::parse_records(bytes, options)?;
        let mut file = Self::from_records(records);
        file.warnings = warnings;
        Ok(file)
    }

    /// Reads and parses a file from the filesystem.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let bytes = fs::read(path)?;
        Ok(Self::parse(&bytes)?)
    }

    /// Serializes to the filesystem, regenerating stale records first.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Box<dyn Error>> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Serializes to wire bytes, regenerating stale records first.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, HexRecError> {
        let mut out = Vec::new();
        F::serialize_records(self.records()?, &mut out);
        Ok(out)
    }

    /// Writes the serialized records to standard output.
    pub fn print(&mut self) -> Result<(), Box<dyn Error>> {
        let bytes = self.to_bytes()?;
        std::io::stdout().write_all(&bytes)?;
        Ok(())
    }

    /// Errors demoted to warnings by the last `parse_with` call.
    #[must_use]
    pub fn warnings(&self) -> &[HexRecError] {
        &self.warnings
    }

    /// Maximum data field size used when regenerating records.
    #[must_use]
    pub fn maxdatalen(&self) -> usize {
        self.maxdatalen
    }

    /// Updates the maximum data field size; stored records become stale.
    pub fn set_maxdatalen(&mut self, maxdatalen: usize) -> Result<(), HexRecError> {
        if maxdatalen < 1 {
            return Err(RecordErrorKind::InvalidMaxDataLen(maxdatalen).into());
        }
        if maxdatalen != self.maxdatalen {
            self.discard_records();
        }
        self.maxdatalen = maxdatalen;
        Ok(())
    }

    /// The image projection, applying stored records first if needed.
    pub fn image(&mut self) -> &SparseImage {
        self.ensure_image()
    }

    /// Mutable image access. The stored records are discarded: after any
    /// edit they no longer reflect the memory content.
    pub fn image_mut(&mut self) -> &mut SparseImage {
        self.ensure_image();
        self.records = None;
        self.image.get_or_insert_with(SparseImage::new)
    }

    /// Consumes the file, returning its image projection.
    #[must_use]
    pub fn into_image(mut self) -> SparseImage {
        self.ensure_image();
        self.image.take().unwrap_or_default()
    }

    /// The record sequence, regenerating from the image first if needed.
    pub fn records(&mut self) -> Result<&[F::Record], HexRecError> {
        if self.records.is_none() {
            self.update_records()?;
        }
        match &self.records {
            Some(records) => Ok(records),
            None => Err(RecordErrorKind::RecordsRequired.into()),
        }
    }

    /// Format metadata (start address, header, ...), applying stored
    /// records first so parsed meta information is visible.
    pub fn meta(&mut self) -> &F::Meta {
        self.ensure_image();
        &self.meta
    }

    /// Mutable metadata access; stored records become stale.
    pub fn meta_mut(&mut self) -> &mut F::Meta {
        self.ensure_image();
        self.records = None;
        &mut self.meta
    }

    /// Start address stated by the file, if the format carries one.
    pub fn start_address(&mut self) -> Option<u64> {
        self.meta().start_address()
    }

    pub fn set_start_address(&mut self, address: Option<u64>) {
        self.meta_mut().set_start_address(address);
    }

    /// Header bytes stated by the file, if the format carries them.
    pub fn header(&mut self) -> Option<Vec<u8>> {
        self.meta().header().map(<[u8]>::to_vec)
    }

    pub fn set_header(&mut self, header: Option<Vec<u8>>) {
        self.meta_mut().set_header(header);
    }

    /// Regenerates records from the image, keeping both roles fresh.
    pub fn update_records(&mut self) -> Result<(), HexRecError> {
        let image = self
            .image
            .as_ref()
            .ok_or(HexRecError::Record(RecordErrorKind::MemoryRequired))?;
        let records = F::update_records(image, &self.meta, self.maxdatalen)?;
        self.records = Some(records);
        Ok(())
    }

    /// Projects records onto the image, keeping both roles fresh.
    pub fn apply_records(&mut self) -> Result<(), HexRecError> {
        let records = self
            .records
            .as_ref()
            .ok_or(HexRecError::Record(RecordErrorKind::RecordsRequired))?;
        let (image, meta) = F::apply_records(records);
        self.image = Some(image);
        self.meta = meta;
        Ok(())
    }

    /// Drops the stored records; they regenerate on next access.
    pub fn discard_records(&mut self) {
        self.ensure_image();
        self.records = None;
    }

    /// Drops the image projection; it regenerates on next access.
    pub fn discard_image(&mut self) {
        if self.records.is_some() {
            self.image = None;
        } else {
            self.image = Some(SparseImage::new());
        }
    }

    /// Validates the record-sequence invariants with default options.
    pub fn validate(&mut self) -> Result<(), HexRecError> {
        self.validate_with(&ValidateOptions::default())
    }

    pub fn validate_with(&mut self, options: &ValidateOptions) -> Result<(), HexRecError> {
        F::validate_records(self.records()?, options)
    }

    // ---- image edit operations -------------------------------------------

    /// Overwrites `[offset, offset + bytes.len())`.
    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), HexRecError> {
        self.image_mut().write(offset, bytes).map_err(Into::into)
    }

    /// Reads a range; `None` edges default to the populated span.
    pub fn read(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
        fill: Option<u8>,
    ) -> Result<Vec<u8>, HexRecError> {
        let image = self.image();
        let (start, end) = resolve_range(image, start, end);
        image.read(start, end, fill).map_err(Into::into)
    }

    /// Borrows a contiguous range of populated bytes.
    pub fn view(&mut self, start: u64, end: u64) -> Result<&[u8], HexRecError> {
        self.image().view(start, end).map_err(Into::into)
    }

    /// Clears a range, making a hole.
    pub fn clear(&mut self, start: Option<u64>, end: Option<u64>) -> Result<(), HexRecError> {
        let image = self.image_mut();
        let (start, end) = resolve_range(image, start, end);
        image.clear(start, end).map_err(Into::into)
    }

    /// Synonym of [`clear`](Self::clear).
    pub fn delete(&mut self, start: Option<u64>, end: Option<u64>) -> Result<(), HexRecError> {
        self.clear(start, end)
    }

    /// Deletes everything outside the range and bounds the image to it.
    pub fn crop(&mut self, start: Option<u64>, end: Option<u64>) -> Result<(), HexRecError> {
        let image = self.image_mut();
        let (start, end) = resolve_range(image, start, end);
        image.crop(start, end).map_err(Into::into)
    }

    /// Overwrites a range with a repeated pattern anchored at its start.
    pub fn fill(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
        pattern: &[u8],
    ) -> Result<(), HexRecError> {
        let image = self.image_mut();
        let (start, end) = resolve_range(image, start, end);
        image.fill(start, end, pattern).map_err(Into::into)
    }

    /// Fills only the holes within a range.
    pub fn flood(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
        pattern: &[u8],
    ) -> Result<(), HexRecError> {
        let image = self.image_mut();
        let (start, end) = resolve_range(image, start, end);
        image.flood(start, end, pattern).map_err(Into::into)
    }

    /// Translates all data by `offset`.
    pub fn shift(&mut self, offset: i64) -> Result<(), HexRecError> {
        self.image_mut().shift(offset).map_err(Into::into)
    }

    /// Pads block boundaries out to multiples of `modulo`.
    pub fn align(&mut self, modulo: u64, pattern: &[u8]) -> Result<(), HexRecError> {
        self.image_mut().align(modulo, pattern).map_err(Into::into)
    }

    /// First absolute address of `pattern` within the range.
    pub fn find(
        &mut self,
        pattern: &[u8],
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<u64, HexRecError> {
        self.image().find(pattern, start, end).map_err(Into::into)
    }

    /// Writes the data of another file over this one; the other file's
    /// bytes win where addresses overlap.
    pub fn merge<G: Format>(&mut self, other: &mut RecordFile<G>) -> Result<(), HexRecError> {
        let other_image = other.image().clone();
        self.image_mut().merge(&other_image).map_err(Into::into)
    }

    /// Appends a byte right after the populated span.
    pub fn append(&mut self, byte: u8) -> Result<(), HexRecError> {
        self.extend(&[byte])
    }

    /// Appends bytes right after the populated span.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), HexRecError> {
        let image = self.image_mut();
        let offset = image.end().unwrap_or(0);
        image.write(offset, bytes).map_err(Into::into)
    }

    /// Copies a range into a new file carrying the same metadata.
    pub fn copy_range(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<Self, HexRecError> {
        let image = self.image();
        let (start, end) = resolve_range(image, start, end);
        let inner = image.extract(start, end)?;

        let mut copied = Self::from_image(inner);
        copied.meta = self.meta.clone();
        copied.maxdatalen = self.maxdatalen;
        Ok(copied)
    }

    /// Takes a range away into a new file, clearing it from this one.
    pub fn cut(&mut self, start: Option<u64>, end: Option<u64>) -> Result<Self, HexRecError> {
        let inner = self.copy_range(start, end)?;
        let (start, end) = {
            let image = self.image_mut();
            resolve_range(image, start, end)
        };
        self.image_mut().clear(start, end)?;
        Ok(inner)
    }

    /// Splits the file at `address`: this file keeps the lower part, the
    /// returned file carries `[address, end)`.
    pub fn split_at(&mut self, address: u64) -> Result<Self, HexRecError> {
        self.cut(Some(address), None)
    }

    /// Lowest populated address.
    pub fn address_min(&mut self) -> Option<u64> {
        self.image().start()
    }

    /// One past the highest populated address.
    pub fn address_max(&mut self) -> Option<u64> {
        self.image().end()
    }

    /// Unpopulated ranges between the first and last populated address.
    pub fn holes(&mut self) -> Vec<(u64, u64)> {
        self.image().holes()
    }

    /// Populated block ranges.
    pub fn spans(&mut self) -> Vec<(u64, u64)> {
        self.image().spans()
    }

    fn ensure_image(&mut self) -> &mut SparseImage {
        if self.image.is_none()
            && let Some(records) = &self.records
        {
            let (image, meta) = F::apply_records(records);
            self.image = Some(image);
            self.meta = meta;
        }
        self.image.get_or_insert_with(SparseImage::new)
    }
}

fn resolve_range(image: &SparseImage, start: Option<u64>, end: Option<u64>) -> (u64, u64) {
    let start = start.or_else(|| image.start()).unwrap_or(0);
    let end = end.or_else(|| image.end()).unwrap_or(start).max(start);
    (start, end)
}

/// Splits a byte stream into `(line_number, line)` couples, keeping the
/// line terminator attached. Line numbers are 1-based.
pub(crate) fn split_lines(bytes: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    let mut offset = 0;
    let mut line_number = 0;
    std::iter::from_fn(move || {
        if offset >= bytes.len() {
            return None;
        }
        let rest = &bytes[offset..];
        let length = match rest.iter().position(|&byte| byte == b'\n') {
            Some(index) => index + 1,
            None => rest.len(),
        };
        offset += length;
        line_number += 1;
        Some((line_number, &rest[..length]))
    })
}

pub(crate) fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Shared line-by-line parse driver for the line-oriented formats.
/// Blank lines are skipped; dismissible errors are demoted to warnings when
/// requested; parsing stops after the termination record by default.
pub(crate) fn parse_lines<R, P>(
    bytes: &[u8],
    options: &ParseOptions,
    mut parse_line: P,
) -> Result<(Vec<R>, Vec<HexRecError>), HexRecError>
where
    R: FormatRecord,
    P: FnMut(&[u8]) -> Result<R, RecordErrorKind>,
{
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (line_number, line) in split_lines(bytes) {
        if is_blank(line) {
            continue;
        }
        match parse_line(line) {
            Ok(record) => {
                let terminate = record.tag().is_file_termination();
                records.push(record);
                if terminate && options.ignore_after_termination {
                    break;
                }
            }
            Err(kind) => {
                let error = HexRecError::Parse(kind, line_number);
                if options.ignore_errors && error.is_dismissible() {
                    warnings.push(error);
                } else {
                    return Err(error);
                }
            }
        }
    }
    Ok((records, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::SrecFile;

    fn sample_file() -> SrecFile {
        SrecFile::from_blocks([(123u64, b"abc".to_vec()), (130, b"xyz".to_vec())])
    }

    #[test]
    fn test_copy_range_leaves_source_unchanged() {
        // Arrange
        let mut file = sample_file();
        file.set_start_address(Some(0x42));

        // Act
        let mut copied = file.copy_range(Some(124), Some(132)).unwrap();

        // Assert: clipped copy, source intact, metadata carried over
        assert_eq!(
            copied.image().to_blocks(),
            vec![(124, b"bc".to_vec()), (130, b"xy".to_vec())]
        );
        assert_eq!(
            file.image().to_blocks(),
            vec![(123, b"abc".to_vec()), (130, b"xyz".to_vec())]
        );
        assert_eq!(copied.start_address(), Some(0x42));
    }

    #[test]
    fn test_copy_range_matches_image_extract() {
        // Arrange
        let mut file = sample_file();

        // Act
        let mut copied = file.copy_range(Some(120), Some(140)).unwrap();
        let extracted = file.image().extract(120, 140).unwrap();

        // Assert
        assert_eq!(copied.image(), &extracted);
    }

    #[test]
    fn test_cut_clears_range_and_returns_it() {
        // Arrange
        let mut file = sample_file();

        // Act
        let mut inner = file.cut(Some(124), Some(132)).unwrap();

        // Assert
        assert_eq!(
            inner.image().to_blocks(),
            vec![(124, b"bc".to_vec()), (130, b"xy".to_vec())]
        );
        assert_eq!(
            file.image().to_blocks(),
            vec![(123, b"a".to_vec()), (132, b"z".to_vec())]
        );
    }

    #[test]
    fn test_cut_piece_round_trips_through_records() {
        // Arrange
        let mut file = sample_file();

        // Act: serialize the cut piece and read it back
        let mut inner = file.cut(Some(130), Some(133)).unwrap();
        let bytes = inner.to_bytes().unwrap();
        let mut parsed = SrecFile::parse(&bytes).unwrap();

        // Assert
        assert_eq!(parsed.image().to_blocks(), vec![(130, b"xyz".to_vec())]);
    }

    #[test]
    fn test_split_at_block_boundary() {
        // Arrange
        let mut file = sample_file();

        // Act
        let mut upper = file.split_at(130).unwrap();

        // Assert
        assert_eq!(file.image().to_blocks(), vec![(123, b"abc".to_vec())]);
        assert_eq!(upper.image().to_blocks(), vec![(130, b"xyz".to_vec())]);
    }

    #[test]
    fn test_split_at_mid_block() {
        // Arrange
        let mut file = sample_file();

        // Act
        let mut upper = file.split_at(124).unwrap();

        // Assert: the straddling block splits
        assert_eq!(file.image().to_blocks(), vec![(123, b"a".to_vec())]);
        assert_eq!(
            upper.image().to_blocks(),
            vec![(124, b"bc".to_vec()), (130, b"xyz".to_vec())]
        );
    }

    #[test]
    fn test_split_at_empty_image() {
        // Arrange
        let mut file = SrecFile::new();

        // Act
        let mut upper = file.split_at(100).unwrap();

        // Assert
        assert!(file.image().is_empty());
        assert!(upper.image().is_empty());
    }

    #[test]
    fn test_align_pads_blocks() {
        // Arrange
        let mut file = SrecFile::from_blocks([(123u64, b"abc".to_vec()), (134, b"xyz".to_vec())]);

        // Act
        file.align(4, b".").unwrap();

        // Assert
        assert_eq!(
            file.image().to_blocks(),
            vec![(120, b"...abc..".to_vec()), (132, b"..xyz...".to_vec())]
        );
    }

    #[test]
    fn test_split_lines_keeps_terminators() {
        // Arrange
        let bytes = b"one\r\ntwo\nthree";

        // Act
        let lines: Vec<(usize, &[u8])> = split_lines(bytes).collect();

        // Assert
        assert_eq!(
            lines,
            vec![
                (1, b"one\r\n".as_slice()),
                (2, b"two\n".as_slice()),
                (3, b"three".as_slice()),
            ]
        );
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(b""));
        assert!(is_blank(b" \t\r\n"));
        assert!(!is_blank(b" q \n"));
    }
}
