//! Atmel Generic format: `AAAAAA:HHLL` lines carrying one big-endian
//! 16-bit word per 24-bit word address. There is no termination record.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::{HexRecError, RecordErrorKind};
use crate::file::{
    FileMeta, Format, FormatRecord, ParseOptions, RecordFile, Tag, ValidateOptions, parse_lines,
};
use crate::image::SparseImage;
use crate::util::{hex_value, hexlify, unhexlify};

static LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^(?P<before>[ \\t]*)\
         (?P<address>[0-9A-Fa-f]{6})\
         [ \\t]*:[ \\t]*\
         (?P<data>[0-9A-Fa-f]{4})\
         (?P<after>\\s*)$",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvrTag {
    Data,
}

impl Tag for AvrTag {
    fn is_data(self) -> bool {
        true
    }
}

/// One Atmel Generic line: a word address and two data bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvrRecord {
    pub tag: AvrTag,
    pub address: u64,
    pub data: Vec<u8>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl AvrRecord {
    /// Creates a data record; `address` counts 16-bit words.
    pub fn create_data(address: u64, data: &[u8]) -> Result<Self, RecordErrorKind> {
        if address > 0xFF_FFFF {
            return Err(RecordErrorKind::AddressOverflow(address));
        }
        if data.len() != 2 {
            return Err(RecordErrorKind::InvalidDataLength(data.len()));
        }
        Ok(Self {
            tag: AvrTag::Data,
            address,
            data: data.to_vec(),
            before: Vec::new(),
            after: b"\n".to_vec(),
        })
    }

    /// Parses one record line.
    pub fn parse(line: &[u8]) -> Result<Self, RecordErrorKind> {
        let caps = LINE_REGEX
            .captures(line)
            .ok_or(RecordErrorKind::SyntaxError)?;

        let record = Self {
            tag: AvrTag::Data,
            address: hex_value(&caps["address"]),
            data: unhexlify(&caps["data"]),
            before: caps["before"].to_vec(),
            after: caps["after"].to_vec(),
        };
        record.validate()?;
        Ok(record)
    }
}

impl FormatRecord for AvrRecord {
    type Tag = AvrTag;

    fn tag(&self) -> AvrTag {
        self.tag
    }

    fn address(&self) -> u64 {
        self.address
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.before.clone();
        out.extend_from_slice(format!("{:06X}:", self.address & 0xFF_FFFF).as_bytes());
        out.extend_from_slice(&hexlify(&self.data, None));
        out.extend_from_slice(&self.after);
        out
    }

    fn validate(&self) -> Result<(), RecordErrorKind> {
        if !self.before.iter().all(u8::is_ascii_whitespace) {
            return Err(RecordErrorKind::JunkBefore);
        }
        if !self.after.iter().all(u8::is_ascii_whitespace) {
            return Err(RecordErrorKind::JunkAfter);
        }
        if self.address > 0xFF_FFFF {
            return Err(RecordErrorKind::AddressOverflow(self.address));
        }
        if self.data.len() != 2 {
            return Err(RecordErrorKind::InvalidDataLength(self.data.len()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvrMeta;

impl FileMeta for AvrMeta {}

/// Atmel Generic format marker.
#[derive(Debug, Clone, Copy)]
pub struct Avr;

pub type AvrFile = RecordFile<Avr>;

impl Format for Avr {
    type Tag = AvrTag;
    type Record = AvrRecord;
    type Meta = AvrMeta;

    const NAME: &'static str = "avr";
    const FILE_EXTENSIONS: &'static [&'static str] = &[".rom", ".gen"];
    const DEFAULT_DATALEN: usize = 2;

    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<AvrRecord>, Vec<HexRecError>), HexRecError> {
        parse_lines(bytes, options, AvrRecord::parse)
    }

    fn apply_records(records: &[AvrRecord]) -> (SparseImage, AvrMeta) {
        let mut image = SparseImage::new();
        for record in records {
            // Word addresses map to doubled byte addresses.
            let _ = image.write(record.address * 2, &record.data);
        }
        (image, AvrMeta)
    }

    fn update_records(
        image: &SparseImage,
        _meta: &AvrMeta,
        maxdatalen: usize,
    ) -> Result<Vec<AvrRecord>, HexRecError> {
        if maxdatalen != 2 {
            return Err(RecordErrorKind::InvalidMaxDataLen(maxdatalen).into());
        }
        if let Some(end) = image.end()
            && end > 0x200_0000
        {
            return Err(RecordErrorKind::AddressOverflow(end - 1).into());
        }

        let mut records = Vec::new();
        for (chunk_start, chunk) in image.chunks(2, true) {
            if chunk_start & 1 != 0 {
                return Err(RecordErrorKind::MisalignedWord(chunk_start).into());
            }
            if chunk.len() != 2 {
                return Err(RecordErrorKind::InvalidDataLength(chunk.len()).into());
            }
            records
                .push(AvrRecord::create_data(chunk_start / 2, chunk).map_err(HexRecError::Record)?);
        }
        Ok(records)
    }

    fn validate_records(
        records: &[AvrRecord],
        _options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        for record in records {
            record.validate().map_err(HexRecError::Record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        // Arrange
        let bytes = b"00003E:6162\n00003F:6364\n";

        // Act
        let mut file = AvrFile::parse(bytes).unwrap();

        // Assert: word address 0x3E maps to byte address 0x7C
        assert_eq!(file.image().to_blocks(), vec![(0x7C, b"abcd".to_vec())]);
        assert_eq!(file.to_bytes().unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_update_records_packs_words() {
        // Arrange
        let mut file = AvrFile::from_bytes(b"abcd", 0x7C);

        // Act / Assert
        assert_eq!(
            file.to_bytes().unwrap(),
            b"00003E:6162\n00003F:6364\n".to_vec()
        );
    }

    #[test]
    fn test_update_records_rejects_odd_block() {
        // Arrange: odd byte length cannot pack into whole words
        let mut file = AvrFile::from_bytes(b"abc", 0x7C);

        // Act / Assert
        assert_eq!(
            file.to_bytes().unwrap_err(),
            HexRecError::Record(RecordErrorKind::InvalidDataLength(1))
        );
    }

    #[test]
    fn test_update_records_rejects_misaligned_block() {
        // Arrange: block starting at an odd byte address
        let mut file = AvrFile::from_bytes(b"ab", 0x7D);

        // Act
        let error = file.to_bytes().unwrap_err();

        // Assert
        assert_eq!(
            error,
            HexRecError::Record(RecordErrorKind::MisalignedWord(0x7D))
        );
    }

    #[test]
    fn test_parse_rejects_bad_syntax() {
        // Arrange / Act
        let error = AvrFile::parse(b"000080::4865\n").unwrap_err();

        // Assert
        assert_eq!(error, HexRecError::Parse(RecordErrorKind::SyntaxError, 1));
    }

    #[test]
    fn test_empty_file_parses_to_empty_image() {
        // Arrange / Act
        let mut file = AvrFile::parse(b"").unwrap();

        // Assert: no termination record exists in this format
        assert!(file.image().is_empty());
        assert_eq!(file.to_bytes().unwrap(), Vec::<u8>::new());
    }
}
