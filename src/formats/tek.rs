//! Tektronix hex format (standard): `/AAAACCKKDD..` records with a 16-bit
//! address and a checksum over the hex digit values of address and data.
//! A zero-count record terminates the file and carries the start address.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::{HexRecError, RecordErrorKind};
use crate::file::{
    FileMeta, Format, FormatRecord, ParseOptions, RecordFile, Tag, ValidateOptions, parse_lines,
};
use crate::image::SparseImage;
use crate::util::{hex_value, hexlify, nibble_sum_bytes, nibble_sum_value, unhexlify};

static LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^(?P<before>\\s*)/\
         (?P<address>[0-9A-Fa-f]{4})\
         (?P<count>[0-9A-Fa-f]{2})\
         (?P<checksum>[0-9A-Fa-f]{2})\
         (?P<data>([0-9A-Fa-f]{2})*)\
         (?P<after>\\s*)$",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TekTag {
    Data,
    Terminator,
}

impl TekTag {
    #[must_use]
    pub fn is_terminator(self) -> bool {
        self == Self::Terminator
    }
}

impl Tag for TekTag {
    fn is_data(self) -> bool {
        self == Self::Data
    }

    fn is_file_termination(self) -> bool {
        self.is_terminator()
    }
}

/// One standard Tektronix record line. The terminator reuses `address` for
/// the program start address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TekRecord {
    pub tag: TekTag,
    pub address: u64,
    pub data: Vec<u8>,
    pub count: Option<u64>,
    pub checksum: Option<u64>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl TekRecord {
    fn build(tag: TekTag, address: u64, data: Vec<u8>) -> Self {
        let mut record = Self {
            tag,
            address,
            data,
            count: None,
            checksum: None,
            before: Vec::new(),
            after: b"\n".to_vec(),
        };
        record.count = Some(record.compute_count());
        record.checksum = Some(record.compute_checksum());
        record
    }

    pub fn create_data(address: u64, data: &[u8]) -> Result<Self, RecordErrorKind> {
        if address > 0xFFFF {
            return Err(RecordErrorKind::AddressOverflow(address));
        }
        if data.is_empty() || data.len() > 0xFF {
            return Err(RecordErrorKind::InvalidDataLength(data.len()));
        }
        Ok(Self::build(TekTag::Data, address, data.to_vec()))
    }

    /// Creates the terminator carrying the program start address.
    pub fn create_terminator(start: u64) -> Result<Self, RecordErrorKind> {
        if start > 0xFFFF {
            return Err(RecordErrorKind::AddressOverflow(start));
        }
        Ok(Self::build(TekTag::Terminator, start, Vec::new()))
    }

    /// Parses one record line. A zero count marks the terminator.
    pub fn parse(line: &[u8]) -> Result<Self, RecordErrorKind> {
        let caps = LINE_REGEX
            .captures(line)
            .ok_or(RecordErrorKind::SyntaxError)?;

        let count = hex_value(&caps["count"]);
        let tag = if count == 0 {
            TekTag::Terminator
        } else {
            TekTag::Data
        };

        let record = Self {
            tag,
            address: hex_value(&caps["address"]),
            data: unhexlify(&caps["data"]),
            count: Some(count),
            checksum: Some(hex_value(&caps["checksum"])),
            before: caps["before"].to_vec(),
            after: caps["after"].to_vec(),
        };
        record.validate()?;
        Ok(record)
    }

    #[must_use]
    pub fn compute_count(&self) -> u64 {
        self.data.len() as u64
    }

    /// Sum of the hex digit values of the address and data fields.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        (nibble_sum_value(self.address & 0xFFFF, 4) + nibble_sum_bytes(&self.data)) & 0xFF
    }
}

impl FormatRecord for TekRecord {
    type Tag = TekTag;

    fn tag(&self) -> TekTag {
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
        out.push(b'/');
        out.extend_from_slice(
            format!(
                "{:04X}{:02X}{:02X}",
                self.address & 0xFFFF,
                self.count.unwrap_or(0) & 0xFF,
                self.checksum.unwrap_or(0) & 0xFF,
            )
            .as_bytes(),
        );
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
        if self.address > 0xFFFF {
            return Err(RecordErrorKind::AddressOverflow(self.address));
        }
        if self.data.len() > 0xFF {
            return Err(RecordErrorKind::DataSizeOverflow(self.data.len()));
        }
        if self.tag == TekTag::Terminator && !self.data.is_empty() {
            return Err(RecordErrorKind::UnexpectedData);
        }

        if let Some(count) = self.count {
            let expected = self.compute_count();
            if count != expected {
                return Err(RecordErrorKind::CountMismatch {
                    expected,
                    actual: count,
                });
            }
        }
        if let Some(checksum) = self.checksum {
            let expected = self.compute_checksum();
            if checksum != expected {
                return Err(RecordErrorKind::ChecksumMismatch {
                    expected,
                    actual: checksum,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TekMeta {
    pub start_address: Option<u64>,
}

impl FileMeta for TekMeta {
    fn start_address(&self) -> Option<u64> {
        self.start_address
    }

    fn set_start_address(&mut self, address: Option<u64>) {
        self.start_address = address;
    }
}

/// Standard Tektronix hex format marker.
#[derive(Debug, Clone, Copy)]
pub struct Tek;

pub type TekFile = RecordFile<Tek>;

impl Format for Tek {
    type Tag = TekTag;
    type Record = TekRecord;
    type Meta = TekMeta;

    const NAME: &'static str = "tek";
    const FILE_EXTENSIONS: &'static [&'static str] = &[".tek"];
    const DEFAULT_DATALEN: usize = 16;

    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<TekRecord>, Vec<HexRecError>), HexRecError> {
        parse_lines(bytes, options, TekRecord::parse)
    }

    fn apply_records(records: &[TekRecord]) -> (SparseImage, TekMeta) {
        let mut image = SparseImage::new();
        let mut meta = TekMeta::default();

        for record in records {
            match record.tag {
                TekTag::Data => {
                    let _ = image.write(record.address, &record.data);
                }
                TekTag::Terminator => meta.start_address = Some(record.address),
            }
        }
        (image, meta)
    }

    fn update_records(
        image: &SparseImage,
        meta: &TekMeta,
        maxdatalen: usize,
    ) -> Result<Vec<TekRecord>, HexRecError> {
        if let Some(end) = image.end()
            && end > 0x1_0000
        {
            return Err(RecordErrorKind::AddressOverflow(end - 1).into());
        }

        let mut records = Vec::new();
        for (chunk_start, chunk) in image.chunks(maxdatalen.min(0xFF), false) {
            records.push(TekRecord::create_data(chunk_start, chunk).map_err(HexRecError::Record)?);
        }

        let start = meta
            .start_address
            .or_else(|| image.start())
            .unwrap_or(0);
        records.push(TekRecord::create_terminator(start).map_err(HexRecError::Record)?);
        Ok(records)
    }

    fn validate_records(
        records: &[TekRecord],
        _options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        let mut terminator_seen = false;

        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(HexRecError::Record)?;

            if record.tag.is_terminator() {
                if index != records.len() - 1 {
                    return Err(RecordErrorKind::TerminationNotLast.into());
                }
                terminator_seen = true;
            }
        }

        if !terminator_seen {
            return Err(RecordErrorKind::MissingTermination.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_serialize_data_record() {
        // Arrange
        let record = TekRecord::create_data(0x0100, &[0x02, 0x33]).unwrap();

        // Assert: checksum = digits(0100) + digits(0233) = 1 + 8
        assert_eq!(record.to_bytes(), b"/010002090233\n".to_vec());
    }

    #[test]
    fn test_parse_round_trip() {
        // Arrange
        let bytes = b"/010002090233\n/01000001\n";

        // Act
        let mut file = TekFile::parse(bytes).unwrap();

        // Assert
        assert_eq!(file.image().to_blocks(), vec![(0x100, vec![0x02, 0x33])]);
        assert_eq!(file.start_address(), Some(0x100));
        assert_eq!(file.to_bytes().unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_terminator_defaults_to_lowest_address() {
        // Arrange
        let mut file = TekFile::from_bytes(&[0x02, 0x33], 0x0100);

        // Act / Assert
        assert_eq!(file.to_bytes().unwrap(), b"/010002090233\n/01000001\n".to_vec());
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        // Arrange: checksum should be 0x09
        let error = TekFile::parse(b"/0100020A0233\n").unwrap_err();

        // Assert
        assert_eq!(
            error,
            HexRecError::Parse(
                RecordErrorKind::ChecksumMismatch {
                    expected: 0x09,
                    actual: 0x0A
                },
                1
            )
        );
    }

    #[test]
    fn test_update_records_rejects_wide_addresses() {
        // Arrange
        let mut file = TekFile::from_bytes(b"a", 0x10000);

        // Act / Assert
        assert_eq!(
            file.to_bytes().unwrap_err(),
            HexRecError::Record(RecordErrorKind::AddressOverflow(0x10000))
        );
    }

    #[test]
    fn test_validate_requires_terminator() {
        // Arrange
        let mut file = TekFile::parse(b"/010002090233\n").unwrap();

        // Act / Assert
        assert_eq!(
            file.validate().unwrap_err(),
            HexRecError::Record(RecordErrorKind::MissingTermination)
        );
    }
}
