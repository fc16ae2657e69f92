//! Tektronix extended hex format: `%LLTKKNAA..DD..` records with a
//! variable-length address (1 to 15 nibbles) and a checksum over the hex
//! digit values of every field but the checksum itself.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::{HexRecError, RecordErrorKind};
use crate::file::{
    FileMeta, Format, FormatRecord, ParseOptions, RecordFile, Tag, ValidateOptions, parse_lines,
};
use crate::image::SparseImage;
use crate::util::{hex_value, hexlify, nibble_sum_bytes, nibble_sum_value, unhexlify};

static HEAD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^(?P<before>[^%]*)%\
         (?P<count>[0-9A-Fa-f]{2})\
         (?P<tag>[68])\
         (?P<checksum>[0-9A-Fa-f]{2})\
         (?P<addrlen>[1-9A-Fa-f])",
    )
    .expect("static regex")
});

static TAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^(?P<data>([0-9A-Fa-f]{2})*)(?P<after>\\s*)$").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum XtekTag {
    Data = 6,
    Eof = 8,
}

impl XtekTag {
    #[must_use]
    pub fn is_eof(self) -> bool {
        self == Self::Eof
    }
}

impl Tag for XtekTag {
    fn is_data(self) -> bool {
        self == Self::Data
    }

    fn is_file_termination(self) -> bool {
        self.is_eof()
    }
}

/// Highest address representable with `addrlen` nibbles.
fn address_max(addrlen: usize) -> u64 {
    if addrlen >= 16 {
        u64::MAX
    } else {
        (1 << (addrlen * 4)) - 1
    }
}

/// Maximum data field size: the count byte caps the whole record body.
fn data_max(addrlen: usize) -> usize {
    (0xFF - 6 - addrlen) / 2
}

/// One extended Tektronix record line, carrying its serialized address
/// nibble count beside the common fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XtekRecord {
    pub tag: XtekTag,
    pub address: u64,
    pub data: Vec<u8>,
    pub addrlen: usize,
    pub count: Option<u64>,
    pub checksum: Option<u64>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl XtekRecord {
    fn build(tag: XtekTag, address: u64, data: Vec<u8>, addrlen: usize) -> Self {
        let mut record = Self {
            tag,
            address,
            data,
            addrlen,
            count: None,
            checksum: None,
            before: Vec::new(),
            after: b"\n".to_vec(),
        };
        record.count = Some(record.compute_count());
        record.checksum = Some(record.compute_checksum());
        record
    }

    pub fn create_data(address: u64, data: &[u8], addrlen: usize) -> Result<Self, RecordErrorKind> {
        if !(1..=15).contains(&addrlen) {
            return Err(RecordErrorKind::InvalidAddressLength(addrlen));
        }
        if address > address_max(addrlen) {
            return Err(RecordErrorKind::AddressOverflow(address));
        }
        if data.len() > data_max(addrlen) {
            return Err(RecordErrorKind::DataSizeOverflow(data.len()));
        }
        Ok(Self::build(XtekTag::Data, address, data.to_vec(), addrlen))
    }

    /// Creates the End Of File record carrying the start address.
    pub fn create_eof(start: u64, addrlen: usize) -> Result<Self, RecordErrorKind> {
        if !(1..=15).contains(&addrlen) {
            return Err(RecordErrorKind::InvalidAddressLength(addrlen));
        }
        if start > address_max(addrlen) {
            return Err(RecordErrorKind::AddressOverflow(start));
        }
        Ok(Self::build(XtekTag::Eof, start, Vec::new(), addrlen))
    }

    /// Parses one record line.
    pub fn parse(line: &[u8]) -> Result<Self, RecordErrorKind> {
        let caps = HEAD_REGEX
            .captures(line)
            .ok_or(RecordErrorKind::SyntaxError)?;

        let count = hex_value(&caps["count"]);
        let tag = if caps["tag"][0] == b'6' {
            XtekTag::Data
        } else {
            XtekTag::Eof
        };
        let checksum = hex_value(&caps["checksum"]);
        let addrlen = hex_value(&caps["addrlen"]) as usize;
        let before = caps["before"].to_vec();
        let head_end = caps.get(0).map_or(0, |m| m.end());

        let rest = &line[head_end..];
        if rest.len() < addrlen || !rest[..addrlen].iter().all(u8::is_ascii_hexdigit) {
            return Err(RecordErrorKind::SyntaxError);
        }
        let address = hex_value(&rest[..addrlen]);

        let caps = TAIL_REGEX
            .captures(&rest[addrlen..])
            .ok_or(RecordErrorKind::SyntaxError)?;

        let record = Self {
            tag,
            address,
            data: unhexlify(&caps["data"]),
            addrlen,
            count: Some(count),
            checksum: Some(checksum),
            before,
            after: caps["after"].to_vec(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Derived count: every hex digit after the `%`, checksum included.
    #[must_use]
    pub fn compute_count(&self) -> u64 {
        (6 + self.addrlen + self.data.len() * 2) as u64
    }

    /// Sum of the hex digit values of all fields but the checksum.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        let count = self.count.unwrap_or_else(|| self.compute_count());
        let sum = nibble_sum_value(count, 2)
            + self.tag as u64
            + self.addrlen as u64
            + nibble_sum_value(self.address, self.addrlen)
            + nibble_sum_bytes(&self.data);
        sum & 0xFF
    }
}

impl FormatRecord for XtekRecord {
    type Tag = XtekTag;

    fn tag(&self) -> XtekTag {
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
        out.push(b'%');
        out.extend_from_slice(
            format!(
                "{:02X}{:X}{:02X}{:X}",
                self.count.unwrap_or(0) & 0xFF,
                self.tag as u8,
                self.checksum.unwrap_or(0) & 0xFF,
                self.addrlen & 0xF,
            )
            .as_bytes(),
        );
        out.extend_from_slice(
            format!("{:0digits$X}", self.address, digits = self.addrlen).as_bytes(),
        );
        out.extend_from_slice(&hexlify(&self.data, None));
        out.extend_from_slice(&self.after);
        out
    }

    fn validate(&self) -> Result<(), RecordErrorKind> {
        if self.before.contains(&b'%') {
            return Err(RecordErrorKind::JunkBefore);
        }
        if !self.after.iter().all(u8::is_ascii_whitespace) {
            return Err(RecordErrorKind::JunkAfter);
        }
        if !(1..=15).contains(&self.addrlen) {
            return Err(RecordErrorKind::InvalidAddressLength(self.addrlen));
        }
        if self.address > address_max(self.addrlen) {
            return Err(RecordErrorKind::AddressOverflow(self.address));
        }
        if self.data.len() > data_max(self.addrlen) {
            return Err(RecordErrorKind::DataSizeOverflow(self.data.len()));
        }
        if self.tag == XtekTag::Eof && !self.data.is_empty() {
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
pub struct XtekMeta {
    pub start_address: Option<u64>,
}

impl FileMeta for XtekMeta {
    fn start_address(&self) -> Option<u64> {
        self.start_address
    }

    fn set_start_address(&mut self, address: Option<u64>) {
        self.start_address = address;
    }
}

/// Extended Tektronix format marker.
#[derive(Debug, Clone, Copy)]
pub struct Xtek;

pub type XtekFile = RecordFile<Xtek>;

/// Serialized address nibble count used for generated records.
const UPDATE_ADDRLEN: usize = 8;

impl Format for Xtek {
    type Tag = XtekTag;
    type Record = XtekRecord;
    type Meta = XtekMeta;

    const NAME: &'static str = "xtek";
    const FILE_EXTENSIONS: &'static [&'static str] = &[".xtek"];
    const DEFAULT_DATALEN: usize = 16;

    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<XtekRecord>, Vec<HexRecError>), HexRecError> {
        parse_lines(bytes, options, XtekRecord::parse)
    }

    fn apply_records(records: &[XtekRecord]) -> (SparseImage, XtekMeta) {
        let mut image = SparseImage::new();
        let mut meta = XtekMeta::default();

        for record in records {
            match record.tag {
                XtekTag::Data => {
                    let _ = image.write(record.address, &record.data);
                }
                XtekTag::Eof => meta.start_address = Some(record.address),
            }
        }
        (image, meta)
    }

    fn update_records(
        image: &SparseImage,
        meta: &XtekMeta,
        maxdatalen: usize,
    ) -> Result<Vec<XtekRecord>, HexRecError> {
        if let Some(end) = image.end()
            && end > 0x1_0000_0000
        {
            return Err(RecordErrorKind::AddressOverflow(end - 1).into());
        }

        let mut records = Vec::new();
        for (chunk_start, chunk) in image.chunks(maxdatalen.min(data_max(UPDATE_ADDRLEN)), false) {
            records.push(
                XtekRecord::create_data(chunk_start, chunk, UPDATE_ADDRLEN)
                    .map_err(HexRecError::Record)?,
            );
        }

        let start = meta.start_address.or_else(|| image.start()).unwrap_or(0);
        records.push(XtekRecord::create_eof(start, UPDATE_ADDRLEN).map_err(HexRecError::Record)?);
        Ok(records)
    }

    fn validate_records(
        records: &[XtekRecord],
        _options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        let mut eof_seen = false;

        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(HexRecError::Record)?;

            if record.tag.is_eof() {
                if index != records.len() - 1 {
                    return Err(RecordErrorKind::TerminationNotLast.into());
                }
                eof_seen = true;
            }
        }

        if !eof_seen {
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
        // Arrange: count = 6 + 8 + 2, checksum = 1+0 + 6 + 8 + 3 + 5
        let record = XtekRecord::create_data(0x12, &[0x41], 8).unwrap();

        // Assert
        assert_eq!(record.to_bytes(), b"%1061780000001241\n".to_vec());
    }

    #[test]
    fn test_parse_round_trip() {
        // Arrange
        let bytes = b"%1061780000001241\n%0E81E800000000\n";

        // Act
        let mut file = XtekFile::parse(bytes).unwrap();

        // Assert
        assert_eq!(file.image().to_blocks(), vec![(0x12, vec![0x41])]);
        assert_eq!(file.start_address(), Some(0));
        assert_eq!(file.to_bytes().unwrap(), bytes.to_vec());
    }

    #[test]
    fn test_parse_short_address() {
        // Arrange: addrlen 4, address 1234, data 0x41
        // count = 6 + 4 + 2 = 12 = 0x0C
        // checksum = (0+12) + 6 + 4 + (1+2+3+4) + (4+1) = 37 = 0x25

        // Act
        let record = XtekRecord::parse(b"%0C6254123441\n").unwrap();

        // Assert
        assert_eq!(record.address, 0x1234);
        assert_eq!(record.addrlen, 4);
        assert_eq!(record.data, vec![0x41]);
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        // Arrange: checksum should be 0x17
        let error = XtekFile::parse(b"%1061880000001241\n").unwrap_err();

        // Assert
        assert_eq!(
            error,
            HexRecError::Parse(
                RecordErrorKind::ChecksumMismatch {
                    expected: 0x17,
                    actual: 0x18
                },
                1
            )
        );
    }

    #[test]
    fn test_data_size_cap_depends_on_addrlen() {
        // Arrange / Act / Assert
        assert!(XtekRecord::create_data(0, &[0u8; 120], 8).is_ok());
        assert_eq!(
            XtekRecord::create_data(0, &[0u8; 121], 8).unwrap_err(),
            RecordErrorKind::DataSizeOverflow(121)
        );
    }

    #[test]
    fn test_validate_requires_eof() {
        // Arrange
        let mut file = XtekFile::parse(b"%1061780000001241\n").unwrap();

        // Act / Assert
        assert_eq!(
            file.validate().unwrap_err(),
            HexRecError::Record(RecordErrorKind::MissingTermination)
        );
    }

    #[test]
    fn test_update_records_uses_eight_nibble_addresses() {
        // Arrange
        let mut file = XtekFile::from_bytes(&[0x41], 0x12);

        // Act / Assert
        assert_eq!(
            file.to_bytes().unwrap(),
            b"%1061780000001241\n%0E821800000012\n".to_vec()
        );
    }
}
