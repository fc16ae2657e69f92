//! Intel HEX format: `:CCAAAATTDD..KK` records with segment/linear address
//! extensions, an optional start address, and a mandatory End Of File record.

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
        "^(?P<before>[^:]*):\
         (?P<count>[0-9A-Fa-f]{2})\
         (?P<address>[0-9A-Fa-f]{4})\
         (?P<tag>[0-9A-Fa-f]{2})\
         (?P<data>([0-9A-Fa-f]{2})*)\
         (?P<checksum>[0-9A-Fa-f]{2})\
         (?P<after>[^\\r\\n]*\\r?\\n?)$",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IhexTag {
    Data = 0x0,
    EndOfFile = 0x1,
    ExtendedSegmentAddress = 0x2,
    StartSegmentAddress = 0x3,
    ExtendedLinearAddress = 0x4,
    StartLinearAddress = 0x5,
}

impl IhexTag {
    fn from_wire(value: u8) -> Result<Self, RecordErrorKind> {
        match value {
            0x0 => Ok(Self::Data),
            0x1 => Ok(Self::EndOfFile),
            0x2 => Ok(Self::ExtendedSegmentAddress),
            0x3 => Ok(Self::StartSegmentAddress),
            0x4 => Ok(Self::ExtendedLinearAddress),
            0x5 => Ok(Self::StartLinearAddress),
            _ => Err(RecordErrorKind::InvalidTag(u16::from(value))),
        }
    }

    /// Tells whether this is the End Of File record tag.
    #[must_use]
    pub fn is_eof(self) -> bool {
        self == Self::EndOfFile
    }

    /// Tells whether this tag updates the parser address extension.
    #[must_use]
    pub fn is_extension(self) -> bool {
        matches!(
            self,
            Self::ExtendedSegmentAddress | Self::ExtendedLinearAddress
        )
    }

    /// Tells whether this tag carries the program start address.
    #[must_use]
    pub fn is_start(self) -> bool {
        matches!(self, Self::StartSegmentAddress | Self::StartLinearAddress)
    }
}

impl Tag for IhexTag {
    fn is_data(self) -> bool {
        self == Self::Data
    }

    fn is_file_termination(self) -> bool {
        self.is_eof()
    }
}

/// One Intel HEX record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IhexRecord {
    pub tag: IhexTag,
    pub address: u64,
    pub data: Vec<u8>,
    pub count: Option<u64>,
    pub checksum: Option<u64>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl IhexRecord {
    fn build(tag: IhexTag, address: u64, data: Vec<u8>) -> Self {
        let mut record = Self {
            tag,
            address,
            data,
            count: None,
            checksum: None,
            before: Vec::new(),
            after: b"\r\n".to_vec(),
        };
        record.count = Some(record.compute_count());
        record.checksum = Some(record.compute_checksum());
        record
    }

    /// Creates a data record; the address is the 16-bit in-segment offset.
    pub fn create_data(address: u64, data: &[u8]) -> Result<Self, RecordErrorKind> {
        if address > 0xFFFF {
            return Err(RecordErrorKind::AddressOverflow(address));
        }
        if data.len() > 0xFF {
            return Err(RecordErrorKind::DataSizeOverflow(data.len()));
        }
        Ok(Self::build(IhexTag::Data, address, data.to_vec()))
    }

    #[must_use]
    pub fn create_end_of_file() -> Self {
        Self::build(IhexTag::EndOfFile, 0, Vec::new())
    }

    /// Creates an Extended Linear Address record carrying the upper 16 bits.
    #[must_use]
    pub fn create_extended_linear_address(extension: u16) -> Self {
        let data = extension.to_be_bytes().to_vec();
        Self::build(IhexTag::ExtendedLinearAddress, 0, data)
    }

    /// Creates an Extended Segment Address record (address bits 19:4).
    #[must_use]
    pub fn create_extended_segment_address(extension: u16) -> Self {
        let data = extension.to_be_bytes().to_vec();
        Self::build(IhexTag::ExtendedSegmentAddress, 0, data)
    }

    #[must_use]
    pub fn create_start_linear_address(address: u32) -> Self {
        let data = address.to_be_bytes().to_vec();
        Self::build(IhexTag::StartLinearAddress, 0, data)
    }

    #[must_use]
    pub fn create_start_segment_address(address: u32) -> Self {
        let data = address.to_be_bytes().to_vec();
        Self::build(IhexTag::StartSegmentAddress, 0, data)
    }

    /// Parses one record line.
    pub fn parse(line: &[u8]) -> Result<Self, RecordErrorKind> {
        let caps = LINE_REGEX
            .captures(line)
            .ok_or(RecordErrorKind::SyntaxError)?;

        let tag = IhexTag::from_wire(hex_value(&caps["tag"]) as u8)?;
        let record = Self {
            tag,
            address: hex_value(&caps["address"]),
            data: unhexlify(&caps["data"]),
            count: Some(hex_value(&caps["count"])),
            checksum: Some(hex_value(&caps["checksum"])),
            before: caps["before"].to_vec(),
            after: caps["after"].to_vec(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Derived payload byte count.
    #[must_use]
    pub fn compute_count(&self) -> u64 {
        self.data.len() as u64
    }

    /// Derived two's-complement checksum over count, address, tag and data.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        let count = self.count.unwrap_or_else(|| self.compute_count()) & 0xFF;
        let address = self.address & 0xFFFF;
        let mut sum = count + (address >> 8) + (address & 0xFF) + self.tag as u64;
        sum += self.data.iter().map(|&byte| u64::from(byte)).sum::<u64>();
        (0x100 - (sum & 0xFF)) & 0xFF
    }

    /// Big-endian value of the data field (extension and start records).
    #[must_use]
    pub fn data_value(&self) -> u64 {
        self.data.iter().fold(0, |acc, &byte| (acc << 8) | u64::from(byte))
    }
}

impl FormatRecord for IhexRecord {
    type Tag = IhexTag;

    fn tag(&self) -> IhexTag {
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
        out.push(b':');
        out.extend_from_slice(
            format!(
                "{:02X}{:04X}{:02X}",
                self.count.unwrap_or(0) & 0xFF,
                self.address & 0xFFFF,
                self.tag as u8,
            )
            .as_bytes(),
        );
        out.extend_from_slice(&hexlify(&self.data, None));
        out.extend_from_slice(format!("{:02X}", self.checksum.unwrap_or(0) & 0xFF).as_bytes());
        out.extend_from_slice(&self.after);
        out
    }

    fn validate(&self) -> Result<(), RecordErrorKind> {
        if self.before.contains(&b':') {
            return Err(RecordErrorKind::JunkBefore);
        }
        if self.address > 0xFFFF {
            return Err(RecordErrorKind::AddressOverflow(self.address));
        }
        if self.data.len() > 0xFF {
            return Err(RecordErrorKind::DataSizeOverflow(self.data.len()));
        }

        match self.tag {
            IhexTag::Data => {}
            IhexTag::StartSegmentAddress | IhexTag::StartLinearAddress => {
                if self.data.len() != 4 {
                    return Err(RecordErrorKind::InvalidDataLength(self.data.len()));
                }
            }
            IhexTag::ExtendedSegmentAddress | IhexTag::ExtendedLinearAddress => {
                if self.data.len() != 2 {
                    return Err(RecordErrorKind::InvalidDataLength(self.data.len()));
                }
            }
            IhexTag::EndOfFile => {
                if !self.data.is_empty() {
                    return Err(RecordErrorKind::UnexpectedData);
                }
            }
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

/// Intel HEX metadata: addressing mode and optional start address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IhexMeta {
    /// True for linear addressing (Extended Linear Address records carrying
    /// the upper 16 address bits); false for 20-bit segment addressing.
    pub linear: bool,
    pub start_address: Option<u64>,
}

impl Default for IhexMeta {
    fn default() -> Self {
        Self {
            linear: true,
            start_address: None,
        }
    }
}

impl FileMeta for IhexMeta {
    fn start_address(&self) -> Option<u64> {
        self.start_address
    }

    fn set_start_address(&mut self, address: Option<u64>) {
        self.start_address = address.map(|address| address & 0xFFFF_FFFF);
    }
}

/// Intel HEX format marker.
#[derive(Debug, Clone, Copy)]
pub struct Ihex;

pub type IhexFile = RecordFile<Ihex>;

impl Format for Ihex {
    type Tag = IhexTag;
    type Record = IhexRecord;
    type Meta = IhexMeta;

    const NAME: &'static str = "ihex";
    const FILE_EXTENSIONS: &'static [&'static str] =
        &[".hex", ".mcs", ".int", ".ihex", ".ihx", ".a43", ".a90"];
    const DEFAULT_DATALEN: usize = 16;

    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<IhexRecord>, Vec<HexRecError>), HexRecError> {
        parse_lines(bytes, options, IhexRecord::parse)
    }

    fn apply_records(records: &[IhexRecord]) -> (SparseImage, IhexMeta) {
        let mut image = SparseImage::new();
        let mut extension: u64 = 0;
        let mut start_address = None;
        let mut has_ela = false;
        let mut has_esa = false;

        for record in records {
            match record.tag {
                IhexTag::Data => {
                    // Unbounded image: the write cannot fail.
                    let _ = image.write(record.address + extension, &record.data);
                }
                IhexTag::ExtendedLinearAddress => {
                    has_ela = true;
                    extension = record.data_value() << 16;
                }
                IhexTag::ExtendedSegmentAddress => {
                    has_esa = true;
                    extension = record.data_value() << 4;
                }
                IhexTag::StartSegmentAddress | IhexTag::StartLinearAddress => {
                    start_address = Some(record.data_value());
                }
                IhexTag::EndOfFile => {}
            }
        }

        let meta = IhexMeta {
            linear: has_ela || !has_esa,
            start_address,
        };
        (image, meta)
    }

    fn update_records(
        image: &SparseImage,
        meta: &IhexMeta,
        maxdatalen: usize,
    ) -> Result<Vec<IhexRecord>, HexRecError> {
        if let Some(end) = image.end()
            && end > 0x1_0000_0000
        {
            return Err(RecordErrorKind::AddressOverflow(end - 1).into());
        }

        let mut records = Vec::new();
        let mut last_start: u64 = 0;

        for (chunk_start, chunk) in image.chunks(maxdatalen.min(0xFF), false) {
            // Chunks never cross a 64 KiB boundary: a crossing run gets a
            // fresh extension record in between.
            let mut piece_start = chunk_start;
            let mut rest = chunk;
            while !rest.is_empty() {
                let boundary = ((piece_start >> 16) + 1) << 16;
                let take = rest.len().min((boundary - piece_start) as usize);
                let (piece, tail) = rest.split_at(take);

                if meta.linear {
                    if (piece_start ^ last_start) & 0xFFFF_0000 != 0 {
                        let extension = (piece_start >> 16) as u16;
                        records.push(IhexRecord::create_extended_linear_address(extension));
                    }
                } else {
                    if piece_start > 0x000F_FFFF {
                        return Err(RecordErrorKind::AddressOverflow(piece_start).into());
                    }
                    if (piece_start ^ last_start) & 0x000F_0000 != 0 {
                        let extension = ((piece_start & 0x000F_0000) >> 4) as u16;
                        records.push(IhexRecord::create_extended_segment_address(extension));
                    }
                }

                let record = IhexRecord::create_data(piece_start & 0xFFFF, piece)
                    .map_err(HexRecError::Record)?;
                records.push(record);
                last_start = piece_start;
                piece_start += take as u64;
                rest = tail;
            }
        }

        if let Some(start_address) = meta.start_address {
            let record = if meta.linear {
                IhexRecord::create_start_linear_address(start_address as u32)
            } else {
                IhexRecord::create_start_segment_address(start_address as u32)
            };
            records.push(record);
        }

        records.push(IhexRecord::create_end_of_file());
        Ok(records)
    }

    fn validate_records(
        records: &[IhexRecord],
        _options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        let mut eof_index = None;
        let mut start_index = None;

        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(HexRecError::Record)?;

            if record.tag.is_eof() {
                if index != records.len() - 1 {
                    return Err(RecordErrorKind::TerminationNotLast.into());
                }
                eof_index = Some(index);
            }
            if record.tag.is_start() {
                if start_index.is_some() {
                    return Err(RecordErrorKind::MultipleRecords("start address").into());
                }
                if index != records.len().saturating_sub(2) {
                    return Err(RecordErrorKind::TerminationNotLast.into());
                }
                start_index = Some(index);
            }
        }

        if eof_index.is_none() {
            return Err(RecordErrorKind::MissingTermination.into());
        }
        Ok(())
    }
}

impl IhexFile {
    /// Linear (32-bit) vs segment (20-bit) addressing mode.
    pub fn linear(&mut self) -> bool {
        self.meta().linear
    }

    pub fn set_linear(&mut self, linear: bool) {
        self.meta_mut().linear = linear;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns valid record instances and their wire representation.
    fn get_valid_records() -> [(IhexRecord, &'static [u8]); 5] {
        [
            (
                IhexRecord::create_data(
                    0x0010,
                    &[
                        0x61, 0x64, 0x64, 0x72, 0x65, 0x73, 0x73, 0x20, 0x67, 0x61, 0x70,
                    ],
                )
                .unwrap(),
                b":0B0010006164647265737320676170A7\r\n",
            ),
            (
                IhexRecord::create_end_of_file(),
                b":00000001FF\r\n",
            ),
            (
                IhexRecord::create_extended_segment_address(0x1200),
                b":020000021200EA\r\n",
            ),
            (
                IhexRecord::create_extended_linear_address(0x0003),
                b":020000040003F7\r\n",
            ),
            (
                IhexRecord::create_start_linear_address(0x1043FFAA),
                b":040000051043FFAAFB\r\n",
            ),
        ]
    }

    #[test]
    fn test_serialize_valid_records() {
        for (record, wire) in get_valid_records() {
            assert_eq!(record.to_bytes(), wire.to_vec());
        }
    }

    #[test]
    fn test_parse_round_trip_is_byte_exact() {
        for (_, wire) in get_valid_records() {
            // Act
            let record = IhexRecord::parse(wire).unwrap();

            // Assert
            assert_eq!(record.to_bytes(), wire.to_vec());
        }
    }

    #[test]
    fn test_parse_keeps_bare_lf_terminator() {
        // Arrange
        let wire = b":00000001FF\n";

        // Act
        let record = IhexRecord::parse(wire).unwrap();

        // Assert
        assert_eq!(record.after, b"\n");
        assert_eq!(record.to_bytes(), wire.to_vec());
    }

    #[test]
    fn test_parse_invalid_records() {
        let vectors: [(&[u8], RecordErrorKind); 5] = [
            // Missing ':' start code
            (b"00000001FF\r\n", RecordErrorKind::SyntaxError),
            // Payload shorter than the count byte
            (
                b":100000000000FF\r\n",
                RecordErrorKind::CountMismatch {
                    expected: 1,
                    actual: 16,
                },
            ),
            // 'Z' is not a hex digit
            (b":0000000ZFF\r\n", RecordErrorKind::SyntaxError),
            // Checksum wrong - should be 0xF0
            (
                b":1000000000000000000000000000000000000000AA\r\n",
                RecordErrorKind::ChecksumMismatch {
                    expected: 0xF0,
                    actual: 0xAA,
                },
            ),
            // Unknown record type
            (b":00000006FA\r\n", RecordErrorKind::InvalidTag(6)),
        ];

        for (wire, expected) in vectors {
            assert_eq!(IhexRecord::parse(wire).unwrap_err(), expected);
        }
    }

    #[test]
    fn test_compute_checksum_matches_known_vectors() {
        // Arrange
        let record =
            IhexRecord::parse(b":10010000214601360121470136007EFE09D2190140\r\n").unwrap();

        // Assert
        assert_eq!(record.checksum, Some(0x40));
        assert_eq!(record.compute_checksum(), 0x40);
    }

    #[test]
    fn test_apply_records_tracks_extensions() {
        // Arrange
        let mut file = IhexFile::parse(
            b":020000040001F9\r\n:040000006162636472\r\n:00000001FF\r\n",
        )
        .unwrap();

        // Act
        let blocks = file.image().to_blocks();

        // Assert: ELA 0x0001 shifts the data record to 0x10000
        assert_eq!(blocks, vec![(0x10000, b"abcd".to_vec())]);
        assert!(file.linear());
    }

    #[test]
    fn test_apply_records_segment_extension() {
        // Arrange: ESA 0x1200 -> base 0x12000
        let mut file =
            IhexFile::parse(b":020000021200EA\r\n:0100100041AE\r\n:00000001FF\r\n").unwrap();

        // Act / Assert
        assert_eq!(file.image().to_blocks(), vec![(0x12010, b"A".to_vec())]);
        assert!(!file.linear());
    }

    #[test]
    fn test_update_records_emits_extension_on_boundary() {
        // Arrange: data crossing the 64 KiB boundary
        let mut file = IhexFile::from_blocks([(0xFFFE_u64, b"abcd".to_vec())]);

        // Act
        let bytes = file.to_bytes().unwrap();

        // Assert
        assert_eq!(
            bytes,
            b":02FFFE0061623E\r\n:020000040001F9\r\n:02000000636437\r\n:00000001FF\r\n"
                .to_vec()
        );
    }

    #[test]
    fn test_update_records_start_address_penultimate() {
        // Arrange
        let mut file = IhexFile::from_bytes(b"abc", 0x7B);
        file.set_start_address(Some(0x1C8));

        // Act
        let bytes = file.to_bytes().unwrap();

        // Assert
        assert_eq!(
            bytes,
            b":03007B006162635C\r\n:04000005000001C82E\r\n:00000001FF\r\n".to_vec()
        );
    }

    #[test]
    fn test_max_data_split() {
        // Arrange
        let mut file = IhexFile::from_bytes(&[0u8; 600], 0);
        file.set_maxdatalen(255).unwrap();

        // Act
        let lengths: Vec<(u64, usize)> = file
            .records()
            .unwrap()
            .iter()
            .filter(|record| record.tag.is_data())
            .map(|record| (record.address, record.data.len()))
            .collect();

        // Assert
        assert_eq!(lengths, vec![(0, 255), (255, 255), (510, 90)]);
    }

    #[test]
    fn test_update_records_rejects_address_overflow() {
        // Arrange
        let mut file = IhexFile::from_bytes(b"a", 0x1_0000_0000);

        // Act / Assert: 2^32 is the first address past the 32-bit space
        assert_eq!(
            file.to_bytes().unwrap_err(),
            HexRecError::Record(RecordErrorKind::AddressOverflow(0x1_0000_0000))
        );

        // Writing the last 32-bit address succeeds
        let mut file = IhexFile::from_bytes(b"a", 0xFFFF_FFFF);
        assert!(file.to_bytes().is_ok());
    }

    #[test]
    fn test_validate_records_requires_eof() {
        // Arrange
        let records = vec![IhexRecord::create_data(123, b"abc").unwrap()];
        let mut file = IhexFile::from_records(records);

        // Act / Assert
        assert_eq!(
            file.validate().unwrap_err(),
            HexRecError::Record(RecordErrorKind::MissingTermination)
        );
    }

    #[test]
    fn test_empty_image_serializes_to_eof_only() {
        // Arrange
        let mut file = IhexFile::new();

        // Act / Assert
        assert_eq!(file.to_bytes().unwrap(), b":00000001FF\r\n".to_vec());
    }

    #[test]
    fn test_parse_ignore_errors_collects_warnings() {
        // Arrange: middle line carries a bad checksum
        let bytes = b":0100100041AE\r\n:01001100420A\r\n:00000001FF\r\n";
        let options = ParseOptions {
            ignore_errors: true,
            ..ParseOptions::default()
        };

        // Act
        let mut file = IhexFile::parse_with(bytes, &options).unwrap();

        // Assert: bad line skipped, warning recorded with its line number
        assert_eq!(file.warnings().len(), 1);
        assert_eq!(
            file.warnings()[0],
            HexRecError::Parse(
                RecordErrorKind::ChecksumMismatch {
                    expected: 0xAC,
                    actual: 0x0A
                },
                2
            )
        );
        assert_eq!(file.image().to_blocks(), vec![(0x10, b"A".to_vec())]);
    }
}
