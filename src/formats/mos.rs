//! MOS Technology format: `;CCAAAADD..KKKK` records with a 16-bit checksum.
//! The terminator record has a zero count and carries the number of data
//! records in its address field.

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
        "^(?P<before>\\s*);\
         (?P<count>[0-9A-Fa-f]{2})\
         (?P<address>[0-9A-Fa-f]{4})\
         (?P<data>([0-9A-Fa-f]{2})*)\
         (?P<checksum>[0-9A-Fa-f]{4})\
         (?P<after>\\s*)$",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MosTag {
    Data,
    Eof,
}

impl MosTag {
    #[must_use]
    pub fn is_eof(self) -> bool {
        self == Self::Eof
    }
}

impl Tag for MosTag {
    fn is_data(self) -> bool {
        self == Self::Data
    }

    fn is_file_termination(self) -> bool {
        self.is_eof()
    }
}

/// One MOS Technology record line. The terminator reuses `address` for the
/// data record count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosRecord {
    pub tag: MosTag,
    pub address: u64,
    pub data: Vec<u8>,
    pub count: Option<u64>,
    pub checksum: Option<u64>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl MosRecord {
    fn build(tag: MosTag, address: u64, data: Vec<u8>) -> Self {
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
        Ok(Self::build(MosTag::Data, address, data.to_vec()))
    }

    /// Creates the terminator; `record_count` is the number of preceding
    /// data records.
    pub fn create_terminator(record_count: u64) -> Result<Self, RecordErrorKind> {
        if record_count > 0xFFFF {
            return Err(RecordErrorKind::WrongRecordCount {
                expected: 0xFFFF,
                actual: record_count,
            });
        }
        Ok(Self::build(MosTag::Eof, record_count, Vec::new()))
    }

    /// Parses one record line. A zero count marks the terminator.
    pub fn parse(line: &[u8]) -> Result<Self, RecordErrorKind> {
        let caps = LINE_REGEX
            .captures(line)
            .ok_or(RecordErrorKind::SyntaxError)?;

        let count = hex_value(&caps["count"]);
        let data = unhexlify(&caps["data"]);
        let tag = if count == 0 { MosTag::Eof } else { MosTag::Data };

        let record = Self {
            tag,
            address: hex_value(&caps["address"]),
            data,
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

    /// 16-bit sum of count, address high, address low, and data bytes.
    /// The terminator echoes its record count instead.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        if self.tag == MosTag::Eof {
            return self.address & 0xFFFF;
        }
        let count = self.count.unwrap_or_else(|| self.compute_count()) & 0xFF;
        let address = self.address & 0xFFFF;
        let mut sum = count + (address >> 8) + (address & 0xFF);
        sum += self.data.iter().map(|&byte| u64::from(byte)).sum::<u64>();
        sum & 0xFFFF
    }
}

impl FormatRecord for MosRecord {
    type Tag = MosTag;

    fn tag(&self) -> MosTag {
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
        out.push(b';');
        out.extend_from_slice(
            format!(
                "{:02X}{:04X}",
                self.count.unwrap_or(0) & 0xFF,
                self.address & 0xFFFF
            )
            .as_bytes(),
        );
        out.extend_from_slice(&hexlify(&self.data, None));
        out.extend_from_slice(format!("{:04X}", self.checksum.unwrap_or(0) & 0xFFFF).as_bytes());
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
        if self.tag == MosTag::Eof && !self.data.is_empty() {
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
pub struct MosMeta;

impl FileMeta for MosMeta {}

/// MOS Technology format marker.
#[derive(Debug, Clone, Copy)]
pub struct Mos;

pub type MosFile = RecordFile<Mos>;

impl Format for Mos {
    type Tag = MosTag;
    type Record = MosRecord;
    type Meta = MosMeta;

    const NAME: &'static str = "mos";
    const FILE_EXTENSIONS: &'static [&'static str] = &[".mos"];
    const DEFAULT_DATALEN: usize = 16;

    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<MosRecord>, Vec<HexRecError>), HexRecError> {
        parse_lines(bytes, options, MosRecord::parse)
    }

    fn apply_records(records: &[MosRecord]) -> (SparseImage, MosMeta) {
        let mut image = SparseImage::new();
        for record in records {
            if record.tag == MosTag::Data {
                let _ = image.write(record.address, &record.data);
            }
        }
        (image, MosMeta)
    }

    fn update_records(
        image: &SparseImage,
        _meta: &MosMeta,
        maxdatalen: usize,
    ) -> Result<Vec<MosRecord>, HexRecError> {
        if let Some(end) = image.end()
            && end > 0x1_0000
        {
            return Err(RecordErrorKind::AddressOverflow(end - 1).into());
        }

        let mut records = Vec::new();
        for (chunk_start, chunk) in image.chunks(maxdatalen.min(0xFF), false) {
            records.push(MosRecord::create_data(chunk_start, chunk).map_err(HexRecError::Record)?);
        }
        let count = records.len() as u64;
        records.push(MosRecord::create_terminator(count).map_err(HexRecError::Record)?);
        Ok(records)
    }

    fn validate_records(
        records: &[MosRecord],
        _options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        let mut data_count: u64 = 0;
        let mut terminator = None;

        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(HexRecError::Record)?;

            match record.tag {
                MosTag::Data => data_count += 1,
                MosTag::Eof => {
                    if index != records.len() - 1 {
                        return Err(RecordErrorKind::TerminationNotLast.into());
                    }
                    terminator = Some(record);
                }
            }
        }

        let Some(terminator) = terminator else {
            return Err(RecordErrorKind::MissingTermination.into());
        };
        if terminator.address != data_count {
            return Err(RecordErrorKind::WrongRecordCount {
                expected: data_count,
                actual: terminator.address,
            }
            .into());
        }
        Ok(())
    }
}
