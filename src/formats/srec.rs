//! Motorola S-record format: `SNCCAA..DD..KK` records where the tag digit
//! selects the record kind and the address width (16/24/32 bits).

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::{HexRecError, RecordErrorKind};
use crate::file::{
    FileMeta, Format, FormatRecord, ParseOptions, RecordFile, Tag, ValidateOptions, parse_lines,
};
use crate::image::SparseImage;
use crate::util::{hex_value, hexlify, unhexlify};

static HEAD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^(?P<before>\\s*)[Ss]\
         (?P<tag>[0-9A-Fa-f])\
         (?P<count>[0-9A-Fa-f]{2})",
    )
    .expect("static regex")
});

static TAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^(?P<data>([0-9A-Fa-f]{2})*)\
         (?P<checksum>[0-9A-Fa-f]{2})\
         (?P<after>[^\\r\\n]*\\r?\\n?)$",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SrecTag {
    /// Header string. Optional.
    Header = 0,
    /// Data record with a 16-bit address.
    Data16 = 1,
    /// Data record with a 24-bit address.
    Data24 = 2,
    /// Data record with a 32-bit address.
    Data32 = 3,
    /// 16-bit data record count. Optional.
    Count16 = 5,
    /// 24-bit data record count. Optional.
    Count24 = 6,
    /// 32-bit start address. Terminates `Data32` files.
    Start32 = 7,
    /// 24-bit start address. Terminates `Data24` files.
    Start24 = 8,
    /// 16-bit start address. Terminates `Data16` files.
    Start16 = 9,
}

impl SrecTag {
    fn from_wire(value: u8) -> Result<Self, RecordErrorKind> {
        match value {
            0 => Ok(Self::Header),
            1 => Ok(Self::Data16),
            2 => Ok(Self::Data24),
            3 => Ok(Self::Data32),
            5 => Ok(Self::Count16),
            6 => Ok(Self::Count24),
            7 => Ok(Self::Start32),
            8 => Ok(Self::Start24),
            9 => Ok(Self::Start16),
            _ => Err(RecordErrorKind::InvalidTag(u16::from(value))),
        }
    }

    /// Serialized address width in bytes.
    #[must_use]
    pub fn address_size(self) -> usize {
        match self {
            Self::Header | Self::Data16 | Self::Count16 | Self::Start16 => 2,
            Self::Data24 | Self::Count24 | Self::Start24 => 3,
            Self::Data32 | Self::Start32 => 4,
        }
    }

    /// Highest address representable by this tag.
    #[must_use]
    pub fn address_max(self) -> u64 {
        (1 << (self.address_size() * 8)) - 1
    }

    /// Maximum data field size: the count byte caps the whole remainder.
    #[must_use]
    pub fn data_max(self) -> usize {
        0xFE - self.address_size()
    }

    /// Smallest data tag whose address width fits `address_max`.
    pub fn fit_data_tag(address_max: u64) -> Result<Self, RecordErrorKind> {
        match address_max {
            0..=0xFFFF => Ok(Self::Data16),
            0x1_0000..=0xFF_FFFF => Ok(Self::Data24),
            0x100_0000..=0xFFFF_FFFF => Ok(Self::Data32),
            _ => Err(RecordErrorKind::AddressOverflow(address_max)),
        }
    }

    /// Smallest count tag fitting `count`.
    pub fn fit_count_tag(count: u64) -> Result<Self, RecordErrorKind> {
        match count {
            0..=0xFFFF => Ok(Self::Count16),
            0x1_0000..=0xFF_FFFF => Ok(Self::Count24),
            _ => Err(RecordErrorKind::WrongRecordCount {
                expected: 0xFF_FFFF,
                actual: count,
            }),
        }
    }

    /// The start address tag paired with a data tag (and vice versa).
    #[must_use]
    pub fn tag_match(self) -> Option<Self> {
        match self {
            Self::Data16 => Some(Self::Start16),
            Self::Data24 => Some(Self::Start24),
            Self::Data32 => Some(Self::Start32),
            Self::Start16 => Some(Self::Data16),
            Self::Start24 => Some(Self::Data24),
            Self::Start32 => Some(Self::Data32),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_header(self) -> bool {
        self == Self::Header
    }

    #[must_use]
    pub fn is_count(self) -> bool {
        matches!(self, Self::Count16 | Self::Count24)
    }

    #[must_use]
    pub fn is_start(self) -> bool {
        matches!(self, Self::Start16 | Self::Start24 | Self::Start32)
    }
}

impl Tag for SrecTag {
    fn is_data(self) -> bool {
        matches!(self, Self::Data16 | Self::Data24 | Self::Data32)
    }

    fn is_file_termination(self) -> bool {
        self.is_start()
    }
}

/// One Motorola S-record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrecRecord {
    pub tag: SrecTag,
    pub address: u64,
    pub data: Vec<u8>,
    pub count: Option<u64>,
    pub checksum: Option<u64>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl SrecRecord {
    fn build(tag: SrecTag, address: u64, data: Vec<u8>) -> Self {
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

    /// Creates the S0 header record.
    pub fn create_header(data: &[u8]) -> Result<Self, RecordErrorKind> {
        if data.len() > 0xFC {
            return Err(RecordErrorKind::DataSizeOverflow(data.len()));
        }
        Ok(Self::build(SrecTag::Header, 0, data.to_vec()))
    }

    /// Creates a data record. Without an explicit `tag`, the smallest
    /// address width fitting `address` is chosen.
    pub fn create_data(
        address: u64,
        data: &[u8],
        tag: Option<SrecTag>,
    ) -> Result<Self, RecordErrorKind> {
        let tag = match tag {
            Some(tag) if tag.is_data() => tag,
            Some(tag) => return Err(RecordErrorKind::InvalidTag(tag as u16)),
            None => SrecTag::fit_data_tag(address)?,
        };
        if address > tag.address_max() {
            return Err(RecordErrorKind::AddressOverflow(address));
        }
        if data.len() > tag.data_max() {
            return Err(RecordErrorKind::DataSizeOverflow(data.len()));
        }
        Ok(Self::build(tag, address, data.to_vec()))
    }

    /// Creates an S5/S6 record-count record.
    pub fn create_count(count: u64, tag: Option<SrecTag>) -> Result<Self, RecordErrorKind> {
        let tag = match tag {
            Some(tag) if tag.is_count() => tag,
            Some(tag) => return Err(RecordErrorKind::InvalidTag(tag as u16)),
            None => SrecTag::fit_count_tag(count)?,
        };
        if count > tag.address_max() {
            return Err(RecordErrorKind::WrongRecordCount {
                expected: tag.address_max(),
                actual: count,
            });
        }
        Ok(Self::build(tag, count, Vec::new()))
    }

    /// Creates the terminating start address record.
    pub fn create_start(address: u64, tag: Option<SrecTag>) -> Result<Self, RecordErrorKind> {
        let tag = match tag {
            Some(tag) if tag.is_start() => tag,
            Some(tag) => return Err(RecordErrorKind::InvalidTag(tag as u16)),
            None => SrecTag::fit_data_tag(address)?
                .tag_match()
                .ok_or(RecordErrorKind::AddressOverflow(address))?,
        };
        if address > tag.address_max() {
            return Err(RecordErrorKind::AddressOverflow(address));
        }
        Ok(Self::build(tag, address, Vec::new()))
    }

    /// Parses one record line.
    pub fn parse(line: &[u8]) -> Result<Self, RecordErrorKind> {
        let caps = HEAD_REGEX
            .captures(line)
            .ok_or(RecordErrorKind::SyntaxError)?;
        let tag = SrecTag::from_wire(hex_value(&caps["tag"]) as u8)?;
        let count = hex_value(&caps["count"]);
        let before = caps["before"].to_vec();
        let head_end = caps.get(0).map_or(0, |m| m.end());

        let rest = &line[head_end..];
        let address_digits = tag.address_size() * 2;
        if rest.len() < address_digits
            || !rest[..address_digits].iter().all(u8::is_ascii_hexdigit)
        {
            return Err(RecordErrorKind::SyntaxError);
        }
        let address = hex_value(&rest[..address_digits]);

        let caps = TAIL_REGEX
            .captures(&rest[address_digits..])
            .ok_or(RecordErrorKind::SyntaxError)?;

        let record = Self {
            tag,
            address,
            data: unhexlify(&caps["data"]),
            count: Some(count),
            checksum: Some(hex_value(&caps["checksum"])),
            before,
            after: caps["after"].to_vec(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Derived count: address bytes, data bytes, and the checksum byte.
    #[must_use]
    pub fn compute_count(&self) -> u64 {
        (self.tag.address_size() + self.data.len() + 1) as u64
    }

    /// Derived one's-complement checksum over count, address and data.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        let mut sum = self.count.unwrap_or_else(|| self.compute_count()) & 0xFF;
        let mut address = self.address & 0xFFFF_FFFF;
        while address > 0 {
            sum += address & 0xFF;
            address >>= 8;
        }
        sum += self.data.iter().map(|&byte| u64::from(byte)).sum::<u64>();
        (sum & 0xFF) ^ 0xFF
    }
}

impl FormatRecord for SrecRecord {
    type Tag = SrecTag;

    fn tag(&self) -> SrecTag {
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
        out.push(b'S');
        out.extend_from_slice(
            format!("{:X}{:02X}", self.tag as u8, self.count.unwrap_or(0) & 0xFF).as_bytes(),
        );
        let digits = self.tag.address_size() * 2;
        out.extend_from_slice(
            format!("{:0digits$X}", self.address & 0xFFFF_FFFF, digits = digits).as_bytes(),
        );
        out.extend_from_slice(&hexlify(&self.data, None));
        out.extend_from_slice(format!("{:02X}", self.checksum.unwrap_or(0) & 0xFF).as_bytes());
        out.extend_from_slice(&self.after);
        out
    }

    fn validate(&self) -> Result<(), RecordErrorKind> {
        if !self.before.iter().all(u8::is_ascii_whitespace) {
            return Err(RecordErrorKind::JunkBefore);
        }
        if self.address > self.tag.address_max() {
            return Err(RecordErrorKind::AddressOverflow(self.address));
        }
        if self.data.len() > self.tag.data_max() {
            return Err(RecordErrorKind::DataSizeOverflow(self.data.len()));
        }
        if !(self.tag.is_data() || self.tag.is_header()) && !self.data.is_empty() {
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

/// S-record metadata: optional header string and the start address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrecMeta {
    /// Header bytes for the S0 record; `None` suppresses the header.
    pub header: Option<Vec<u8>>,
    pub start_address: u64,
}

impl Default for SrecMeta {
    fn default() -> Self {
        Self {
            header: Some(Vec::new()),
            start_address: 0,
        }
    }
}

impl FileMeta for SrecMeta {
    fn start_address(&self) -> Option<u64> {
        Some(self.start_address)
    }

    fn set_start_address(&mut self, address: Option<u64>) {
        self.start_address = address.unwrap_or(0) & 0xFFFF_FFFF;
    }

    fn header(&self) -> Option<&[u8]> {
        self.header.as_deref()
    }

    fn set_header(&mut self, header: Option<Vec<u8>>) {
        self.header = header;
    }
}

/// Motorola S-record format marker.
#[derive(Debug, Clone, Copy)]
pub struct Srec;

pub type SrecFile = RecordFile<Srec>;

impl Format for Srec {
    type Tag = SrecTag;
    type Record = SrecRecord;
    type Meta = SrecMeta;

    const NAME: &'static str = "srec";
    const FILE_EXTENSIONS: &'static [&'static str] = &[
        ".s19", ".s28", ".s37", ".s", ".s1", ".s2", ".s3", ".srec", ".exo", ".mot", ".mxt",
    ];
    const DEFAULT_DATALEN: usize = 16;

    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<SrecRecord>, Vec<HexRecError>), HexRecError> {
        let (records, mut warnings) = parse_lines(bytes, options, SrecRecord::parse)?;

        // Mixed data widths are tolerated here; strict checking is left to
        // validate_records.
        let mut sample = None;
        for record in &records {
            if record.tag.is_data() {
                match sample {
                    None => sample = Some(record.tag),
                    Some(tag) if tag != record.tag => {
                        warnings.push(RecordErrorKind::MixedDataWidths.into());
                        break;
                    }
                    _ => {}
                }
            }
        }
        Ok((records, warnings))
    }

    fn apply_records(records: &[SrecRecord]) -> (SparseImage, SrecMeta) {
        let mut image = SparseImage::new();
        let mut meta = SrecMeta {
            header: None,
            start_address: 0,
        };

        for record in records {
            if record.tag.is_data() {
                let _ = image.write(record.address, &record.data);
            } else if record.tag.is_start() {
                meta.start_address = record.address;
            } else if record.tag.is_header() {
                meta.header = Some(record.data.clone());
            }
        }
        (image, meta)
    }

    fn update_records(
        image: &SparseImage,
        meta: &SrecMeta,
        maxdatalen: usize,
    ) -> Result<Vec<SrecRecord>, HexRecError> {
        let address_max = image.end().map_or(0, |end| end - 1);
        let data_tag = SrecTag::fit_data_tag(address_max).map_err(HexRecError::Record)?;

        let mut records = Vec::new();
        if let Some(header) = &meta.header {
            records.push(SrecRecord::create_header(header).map_err(HexRecError::Record)?);
        }

        let mut data_count: u64 = 0;
        for (chunk_start, chunk) in image.chunks(maxdatalen.min(data_tag.data_max()), true) {
            let record = SrecRecord::create_data(chunk_start, chunk, Some(data_tag))
                .map_err(HexRecError::Record)?;
            records.push(record);
            data_count += 1;
        }

        records.push(SrecRecord::create_count(data_count, None).map_err(HexRecError::Record)?);
        let start_tag = data_tag.tag_match();
        records
            .push(SrecRecord::create_start(meta.start_address, start_tag)
                .map_err(HexRecError::Record)?);
        Ok(records)
    }

    fn validate_records(
        records: &[SrecRecord],
        options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        let mut count_record: Option<&SrecRecord> = None;
        let mut start_record: Option<&SrecRecord> = None;
        let mut data_tag_sample = None;
        let mut data_count: u64 = 0;

        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(HexRecError::Record)?;
            let tag = record.tag;

            if tag.is_data() {
                data_count += 1;
                match data_tag_sample {
                    None => data_tag_sample = Some(tag),
                    Some(sample) if sample != tag && !options.lax => {
                        return Err(RecordErrorKind::MixedDataWidths.into());
                    }
                    _ => {}
                }
            } else if tag.is_count() {
                if count_record.is_some() {
                    return Err(RecordErrorKind::MultipleRecords("count").into());
                }
                if record.address != data_count {
                    return Err(RecordErrorKind::WrongRecordCount {
                        expected: data_count,
                        actual: record.address,
                    }
                    .into());
                }
                if index != records.len().saturating_sub(2) {
                    return Err(RecordErrorKind::CountNotPenultimate.into());
                }
                count_record = Some(record);
            } else if tag.is_start() {
                if start_record.is_some() {
                    return Err(RecordErrorKind::MultipleRecords("start address").into());
                }
                if index != records.len() - 1 {
                    return Err(RecordErrorKind::TerminationNotLast.into());
                }
                start_record = Some(record);
            } else if index != 0 {
                return Err(RecordErrorKind::HeaderNotFirst.into());
            }
        }

        let Some(start_record) = start_record else {
            return Err(RecordErrorKind::MissingTermination.into());
        };
        if !options.lax
            && let Some(sample) = data_tag_sample
            && sample.tag_match() != Some(start_record.tag)
        {
            return Err(RecordErrorKind::MixedDataWidths.into());
        }
        Ok(())
    }
}
