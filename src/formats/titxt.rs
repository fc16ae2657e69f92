//! Texas Instruments TI-TXT format: `@XXXX` address records, lines of
//! whitespace-separated hex byte pairs, and a final `q` record.

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
        "^(?P<before>[ \\t]*)(\
         (?P<data>([0-9A-Fa-f]{2}[ \\t]?)+)|\
         (@(?P<address>[0-9A-Fa-f]+))|\
         (?P<eof>q)\
         )(?P<after>\\s*)$",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TiTxtTag {
    Data,
    Address,
    Eof,
}

impl TiTxtTag {
    /// Tells whether this tag updates the running data address.
    #[must_use]
    pub fn is_address(self) -> bool {
        self == Self::Address
    }

    #[must_use]
    pub fn is_eof(self) -> bool {
        self == Self::Eof
    }
}

impl Tag for TiTxtTag {
    fn is_data(self) -> bool {
        self == Self::Data
    }

    fn is_file_termination(self) -> bool {
        self.is_eof()
    }
}

/// One TI-TXT record line. Address records reuse `count` for the number of
/// serialized address digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiTxtRecord {
    pub tag: TiTxtTag,
    pub address: u64,
    pub data: Vec<u8>,
    pub count: Option<u64>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl TiTxtRecord {
    /// Creates an address record with `addrlen` serialized hex digits.
    pub fn create_address(address: u64, addrlen: usize) -> Result<Self, RecordErrorKind> {
        if addrlen < 1 || hex_digits(address) > addrlen {
            return Err(RecordErrorKind::InvalidAddressLength(addrlen));
        }
        Ok(Self {
            tag: TiTxtTag::Address,
            address,
            data: Vec::new(),
            count: Some(addrlen as u64),
            before: Vec::new(),
            after: b"\n".to_vec(),
        })
    }

    #[must_use]
    pub fn create_data(address: u64, data: &[u8]) -> Self {
        Self {
            tag: TiTxtTag::Data,
            address,
            data: data.to_vec(),
            count: None,
            before: Vec::new(),
            after: b"\n".to_vec(),
        }
    }

    #[must_use]
    pub fn create_eof() -> Self {
        Self {
            tag: TiTxtTag::Eof,
            address: 0,
            data: Vec::new(),
            count: None,
            before: Vec::new(),
            after: b"\n".to_vec(),
        }
    }

    /// Parses one record line. Data record addresses are assigned later by
    /// the file-level parse, which tracks the running address.
    pub fn parse(line: &[u8]) -> Result<Self, RecordErrorKind> {
        let caps = LINE_REGEX
            .captures(line)
            .ok_or(RecordErrorKind::SyntaxError)?;

        let before = caps["before"].to_vec();
        let after = caps["after"].to_vec();

        let record = if let Some(address) = caps.name("address") {
            Self {
                tag: TiTxtTag::Address,
                address: hex_value(address.as_bytes()),
                data: Vec::new(),
                count: Some(address.as_bytes().len() as u64),
                before,
                after,
            }
        } else if caps.name("eof").is_some() {
            Self {
                tag: TiTxtTag::Eof,
                address: 0,
                data: Vec::new(),
                count: None,
                before,
                after,
            }
        } else {
            let mut text = caps["data"].to_vec();
            text.retain(|byte| !matches!(byte, b' ' | b'\t'));
            Self {
                tag: TiTxtTag::Data,
                address: 0,
                data: unhexlify(&text),
                count: None,
                before,
                after,
            }
        };
        record.validate()?;
        Ok(record)
    }
}

impl FormatRecord for TiTxtRecord {
    type Tag = TiTxtTag;

    fn tag(&self) -> TiTxtTag {
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
        match self.tag {
            TiTxtTag::Address => {
                let digits = self.count.unwrap_or(1) as usize;
                let mask = if digits >= 16 {
                    u64::MAX
                } else {
                    (1u64 << (4 * digits)) - 1
                };
                out.push(b'@');
                out.extend_from_slice(
                    format!("{:0digits$X}", self.address & mask, digits = digits).as_bytes(),
                );
            }
            TiTxtTag::Eof => out.push(b'q'),
            TiTxtTag::Data => out.extend_from_slice(&hexlify(&self.data, Some(b' '))),
        }
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
        if self.tag == TiTxtTag::Address {
            let digits = self.count.unwrap_or(0) as usize;
            if digits < hex_digits(self.address).max(1) {
                return Err(RecordErrorKind::InvalidAddressLength(digits));
            }
        }
        if !self.data.is_empty() && self.tag != TiTxtTag::Data {
            return Err(RecordErrorKind::UnexpectedData);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TiTxtMeta;

impl FileMeta for TiTxtMeta {}

/// TI-TXT format marker.
#[derive(Debug, Clone, Copy)]
pub struct TiTxt;

pub type TiTxtFile = RecordFile<TiTxt>;

impl Format for TiTxt {
    type Tag = TiTxtTag;
    type Record = TiTxtRecord;
    type Meta = TiTxtMeta;

    const NAME: &'static str = "titxt";
    const FILE_EXTENSIONS: &'static [&'static str] = &[".txt"];
    const DEFAULT_DATALEN: usize = 16;

    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<TiTxtRecord>, Vec<HexRecError>), HexRecError> {
        let (mut records, warnings) = parse_lines(bytes, options, TiTxtRecord::parse)?;

        // Data records inherit the running address.
        let mut current = 0;
        for record in &mut records {
            match record.tag {
                TiTxtTag::Address => current = record.address,
                TiTxtTag::Data => {
                    record.address = current;
                    current = current.saturating_add(record.data.len() as u64);
                }
                TiTxtTag::Eof => {}
            }
        }
        Ok((records, warnings))
    }

    fn apply_records(records: &[TiTxtRecord]) -> (SparseImage, TiTxtMeta) {
        let mut image = SparseImage::new();
        for record in records {
            if record.tag == TiTxtTag::Data {
                let _ = image.write(record.address, &record.data);
            }
        }
        (image, TiTxtMeta)
    }

    fn update_records(
        image: &SparseImage,
        _meta: &TiTxtMeta,
        maxdatalen: usize,
    ) -> Result<Vec<TiTxtRecord>, HexRecError> {
        let mut records = Vec::new();
        let mut last_end = 0;

        for (chunk_start, chunk) in image.chunks(maxdatalen, false) {
            if chunk_start != last_end {
                let addrlen = hex_digits(chunk_start).max(4);
                records.push(
                    TiTxtRecord::create_address(chunk_start, addrlen)
                        .map_err(HexRecError::Record)?,
                );
            }
            records.push(TiTxtRecord::create_data(chunk_start, chunk));
            last_end = chunk_start + chunk.len() as u64;
        }

        records.push(TiTxtRecord::create_eof());
        Ok(records)
    }

    fn validate_records(
        records: &[TiTxtRecord],
        _options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        let mut eof_seen = false;

        for (index, record) in records.iter().enumerate() {
            record.validate().map_err(HexRecError::Record)?;

            match record.tag {
                TiTxtTag::Address => {
                    // TI-TXT addresses words; odd addresses are invalid.
                    if record.address & 1 != 0 {
                        return Err(RecordErrorKind::MisalignedWord(record.address).into());
                    }
                }
                TiTxtTag::Eof => {
                    if index != records.len() - 1 {
                        return Err(RecordErrorKind::TerminationNotLast.into());
                    }
                    eof_seen = true;
                }
                TiTxtTag::Data => {}
            }
        }

        if !eof_seen {
            return Err(RecordErrorKind::MissingTermination.into());
        }
        Ok(())
    }
}

fn hex_digits(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        (64 - value.leading_zeros() as usize).div_ceil(4)
    }
}
