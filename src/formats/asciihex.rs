//! ASCII-hex format: free-form hex byte pairs separated by execution
//! characters, `$Axxxx,` address markers, optional `$Sxxxx,` running
//! checksum markers, framed by STX/ETX control characters.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::{HexRecError, RecordErrorKind};
use crate::file::{
    FileMeta, Format, FormatRecord, ParseOptions, RecordFile, Tag, ValidateOptions,
};
use crate::image::SparseImage;
use crate::util::{hex_value, hexlify};

const STX: u8 = 0x02;
const ETX: u8 = 0x03;

static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^(?P<before>\\s*)(\
         (?P<data>([0-9A-Fa-f]{2}[ \\t\\x0B\\x0C\\r%',]?)+)|\
         (\\$[Aa](?P<address>[0-9A-Fa-f]+)[,.])|\
         (\\$[Ss](?P<checksum>[0-9A-Fa-f]+)[,.])\
         )(?P<after>\\s*)",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsciiHexTag {
    Data,
    Address,
    Checksum,
}

impl AsciiHexTag {
    #[must_use]
    pub fn is_address(self) -> bool {
        self == Self::Address
    }

    /// Tells whether this record carries a running checksum marker.
    #[must_use]
    pub fn is_checksum(self) -> bool {
        self == Self::Checksum
    }
}

impl Tag for AsciiHexTag {
    fn is_data(self) -> bool {
        self == Self::Data
    }
}

/// One ASCII-hex token: a data run, an address marker, or a checksum
/// marker. Address records reuse `count` for the serialized digit count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiHexRecord {
    pub tag: AsciiHexTag,
    pub address: u64,
    pub data: Vec<u8>,
    pub count: Option<u64>,
    pub checksum: Option<u64>,
    pub before: Vec<u8>,
    pub after: Vec<u8>,
}

impl AsciiHexRecord {
    pub fn create_address(address: u64, addrlen: usize) -> Result<Self, RecordErrorKind> {
        if addrlen < 1 || hex_digits(address) > addrlen {
            return Err(RecordErrorKind::InvalidAddressLength(addrlen));
        }
        Ok(Self {
            tag: AsciiHexTag::Address,
            address,
            data: Vec::new(),
            count: Some(addrlen as u64),
            checksum: None,
            before: Vec::new(),
            after: b"\r\n".to_vec(),
        })
    }

    #[must_use]
    pub fn create_data(address: u64, data: &[u8]) -> Self {
        Self {
            tag: AsciiHexTag::Data,
            address,
            data: data.to_vec(),
            count: None,
            checksum: None,
            before: Vec::new(),
            after: b"\r\n".to_vec(),
        }
    }

    pub fn create_checksum(checksum: u64) -> Result<Self, RecordErrorKind> {
        if checksum > 0xFFFF {
            return Err(RecordErrorKind::ChecksumMismatch {
                expected: checksum & 0xFFFF,
                actual: checksum,
            });
        }
        Ok(Self {
            tag: AsciiHexTag::Checksum,
            address: 0,
            data: Vec::new(),
            count: None,
            checksum: Some(checksum),
            before: Vec::new(),
            after: b"\r\n".to_vec(),
        })
    }
}

impl FormatRecord for AsciiHexRecord {
    type Tag = AsciiHexTag;

    fn tag(&self) -> AsciiHexTag {
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
            AsciiHexTag::Address => {
                let digits = self.count.unwrap_or(1) as usize;
                out.extend_from_slice(b"$A");
                out.extend_from_slice(
                    format!("{:0digits$X}", self.address, digits = digits).as_bytes(),
                );
                out.push(b',');
            }
            AsciiHexTag::Checksum => {
                out.extend_from_slice(
                    format!("$S{:04X},", self.checksum.unwrap_or(0) & 0xFFFF).as_bytes(),
                );
            }
            AsciiHexTag::Data => {
                if !self.data.is_empty() {
                    out.extend_from_slice(&hexlify(&self.data, Some(b' ')));
                    out.push(b' ');
                }
            }
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
        match self.tag {
            AsciiHexTag::Address => {
                let digits = self.count.unwrap_or(0) as usize;
                if digits < hex_digits(self.address).max(1) {
                    return Err(RecordErrorKind::InvalidAddressLength(digits));
                }
            }
            AsciiHexTag::Checksum => {
                let checksum = self.checksum.unwrap_or(0);
                if checksum > 0xFFFF {
                    return Err(RecordErrorKind::ChecksumMismatch {
                        expected: checksum & 0xFFFF,
                        actual: checksum,
                    });
                }
            }
            AsciiHexTag::Data => {}
        }
        if !self.data.is_empty() && self.tag != AsciiHexTag::Data {
            return Err(RecordErrorKind::UnexpectedData);
        }
        Ok(())
    }
}

/// ASCII-hex metadata: whether a `$S` running checksum marker is emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AsciiHexMeta {
    pub emit_checksum: bool,
}

impl FileMeta for AsciiHexMeta {}

/// ASCII-hex format marker.
#[derive(Debug, Clone, Copy)]
pub struct AsciiHex;

pub type AsciiHexFile = RecordFile<AsciiHex>;

impl Format for AsciiHex {
    type Tag = AsciiHexTag;
    type Record = AsciiHexRecord;
    type Meta = AsciiHexMeta;

    const NAME: &'static str = "asciihex";
    const FILE_EXTENSIONS: &'static [&'static str] = &[".ahex", ".ascii", ".ahx"];
    const DEFAULT_DATALEN: usize = 16;

    fn parse_records(
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Vec<AsciiHexRecord>, Vec<HexRecError>), HexRecError> {
        // STX/ETX framing is optional on input: content starts after an STX
        // if present, and always stops at an ETX.
        let start_offset = bytes
            .iter()
            .position(|&byte| byte == STX)
            .map_or(0, |index| index + 1);
        let end_offset = bytes[start_offset..]
            .iter()
            .position(|&byte| byte == ETX)
            .map_or(bytes.len(), |index| start_offset + index);
        let region = &bytes[start_offset..end_offset];

        let mut records = Vec::new();
        let mut warnings = Vec::new();
        let mut offset = 0;
        let mut address: u64 = 0;
        let mut line = 1 + count_newlines(&bytes[..start_offset]);

        while offset < region.len() {
            let rest = &region[offset..];
            if rest.iter().all(u8::is_ascii_whitespace) {
                break;
            }

            match TOKEN_REGEX.captures(rest) {
                Some(caps) => {
                    let record = if let Some(value) = caps.name("address") {
                        address = hex_value(value.as_bytes());
                        AsciiHexRecord {
                            tag: AsciiHexTag::Address,
                            address,
                            data: Vec::new(),
                            count: Some(value.as_bytes().len() as u64),
                            checksum: None,
                            before: caps["before"].to_vec(),
                            after: caps["after"].to_vec(),
                        }
                    } else if let Some(value) = caps.name("checksum") {
                        AsciiHexRecord {
                            tag: AsciiHexTag::Checksum,
                            address: 0,
                            data: Vec::new(),
                            count: None,
                            checksum: Some(hex_value(value.as_bytes())),
                            before: caps["before"].to_vec(),
                            after: caps["after"].to_vec(),
                        }
                    } else {
                        let mut text = caps["data"].to_vec();
                        text.retain(|byte| byte.is_ascii_hexdigit());
                        let data = crate::util::unhexlify(&text);
                        let record_address = address;
                        address = address.saturating_add(data.len() as u64);
                        AsciiHexRecord {
                            tag: AsciiHexTag::Data,
                            address: record_address,
                            data,
                            count: None,
                            checksum: None,
                            before: caps["before"].to_vec(),
                            after: caps["after"].to_vec(),
                        }
                    };

                    let consumed = caps.get(0).map_or(1, |m| m.end());
                    match record.validate() {
                        Ok(()) => records.push(record),
                        Err(kind) => {
                            let error = HexRecError::Parse(kind, line);
                            if options.ignore_errors && error.is_dismissible() {
                                warnings.push(error);
                            } else {
                                return Err(error);
                            }
                        }
                    }
                    line += count_newlines(&rest[..consumed]);
                    offset += consumed;
                }
                None => {
                    let error = HexRecError::Parse(RecordErrorKind::SyntaxError, line);
                    if options.ignore_errors {
                        if rest[0] == b'\n' {
                            line += 1;
                        }
                        offset += 1;
                        warnings.push(error);
                    } else {
                        return Err(error);
                    }
                }
            }
        }
        Ok((records, warnings))
    }

    fn apply_records(records: &[AsciiHexRecord]) -> (SparseImage, AsciiHexMeta) {
        let mut image = SparseImage::new();
        let mut meta = AsciiHexMeta::default();

        for record in records {
            match record.tag {
                AsciiHexTag::Data => {
                    let _ = image.write(record.address, &record.data);
                }
                AsciiHexTag::Checksum => meta.emit_checksum = true,
                AsciiHexTag::Address => {}
            }
        }
        (image, meta)
    }

    fn update_records(
        image: &SparseImage,
        meta: &AsciiHexMeta,
        maxdatalen: usize,
    ) -> Result<Vec<AsciiHexRecord>, HexRecError> {
        let mut records = Vec::new();
        let mut last_end = 0;
        let mut file_checksum: u64 = 0;

        for (chunk_start, chunk) in image.chunks(maxdatalen, true) {
            if chunk_start != last_end {
                let addrlen = hex_digits(chunk_start).max(8);
                records.push(
                    AsciiHexRecord::create_address(chunk_start, addrlen)
                        .map_err(HexRecError::Record)?,
                );
            }
            file_checksum =
                (file_checksum + chunk.iter().map(|&byte| u64::from(byte)).sum::<u64>()) & 0xFFFF;
            records.push(AsciiHexRecord::create_data(chunk_start, chunk));
            last_end = chunk_start + chunk.len() as u64;
        }

        if meta.emit_checksum {
            records.push(
                AsciiHexRecord::create_checksum(file_checksum).map_err(HexRecError::Record)?,
            );
        }
        Ok(records)
    }

    fn validate_records(
        records: &[AsciiHexRecord],
        _options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        let mut file_checksum: u64 = 0;

        for record in records {
            record.validate().map_err(HexRecError::Record)?;

            match record.tag {
                AsciiHexTag::Data => {
                    file_checksum = (file_checksum
                        + record.data.iter().map(|&byte| u64::from(byte)).sum::<u64>())
                        & 0xFFFF;
                }
                AsciiHexTag::Checksum => {
                    // The marker checks the sum of all data bytes before it.
                    let stated = record.checksum.unwrap_or(0);
                    if stated != file_checksum {
                        return Err(RecordErrorKind::ChecksumMismatch {
                            expected: file_checksum,
                            actual: stated,
                        }
                        .into());
                    }
                }
                AsciiHexTag::Address => {}
            }
        }
        Ok(())
    }

    fn serialize_records(records: &[AsciiHexRecord], out: &mut Vec<u8>) {
        out.push(STX);
        for record in records {
            out.extend_from_slice(&record.to_bytes());
        }
        out.push(ETX);
    }
}

fn hex_digits(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        (64 - value.leading_zeros() as usize).div_ceil(4)
    }
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&byte| byte == b'\n').count()
}
