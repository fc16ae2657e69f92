//! Raw binary format: the whole file is one data payload at address zero.

use crate::error::{HexRecError, RecordErrorKind};
use crate::file::{
    FileMeta, Format, FormatRecord, ParseOptions, RecordFile, Tag, ValidateOptions,
};
use crate::image::SparseImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawTag {
    Data,
}

impl Tag for RawTag {
    fn is_data(self) -> bool {
        true
    }
}

/// One raw data chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub tag: RawTag,
    pub address: u64,
    pub data: Vec<u8>,
}

impl RawRecord {
    #[must_use]
    pub fn create_data(address: u64, data: &[u8]) -> Self {
        Self {
            tag: RawTag::Data,
            address,
            data: data.to_vec(),
        }
    }
}

impl FormatRecord for RawRecord {
    type Tag = RawTag;

    fn tag(&self) -> RawTag {
        self.tag
    }

    fn address(&self) -> u64 {
        self.address
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn validate(&self) -> Result<(), RecordErrorKind> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMeta;

impl FileMeta for RawMeta {}

/// Raw binary format marker.
#[derive(Debug, Clone, Copy)]
pub struct Raw;

pub type RawFile = RecordFile<Raw>;

impl Format for Raw {
    type Tag = RawTag;
    type Record = RawRecord;
    type Meta = RawMeta;

    const NAME: &'static str = "raw";
    const FILE_EXTENSIONS: &'static [&'static str] = &[".bin", ".dat", ".raw", ".eep"];
    const DEFAULT_DATALEN: usize = usize::MAX;

    fn parse_records(
        bytes: &[u8],
        _options: &ParseOptions,
    ) -> Result<(Vec<RawRecord>, Vec<HexRecError>), HexRecError> {
        if bytes.is_empty() {
            Ok((Vec::new(), Vec::new()))
        } else {
            Ok((vec![RawRecord::create_data(0, bytes)], Vec::new()))
        }
    }

    fn apply_records(records: &[RawRecord]) -> (SparseImage, RawMeta) {
        let mut image = SparseImage::new();
        for record in records {
            let _ = image.write(record.address, &record.data);
        }
        (image, RawMeta)
    }

    fn update_records(
        image: &SparseImage,
        _meta: &RawMeta,
        maxdatalen: usize,
    ) -> Result<Vec<RawRecord>, HexRecError> {
        // Holes cannot be represented in a raw dump.
        if !image.contiguous() {
            return Err(RecordErrorKind::NotContiguous.into());
        }

        let mut records = Vec::new();
        for (chunk_start, chunk) in image.chunks(maxdatalen, false) {
            records.push(RawRecord::create_data(chunk_start, chunk));
        }
        Ok(records)
    }

    fn validate_records(
        records: &[RawRecord],
        _options: &ValidateOptions,
    ) -> Result<(), HexRecError> {
        let mut cursor = None;

        for record in records {
            record.validate().map_err(HexRecError::Record)?;

            match cursor {
                None => {
                    if record.address != 0 {
                        return Err(RecordErrorKind::StartNotZero(record.address).into());
                    }
                }
                Some(end) => {
                    if record.address != end {
                        return Err(RecordErrorKind::NotContiguous.into());
                    }
                }
            }
            cursor = Some(record.address + record.data.len() as u64);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_file_as_one_record() {
        // Arrange / Act
        let mut file = RawFile::parse(b"Hello, World!").unwrap();

        // Assert
        assert_eq!(
            file.image().to_blocks(),
            vec![(0, b"Hello, World!".to_vec())]
        );
        assert_eq!(file.to_bytes().unwrap(), b"Hello, World!".to_vec());
    }

    #[test]
    fn test_update_records_rejects_holes() {
        // Arrange
        let mut file = RawFile::from_blocks([(0u64, vec![1]), (10, vec![2])]);

        // Act / Assert
        assert_eq!(
            file.to_bytes().unwrap_err(),
            HexRecError::Record(RecordErrorKind::NotContiguous)
        );
    }

    #[test]
    fn test_validate_rejects_nonzero_start() {
        // Arrange
        let mut file = RawFile::from_bytes(b"abc", 0x1000);

        // Act / Assert
        assert_eq!(
            file.validate().unwrap_err(),
            HexRecError::Record(RecordErrorKind::StartNotZero(0x1000))
        );
    }

    #[test]
    fn test_maxdatalen_chunks_records_not_output() {
        // Arrange
        let mut file = RawFile::from_bytes(&[0x55; 10], 0);
        file.set_maxdatalen(4).unwrap();

        // Act
        let record_count = file.records().unwrap().len();
        let bytes = file.to_bytes().unwrap();

        // Assert
        assert_eq!(record_count, 3);
        assert_eq!(bytes, vec![0x55; 10]);
    }

    #[test]
    fn test_empty_file() {
        // Arrange / Act
        let mut file = RawFile::parse(b"").unwrap();

        // Assert
        assert!(file.image().is_empty());
        assert_eq!(file.to_bytes().unwrap(), Vec::<u8>::new());
    }
}
