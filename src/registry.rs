//! The `registry` module maps format names and file extensions to record
//! file types, guesses formats from paths or content, and provides the
//! [`AnyFile`] handle plus the load/convert/merge facade used by the CLI
//! and by external callers.

use std::error::Error;
use std::fs;
use std::path::Path;

use crate::error::HexRecError;
use crate::file::{Format, ParseOptions, ValidateOptions};
use crate::formats::{
    AsciiHex, AsciiHexFile, Avr, AvrFile, Ihex, IhexFile, Mos, MosFile, Raw, RawFile, Srec,
    SrecFile, Tek, TekFile, TiTxt, TiTxtFile, Xtek, XtekFile,
};
use crate::image::SparseImage;

/// Enumerates the registered record formats, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Ihex,
    Srec,
    TiTxt,
    Tek,
    Xtek,
    Mos,
    Avr,
    AsciiHex,
    Raw,
}

impl FormatKind {
    /// All registered formats; earlier entries win ambiguous detection.
    /// Raw accepts any content, so it stays last.
    pub const ALL: [Self; 9] = [
        Self::Ihex,
        Self::Srec,
        Self::TiTxt,
        Self::Tek,
        Self::Xtek,
        Self::Mos,
        Self::Avr,
        Self::AsciiHex,
        Self::Raw,
    ];

    /// Canonical registry name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ihex => Ihex::NAME,
            Self::Srec => Srec::NAME,
            Self::TiTxt => TiTxt::NAME,
            Self::Tek => Tek::NAME,
            Self::Xtek => Xtek::NAME,
            Self::Mos => Mos::NAME,
            Self::Avr => Avr::NAME,
            Self::AsciiHex => AsciiHex::NAME,
            Self::Raw => Raw::NAME,
        }
    }

    /// Looks a format up by its canonical name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self, HexRecError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| HexRecError::UnknownFormat(name.to_string()))
    }

    /// File extensions (with leading dot) mapped to this format.
    #[must_use]
    pub fn file_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Ihex => Ihex::FILE_EXTENSIONS,
            Self::Srec => Srec::FILE_EXTENSIONS,
            Self::TiTxt => TiTxt::FILE_EXTENSIONS,
            Self::Tek => Tek::FILE_EXTENSIONS,
            Self::Xtek => Xtek::FILE_EXTENSIONS,
            Self::Mos => Mos::FILE_EXTENSIONS,
            Self::Avr => Avr::FILE_EXTENSIONS,
            Self::AsciiHex => AsciiHex::FILE_EXTENSIONS,
            Self::Raw => Raw::FILE_EXTENSIONS,
        }
    }
}

/// Guesses the record format from a file extension.
///
/// # Examples
/// ```
/// use hexreclib::{FormatKind, guess_format_name};
///
/// assert_eq!(guess_format_name("firmware.hex".as_ref()).unwrap(), FormatKind::Ihex);
/// assert_eq!(guess_format_name("firmware.s19".as_ref()).unwrap(), FormatKind::Srec);
/// ```
pub fn guess_format_name(path: &Path) -> Result<FormatKind, HexRecError> {
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    FormatKind::ALL
        .into_iter()
        .find(|kind| kind.file_extensions().contains(&extension.as_str()))
        .ok_or_else(|| HexRecError::UnknownFormat(extension))
}

macro_rules! dispatch {
    ($value:expr, $file:pat => $body:expr) => {
        match $value {
            AnyFile::Ihex($file) => $body,
            AnyFile::Srec($file) => $body,
            AnyFile::TiTxt($file) => $body,
            AnyFile::Tek($file) => $body,
            AnyFile::Xtek($file) => $body,
            AnyFile::Mos($file) => $body,
            AnyFile::Avr($file) => $body,
            AnyFile::AsciiHex($file) => $body,
            AnyFile::Raw($file) => $body,
        }
    };
}

/// A record file of any registered format, for callers that select the
/// format at runtime.
#[derive(Debug, Clone)]
pub enum AnyFile {
    Ihex(IhexFile),
    Srec(SrecFile),
    TiTxt(TiTxtFile),
    Tek(TekFile),
    Xtek(XtekFile),
    Mos(MosFile),
    Avr(AvrFile),
    AsciiHex(AsciiHexFile),
    Raw(RawFile),
}

impl AnyFile {
    /// Parses `bytes` as the given format.
    pub fn parse(kind: FormatKind, bytes: &[u8]) -> Result<Self, HexRecError> {
        Self::parse_with(kind, bytes, &ParseOptions::default())
    }

    pub fn parse_with(
        kind: FormatKind,
        bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<Self, HexRecError> {
        Ok(match kind {
            FormatKind::Ihex => Self::Ihex(IhexFile::parse_with(bytes, options)?),
            FormatKind::Srec => Self::Srec(SrecFile::parse_with(bytes, options)?),
            FormatKind::TiTxt => Self::TiTxt(TiTxtFile::parse_with(bytes, options)?),
            FormatKind::Tek => Self::Tek(TekFile::parse_with(bytes, options)?),
            FormatKind::Xtek => Self::Xtek(XtekFile::parse_with(bytes, options)?),
            FormatKind::Mos => Self::Mos(MosFile::parse_with(bytes, options)?),
            FormatKind::Avr => Self::Avr(AvrFile::parse_with(bytes, options)?),
            FormatKind::AsciiHex => Self::AsciiHex(AsciiHexFile::parse_with(bytes, options)?),
            FormatKind::Raw => Self::Raw(RawFile::parse_with(bytes, options)?),
        })
    }

    /// Detects the format by trying every registered candidate in priority
    /// order; a candidate is accepted when its parse and record validation
    /// both pass. Raw accepts anything, so sniffing cannot fail.
    pub fn sniff(bytes: &[u8]) -> Result<Self, HexRecError> {
        let mut last_error = None;
        for kind in FormatKind::ALL {
            match Self::parse(kind, bytes) {
                Ok(mut file) => {
                    if file.validate().is_ok() {
                        return Ok(file);
                    }
                    last_error = Some(HexRecError::UnknownFormat(kind.name().to_string()));
                }
                Err(error) => last_error = Some(error),
            }
        }
        Err(last_error.unwrap_or_else(|| HexRecError::UnknownFormat(String::new())))
    }

    /// Creates an empty file of the given format holding `image`.
    #[must_use]
    pub fn from_image(kind: FormatKind, image: SparseImage) -> Self {
        match kind {
            FormatKind::Ihex => Self::Ihex(IhexFile::from_image(image)),
            FormatKind::Srec => Self::Srec(SrecFile::from_image(image)),
            FormatKind::TiTxt => Self::TiTxt(TiTxtFile::from_image(image)),
            FormatKind::Tek => Self::Tek(TekFile::from_image(image)),
            FormatKind::Xtek => Self::Xtek(XtekFile::from_image(image)),
            FormatKind::Mos => Self::Mos(MosFile::from_image(image)),
            FormatKind::Avr => Self::Avr(AvrFile::from_image(image)),
            FormatKind::AsciiHex => Self::AsciiHex(AsciiHexFile::from_image(image)),
            FormatKind::Raw => Self::Raw(RawFile::from_image(image)),
        }
    }

    #[must_use]
    pub fn format_kind(&self) -> FormatKind {
        match self {
            Self::Ihex(_) => FormatKind::Ihex,
            Self::Srec(_) => FormatKind::Srec,
            Self::TiTxt(_) => FormatKind::TiTxt,
            Self::Tek(_) => FormatKind::Tek,
            Self::Xtek(_) => FormatKind::Xtek,
            Self::Mos(_) => FormatKind::Mos,
            Self::Avr(_) => FormatKind::Avr,
            Self::AsciiHex(_) => FormatKind::AsciiHex,
            Self::Raw(_) => FormatKind::Raw,
        }
    }

    /// Converts to another format: the image is copied and the shared
    /// metadata (start address, header) transfers where supported.
    pub fn convert(&mut self, kind: FormatKind) -> Self {
        let image = self.image().clone();
        let start_address = self.start_address();
        let header = self.header();

        let mut target = Self::from_image(kind, image);
        if start_address.is_some() {
            target.set_start_address(start_address);
        }
        if header.is_some() {
            target.set_header(header);
        }
        target
    }

    /// Writes the data of `other` over this file.
    pub fn merge_from(&mut self, other: &mut Self) -> Result<(), HexRecError> {
        let other_image = other.image().clone();
        dispatch!(self, file => file.image_mut().merge(&other_image))?;
        Ok(())
    }

    pub fn image(&mut self) -> &SparseImage {
        dispatch!(self, file => file.image())
    }

    pub fn image_mut(&mut self) -> &mut SparseImage {
        dispatch!(self, file => file.image_mut())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, HexRecError> {
        dispatch!(self, file => file.to_bytes())
    }

    pub fn validate(&mut self) -> Result<(), HexRecError> {
        dispatch!(self, file => file.validate())
    }

    pub fn validate_with(&mut self, options: &ValidateOptions) -> Result<(), HexRecError> {
        dispatch!(self, file => file.validate_with(options))
    }

    #[must_use]
    pub fn warnings(&self) -> &[HexRecError] {
        dispatch!(self, file => file.warnings())
    }

    #[must_use]
    pub fn maxdatalen(&self) -> usize {
        dispatch!(self, file => file.maxdatalen())
    }

    pub fn set_maxdatalen(&mut self, maxdatalen: usize) -> Result<(), HexRecError> {
        dispatch!(self, file => file.set_maxdatalen(maxdatalen))
    }

    pub fn start_address(&mut self) -> Option<u64> {
        dispatch!(self, file => file.start_address())
    }

    pub fn set_start_address(&mut self, address: Option<u64>) {
        dispatch!(self, file => file.set_start_address(address));
    }

    pub fn header(&mut self) -> Option<Vec<u8>> {
        dispatch!(self, file => file.header())
    }

    pub fn set_header(&mut self, header: Option<Vec<u8>>) {
        dispatch!(self, file => file.set_header(header));
    }

    // Image edit operations forwarded for runtime-format callers.

    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<(), HexRecError> {
        dispatch!(self, file => file.write(offset, bytes))
    }

    pub fn read(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
        fill: Option<u8>,
    ) -> Result<Vec<u8>, HexRecError> {
        dispatch!(self, file => file.read(start, end, fill))
    }

    pub fn crop(&mut self, start: Option<u64>, end: Option<u64>) -> Result<(), HexRecError> {
        dispatch!(self, file => file.crop(start, end))
    }

    pub fn clear(&mut self, start: Option<u64>, end: Option<u64>) -> Result<(), HexRecError> {
        dispatch!(self, file => file.clear(start, end))
    }

    pub fn fill(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
        pattern: &[u8],
    ) -> Result<(), HexRecError> {
        dispatch!(self, file => file.fill(start, end, pattern))
    }

    pub fn flood(
        &mut self,
        start: Option<u64>,
        end: Option<u64>,
        pattern: &[u8],
    ) -> Result<(), HexRecError> {
        dispatch!(self, file => file.flood(start, end, pattern))
    }

    pub fn shift(&mut self, offset: i64) -> Result<(), HexRecError> {
        dispatch!(self, file => file.shift(offset))
    }

    pub fn align(&mut self, modulo: u64, pattern: &[u8]) -> Result<(), HexRecError> {
        dispatch!(self, file => file.align(modulo, pattern))
    }

    pub fn find(
        &mut self,
        pattern: &[u8],
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<u64, HexRecError> {
        dispatch!(self, file => file.find(pattern, start, end))
    }
}

/// Loads a record file from the filesystem. Without an explicit format the
/// extension is tried first, then content sniffing.
pub fn load(path: &Path, format: Option<FormatKind>) -> Result<AnyFile, Box<dyn Error>> {
    let bytes = fs::read(path)?;

    match format {
        Some(kind) => Ok(AnyFile::parse(kind, &bytes)?),
        None => {
            if let Ok(kind) = guess_format_name(path)
                && let Ok(file) = AnyFile::parse(kind, &bytes)
            {
                return Ok(file);
            }
            Ok(AnyFile::sniff(&bytes)?)
        }
    }
}

/// Saves a record file to the filesystem, regenerating stale records.
pub fn save(file: &mut AnyFile, path: &Path) -> Result<(), Box<dyn Error>> {
    let bytes = file.to_bytes()?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Converts a record file on the filesystem into another format.
/// Formats left `None` are guessed from the respective paths.
pub fn convert(
    in_path: &Path,
    out_path: &Path,
    in_format: Option<FormatKind>,
    out_format: Option<FormatKind>,
) -> Result<(AnyFile, AnyFile), Box<dyn Error>> {
    let out_kind = match out_format {
        Some(kind) => kind,
        None => guess_format_name(out_path)?,
    };

    let mut in_file = load(in_path, in_format)?;
    let mut out_file = in_file.convert(out_kind);
    save(&mut out_file, out_path)?;
    Ok((in_file, out_file))
}

/// Merges multiple record files into one output, in order: later inputs
/// win where addresses overlap.
pub fn merge<P: AsRef<Path>>(
    in_paths: &[P],
    out_path: &Path,
    out_format: Option<FormatKind>,
) -> Result<AnyFile, Box<dyn Error>> {
    let out_kind = match out_format {
        Some(kind) => kind,
        None => guess_format_name(out_path)?,
    };

    let mut out_file = AnyFile::from_image(out_kind, SparseImage::new());
    for in_path in in_paths {
        let mut in_file = load(in_path.as_ref(), None)?;
        out_file.merge_from(&mut in_file)?;
    }
    save(&mut out_file, out_path)?;
    Ok(out_file)
}
