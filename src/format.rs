//! Format Code Registry
//!
//! A format code is a 32-bit value made of three disjoint bit-fields:
//! the major format (container), the subtype (sample encoding) and the
//! endianness. Codes are built by OR-ing named constants together and
//! are passed to the engine untouched.
//!
//! Names and extensions are owned by the engine. This module only masks
//! bits and asks the engine; it never makes up a description for a code
//! the engine does not know.
//!
//! # Example
//! ```
//! use wavefile::FormatCode;
//!
//! let code = FormatCode::WAV | FormatCode::PCM_16;
//! let parts = code.decompose();
//! assert_eq!(parts.major, FormatCode::WAV);
//! assert_eq!(parts.subtype, FormatCode::PCM_16);
//! assert_eq!(parts.endianness, FormatCode::ENDIAN_FILE);
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::engine::{self, Catalog, Engine, StreamInfo};
use crate::error::{Result, WavefileError};

// ============================================================================
// Format Code
// ============================================================================

/// An audio file format: `major | subtype | endianness`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatCode(u32);

impl FormatCode {
    // Major formats (containers)
    pub const WAV: FormatCode = FormatCode(0x010000); // Microsoft WAV format (little endian default)
    pub const AIFF: FormatCode = FormatCode(0x020000); // Apple/SGI AIFF format (big endian)
    pub const AU: FormatCode = FormatCode(0x030000); // Sun/NeXT AU format (big endian)
    pub const RAW: FormatCode = FormatCode(0x040000); // RAW PCM data
    pub const PAF: FormatCode = FormatCode(0x050000); // Ensoniq PARIS file format
    pub const SVX: FormatCode = FormatCode(0x060000); // Amiga IFF / SVX8 / SV16 format
    pub const NIST: FormatCode = FormatCode(0x070000); // Sphere NIST format
    pub const VOC: FormatCode = FormatCode(0x080000); // VOC files
    pub const IRCAM: FormatCode = FormatCode(0x0A0000); // Berkeley/IRCAM/CARL
    pub const W64: FormatCode = FormatCode(0x0B0000); // Sonic Foundry's 64 bit RIFF/WAV
    pub const MAT4: FormatCode = FormatCode(0x0C0000); // Matlab (tm) V4.2 / GNU Octave 2.0
    pub const MAT5: FormatCode = FormatCode(0x0D0000); // Matlab (tm) V5.0 / GNU Octave 2.1
    pub const PVF: FormatCode = FormatCode(0x0E0000); // Portable Voice Format
    pub const XI: FormatCode = FormatCode(0x0F0000); // Fasttracker 2 Extended Instrument
    pub const HTK: FormatCode = FormatCode(0x100000); // HMM Tool Kit format
    pub const SDS: FormatCode = FormatCode(0x110000); // Midi Sample Dump Standard
    pub const AVR: FormatCode = FormatCode(0x120000); // Audio Visual Research
    pub const WAVEX: FormatCode = FormatCode(0x130000); // MS WAVE with WAVEFORMATEX
    pub const SD2: FormatCode = FormatCode(0x160000); // Sound Designer 2
    pub const FLAC: FormatCode = FormatCode(0x170000); // FLAC lossless file format
    pub const CAF: FormatCode = FormatCode(0x180000); // Core Audio File format
    pub const WVE: FormatCode = FormatCode(0x190000); // Psion WVE format
    pub const OGG: FormatCode = FormatCode(0x200000); // Xiph OGG container
    pub const MPC2K: FormatCode = FormatCode(0x210000); // Akai MPC 2000 sampler
    pub const RF64: FormatCode = FormatCode(0x220000); // RF64 WAV file
    pub const MPEG: FormatCode = FormatCode(0x230000); // MPEG-1/2 audio stream

    // Subtypes (sample encodings)
    pub const PCM_S8: FormatCode = FormatCode(0x0001); // Signed 8 bit data
    pub const PCM_16: FormatCode = FormatCode(0x0002); // Signed 16 bit data
    pub const PCM_24: FormatCode = FormatCode(0x0003); // Signed 24 bit data
    pub const PCM_32: FormatCode = FormatCode(0x0004); // Signed 32 bit data
    pub const PCM_U8: FormatCode = FormatCode(0x0005); // Unsigned 8 bit data (WAV and RAW only)
    pub const FLOAT: FormatCode = FormatCode(0x0006); // 32 bit float data
    pub const DOUBLE: FormatCode = FormatCode(0x0007); // 64 bit float data
    pub const ULAW: FormatCode = FormatCode(0x0010); // U-Law encoded
    pub const ALAW: FormatCode = FormatCode(0x0011); // A-Law encoded
    pub const IMA_ADPCM: FormatCode = FormatCode(0x0012); // IMA ADPCM
    pub const MS_ADPCM: FormatCode = FormatCode(0x0013); // Microsoft ADPCM
    pub const GSM610: FormatCode = FormatCode(0x0020); // GSM 6.10 encoding
    pub const VOX_ADPCM: FormatCode = FormatCode(0x0021); // OKI / Dialogix ADPCM
    pub const NMS_ADPCM_16: FormatCode = FormatCode(0x0022); // 16kbs NMS G721-variant encoding
    pub const NMS_ADPCM_24: FormatCode = FormatCode(0x0023); // 24kbs NMS G721-variant encoding
    pub const NMS_ADPCM_32: FormatCode = FormatCode(0x0024); // 32kbs NMS G721-variant encoding
    pub const G721_32: FormatCode = FormatCode(0x0030); // 32kbs G721 ADPCM encoding
    pub const G723_24: FormatCode = FormatCode(0x0031); // 24kbs G723 ADPCM encoding
    pub const G723_40: FormatCode = FormatCode(0x0032); // 40kbs G723 ADPCM encoding
    pub const DWVW_12: FormatCode = FormatCode(0x0040); // 12 bit Delta Width Variable Word encoding
    pub const DWVW_16: FormatCode = FormatCode(0x0041); // 16 bit Delta Width Variable Word encoding
    pub const DWVW_24: FormatCode = FormatCode(0x0042); // 24 bit Delta Width Variable Word encoding
    pub const DWVW_N: FormatCode = FormatCode(0x0043); // N bit Delta Width Variable Word encoding
    pub const DPCM_8: FormatCode = FormatCode(0x0050); // 8 bit differential PCM (XI only)
    pub const DPCM_16: FormatCode = FormatCode(0x0051); // 16 bit differential PCM (XI only)
    pub const VORBIS: FormatCode = FormatCode(0x0060); // Xiph Vorbis encoding
    pub const OPUS: FormatCode = FormatCode(0x0064); // Xiph/Skype Opus encoding
    pub const ALAC_16: FormatCode = FormatCode(0x0070); // Apple Lossless Audio Codec (16 bit)
    pub const ALAC_20: FormatCode = FormatCode(0x0071); // Apple Lossless Audio Codec (20 bit)
    pub const ALAC_24: FormatCode = FormatCode(0x0072); // Apple Lossless Audio Codec (24 bit)
    pub const ALAC_32: FormatCode = FormatCode(0x0073); // Apple Lossless Audio Codec (32 bit)
    pub const MPEG_LAYER_I: FormatCode = FormatCode(0x0080); // MPEG-1 Audio Layer I
    pub const MPEG_LAYER_II: FormatCode = FormatCode(0x0081); // MPEG-1 Audio Layer II
    pub const MPEG_LAYER_III: FormatCode = FormatCode(0x0082); // MPEG-2 Audio Layer III

    // Endianness
    pub const ENDIAN_FILE: FormatCode = FormatCode(0x0000_0000); // Default file endian-ness
    pub const ENDIAN_LITTLE: FormatCode = FormatCode(0x1000_0000); // Force little endian-ness
    pub const ENDIAN_BIG: FormatCode = FormatCode(0x2000_0000); // Force big endian-ness
    pub const ENDIAN_CPU: FormatCode = FormatCode(0x3000_0000); // Force CPU endian-ness

    // Masks
    pub const SUBMASK: FormatCode = FormatCode(0x0000_FFFF);
    pub const TYPEMASK: FormatCode = FormatCode(0x0FFF_0000);
    pub const ENDMASK: FormatCode = FormatCode(0x3000_0000);

    /// Wrap a raw code as reported by, or handed to, the engine
    #[inline]
    pub const fn new(value: u32) -> Self {
        FormatCode(value)
    }

    /// The raw integer value
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Container component
    #[inline]
    pub const fn major(self) -> FormatCode {
        FormatCode(self.0 & Self::TYPEMASK.0)
    }

    /// Sample encoding component
    #[inline]
    pub const fn subtype(self) -> FormatCode {
        FormatCode(self.0 & Self::SUBMASK.0)
    }

    /// Endianness component
    #[inline]
    pub const fn endianness(self) -> FormatCode {
        FormatCode(self.0 & Self::ENDMASK.0)
    }

    /// Split the code into its three components
    pub const fn decompose(self) -> FormatParts {
        FormatParts {
            major: self.major(),
            subtype: self.subtype(),
            endianness: self.endianness(),
        }
    }

    /// True if no bit is set
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names and extension the engine reports for this code
    pub fn info(self) -> Result<FormatDescription> {
        describe(self)
    }

    /// Major name and subtype name joined by a space, whichever are present
    pub fn description(self) -> Result<String> {
        let info = self.info()?;
        let parts: Vec<&str> = [info.name.as_deref(), info.subtype.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        Ok(parts.join(" "))
    }

    /// Usual file extension of the major format, if the code has one
    pub fn extension(self) -> Result<Option<String>> {
        Ok(self.info()?.extension)
    }

    /// Whether the engine can write this combination (stereo, 44100 Hz)
    pub fn is_supported(self) -> bool {
        check_format(self, 2, 44100)
    }

    /// Whether the engine can write this combination with the given shape
    pub fn is_supported_for(self, channels: usize, sample_rate: u32) -> bool {
        check_format(self, channels, sample_rate)
    }
}

impl BitOr for FormatCode {
    type Output = FormatCode;

    fn bitor(self, rhs: FormatCode) -> FormatCode {
        FormatCode(self.0 | rhs.0)
    }
}

impl BitOrAssign for FormatCode {
    fn bitor_assign(&mut self, rhs: FormatCode) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FormatCode {
    type Output = FormatCode;

    fn bitand(self, rhs: FormatCode) -> FormatCode {
        FormatCode(self.0 & rhs.0)
    }
}

impl From<u32> for FormatCode {
    fn from(value: u32) -> Self {
        FormatCode(value)
    }
}

impl From<FormatCode> for u32 {
    fn from(code: FormatCode) -> u32 {
        code.0
    }
}

impl fmt::Display for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::LowerHex for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// The three components of a [`FormatCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatParts {
    pub major: FormatCode,
    pub subtype: FormatCode,
    pub endianness: FormatCode,
}

impl FormatParts {
    /// Recombine the components
    pub fn code(&self) -> FormatCode {
        self.major | self.subtype | self.endianness
    }
}

// ============================================================================
// Descriptions
// ============================================================================

/// What the engine knows about a format code
///
/// `format`, `name` and `extension` come from the major component,
/// `subtype` from the encoding component. Each is absent when the
/// corresponding bits are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

/// One entry of an engine format catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRecord {
    pub format: FormatCode,
    pub name: String,
    pub extension: Option<String>,
}

/// Resolve the names the engine has for `code`
///
/// # Errors
/// * `UnknownFormatCode` - if a nonzero major or subtype is not known
pub fn describe(code: FormatCode) -> Result<FormatDescription> {
    describe_with(engine::engine(), code)
}

pub(crate) fn describe_with(engine: &dyn Engine, code: FormatCode) -> Result<FormatDescription> {
    let mut description = FormatDescription::default();

    if !code.subtype().is_empty() {
        let info = engine
            .format_info(code.subtype())
            .ok_or(WavefileError::UnknownFormatCode(code))?;
        description.subtype = Some(info.name);
    }

    if !code.major().is_empty() {
        let info = engine
            .format_info(code.major())
            .ok_or(WavefileError::UnknownFormatCode(code))?;
        description.format = Some(info.format);
        description.name = Some(info.name);
        description.extension = info.extension;
    }

    Ok(description)
}

/// Ask the engine whether it can write `code` with the given shape
///
/// Never fails: any unsupported combination, including nonsensical
/// channel counts or rates, is just `false`.
pub fn check_format(code: FormatCode, channels: usize, sample_rate: u32) -> bool {
    check_format_with(engine::engine(), code, channels, sample_rate)
}

pub(crate) fn check_format_with(
    engine: &dyn Engine,
    code: FormatCode,
    channels: usize,
    sample_rate: u32,
) -> bool {
    let info = StreamInfo {
        frames: 1000,
        sample_rate,
        channels,
        format: code,
        seekable: true,
    };
    engine.format_check(&info)
}

// ============================================================================
// Catalogues
// ============================================================================

/// Which catalogue to enumerate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Ready-made major/subtype combinations
    Common,
    /// Containers
    Major,
    /// Encodings
    Subtype,
    /// Every supported major × subtype combination
    All,
}

impl std::str::FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "common" => Ok(FormatKind::Common),
            "major" => Ok(FormatKind::Major),
            "subtype" | "subtypes" => Ok(FormatKind::Subtype),
            "all" => Ok(FormatKind::All),
            other => Err(format!("unknown format kind '{}'", other)),
        }
    }
}

/// Lazily enumerate one of the engine's format catalogues
///
/// The returned iterator is finite and can be cloned to restart it.
pub fn list_formats(kind: FormatKind) -> Formats {
    list_formats_with(engine::engine(), kind)
}

pub(crate) fn list_formats_with(engine: &'static dyn Engine, kind: FormatKind) -> Formats {
    match kind {
        FormatKind::Common => Formats::Catalog(CatalogIter::new(engine, Catalog::Simple)),
        FormatKind::Major => Formats::Catalog(CatalogIter::new(engine, Catalog::Major)),
        FormatKind::Subtype => Formats::Catalog(CatalogIter::new(engine, Catalog::Subtype)),
        FormatKind::All => Formats::All(AllFormats::new(engine)),
    }
}

pub fn common_formats() -> Formats {
    list_formats(FormatKind::Common)
}

pub fn major_formats() -> Formats {
    list_formats(FormatKind::Major)
}

pub fn subtype_formats() -> Formats {
    list_formats(FormatKind::Subtype)
}

pub fn all_formats() -> Formats {
    list_formats(FormatKind::All)
}

/// Iterator over format records, see [`list_formats`]
#[derive(Clone)]
pub enum Formats {
    Catalog(CatalogIter),
    All(AllFormats),
}

impl Iterator for Formats {
    type Item = FormatRecord;

    fn next(&mut self) -> Option<FormatRecord> {
        match self {
            Formats::Catalog(iter) => iter.next(),
            Formats::All(iter) => iter.next(),
        }
    }
}

/// Walks one engine catalogue by index
#[derive(Clone)]
pub struct CatalogIter {
    engine: &'static dyn Engine,
    catalog: Catalog,
    index: usize,
    count: usize,
}

impl CatalogIter {
    fn new(engine: &'static dyn Engine, catalog: Catalog) -> Self {
        Self {
            engine,
            catalog,
            index: 0,
            count: engine.format_count(catalog),
        }
    }
}

impl Iterator for CatalogIter {
    type Item = FormatRecord;

    fn next(&mut self) -> Option<FormatRecord> {
        while self.index < self.count {
            let index = self.index;
            self.index += 1;
            if let Some(record) = self.engine.format_entry(self.catalog, index) {
                return Some(record);
            }
        }
        None
    }
}

/// Cross product of majors and subtypes, filtered by the engine
#[derive(Clone)]
pub struct AllFormats {
    engine: &'static dyn Engine,
    majors: CatalogIter,
    subtypes: Vec<FormatRecord>,
    current: Option<FormatRecord>,
    subtype_index: usize,
}

impl AllFormats {
    fn new(engine: &'static dyn Engine) -> Self {
        Self {
            engine,
            majors: CatalogIter::new(engine, Catalog::Major),
            subtypes: CatalogIter::new(engine, Catalog::Subtype).collect(),
            current: None,
            subtype_index: 0,
        }
    }
}

impl Iterator for AllFormats {
    type Item = FormatRecord;

    fn next(&mut self) -> Option<FormatRecord> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.majors.next()?);
                self.subtype_index = 0;
            }
            let major = self.current.as_ref()?;

            while self.subtype_index < self.subtypes.len() {
                let subtype = &self.subtypes[self.subtype_index];
                self.subtype_index += 1;

                let code = major.format | subtype.format;
                if check_format_with(self.engine, code, 2, 44100) {
                    return Some(FormatRecord {
                        format: code,
                        name: format!("{} {}", major.name, subtype.name),
                        extension: major.extension.clone(),
                    });
                }
            }

            self.current = None;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_recombines() {
        let codes = [
            FormatCode::WAV | FormatCode::PCM_16,
            FormatCode::OGG | FormatCode::VORBIS,
            FormatCode::AIFF | FormatCode::FLOAT | FormatCode::ENDIAN_BIG,
            FormatCode::RF64 | FormatCode::ALAW | FormatCode::ENDIAN_CPU,
            FormatCode::PCM_24,
            FormatCode::new(0),
        ];
        for code in codes {
            assert_eq!(code.decompose().code(), code);
            let parts = code.decompose();
            assert_eq!(parts.major | parts.subtype | parts.endianness, code);
        }
    }

    #[test]
    fn test_masks_are_disjoint() {
        assert!((FormatCode::SUBMASK & FormatCode::TYPEMASK).is_empty());
        assert!((FormatCode::SUBMASK & FormatCode::ENDMASK).is_empty());
        assert!((FormatCode::TYPEMASK & FormatCode::ENDMASK).is_empty());
    }

    #[test]
    fn test_components() {
        let code = FormatCode::FLAC | FormatCode::PCM_24 | FormatCode::ENDIAN_LITTLE;
        assert_eq!(code.major(), FormatCode::FLAC);
        assert_eq!(code.subtype(), FormatCode::PCM_24);
        assert_eq!(code.endianness(), FormatCode::ENDIAN_LITTLE);
        assert_eq!(code.value(), 0x1017_0003);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!((FormatCode::WAV | FormatCode::FLOAT).to_string(), "0x00010006");
        assert_eq!(format!("{:x}", FormatCode::OGG), "200000");
    }

    #[test]
    fn test_describe_full() {
        let info = describe(FormatCode::WAV | FormatCode::PCM_16).unwrap();
        assert_eq!(
            info,
            FormatDescription {
                format: Some(FormatCode::WAV),
                name: Some("WAV (Microsoft)".to_string()),
                subtype: Some("Signed 16 bit PCM".to_string()),
                extension: Some("wav".to_string()),
            }
        );
    }

    #[test]
    fn test_describe_major_only() {
        let info = FormatCode::WAV.info().unwrap();
        assert_eq!(info.format, Some(FormatCode::WAV));
        assert_eq!(info.name.as_deref(), Some("WAV (Microsoft)"));
        assert_eq!(info.subtype, None);
        assert_eq!(info.extension.as_deref(), Some("wav"));
    }

    #[test]
    fn test_describe_subtype_only() {
        let info = FormatCode::PCM_16.info().unwrap();
        assert_eq!(
            info,
            FormatDescription {
                subtype: Some("Signed 16 bit PCM".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(FormatCode::PCM_16.extension().unwrap(), None);
    }

    #[test]
    fn test_describe_unknown_subtype() {
        let err = FormatCode::new(0x29).info().unwrap_err();
        assert!(matches!(err, WavefileError::UnknownFormatCode(code) if code.value() == 0x29));
        assert_eq!(err.to_string(), "41");
    }

    #[test]
    fn test_describe_unknown_major() {
        let err = FormatCode::new(0x290000).info().unwrap_err();
        assert_eq!(err.to_string(), "2686976");
    }

    #[test]
    fn test_description_strings() {
        assert_eq!(FormatCode::WAV.description().unwrap(), "WAV (Microsoft)");
        assert_eq!(
            (FormatCode::WAV | FormatCode::PCM_16).description().unwrap(),
            "WAV (Microsoft) Signed 16 bit PCM"
        );
        assert_eq!(FormatCode::PCM_16.description().unwrap(), "Signed 16 bit PCM");
        assert_eq!(
            (FormatCode::WAV | FormatCode::PCM_16).extension().unwrap().as_deref(),
            Some("wav")
        );
    }

    #[test]
    fn test_is_supported() {
        assert!((FormatCode::WAV | FormatCode::PCM_16).is_supported());
        assert!(!(FormatCode::WAV | FormatCode::PCM_S8).is_supported());
        assert!(!(FormatCode::WAV | FormatCode::PCM_16).is_supported_for(0, 44100));
    }

    #[test]
    fn test_is_supported_is_stable() {
        let code = FormatCode::WAV | FormatCode::FLOAT;
        assert_eq!(code.is_supported_for(4, 22050), code.is_supported_for(4, 22050));
    }

    #[test]
    fn test_format_kind_from_str() {
        assert_eq!("common".parse::<FormatKind>().unwrap(), FormatKind::Common);
        assert_eq!("ALL".parse::<FormatKind>().unwrap(), FormatKind::All);
        assert!("bogus".parse::<FormatKind>().is_err());
    }

    #[test]
    fn test_listing_is_restartable() {
        let formats = major_formats();
        let first: Vec<_> = formats.clone().collect();
        let second: Vec<_> = formats.collect();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_formats_are_supported_combinations() {
        for record in all_formats() {
            assert!(record.format.is_supported(), "{} not supported", record.format);
            assert!(!record.format.major().is_empty());
            assert!(!record.format.subtype().is_empty());
        }
    }
}
