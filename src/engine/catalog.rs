//! Format name catalogue of the built-in engine
//!
//! Names and extensions use the same wording libsndfile reports, so a
//! program sees identical descriptions whichever engine is compiled in.

use crate::engine::Catalog;
use crate::format::{FormatCode, FormatRecord};

/// A static catalogue row
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub code: FormatCode,
    pub name: &'static str,
    pub extension: Option<&'static str>,
}

const fn entry(code: FormatCode, name: &'static str, extension: Option<&'static str>) -> Entry {
    Entry {
        code,
        name,
        extension,
    }
}

impl Entry {
    pub fn record(&self) -> FormatRecord {
        FormatRecord {
            format: self.code,
            name: self.name.to_string(),
            extension: self.extension.map(str::to_string),
        }
    }
}

/// Containers
pub const MAJOR: &[Entry] = &[
    entry(FormatCode::WAV, "WAV (Microsoft)", Some("wav")),
    entry(FormatCode::AIFF, "AIFF (Apple/SGI)", Some("aiff")),
    entry(FormatCode::AU, "AU (Sun/NeXT)", Some("au")),
    entry(FormatCode::RAW, "RAW (header-less)", Some("raw")),
    entry(FormatCode::PAF, "PAF (Ensoniq PARIS)", Some("paf")),
    entry(FormatCode::SVX, "IFF (Amiga IFF/SVX8/SV16)", Some("iff")),
    entry(FormatCode::NIST, "WAV (NIST Sphere)", Some("wav")),
    entry(FormatCode::VOC, "VOC (Creative Labs)", Some("voc")),
    entry(FormatCode::IRCAM, "SF (Berkeley/IRCAM/CARL)", Some("sf")),
    entry(FormatCode::W64, "W64 (SoundFoundry WAVE 64)", Some("w64")),
    entry(FormatCode::MAT4, "MAT4 (GNU Octave 2.0 / Matlab 4.2)", Some("mat")),
    entry(FormatCode::MAT5, "MAT5 (GNU Octave 2.1 / Matlab 5.0)", Some("mat")),
    entry(FormatCode::PVF, "PVF (Portable Voice Format)", Some("pvf")),
    entry(FormatCode::XI, "XI (FastTracker 2)", Some("xi")),
    entry(FormatCode::HTK, "HTK (HMM Tool Kit)", Some("htk")),
    entry(FormatCode::SDS, "SDS (Midi Sample Dump Standard)", Some("sds")),
    entry(FormatCode::AVR, "AVR (Audio Visual Research)", Some("avr")),
    entry(FormatCode::WAVEX, "WAVEX (Microsoft)", Some("wav")),
    entry(FormatCode::SD2, "SD2 (Sound Designer II)", Some("sd2")),
    entry(FormatCode::FLAC, "FLAC (Free Lossless Audio Codec)", Some("flac")),
    entry(FormatCode::CAF, "CAF (Apple Core Audio File)", Some("caf")),
    entry(FormatCode::WVE, "WVE (Psion Series 3)", Some("wve")),
    entry(FormatCode::OGG, "OGG (OGG Container format)", Some("oga")),
    entry(FormatCode::MPC2K, "MPC (Akai MPC 2k)", Some("mpc")),
    entry(FormatCode::RF64, "RF64 (RIFF 64)", Some("rf64")),
    entry(FormatCode::MPEG, "MPEG-1/2 Audio", Some("m1a")),
];

/// Encodings
pub const SUBTYPE: &[Entry] = &[
    entry(FormatCode::PCM_S8, "Signed 8 bit PCM", None),
    entry(FormatCode::PCM_16, "Signed 16 bit PCM", None),
    entry(FormatCode::PCM_24, "Signed 24 bit PCM", None),
    entry(FormatCode::PCM_32, "Signed 32 bit PCM", None),
    entry(FormatCode::PCM_U8, "Unsigned 8 bit PCM", None),
    entry(FormatCode::FLOAT, "32 bit float", None),
    entry(FormatCode::DOUBLE, "64 bit float", None),
    entry(FormatCode::ULAW, "U-Law", None),
    entry(FormatCode::ALAW, "A-Law", None),
    entry(FormatCode::IMA_ADPCM, "IMA ADPCM", None),
    entry(FormatCode::MS_ADPCM, "Microsoft ADPCM", None),
    entry(FormatCode::GSM610, "GSM 6.10", None),
    entry(FormatCode::VOX_ADPCM, "VOX ADPCM", Some("vox")),
    entry(FormatCode::NMS_ADPCM_16, "16kbs NMS ADPCM", None),
    entry(FormatCode::NMS_ADPCM_24, "24kbs NMS ADPCM", None),
    entry(FormatCode::NMS_ADPCM_32, "32kbs NMS ADPCM", None),
    entry(FormatCode::G721_32, "32kbs G721 ADPCM", None),
    entry(FormatCode::G723_24, "24kbs G723 ADPCM", None),
    entry(FormatCode::G723_40, "40kbs G723 ADPCM", None),
    entry(FormatCode::DWVW_12, "12 bit DWVW", None),
    entry(FormatCode::DWVW_16, "16 bit DWVW", None),
    entry(FormatCode::DWVW_24, "24 bit DWVW", None),
    entry(FormatCode::DPCM_8, "8 bit DPCM", None),
    entry(FormatCode::DPCM_16, "16 bit DPCM", None),
    entry(FormatCode::VORBIS, "Vorbis", None),
    entry(FormatCode::OPUS, "Opus", None),
    entry(FormatCode::ALAC_16, "16 bit ALAC", None),
    entry(FormatCode::ALAC_20, "20 bit ALAC", None),
    entry(FormatCode::ALAC_24, "24 bit ALAC", None),
    entry(FormatCode::ALAC_32, "32 bit ALAC", None),
    entry(FormatCode::MPEG_LAYER_I, "MPEG Layer I", Some("mp1")),
    entry(FormatCode::MPEG_LAYER_II, "MPEG Layer II", Some("mp2")),
    entry(FormatCode::MPEG_LAYER_III, "MPEG Layer III", Some("mp3")),
];

/// Ready-made combinations the built-in engine can write
pub const SIMPLE: &[Entry] = &[
    entry(
        FormatCode::new(0x0001_0002),
        "WAV (Microsoft 16 bit PCM)",
        Some("wav"),
    ),
    entry(
        FormatCode::new(0x0001_0005),
        "WAV (Microsoft 8 bit PCM)",
        Some("wav"),
    ),
    entry(
        FormatCode::new(0x0001_0006),
        "WAV (Microsoft 32 bit float)",
        Some("wav"),
    ),
];

pub fn table(catalog: Catalog) -> &'static [Entry] {
    match catalog {
        Catalog::Simple => SIMPLE,
        Catalog::Major => MAJOR,
        Catalog::Subtype => SUBTYPE,
    }
}

/// Major lookup when the major bits are set, subtype lookup otherwise
pub fn lookup(code: FormatCode) -> Option<&'static Entry> {
    if !code.major().is_empty() {
        MAJOR.iter().find(|e| e.code == code.major())
    } else if !code.subtype().is_empty() {
        SUBTYPE.iter().find(|e| e.code == code.subtype())
    } else {
        None
    }
}
