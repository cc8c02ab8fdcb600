//! Sound File Engine Boundary
//!
//! Decoding, encoding and container handling live behind the [`Engine`]
//! and [`EngineHandle`] traits. The rest of the crate only marshals
//! buffers, names and format codes across this boundary.
//!
//! - [`riff`]: built-in RIFF/WAVE engine (default)
//! - `sndfile`: the system libsndfile (feature `libsndfile`)
//!
//! The process uses a single engine instance, created on first use and
//! never torn down.

pub mod catalog;
pub mod info_chunk;
pub mod riff;
#[cfg(feature = "libsndfile")]
pub mod sndfile;

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;

use crate::format::{FormatCode, FormatRecord};
use crate::metadata::Tag;

// ============================================================================
// Boundary Types
// ============================================================================

/// Open mode of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    Read,
    Write,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Read => write!(f, "read"),
            OpenMode::Write => write!(f, "write"),
        }
    }
}

/// Origin of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    /// Absolute, from the first frame
    Set,
    /// Relative to the last read or written frame
    Current,
    /// Relative to the end of the stream
    End,
}

/// Stream parameters exchanged with the engine on open
///
/// For writing, the caller fills in rate, channels and format. For
/// reading, nonzero values are hints and the engine overwrites the
/// struct with what the file header says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamInfo {
    pub frames: u64,
    pub sample_rate: u32,
    pub channels: usize,
    pub format: FormatCode,
    pub seekable: bool,
}

/// Engine status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const NO_ERROR: ErrorCode = ErrorCode(0);
    pub const UNRECOGNISED_FORMAT: ErrorCode = ErrorCode(1);
    pub const SYSTEM: ErrorCode = ErrorCode(2);
    pub const MALFORMED_FILE: ErrorCode = ErrorCode(3);
    pub const UNSUPPORTED_ENCODING: ErrorCode = ErrorCode(4);

    #[inline]
    pub fn is_error(self) -> bool {
        self != ErrorCode::NO_ERROR
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine catalogue selector for format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalog {
    /// Ready-made major/subtype combinations
    Simple,
    Major,
    Subtype,
}

// ============================================================================
// File Names
// ============================================================================

/// A file name as handed to the engine
///
/// Text names are encoded as UTF-8 regardless of the host convention.
/// Byte names are taken as already encoded and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileName {
    Text(String),
    Bytes(Vec<u8>),
}

impl FileName {
    /// The bytes the engine receives
    pub fn encoded(&self) -> &[u8] {
        match self {
            FileName::Text(text) => text.as_bytes(),
            FileName::Bytes(bytes) => bytes,
        }
    }

    /// The name as used in messages
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            FileName::Text(text) => Cow::Borrowed(text),
            FileName::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<&str> for FileName {
    fn from(name: &str) -> Self {
        FileName::Text(name.to_string())
    }
}

impl From<String> for FileName {
    fn from(name: String) -> Self {
        FileName::Text(name)
    }
}

impl From<&String> for FileName {
    fn from(name: &String) -> Self {
        FileName::Text(name.clone())
    }
}

impl From<Vec<u8>> for FileName {
    fn from(bytes: Vec<u8>) -> Self {
        FileName::Bytes(bytes)
    }
}

impl From<&[u8]> for FileName {
    fn from(bytes: &[u8]) -> Self {
        FileName::Bytes(bytes.to_vec())
    }
}

impl From<&Path> for FileName {
    fn from(path: &Path) -> Self {
        match path.to_str() {
            Some(text) => FileName::Text(text.to_string()),
            None => FileName::Bytes(os_bytes(path)),
        }
    }
}

impl From<PathBuf> for FileName {
    fn from(path: PathBuf) -> Self {
        FileName::from(path.as_path())
    }
}

impl From<&PathBuf> for FileName {
    fn from(path: &PathBuf) -> Self {
        FileName::from(path.as_path())
    }
}

#[cfg(unix)]
fn os_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn os_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Turn engine-bound name bytes back into a host path
#[cfg(unix)]
pub(crate) fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
pub(crate) fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

// ============================================================================
// Engine Traits
// ============================================================================

/// A sound file engine: opens handles and answers format questions
pub trait Engine: Send + Sync {
    /// Short engine identifier
    fn name(&self) -> &'static str;

    /// Engine version string
    fn version(&self) -> String;

    /// Open `name` in `mode`. On success `info` describes the stream.
    fn open(
        &self,
        name: &[u8],
        mode: OpenMode,
        info: &mut StreamInfo,
    ) -> Result<Box<dyn EngineHandle>, ErrorCode>;

    /// Human readable text for an error code
    fn error_message(&self, code: ErrorCode) -> String;

    /// Whether a stream with these parameters can be written
    fn format_check(&self, info: &StreamInfo) -> bool;

    /// Number of entries in a catalogue
    fn format_count(&self, catalog: Catalog) -> usize;

    /// Entry `index` of a catalogue
    fn format_entry(&self, catalog: Catalog, index: usize) -> Option<FormatRecord>;

    /// Look up the major component of `code`, or the subtype if the
    /// major bits are zero. The record's `format` is the matched code.
    fn format_info(&self, code: FormatCode) -> Option<FormatRecord>;
}

/// One open stream inside an engine
///
/// Sample buffers are frame-interleaved and must hold at least
/// `frames * channels` values. Transfers return frames actually moved;
/// a short count is not an error.
pub trait EngineHandle: Send {
    /// Move the frame cursor. Returns the new absolute position or -1.
    fn seek(&mut self, frames: i64, whence: Whence) -> i64;

    fn readf_i16(&mut self, buffer: &mut [i16], frames: usize) -> usize;
    fn readf_i32(&mut self, buffer: &mut [i32], frames: usize) -> usize;
    fn readf_f32(&mut self, buffer: &mut [f32], frames: usize) -> usize;
    fn readf_f64(&mut self, buffer: &mut [f64], frames: usize) -> usize;

    fn writef_i16(&mut self, buffer: &[i16], frames: usize) -> usize;
    fn writef_i32(&mut self, buffer: &[i32], frames: usize) -> usize;
    fn writef_f32(&mut self, buffer: &[f32], frames: usize) -> usize;
    fn writef_f64(&mut self, buffer: &[f64], frames: usize) -> usize;

    /// Raw UTF-8 value of a text tag, `None` when unset
    fn get_string(&self, tag: Tag) -> Option<Vec<u8>>;

    /// Store a text tag
    fn set_string(&mut self, tag: Tag, value: &[u8]) -> Result<(), ErrorCode>;

    /// Current byte rate, if the engine can tell
    fn byte_rate(&self) -> Option<u32>;

    /// Flush and release the stream. Called at most once.
    fn close(&mut self) -> Result<(), ErrorCode>;
}

// ============================================================================
// Process-wide Engine
// ============================================================================

lazy_static! {
    static ref ENGINE: Box<dyn Engine> = default_engine();
}

#[cfg(not(feature = "libsndfile"))]
fn default_engine() -> Box<dyn Engine> {
    Box::new(riff::RiffEngine::new())
}

#[cfg(feature = "libsndfile")]
fn default_engine() -> Box<dyn Engine> {
    Box::new(sndfile::SndfileEngine::new())
}

/// The engine every session and registry call goes through
pub fn engine() -> &'static dyn Engine {
    &**ENGINE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_text_is_utf8() {
        let name = FileName::from("file€.wav");
        assert_eq!(name.encoded(), "file€.wav".as_bytes());
        assert_eq!(name.to_string(), "file€.wav");
    }

    #[test]
    fn test_file_name_bytes_pass_through() {
        let raw = vec![b'a', 0xff, b'.', b'w', b'a', b'v'];
        let name = FileName::from(raw.clone());
        assert_eq!(name.encoded(), raw.as_slice());
        assert_eq!(name.display(), "a\u{fffd}.wav");
    }

    #[test]
    fn test_file_name_from_path() {
        let name = FileName::from(Path::new("dir/언어.wav"));
        assert_eq!(name, FileName::Text("dir/언어.wav".to_string()));
    }

    #[test]
    fn test_path_round_trip() {
        let name = FileName::from("语言Языку.wav");
        assert_eq!(
            path_from_bytes(name.encoded()),
            PathBuf::from("语言Языку.wav")
        );
    }

    #[test]
    fn test_engine_is_shared() {
        let a = engine() as *const dyn Engine as *const u8;
        let b = engine() as *const dyn Engine as *const u8;
        assert_eq!(a, b);
        assert!(!engine().version().is_empty());
    }

    #[test]
    fn test_error_code_flags() {
        assert!(!ErrorCode::NO_ERROR.is_error());
        assert!(ErrorCode::SYSTEM.is_error());
    }
}
