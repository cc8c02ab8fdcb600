//! Wavefile - Array-oriented Audio File I/O
//!
//! Reads and writes sound files as `(channels, frames)` sample buffers on
//! top of a sound file engine that owns decoding, encoding and container
//! handling.
//!
//! # Architecture
//!
//! - [`format`]: format codes (`major | subtype | endianness`) and the
//!   engine's format catalogues
//! - [`buffer`]: sample buffers and their checks against a stream
//! - [`stream`]: reader/writer sessions, seeking and block iteration
//! - [`metadata`]: text tags of an open stream
//! - [`io`]: whole-file load and save
//! - [`engine`]: the engine boundary; a built-in RIFF/WAVE engine by
//!   default, libsndfile with the `libsndfile` feature

pub mod buffer;
pub mod cli;
pub mod engine;
pub mod error;
pub mod format;
pub mod io;
pub mod metadata;
pub mod stream;

pub use buffer::{BufferView, ElementKind, Sample, SampleBuffer};
pub use engine::{FileName, Whence};
pub use error::{Result, WavefileError};
pub use format::{
    all_formats, check_format, common_formats, describe, list_formats, major_formats,
    subtype_formats, FormatCode, FormatDescription, FormatKind, FormatRecord,
};
pub use io::{load, load_as, save, save_with};
pub use metadata::{Metadata, MetadataMut, Tag};
pub use stream::{with_reader, with_writer, Blocks, ReaderHints, WaveReader, WaveWriter, WriterOptions};
