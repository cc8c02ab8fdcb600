//! Stream Sessions
//!
//! [`WaveReader`] and [`WaveWriter`] each own one engine handle. A session
//! is open from construction until [`close`](WaveReader::close) or drop;
//! afterwards every operation fails with `InvalidState`.
//!
//! ```no_run
//! use wavefile::{WaveReader, WaveWriter, WriterOptions};
//!
//! # fn main() -> wavefile::Result<()> {
//! let mut writer = WaveWriter::create("out.wav", WriterOptions::default().with_channels(2))?;
//! let mut reader = WaveReader::open("in.wav")?;
//! let mut blocks = reader.read_iter::<f32>(512);
//! while let Some(block) = blocks.next_block()? {
//!     writer.write_view(block)?;
//! }
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use log::{debug, warn};

use crate::buffer::{check_channels, BufferView, Sample, SampleBuffer};
use crate::engine::{self, Engine, EngineHandle, FileName, OpenMode, StreamInfo, Whence};
use crate::error::{Result, WavefileError};
use crate::format::FormatCode;
use crate::metadata::{Metadata, MetadataMut};

// ============================================================================
// Options
// ============================================================================

/// Stream parameters for a new file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Sample rate in Hz (default: 44100)
    pub sample_rate: u32,
    /// Channel count (default: 1)
    pub channels: usize,
    /// Container and encoding (default: WAV, 32 bit float)
    pub format: FormatCode,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            sample_rate: 44100,
            channels: 1,
            format: FormatCode::WAV | FormatCode::FLOAT,
        }
    }
}

impl WriterOptions {
    pub fn new(sample_rate: u32, channels: usize, format: FormatCode) -> Self {
        WriterOptions {
            sample_rate,
            channels,
            format,
        }
    }

    /// CD quality (44.1kHz, stereo, 16-bit PCM)
    pub fn cd_quality() -> Self {
        WriterOptions::new(44100, 2, FormatCode::WAV | FormatCode::PCM_16)
    }

    /// High quality (48kHz, stereo, 24-bit PCM)
    pub fn high_quality() -> Self {
        WriterOptions::new(48000, 2, FormatCode::WAV | FormatCode::PCM_24)
    }

    /// Maximum quality (96kHz, stereo, 32-bit float)
    pub fn max_quality() -> Self {
        WriterOptions::new(96000, 2, FormatCode::WAV | FormatCode::FLOAT)
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_format(mut self, format: FormatCode) -> Self {
        self.format = format;
        self
    }

    /// Whether the engine can write files with these options
    pub fn is_supported(&self) -> bool {
        self.format.is_supported_for(self.channels, self.sample_rate)
    }
}

/// Optional stream parameters for opening a file
///
/// Only needed for header-less formats; anything left `None` is taken from
/// the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderHints {
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
    pub format: Option<FormatCode>,
}

impl ReaderHints {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_format(mut self, format: FormatCode) -> Self {
        self.format = Some(format);
        self
    }
}

// ============================================================================
// Session
// ============================================================================

struct Session {
    handle: Option<Box<dyn EngineHandle>>,
    engine: &'static dyn Engine,
    name: FileName,
    mode: OpenMode,
    info: StreamInfo,
}

impl Session {
    fn open(name: FileName, mode: OpenMode, mut info: StreamInfo) -> Result<Self> {
        let engine = engine::engine();
        let handle = engine
            .open(name.encoded(), mode, &mut info)
            .map_err(|code| WavefileError::Open {
                path: name.to_string(),
                reason: engine.error_message(code),
            })?;
        debug!(
            "Opened '{}' for {} ({} channels, {} Hz, format {})",
            name, mode, info.channels, info.sample_rate, info.format
        );

        Ok(Self {
            handle: Some(handle),
            engine,
            name,
            mode,
            info,
        })
    }

    fn closed(&self, operation: &'static str) -> WavefileError {
        WavefileError::InvalidState {
            operation,
            path: self.name.to_string(),
        }
    }

    fn handle(&self, operation: &'static str) -> Result<&(dyn EngineHandle + 'static)> {
        match self.handle.as_deref() {
            Some(handle) => Ok(handle),
            None => Err(self.closed(operation)),
        }
    }

    fn handle_mut(&mut self, operation: &'static str) -> Result<&mut (dyn EngineHandle + 'static)> {
        match self.handle.as_deref_mut() {
            Some(handle) => Ok(handle),
            None => Err(WavefileError::InvalidState {
                operation,
                path: self.name.to_string(),
            }),
        }
    }

    fn metadata(&self) -> Result<Metadata<'_>> {
        Ok(Metadata::new(self.handle("read metadata of")?))
    }

    fn metadata_mut(&mut self) -> Result<MetadataMut<'_>> {
        let Session {
            handle,
            engine,
            name,
            ..
        } = self;
        match handle.as_deref_mut() {
            Some(handle) => Ok(MetadataMut::new(handle, *engine, name)),
            None => Err(WavefileError::InvalidState {
                operation: "write metadata of",
                path: name.to_string(),
            }),
        }
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<Option<u64>> {
        let position = self.handle_mut("seek")?.seek(offset, whence);
        Ok(u64::try_from(position).ok())
    }

    fn byte_rate(&self) -> Result<Option<u32>> {
        Ok(self.handle("query")?.byte_rate())
    }

    fn close(&mut self) -> Result<()> {
        let mut handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };
        debug!("Closing '{}'", self.name);
        handle.close().map_err(|code| WavefileError::Close {
            path: self.name.to_string(),
            reason: self.engine.error_message(code),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("{}", err);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("info", &self.info)
            .field("closed", &self.handle.is_none())
            .finish()
    }
}

// ============================================================================
// Reader
// ============================================================================

/// A sound file open for reading
#[derive(Debug)]
pub struct WaveReader {
    session: Session,
}

impl WaveReader {
    /// Open a file for reading
    ///
    /// # Errors
    /// * `Open` - with the engine's reason, e.g.
    ///   `Error opening 'notexisting.wav': System error.`
    pub fn open(name: impl Into<FileName>) -> Result<Self> {
        Self::open_with(name, ReaderHints::default())
    }

    /// Open a file for reading, passing stream parameters to the engine
    pub fn open_with(name: impl Into<FileName>, hints: ReaderHints) -> Result<Self> {
        let info = StreamInfo {
            frames: 0,
            sample_rate: hints.sample_rate.unwrap_or(0),
            channels: hints.channels.unwrap_or(0),
            format: hints.format.unwrap_or_default(),
            seekable: false,
        };
        let session = Session::open(name.into(), OpenMode::Read, info)?;
        Ok(Self { session })
    }

    pub fn name(&self) -> &FileName {
        &self.session.name
    }

    pub fn channels(&self) -> usize {
        self.session.info.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.session.info.sample_rate
    }

    pub fn format(&self) -> FormatCode {
        self.session.info.format
    }

    /// Total frames in the file
    pub fn frames(&self) -> u64 {
        self.session.info.frames
    }

    pub fn is_seekable(&self) -> bool {
        self.session.info.seekable
    }

    /// Byte rate reported by the engine, `None` if it cannot tell
    pub fn byte_rate(&self) -> Result<Option<u32>> {
        self.session.byte_rate()
    }

    pub fn metadata(&self) -> Result<Metadata<'_>> {
        self.session.metadata()
    }

    /// A zeroed buffer this reader accepts, `frames` frames long
    pub fn buffer<T: Sample>(&self, frames: usize) -> SampleBuffer<T> {
        SampleBuffer::new(self.channels(), frames)
    }

    /// Fill `buffer` from the current position
    ///
    /// Returns the frames read; fewer than `buffer.frames()` near the end
    /// of the file, 0 at the end. Frames past the returned count are left
    /// untouched.
    ///
    /// # Errors
    /// * `InvalidState` - if the reader is closed
    /// * `ChannelMismatch` - if the buffer's channel count differs
    /// * `BufferLayout` - if the buffer is not frame-interleaved
    pub fn read<T: Sample>(&mut self, buffer: &mut SampleBuffer<T>) -> Result<usize> {
        let frames = buffer.frames();
        self.read_span(buffer, 0, frames)
    }

    /// Read up to `len` frames into `buffer`, starting at its frame `start`
    pub(crate) fn read_span<T: Sample>(
        &mut self,
        buffer: &mut SampleBuffer<T>,
        start: usize,
        len: usize,
    ) -> Result<usize> {
        let channels = self.session.info.channels;
        let handle = self.session.handle_mut("read")?;
        let storage = buffer.engine_storage(channels)?;
        let begin = (start * channels).min(storage.len());
        let end = ((start + len) * channels).min(storage.len());
        let frames = (end - begin) / channels.max(1);
        Ok(T::read_frames(handle, &mut storage[begin..end], frames))
    }

    /// Iterate over the rest of the file in blocks of `block_size` frames
    pub fn read_iter<T: Sample>(&mut self, block_size: usize) -> Blocks<'_, T> {
        let buffer = self.buffer(block_size);
        Blocks {
            reader: self,
            buffer,
        }
    }

    /// Iterate in blocks the size of `buffer`, reusing it
    ///
    /// # Errors
    /// * `InvalidState` - if the reader is closed
    /// * `ChannelMismatch` or `BufferLayout` - if the buffer cannot be read into
    pub fn read_iter_with<T: Sample>(&mut self, mut buffer: SampleBuffer<T>) -> Result<Blocks<'_, T>> {
        self.session.handle("read")?;
        buffer.engine_storage(self.channels())?;
        Ok(Blocks {
            reader: self,
            buffer,
        })
    }

    /// Move the read position
    ///
    /// Returns the new absolute frame position, or `None` if the target is
    /// out of range, in which case the position is unchanged.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<Option<u64>> {
        self.session.seek(offset, whence)
    }

    /// Release the file. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    pub fn is_closed(&self) -> bool {
        self.session.handle.is_none()
    }
}

/// Blocks of a [`WaveReader`], see [`WaveReader::read_iter`]
///
/// Every block is a view into the same reusable buffer, so it must be
/// dropped before the next call to [`next_block`](Blocks::next_block).
/// Iteration ends at the first empty read; seeking back makes more blocks
/// available.
pub struct Blocks<'r, T> {
    reader: &'r mut WaveReader,
    buffer: SampleBuffer<T>,
}

impl<'r, T: Sample> Blocks<'r, T> {
    /// Read the next block, `None` once a read returns no frames
    pub fn next_block(&mut self) -> Result<Option<BufferView<'_, T>>> {
        let frames = self.buffer.frames();
        let read = self.reader.read_span(&mut self.buffer, 0, frames)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(self.buffer.slice(0, read)))
    }

    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<Option<u64>> {
        self.reader.seek(offset, whence)
    }

    /// The reusable buffer, holding the last block read
    pub fn buffer(&self) -> &SampleBuffer<T> {
        &self.buffer
    }

    pub fn into_buffer(self) -> SampleBuffer<T> {
        self.buffer
    }
}

// ============================================================================
// Writer
// ============================================================================

/// A sound file open for writing
#[derive(Debug)]
pub struct WaveWriter {
    session: Session,
    written: u64,
}

impl WaveWriter {
    /// Create (or truncate) a file
    ///
    /// # Errors
    /// * `Open` - if the path is not writable or the engine cannot write
    ///   `options.format` with these parameters
    pub fn create(name: impl Into<FileName>, options: WriterOptions) -> Result<Self> {
        let info = StreamInfo {
            frames: 0,
            sample_rate: options.sample_rate,
            channels: options.channels,
            format: options.format,
            seekable: false,
        };
        let session = Session::open(name.into(), OpenMode::Write, info)?;
        Ok(Self {
            session,
            written: 0,
        })
    }

    pub fn name(&self) -> &FileName {
        &self.session.name
    }

    pub fn channels(&self) -> usize {
        self.session.info.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.session.info.sample_rate
    }

    pub fn format(&self) -> FormatCode {
        self.session.info.format
    }

    /// Frames written so far
    pub fn frames(&self) -> u64 {
        self.written
    }

    pub fn byte_rate(&self) -> Result<Option<u32>> {
        self.session.byte_rate()
    }

    pub fn metadata(&mut self) -> Result<MetadataMut<'_>> {
        self.session.metadata_mut()
    }

    /// Append every frame of `buffer`
    ///
    /// Any layout is accepted; non-interleaved buffers are copied first.
    ///
    /// # Errors
    /// * `InvalidState` - if the writer is closed
    /// * `ChannelMismatch` - if the buffer's channel count differs
    pub fn write<T: Sample>(&mut self, buffer: &SampleBuffer<T>) -> Result<usize> {
        self.write_view(buffer.view())
    }

    /// Append the frames of `view`
    pub fn write_view<T: Sample>(&mut self, view: BufferView<'_, T>) -> Result<usize> {
        let channels = self.session.info.channels;
        let handle = self.session.handle_mut("write")?;
        check_channels(view.channels(), channels)?;
        let samples = view.to_interleaved();
        let written = T::write_frames(handle, &samples, view.frames());
        self.written += written as u64;
        Ok(written)
    }

    /// Move the write position, see [`WaveReader::seek`]
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<Option<u64>> {
        self.session.seek(offset, whence)
    }

    /// Finish the file. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    pub fn is_closed(&self) -> bool {
        self.session.handle.is_none()
    }
}

// ============================================================================
// Scoped Access
// ============================================================================

fn finish<R>(result: Result<R>, closed: Result<()>) -> Result<R> {
    let value = result?;
    closed?;
    Ok(value)
}

/// Open `name`, run `body` on the reader and close it
///
/// The reader is closed on every path. An error from `body` wins over an
/// error from closing.
pub fn with_reader<R>(
    name: impl Into<FileName>,
    body: impl FnOnce(&mut WaveReader) -> Result<R>,
) -> Result<R> {
    let mut reader = WaveReader::open(name)?;
    let result = body(&mut reader);
    let closed = reader.close();
    finish(result, closed)
}

/// Create `name`, run `body` on the writer and close it
///
/// See [`with_reader`].
pub fn with_writer<R>(
    name: impl Into<FileName>,
    options: WriterOptions,
    body: impl FnOnce(&mut WaveWriter) -> Result<R>,
) -> Result<R> {
    let mut writer = WaveWriter::create(name, options)?;
    let result = body(&mut writer);
    let closed = writer.close();
    finish(result, closed)
}
