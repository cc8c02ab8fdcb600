//! Built-in RIFF/WAVE engine
//!
//! Sample data goes through hound. Tags are kept in a `LIST/INFO` chunk
//! handled by [`info_chunk`](super::info_chunk).
//!
//! Supported encodings: unsigned 8 bit, signed 16/24/32 bit PCM and 32 bit
//! float, little endian only.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::path::PathBuf;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, warn};

use crate::engine::catalog;
use crate::engine::info_chunk::{self, InfoTags, ScanError};
use crate::engine::{
    path_from_bytes, Catalog, Engine, EngineHandle, ErrorCode, OpenMode, StreamInfo, Whence,
};
use crate::format::{FormatCode, FormatRecord};
use crate::metadata::Tag;

/// Format passed to a write open is not writable by this engine
pub const BAD_OPEN_FORMAT: ErrorCode = ErrorCode(0x100);
/// Tag change on a stream opened for reading
pub const READ_ONLY_TAGS: ErrorCode = ErrorCode(0x101);
/// Finalising the file failed
pub const WRITE_FAILED: ErrorCode = ErrorCode(0x102);

// ============================================================================
// Encodings
// ============================================================================

/// Sample encoding of a RIFF/WAVE stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Integer PCM with this many valid bits
    Int(u16),
    /// 32 bit IEEE float
    Float,
}

impl Encoding {
    /// Encoding for a writable format code, `None` if unsupported
    pub fn from_format(format: FormatCode) -> Option<Encoding> {
        if format.major() != FormatCode::WAV {
            return None;
        }
        let endian_ok = match format.endianness() {
            FormatCode::ENDIAN_FILE | FormatCode::ENDIAN_LITTLE => true,
            FormatCode::ENDIAN_CPU => cfg!(target_endian = "little"),
            _ => false,
        };
        if !endian_ok {
            return None;
        }
        match format.subtype() {
            FormatCode::PCM_U8 => Some(Encoding::Int(8)),
            FormatCode::PCM_16 => Some(Encoding::Int(16)),
            FormatCode::PCM_24 => Some(Encoding::Int(24)),
            FormatCode::PCM_32 => Some(Encoding::Int(32)),
            FormatCode::FLOAT => Some(Encoding::Float),
            _ => None,
        }
    }

    fn from_spec(spec: &WavSpec) -> Encoding {
        match spec.sample_format {
            SampleFormat::Float => Encoding::Float,
            SampleFormat::Int => Encoding::Int(spec.bits_per_sample),
        }
    }

    pub fn subtype(self) -> FormatCode {
        match self {
            Encoding::Int(bits) if bits <= 8 => FormatCode::PCM_U8,
            Encoding::Int(bits) if bits <= 16 => FormatCode::PCM_16,
            Encoding::Int(bits) if bits <= 24 => FormatCode::PCM_24,
            Encoding::Int(_) => FormatCode::PCM_32,
            Encoding::Float => FormatCode::FLOAT,
        }
    }

    fn bytes_per_sample(self) -> u16 {
        match self {
            Encoding::Int(bits) => (bits + 7) / 8,
            Encoding::Float => 4,
        }
    }

    /// Block align and byte rate of a stream, `None` if either overflows
    /// its header field
    pub fn rates(self, channels: usize, sample_rate: u32) -> Option<(u16, u32)> {
        let block_align = u16::try_from(channels)
            .ok()?
            .checked_mul(self.bytes_per_sample())?;
        let byte_rate = sample_rate.checked_mul(block_align as u32)?;
        Some((block_align, byte_rate))
    }

    fn spec(self, channels: u16, sample_rate: u32) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            Encoding::Int(bits) => (bits, SampleFormat::Int),
            Encoding::Float => (32, SampleFormat::Float),
        };
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

// ============================================================================
// Sample Conversion
// ============================================================================

/// Conversion between caller sample types and the stored encoding
///
/// Integer to integer is a bit shift to the target width. Integer to float
/// divides by `2^(bits-1)`. Float to integer multiplies by the positive
/// full scale of the target width, rounding and clamping.
pub trait Transcode: Copy {
    fn from_pcm(value: i32, bits: u16) -> Self;
    fn from_float(value: f32) -> Self;
    fn to_pcm(self, bits: u16) -> i32;
    fn to_float(self) -> f32;
}

fn shift(value: i32, from_bits: u16, to_bits: u16) -> i32 {
    if from_bits >= to_bits {
        value >> (from_bits - to_bits)
    } else {
        value << (to_bits - from_bits)
    }
}

/// Divisor taking `bits`-wide integers to [-1, 1)
fn unit(bits: u16) -> f64 {
    (1i64 << (bits - 1)) as f64
}

fn full_scale(bits: u16) -> f64 {
    ((1i64 << (bits - 1)) - 1) as f64
}

fn quantize(value: f64, bits: u16) -> i32 {
    let full = full_scale(bits);
    (value * full).round().clamp(-full - 1.0, full) as i32
}

impl Transcode for i16 {
    fn from_pcm(value: i32, bits: u16) -> Self {
        shift(value, bits, 16) as i16
    }

    fn from_float(value: f32) -> Self {
        quantize(value as f64, 16) as i16
    }

    fn to_pcm(self, bits: u16) -> i32 {
        shift(self as i32, 16, bits)
    }

    fn to_float(self) -> f32 {
        (self as f64 / unit(16)) as f32
    }
}

impl Transcode for i32 {
    fn from_pcm(value: i32, bits: u16) -> Self {
        shift(value, bits, 32)
    }

    fn from_float(value: f32) -> Self {
        quantize(value as f64, 32)
    }

    fn to_pcm(self, bits: u16) -> i32 {
        shift(self, 32, bits)
    }

    fn to_float(self) -> f32 {
        (self as f64 / unit(32)) as f32
    }
}

impl Transcode for f32 {
    fn from_pcm(value: i32, bits: u16) -> Self {
        (value as f64 / unit(bits)) as f32
    }

    fn from_float(value: f32) -> Self {
        value
    }

    fn to_pcm(self, bits: u16) -> i32 {
        quantize(self as f64, bits)
    }

    fn to_float(self) -> f32 {
        self
    }
}

impl Transcode for f64 {
    fn from_pcm(value: i32, bits: u16) -> Self {
        value as f64 / unit(bits)
    }

    fn from_float(value: f32) -> Self {
        value as f64
    }

    fn to_pcm(self, bits: u16) -> i32 {
        quantize(self, bits)
    }

    fn to_float(self) -> f32 {
        self as f32
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The built-in engine
#[derive(Debug, Default)]
pub struct RiffEngine;

impl RiffEngine {
    pub fn new() -> Self {
        RiffEngine
    }
}

fn map_hound_error(err: hound::Error) -> ErrorCode {
    match err {
        hound::Error::IoError(_) => ErrorCode::SYSTEM,
        hound::Error::FormatError(_) => ErrorCode::MALFORMED_FILE,
        _ => ErrorCode::UNSUPPORTED_ENCODING,
    }
}

impl Engine for RiffEngine {
    fn name(&self) -> &'static str {
        "riff"
    }

    fn version(&self) -> String {
        format!("wavefile-riff-{}", env!("CARGO_PKG_VERSION"))
    }

    fn open(
        &self,
        name: &[u8],
        mode: OpenMode,
        info: &mut StreamInfo,
    ) -> Result<Box<dyn EngineHandle>, ErrorCode> {
        let path = path_from_bytes(name);
        match mode {
            OpenMode::Read => Ok(Box::new(RiffReader::open(path, info)?)),
            OpenMode::Write => {
                if !self.format_check(info) {
                    return Err(BAD_OPEN_FORMAT);
                }
                Ok(Box::new(RiffWriter::create(path, info)?))
            }
        }
    }

    fn error_message(&self, code: ErrorCode) -> String {
        let message = match code {
            ErrorCode::NO_ERROR => "No Error.",
            ErrorCode::UNRECOGNISED_FORMAT => "Format not recognised.",
            ErrorCode::SYSTEM => "System error.",
            ErrorCode::MALFORMED_FILE => "Supported file format but file is malformed.",
            ErrorCode::UNSUPPORTED_ENCODING => "Supported file format but unsupported encoding.",
            BAD_OPEN_FORMAT => "Format not supported by the RIFF engine.",
            READ_ONLY_TAGS => "Tags cannot be changed on a file opened for reading.",
            WRITE_FAILED => "Error while finalising the file.",
            other => return format!("Unknown error code {}.", other),
        };
        message.to_string()
    }

    fn format_check(&self, info: &StreamInfo) -> bool {
        match Encoding::from_format(info.format) {
            Some(encoding) => {
                info.channels > 0
                    && info.sample_rate > 0
                    && encoding.rates(info.channels, info.sample_rate).is_some()
            }
            None => false,
        }
    }

    fn format_count(&self, catalog: Catalog) -> usize {
        catalog::table(catalog).len()
    }

    fn format_entry(&self, catalog: Catalog, index: usize) -> Option<FormatRecord> {
        catalog::table(catalog).get(index).map(|entry| entry.record())
    }

    fn format_info(&self, code: FormatCode) -> Option<FormatRecord> {
        catalog::lookup(code).map(|entry| entry.record())
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Read handle
pub struct RiffReader {
    reader: WavReader<BufReader<File>>,
    encoding: Encoding,
    channels: usize,
    frames: u64,
    position: u64,
    byte_rate: u32,
    tags: InfoTags,
}

impl RiffReader {
    fn open(path: PathBuf, info: &mut StreamInfo) -> Result<Self, ErrorCode> {
        let mut file = File::open(&path).map_err(|err| {
            debug!("{}: {}", path.display(), err);
            ErrorCode::SYSTEM
        })?;

        let tags = match info_chunk::read_info_tags(&mut BufReader::new(&mut file)) {
            Ok(tags) => tags,
            Err(ScanError::NotRiff) => return Err(ErrorCode::UNRECOGNISED_FORMAT),
            Err(ScanError::Io(err)) => {
                debug!("{}: {}", path.display(), err);
                return Err(ErrorCode::SYSTEM);
            }
        };
        file.seek(SeekFrom::Start(0)).map_err(|_| ErrorCode::SYSTEM)?;

        let reader = WavReader::new(BufReader::new(file)).map_err(map_hound_error)?;
        let spec = reader.spec();
        let encoding = Encoding::from_spec(&spec);
        let channels = spec.channels as usize;
        let frames = reader.duration() as u64;
        let (_, byte_rate) = encoding
            .rates(channels, spec.sample_rate)
            .ok_or(ErrorCode::UNSUPPORTED_ENCODING)?;

        *info = StreamInfo {
            frames,
            sample_rate: spec.sample_rate,
            channels,
            format: FormatCode::WAV | encoding.subtype(),
            seekable: true,
        };

        Ok(Self {
            reader,
            encoding,
            channels,
            frames,
            position: 0,
            byte_rate,
            tags,
        })
    }

    fn read_frames<T: Transcode>(&mut self, buffer: &mut [T], frames: usize) -> usize {
        let remaining = self.frames - self.position;
        let frames = (frames as u64)
            .min(remaining)
            .min((buffer.len() / self.channels) as u64) as usize;
        let wanted = frames * self.channels;

        let mut done = 0;
        let mut failure = None;
        match self.encoding {
            Encoding::Int(bits) => {
                for (slot, sample) in buffer[..wanted].iter_mut().zip(self.reader.samples::<i32>()) {
                    match sample {
                        Ok(value) => *slot = T::from_pcm(value, bits),
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                    done += 1;
                }
            }
            Encoding::Float => {
                for (slot, sample) in buffer[..wanted].iter_mut().zip(self.reader.samples::<f32>()) {
                    match sample {
                        Ok(value) => *slot = T::from_float(value),
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                    done += 1;
                }
            }
        }

        let read = done / self.channels;
        self.position += read as u64;
        if let Some(err) = failure {
            warn!("short read at frame {}: {}", self.position, err);
            if self.reader.seek(self.position as u32).is_err() {
                self.frames = self.position;
            }
        }
        read
    }
}

impl EngineHandle for RiffReader {
    fn seek(&mut self, frames: i64, whence: Whence) -> i64 {
        let base = match whence {
            Whence::Set => 0,
            Whence::Current => self.position as i64,
            Whence::End => self.frames as i64,
        };
        let target = match base.checked_add(frames) {
            Some(target) if (0..=self.frames as i64).contains(&target) => target,
            _ => return -1,
        };
        match self.reader.seek(target as u32) {
            Ok(()) => {
                self.position = target as u64;
                target
            }
            Err(err) => {
                debug!("seek to frame {} failed: {}", target, err);
                -1
            }
        }
    }

    fn readf_i16(&mut self, buffer: &mut [i16], frames: usize) -> usize {
        self.read_frames(buffer, frames)
    }

    fn readf_i32(&mut self, buffer: &mut [i32], frames: usize) -> usize {
        self.read_frames(buffer, frames)
    }

    fn readf_f32(&mut self, buffer: &mut [f32], frames: usize) -> usize {
        self.read_frames(buffer, frames)
    }

    fn readf_f64(&mut self, buffer: &mut [f64], frames: usize) -> usize {
        self.read_frames(buffer, frames)
    }

    fn writef_i16(&mut self, _buffer: &[i16], _frames: usize) -> usize {
        0
    }

    fn writef_i32(&mut self, _buffer: &[i32], _frames: usize) -> usize {
        0
    }

    fn writef_f32(&mut self, _buffer: &[f32], _frames: usize) -> usize {
        0
    }

    fn writef_f64(&mut self, _buffer: &[f64], _frames: usize) -> usize {
        0
    }

    fn get_string(&self, tag: Tag) -> Option<Vec<u8>> {
        self.tags.get(&tag).cloned()
    }

    fn set_string(&mut self, _tag: Tag, _value: &[u8]) -> Result<(), ErrorCode> {
        Err(READ_ONLY_TAGS)
    }

    fn byte_rate(&self) -> Option<u32> {
        Some(self.byte_rate)
    }

    fn close(&mut self) -> Result<(), ErrorCode> {
        Ok(())
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Write handle. Frames are streamed, so the cursor only moves forward.
pub struct RiffWriter {
    writer: Option<WavWriter<BufWriter<File>>>,
    path: PathBuf,
    encoding: Encoding,
    channels: usize,
    position: u64,
    byte_rate: u32,
    tags: InfoTags,
}

impl RiffWriter {
    fn create(path: PathBuf, info: &mut StreamInfo) -> Result<Self, ErrorCode> {
        let encoding = Encoding::from_format(info.format).ok_or(BAD_OPEN_FORMAT)?;
        let channels = u16::try_from(info.channels).map_err(|_| BAD_OPEN_FORMAT)?;
        let (_, byte_rate) = encoding
            .rates(info.channels, info.sample_rate)
            .ok_or(BAD_OPEN_FORMAT)?;
        let spec = encoding.spec(channels, info.sample_rate);

        let writer = WavWriter::create(&path, spec).map_err(|err| {
            debug!("{}: {}", path.display(), err);
            map_hound_error(err)
        })?;

        info.frames = 0;
        info.seekable = true;

        Ok(Self {
            writer: Some(writer),
            path,
            encoding,
            channels: info.channels,
            position: 0,
            byte_rate,
            tags: InfoTags::new(),
        })
    }

    fn write_frames<T: Transcode>(&mut self, buffer: &[T], frames: usize) -> usize {
        let encoding = self.encoding;
        let channels = self.channels;
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return 0,
        };
        let frames = frames.min(buffer.len() / channels);

        for (index, frame) in buffer[..frames * channels].chunks_exact(channels).enumerate() {
            for &sample in frame {
                let result = match encoding {
                    Encoding::Int(bits) => writer.write_sample(sample.to_pcm(bits)),
                    Encoding::Float => writer.write_sample(sample.to_float()),
                };
                if let Err(err) = result {
                    warn!("short write at frame {}: {}", self.position + index as u64, err);
                    self.position += index as u64;
                    return index;
                }
            }
        }
        self.position += frames as u64;
        frames
    }
}

impl EngineHandle for RiffWriter {
    fn seek(&mut self, frames: i64, whence: Whence) -> i64 {
        let base = match whence {
            Whence::Set => 0,
            Whence::Current | Whence::End => self.position as i64,
        };
        match base.checked_add(frames) {
            Some(target) if target == self.position as i64 => target,
            _ => -1,
        }
    }

    fn readf_i16(&mut self, _buffer: &mut [i16], _frames: usize) -> usize {
        0
    }

    fn readf_i32(&mut self, _buffer: &mut [i32], _frames: usize) -> usize {
        0
    }

    fn readf_f32(&mut self, _buffer: &mut [f32], _frames: usize) -> usize {
        0
    }

    fn readf_f64(&mut self, _buffer: &mut [f64], _frames: usize) -> usize {
        0
    }

    fn writef_i16(&mut self, buffer: &[i16], frames: usize) -> usize {
        self.write_frames(buffer, frames)
    }

    fn writef_i32(&mut self, buffer: &[i32], frames: usize) -> usize {
        self.write_frames(buffer, frames)
    }

    fn writef_f32(&mut self, buffer: &[f32], frames: usize) -> usize {
        self.write_frames(buffer, frames)
    }

    fn writef_f64(&mut self, buffer: &[f64], frames: usize) -> usize {
        self.write_frames(buffer, frames)
    }

    fn get_string(&self, tag: Tag) -> Option<Vec<u8>> {
        self.tags.get(&tag).cloned()
    }

    fn set_string(&mut self, tag: Tag, value: &[u8]) -> Result<(), ErrorCode> {
        self.tags.insert(tag, value.to_vec());
        Ok(())
    }

    fn byte_rate(&self) -> Option<u32> {
        Some(self.byte_rate)
    }

    fn close(&mut self) -> Result<(), ErrorCode> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => return Ok(()),
        };
        writer.finalize().map_err(|err| {
            warn!("{}: {}", self.path.display(), err);
            WRITE_FAILED
        })?;
        info_chunk::append_info_chunk(&self.path, &self.tags).map_err(|err| {
            warn!("{}: {}", self.path.display(), err);
            WRITE_FAILED
        })
    }
}
