//! Sample Buffer Adapter
//!
//! Two-dimensional `(channels, frames)` sample buffers and the checks that
//! stand between them and the engine. The engine only ever sees a linear,
//! frame-interleaved run of samples; reads land directly in the caller's
//! storage, so that storage must already be laid out that way.
//!
//! Sample values are passed through unscaled: integers are native sample
//! values, floats use the engine's normalized range.

use std::borrow::Cow;
use std::fmt;

use num_traits::Zero;

use crate::engine::EngineHandle;
use crate::error::{Result, WavefileError};

// ============================================================================
// Sample Types
// ============================================================================

/// Element type of a sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    I16,
    I32,
    F32,
    F64,
}

impl ElementKind {
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::I16 => "int16",
            ElementKind::I32 => "int32",
            ElementKind::F32 => "float32",
            ElementKind::F64 => "float64",
        }
    }

    /// Size of one sample in bytes
    pub fn size(self) -> usize {
        match self {
            ElementKind::I16 => 2,
            ElementKind::I32 | ElementKind::F32 => 4,
            ElementKind::F64 => 8,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A sample type the engine can transfer
///
/// Implemented for `i16`, `i32`, `f32` and `f64` only. Each type routes to
/// its own engine call family.
pub trait Sample:
    sealed::Sealed + Copy + Zero + PartialEq + fmt::Debug + Send + Sync + 'static
{
    const KIND: ElementKind;

    /// Read up to `frames` interleaved frames into `buffer`
    fn read_frames(handle: &mut dyn EngineHandle, buffer: &mut [Self], frames: usize) -> usize;

    /// Write up to `frames` interleaved frames from `buffer`
    fn write_frames(handle: &mut dyn EngineHandle, buffer: &[Self], frames: usize) -> usize;
}

macro_rules! impl_sample {
    ($ty:ty, $kind:expr, $read:ident, $write:ident) => {
        impl sealed::Sealed for $ty {}

        impl Sample for $ty {
            const KIND: ElementKind = $kind;

            #[inline]
            fn read_frames(
                handle: &mut dyn EngineHandle,
                buffer: &mut [Self],
                frames: usize,
            ) -> usize {
                handle.$read(buffer, frames)
            }

            #[inline]
            fn write_frames(handle: &mut dyn EngineHandle, buffer: &[Self], frames: usize) -> usize {
                handle.$write(buffer, frames)
            }
        }
    };
}

impl_sample!(i16, ElementKind::I16, readf_i16, writef_i16);
impl_sample!(i32, ElementKind::I32, readf_i32, writef_i32);
impl_sample!(f32, ElementKind::F32, readf_f32, writef_f32);
impl_sample!(f64, ElementKind::F64, readf_f64, writef_f64);

// ============================================================================
// Sample Buffer
// ============================================================================

/// A `(channels, frames)` sample buffer with explicit strides
///
/// Sample `(c, f)` lives at `data[c * channel_stride + f * frame_stride]`.
/// Interleaved storage (`channel_stride == 1`, `frame_stride == channels`)
/// is what reads require; writes accept any layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer<T> {
    data: Vec<T>,
    channels: usize,
    frames: usize,
    channel_stride: usize,
    frame_stride: usize,
}

impl<T: Sample> SampleBuffer<T> {
    /// Create a zeroed, interleaved buffer
    ///
    /// This is the layout reads expect, so a buffer made here for a
    /// stream's channel count is always accepted by it.
    ///
    /// # Arguments
    /// * `channels` - Number of channels
    /// * `frames` - Number of frames
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![T::zero(); channels * frames],
            channels,
            frames,
            channel_stride: 1,
            frame_stride: channels,
        }
    }

    /// Wrap frame-interleaved samples (`c0 c1 c0 c1 ...` for stereo)
    ///
    /// # Errors
    /// * `BufferShape` - if `channels` is zero or does not divide the length
    pub fn from_interleaved(channels: usize, data: Vec<T>) -> Result<Self> {
        let frames = frames_in(data.len(), channels)?;
        Ok(Self {
            data,
            channels,
            frames,
            channel_stride: 1,
            frame_stride: channels,
        })
    }

    /// Wrap channel-after-channel samples (`c0 c0 ... c1 c1 ...`)
    ///
    /// Such a buffer can be written, but reading into it fails with
    /// `BufferLayout` unless it has a single channel.
    ///
    /// # Errors
    /// * `BufferShape` - if `channels` is zero or does not divide the length
    pub fn from_planar(channels: usize, data: Vec<T>) -> Result<Self> {
        let frames = frames_in(data.len(), channels)?;
        Ok(Self {
            data,
            channels,
            frames,
            channel_stride: frames,
            frame_stride: 1,
        })
    }

    /// Interleave separate channel vectors
    ///
    /// # Errors
    /// * `BufferShape` - if there are no channels or their lengths differ
    pub fn from_channels(channels: Vec<Vec<T>>) -> Result<Self> {
        let frames = channels.first().map(Vec::len).unwrap_or(0);
        let total: usize = channels.iter().map(Vec::len).sum();
        if channels.is_empty() || total != frames * channels.len() {
            return Err(WavefileError::BufferShape {
                len: total,
                channels: channels.len(),
            });
        }

        let mut buffer = Self::new(channels.len(), frames);
        for (c, channel) in channels.iter().enumerate() {
            for (f, &sample) in channel.iter().enumerate() {
                buffer.data[f * buffer.frame_stride + c] = sample;
            }
        }
        Ok(buffer)
    }

    /// Single-channel buffer
    pub fn from_mono(data: Vec<T>) -> Self {
        let frames = data.len();
        Self {
            data,
            channels: 1,
            frames,
            channel_stride: 1,
            frame_stride: 1,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    /// `(channel_stride, frame_stride)` in samples
    #[inline]
    pub fn strides(&self) -> (usize, usize) {
        (self.channel_stride, self.frame_stride)
    }

    /// Whether the storage is frame-interleaved, i.e. readable into
    #[inline]
    pub fn is_interleaved(&self) -> bool {
        self.frame_stride == self.channels && (self.channels == 1 || self.channel_stride == 1)
    }

    #[inline]
    fn index(&self, channel: usize, frame: usize) -> Option<usize> {
        if channel < self.channels && frame < self.frames {
            Some(channel * self.channel_stride + frame * self.frame_stride)
        } else {
            None
        }
    }

    /// Get the sample at `(channel, frame)`, `None` if out of bounds
    #[inline]
    pub fn get(&self, channel: usize, frame: usize) -> Option<T> {
        self.index(channel, frame).map(|i| self.data[i])
    }

    /// Set the sample at `(channel, frame)`
    ///
    /// # Returns
    /// true if the sample was set, false if indices are out of bounds
    #[inline]
    pub fn set(&mut self, channel: usize, frame: usize, value: T) -> bool {
        match self.index(channel, frame) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// Samples of one channel in frame order, empty if out of bounds
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = T> + '_ {
        self.view().channel(channel)
    }

    pub fn to_channels(&self) -> Vec<Vec<T>> {
        self.view().to_channels()
    }

    pub fn to_interleaved(&self) -> Vec<T> {
        self.view().to_interleaved().into_owned()
    }

    /// Raw storage in its own layout
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// View of every frame
    pub fn view(&self) -> BufferView<'_, T> {
        BufferView::new(self, 0, self.frames)
    }

    /// View of `len` frames from `start`, clamped to the buffer
    pub fn slice(&self, start: usize, len: usize) -> BufferView<'_, T> {
        let start = start.min(self.frames);
        BufferView::new(self, start, len.min(self.frames - start))
    }

    /// Validate the buffer against a stream and hand out its storage
    ///
    /// # Errors
    /// * `ChannelMismatch` - if the channel counts differ
    /// * `BufferLayout` - if the storage is not frame-interleaved
    pub(crate) fn engine_storage(&mut self, file_channels: usize) -> Result<&mut [T]> {
        check_channels(self.channels, file_channels)?;
        if !self.is_interleaved() {
            return Err(WavefileError::BufferLayout);
        }
        Ok(&mut self.data)
    }

    /// Reshape an interleaved buffer in place to hold `frames` frames
    pub(crate) fn resize_frames(&mut self, frames: usize) {
        debug_assert!(self.is_interleaved());
        self.data.resize(frames * self.channels, T::zero());
        self.frames = frames;
        self.channel_stride = 1;
        self.frame_stride = self.channels;
    }
}

impl<T: Sample> Default for SampleBuffer<T> {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

fn frames_in(len: usize, channels: usize) -> Result<usize> {
    if channels == 0 || len % channels != 0 {
        return Err(WavefileError::BufferShape { len, channels });
    }
    Ok(len / channels)
}

/// Fail unless a buffer's channel count matches the stream's
pub(crate) fn check_channels(buffer: usize, file: usize) -> Result<()> {
    if buffer != file {
        return Err(WavefileError::ChannelMismatch { buffer, file });
    }
    Ok(())
}

// ============================================================================
// Buffer View
// ============================================================================

/// A run of frames borrowed from a [`SampleBuffer`]
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a, T> {
    buffer: &'a SampleBuffer<T>,
    start: usize,
    len: usize,
}

impl<'a, T: Sample> BufferView<'a, T> {
    pub(crate) fn new(buffer: &'a SampleBuffer<T>, start: usize, len: usize) -> Self {
        Self { buffer, start, len }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.buffer.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, channel: usize, frame: usize) -> Option<T> {
        if frame < self.len {
            self.buffer.get(channel, self.start + frame)
        } else {
            None
        }
    }

    /// Samples of one channel in frame order, empty if out of bounds
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = T> + 'a {
        let buffer = self.buffer;
        let start = self.start;
        let len = if channel < buffer.channels { self.len } else { 0 };
        (0..len).filter_map(move |f| buffer.get(channel, start + f))
    }

    pub fn to_channels(&self) -> Vec<Vec<T>> {
        (0..self.channels())
            .map(|c| self.channel(c).collect())
            .collect()
    }

    /// The frames as one interleaved run, borrowed when the storage allows
    pub fn to_interleaved(&self) -> Cow<'a, [T]> {
        match self.as_interleaved() {
            Some(samples) => Cow::Borrowed(samples),
            None => {
                let mut samples = Vec::with_capacity(self.len * self.channels());
                for f in 0..self.len {
                    for c in 0..self.channels() {
                        if let Some(sample) = self.buffer.get(c, self.start + f) {
                            samples.push(sample);
                        }
                    }
                }
                Cow::Owned(samples)
            }
        }
    }

    /// The underlying interleaved samples, `None` for other layouts
    pub fn as_interleaved(&self) -> Option<&'a [T]> {
        if !self.buffer.is_interleaved() {
            return None;
        }
        let channels = self.buffer.channels;
        Some(&self.buffer.data[self.start * channels..(self.start + self.len) * channels])
    }

    /// Copy the frames into an owned interleaved buffer
    pub fn to_buffer(&self) -> SampleBuffer<T> {
        let channels = self.channels();
        SampleBuffer {
            data: self.to_interleaved().into_owned(),
            channels,
            frames: self.len,
            channel_stride: 1,
            frame_stride: channels,
        }
    }
}

impl<'a, T: Sample> From<&'a SampleBuffer<T>> for BufferView<'a, T> {
    fn from(buffer: &'a SampleBuffer<T>) -> Self {
        buffer.view()
    }
}
