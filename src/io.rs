//! Whole-file convenience
//!
//! One-call loading and saving on top of [`WaveReader`] / [`WaveWriter`].
//! Both walk the file in blocks of 512 frames.

use std::io;

use log::debug;

use crate::buffer::{Sample, SampleBuffer};
use crate::engine::FileName;
use crate::error::Result;
use crate::stream::{with_reader, with_writer, WriterOptions};

/// Frames moved per engine call
pub const BLOCK_FRAMES: usize = 512;

/// Load a whole file as 32 bit float samples
///
/// # Returns
/// `(sample_rate, samples)`
pub fn load(name: impl Into<FileName>) -> Result<(u32, SampleBuffer<f32>)> {
    load_as(name)
}

/// Load a whole file as samples of type `T`
///
/// The buffer is sized from the frame count in the header and trimmed if
/// the file turns out shorter.
pub fn load_as<T: Sample>(name: impl Into<FileName>) -> Result<(u32, SampleBuffer<T>)> {
    with_reader(name, |reader| {
        let frames = usize::try_from(reader.frames()).unwrap_or(usize::MAX);
        let mut buffer = reader.buffer::<T>(frames);

        let mut position = 0;
        while position < frames {
            let read = reader.read_span(&mut buffer, position, BLOCK_FRAMES)?;
            if read == 0 {
                break;
            }
            position += read;
        }
        if position < frames {
            debug!("'{}' ended after {} of {} frames", reader.name(), position, frames);
            buffer.resize_frames(position);
        }
        Ok((reader.sample_rate(), buffer))
    })
}

/// Save `buffer` as a 32 bit float WAV file
pub fn save<T: Sample>(name: impl Into<FileName>, buffer: &SampleBuffer<T>, sample_rate: u32) -> Result<()> {
    let options = WriterOptions::default()
        .with_sample_rate(sample_rate)
        .with_channels(buffer.channels());
    save_with(name, buffer, options)
}

/// Save `buffer` with explicit stream options
///
/// # Errors
/// * `Open` - if the file cannot be created with `options`
/// * `ChannelMismatch` - if `options.channels` differs from the buffer
/// * `Io` - if the engine stops accepting frames
pub fn save_with<T: Sample>(
    name: impl Into<FileName>,
    buffer: &SampleBuffer<T>,
    options: WriterOptions,
) -> Result<()> {
    with_writer(name, options, |writer| {
        let mut position = 0;
        while position < buffer.frames() {
            let block = buffer.slice(position, BLOCK_FRAMES);
            let written = writer.write_view(block)?;
            if written < block.frames() {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!(
                        "'{}' accepted {} of {} frames",
                        writer.name(),
                        position + written,
                        buffer.frames()
                    ),
                )
                .into());
            }
            position += written;
        }
        Ok(())
    })
}
