//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use serde::Serialize;

use crate::buffer::SampleBuffer;
use crate::error::Result;
use crate::format::{describe, list_formats, FormatCode, FormatKind, FormatRecord};
use crate::metadata::Tag;
use crate::stream::{with_reader, with_writer, WriterOptions};

/// Summary of a sound file, as printed by `info`
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub channels: usize,
    pub sample_rate: u32,
    pub frames: u64,
    pub duration_secs: f64,
    pub format: FormatCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_rate: Option<u32>,
    pub tags: BTreeMap<String, String>,
}

/// Collect stream parameters and tags of `path`
pub fn file_info(path: &Path) -> Result<FileInfo> {
    with_reader(path, |reader| {
        let description = describe(reader.format()).ok().unwrap_or_default();
        let tags = reader
            .metadata()?
            .iter()
            .map(|(tag, value)| (tag.name().to_string(), value))
            .collect();
        let duration_secs = if reader.sample_rate() == 0 {
            0.0
        } else {
            reader.frames() as f64 / reader.sample_rate() as f64
        };

        Ok(FileInfo {
            name: reader.name().to_string(),
            channels: reader.channels(),
            sample_rate: reader.sample_rate(),
            frames: reader.frames(),
            duration_secs,
            format: reader.format(),
            format_name: description.name,
            subtype_name: description.subtype,
            byte_rate: reader.byte_rate()?,
            tags,
        })
    })
}

/// Print stream parameters and tags.
pub fn info(path: &Path, json: bool) -> Result<()> {
    info!("Inspecting: {}", path.display());

    let file = file_info(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&file)?);
        return Ok(());
    }

    println!("File: {}", file.name);
    println!(
        "Title: {}",
        file.tags.get(Tag::Title.name()).map_or("", String::as_str)
    );
    println!(
        "Artist: {}",
        file.tags.get(Tag::Artist.name()).map_or("", String::as_str)
    );
    println!("Channels: {}", file.channels);
    println!("Format: 0x{:x}", file.format);
    if let Some(name) = &file.format_name {
        println!(
            "Format name: {} {}",
            name,
            file.subtype_name.as_deref().unwrap_or("")
        );
    }
    println!("Sample Rate: {}", file.sample_rate);
    println!("Frames: {} ({:.3} s)", file.frames, file.duration_secs);

    let others: Vec<_> = file
        .tags
        .iter()
        .filter(|(name, _)| *name != Tag::Title.name() && *name != Tag::Artist.name())
        .collect();
    if !others.is_empty() {
        println!("{:-<60}", "");
        for (name, value) in others {
            println!("{}: {}", name, value);
        }
    }

    Ok(())
}

/// Print one of the engine's format catalogues.
pub fn formats(kind: FormatKind, json: bool) -> Result<()> {
    let records: Vec<FormatRecord> = list_formats(kind).collect();
    debug!("{} formats in the {:?} catalogue", records.len(), kind);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {:<45} {}",
            record.format,
            record.name,
            record.extension.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Copy `input` to `output` block by block with a gain.
///
/// The copy gets the source's title with " II" appended, and its artist.
pub fn copy(input: &Path, output: &Path, gain: f32, block: usize) -> Result<()> {
    info!("Copying {} -> {}", input.display(), output.display());

    let frames = with_reader(input, |reader| {
        let channels = reader.channels();
        let options = WriterOptions::default()
            .with_channels(channels)
            .with_sample_rate(reader.sample_rate());

        let source = reader.metadata()?;
        let title = source.get_tag(Tag::Title);
        let artist = source.get_tag(Tag::Artist);

        with_writer(output, options, |writer| {
            {
                let mut tags = writer.metadata()?;
                if let Some(title) = &title {
                    tags.set_tag(Tag::Title, &format!("{} II", title));
                }
                if let Some(artist) = &artist {
                    tags.set_tag(Tag::Artist, artist);
                }
            }

            let mut scaled = SampleBuffer::<f32>::new(channels, block);
            let mut blocks = reader.read_iter::<f32>(block);
            let mut total = 0;
            while let Some(view) = blocks.next_block()? {
                for f in 0..view.frames() {
                    for c in 0..channels {
                        scaled.set(c, f, view.get(c, f).unwrap_or(0.0) * gain);
                    }
                }
                total += writer.write_view(scaled.slice(0, view.frames()))?;
            }
            Ok(total)
        })
    })?;

    println!("Copied {} frames to {}", frames, output.display());
    Ok(())
}

/// Write the stereo test signal.
///
/// Channel 0 is a saw wave whose rate rises with every block, channel 1 a
/// square wave whose duty cycle grows with every block.
pub fn synth(output: &Path, blocks: usize, block: usize, rate: u32, format: FormatCode) -> Result<()> {
    info!("Synthesizing {} blocks into {}", blocks, output.display());

    let options = WriterOptions::new(rate, 2, format);
    let frames = with_writer(output, options, |writer| {
        {
            let mut tags = writer.metadata()?;
            tags.set_tag(Tag::Title, "Some Noise");
            tags.set_tag(Tag::Artist, "The Artists");
        }

        let mut data = SampleBuffer::<f32>::new(2, block);
        for x in 0..blocks {
            let edge = block.saturating_sub(x * 2);
            for i in 0..block {
                data.set(0, i, ((x * i) % block) as f32 / block as f32);
                data.set(1, i, if i >= edge { 1.0 } else { -1.0 });
            }
            writer.write(&data)?;
        }
        Ok(writer.frames())
    })?;

    println!("Wrote {} frames to {}", frames, output.display());
    Ok(())
}
