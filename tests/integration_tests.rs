//! Integration Tests
//!
//! End-to-end tests for reading, writing, seeking, tags and the format
//! catalogues through the public API.

use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use test_case::test_case;

use wavefile::{
    check_format, describe, load, save, with_reader, with_writer, FileName, FormatCode, SampleBuffer,
    Tag, WaveReader, WaveWriter, WavefileError, Whence, WriterOptions,
};

/// Helper to create a deterministic test signal in [-1, 1]
fn create_signal(channels: usize, frames: usize) -> SampleBuffer<f32> {
    let mut buffer = SampleBuffer::new(channels, frames);
    for f in 0..frames {
        for c in 0..channels {
            let phase = (f * (c + 1)) as f32 * 0.013;
            buffer.set(c, f, phase.sin() * 0.9);
        }
    }
    buffer
}

/// Helper to write a mono float file whose frame `i` holds the value `i`
fn create_counter_file(path: &Path, frames: usize) {
    let data: Vec<f32> = (0..frames).map(|i| i as f32).collect();
    with_writer(path, WriterOptions::default(), |writer| {
        writer.write(&SampleBuffer::from_mono(data))
    })
    .unwrap();
}

fn scratch(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

// === Round Trip Tests ===

#[test]
fn test_write_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "roundtrip.wav");
    let original = create_signal(4, 400);

    let options = WriterOptions::default().with_channels(4).with_sample_rate(48000);
    let mut writer = WaveWriter::create(&path, options).unwrap();
    assert_eq!(writer.write(&original).unwrap(), 400);
    writer.close().unwrap();

    let mut reader = WaveReader::open(&path).unwrap();
    assert_eq!(reader.sample_rate(), 48000);
    assert_eq!(reader.channels(), 4);
    assert_eq!(reader.frames(), 400);
    assert_eq!(reader.format(), FormatCode::WAV | FormatCode::FLOAT);

    let mut back = reader.buffer::<f32>(400);
    assert_eq!(reader.read(&mut back).unwrap(), 400);
    for (a, b) in back.as_slice().iter().zip(original.as_slice()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-7);
    }
}

#[test]
fn test_whole_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "whole.wav");
    let original = create_signal(2, 1500);

    save(&path, &original, 32000).unwrap();
    let (rate, loaded) = load(&path).unwrap();

    assert_eq!(rate, 32000);
    assert_eq!(loaded.channels(), 2);
    assert_eq!(loaded.frames(), 1500);
    for (a, b) in loaded.as_slice().iter().zip(original.as_slice()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-7);
    }
}

#[test]
fn test_write_zero_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "empty.wav");

    let mut writer = WaveWriter::create(&path, WriterOptions::default().with_channels(2)).unwrap();
    assert_eq!(writer.write(&SampleBuffer::<f32>::new(2, 0)).unwrap(), 0);
    assert_eq!(writer.frames(), 0);
    writer.close().unwrap();

    let mut reader = WaveReader::open(&path).unwrap();
    assert_eq!(reader.frames(), 0);
    assert_eq!(reader.channels(), 2);
    let mut buffer = reader.buffer::<f32>(4);
    assert_eq!(reader.read(&mut buffer).unwrap(), 0);
}

#[test]
fn test_pcm16_read_as_float_and_int() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "pcm16.wav");
    let options = WriterOptions::cd_quality();
    let data = SampleBuffer::from_interleaved(2, vec![16384i16, -16384, 0, 32767]).unwrap();
    with_writer(&path, options, |writer| writer.write(&data)).unwrap();

    let mut reader = WaveReader::open(&path).unwrap();
    let mut floats = reader.buffer::<f64>(2);
    reader.read(&mut floats).unwrap();
    assert_abs_diff_eq!(floats.get(0, 0).unwrap(), 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(floats.get(1, 0).unwrap(), -0.5, epsilon = 1e-12);

    reader.seek(0, Whence::Set).unwrap();
    let mut ints = reader.buffer::<i32>(2);
    reader.read(&mut ints).unwrap();
    assert_eq!(ints.get(0, 0), Some(16384 << 16));
    assert_eq!(ints.get(1, 1), Some(32767 << 16));
}

// === Block Iteration Tests ===

#[test]
fn test_read_iter_tail_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "blocks.wav");
    let original = create_signal(4, 410);
    save(&path, &original, 44100).unwrap();

    let mut reader = WaveReader::open(&path).unwrap();
    let mut blocks = reader.read_iter::<f32>(100);
    let mut sizes = Vec::new();
    let mut collected = Vec::new();
    while let Some(block) = blocks.next_block().unwrap() {
        sizes.push(block.frames());
        collected.extend_from_slice(block.as_interleaved().unwrap());
    }

    assert_eq!(sizes, vec![100, 100, 100, 100, 10]);
    assert_eq!(collected.len(), original.as_slice().len());
    for (a, b) in collected.iter().zip(original.as_slice()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-7);
    }
}

#[test]
fn test_read_iter_with_caller_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "reuse.wav");
    create_counter_file(&path, 25);

    let mut reader = WaveReader::open(&path).unwrap();
    let buffer = SampleBuffer::<i32>::new(1, 10);
    let mut blocks = reader.read_iter_with(buffer).unwrap();
    let mut count = 0;
    while let Some(block) = blocks.next_block().unwrap() {
        count += block.frames();
    }
    assert_eq!(count, 25);
    assert_eq!(blocks.into_buffer().frames(), 10);
}

// === Seek Tests ===

#[test_case(55, Whence::Set, Some(55) ; "set forward")]
#[test_case(35, Whence::Set, Some(35) ; "set back")]
#[test_case(-35, Whence::Set, None ; "set negative")]
#[test_case(100, Whence::Set, Some(100) ; "set to end")]
#[test_case(101, Whence::Set, None ; "set past end")]
#[test_case(0, Whence::Set, Some(0) ; "set to start")]
#[test_case(32, Whence::Current, Some(82) ; "current forward")]
#[test_case(-32, Whence::Current, Some(18) ; "current back")]
#[test_case(51, Whence::Current, None ; "current past end")]
#[test_case(-51, Whence::Current, None ; "current before start")]
#[test_case(50, Whence::Current, Some(100) ; "current to end")]
#[test_case(-20, Whence::End, Some(80) ; "end back")]
#[test_case(-100, Whence::End, Some(0) ; "end to start")]
#[test_case(-101, Whence::End, None ; "end before start")]
#[test_case(0, Whence::End, Some(100) ; "end exact")]
#[test_case(1, Whence::End, None ; "end past end")]
fn test_seek_from_middle(offset: i64, whence: Whence, expected: Option<u64>) {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "seek.wav");
    create_counter_file(&path, 100);

    let mut reader = WaveReader::open(&path).unwrap();
    assert_eq!(reader.seek(50, Whence::Set).unwrap(), Some(50));
    assert_eq!(reader.seek(offset, whence).unwrap(), expected);

    // A failed seek leaves the position where it was
    let position = expected.unwrap_or(50);
    let mut buffer = reader.buffer::<f32>(1);
    let read = reader.read(&mut buffer).unwrap();
    if position < 100 {
        assert_eq!(read, 1);
        assert_eq!(buffer.get(0, 0), Some(position as f32));
    } else {
        assert_eq!(read, 0);
    }
}

#[test]
fn test_failed_seek_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "noop.wav");
    create_counter_file(&path, 100);

    let mut reader = WaveReader::open(&path).unwrap();
    assert_eq!(reader.seek(101, Whence::Set).unwrap(), None);
    let mut buffer = reader.buffer::<f32>(3);
    assert_eq!(reader.read(&mut buffer).unwrap(), 3);
    assert_eq!(buffer.as_slice(), &[0.0, 1.0, 2.0]);
}

#[test]
fn test_seek_to_end_reads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "end.wav");
    create_counter_file(&path, 100);

    let mut reader = WaveReader::open(&path).unwrap();
    assert_eq!(reader.seek(0, Whence::End).unwrap(), Some(100));
    let mut buffer = reader.buffer::<f32>(10);
    assert_eq!(reader.read(&mut buffer).unwrap(), 0);
}

// === Error Tests ===

#[test]
fn test_open_missing_file() {
    let err = WaveReader::open("notexisting.wav").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error opening 'notexisting.wav': System error."
    );
}

#[test]
fn test_create_in_missing_directory() {
    let err = WaveWriter::create("/badpath/file.wav", WriterOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error opening '/badpath/file.wav': System error."
    );
}

#[test]
fn test_open_non_audio_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "notes.wav");
    std::fs::write(&path, "Some text, definitely not a sound file.\n").unwrap();

    let err = WaveReader::open(&path).unwrap_err();
    assert_eq!(err.error_code(), "OPEN_ERROR");
    let message = err.to_string();
    assert!(message.starts_with(&format!("Error opening '{}': ", path.display())));
    #[cfg(not(feature = "libsndfile"))]
    assert!(message.ends_with("Format not recognised."));
}

#[test]
fn test_read_channel_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "four.wav");
    save(&path, &create_signal(4, 10), 44100).unwrap();

    let mut reader = WaveReader::open(&path).unwrap();
    let mut buffer = SampleBuffer::<f32>::new(2, 10);
    let err = reader.read(&mut buffer).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Buffer has room for 2 channels, wave file has 4 channels"
    );
}

#[test]
fn test_read_into_planar_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "planar.wav");
    save(&path, &create_signal(4, 10), 44100).unwrap();

    let mut reader = WaveReader::open(&path).unwrap();
    let mut buffer = SampleBuffer::from_planar(4, vec![0.0f32; 40]).unwrap();
    let err = reader.read(&mut buffer).unwrap_err();
    assert!(matches!(err, WavefileError::BufferLayout));
    assert_eq!(
        err.to_string(),
        "Buffer storage be column-major order. Consider using buffer(size)"
    );
}

#[test]
fn test_scoped_reader_closes_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "scoped.wav");
    create_counter_file(&path, 10);

    let result: wavefile::Result<usize> = with_reader(&path, |reader| {
        let mut wrong = SampleBuffer::<f32>::new(2, 4);
        reader.read(&mut wrong)
    });
    assert!(matches!(
        result,
        Err(WavefileError::ChannelMismatch { buffer: 2, file: 1 })
    ));

    // The file is released and can be replaced
    create_counter_file(&path, 5);
    assert_eq!(WaveReader::open(&path).unwrap().frames(), 5);
}

// === Metadata Tests ===

#[test]
fn test_title_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "title.wav");

    let mut writer = WaveWriter::create(&path, WriterOptions::default()).unwrap();
    writer.metadata().unwrap().set("title", "mytitle").unwrap();
    writer.close().unwrap();

    let reader = WaveReader::open(&path).unwrap();
    assert_eq!(
        reader.metadata().unwrap().get("title").unwrap(),
        Some("mytitle".to_string())
    );
}

#[test]
fn test_all_tags_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "tags.wav");

    with_writer(&path, WriterOptions::default(), |writer| {
        let mut tags = writer.metadata()?;
        for tag in Tag::ALL {
            tags.try_set_tag(tag, &format!("my{}", tag.name()))?;
        }
        writer.write(&create_signal(1, 33))
    })
    .unwrap();

    with_reader(&path, |reader| {
        let metadata = reader.metadata()?;
        for tag in Tag::ALL {
            assert_eq!(metadata.get_tag(tag), Some(format!("my{}", tag.name())));
        }
        assert_eq!(reader.frames(), 33);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_unset_tags_are_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "untagged.wav");
    create_counter_file(&path, 10);

    let reader = WaveReader::open(&path).unwrap();
    let metadata = reader.metadata().unwrap();
    for tag in Tag::ALL {
        assert_eq!(metadata.get(tag.name()).unwrap(), None);
    }
    assert_eq!(metadata.iter().count(), 0);
}

#[test]
fn test_metadata_iter_in_tag_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "order.wav");

    with_writer(&path, WriterOptions::default(), |writer| {
        let mut tags = writer.metadata()?;
        tags.set("genre", "noise")?;
        tags.set("artist", "The Artists")?;
        tags.set("title", "Some Noise")?;
        Ok(())
    })
    .unwrap();

    let reader = WaveReader::open(&path).unwrap();
    let tags: Vec<(Tag, String)> = reader.metadata().unwrap().iter().collect();
    assert_eq!(
        tags,
        vec![
            (Tag::Title, "Some Noise".to_string()),
            (Tag::Artist, "The Artists".to_string()),
            (Tag::Genre, "noise".to_string()),
        ]
    );
}

#[test]
fn test_unknown_tag_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "illegal.wav");
    create_counter_file(&path, 10);

    let reader = WaveReader::open(&path).unwrap();
    let err = reader.metadata().unwrap().get("illegalAttribute").unwrap_err();
    match err {
        WavefileError::UnknownTag(name) => assert_eq!(name, "illegalAttribute"),
        other => panic!("Expected UnknownTag error, got: {:?}", other),
    }

    let mut writer = WaveWriter::create(scratch(&dir, "other.wav"), WriterOptions::default()).unwrap();
    assert!(matches!(
        writer.metadata().unwrap().set("illegalAttribute", "value"),
        Err(WavefileError::UnknownTag(_))
    ));
}

#[test]
fn test_unicode_tag_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, "unicode-tags.wav");

    with_writer(&path, WriterOptions::default(), |writer| {
        writer.metadata()?.set("comment", "语言 Языку ünïcödé €")
    })
    .unwrap();

    let reader = WaveReader::open(&path).unwrap();
    assert_eq!(
        reader.metadata().unwrap().get_tag(Tag::Comment).as_deref(),
        Some("语言 Языку ünïcödé €")
    );
}

// === File Name Tests ===

#[test_case("file€.wav" ; "euro sign")]
#[test_case("语言Языку.wav" ; "mixed scripts")]
#[test_case("ñandú.wav" ; "latin accents")]
fn test_unicode_file_names(name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch(&dir, name);
    let text = path.to_str().unwrap().to_string();

    create_counter_file(Path::new(&text), 10);
    let reader = WaveReader::open(text.as_str()).unwrap();
    assert_eq!(reader.frames(), 10);
    assert_eq!(reader.name().to_string(), text);

    // Already-encoded names pass through unchanged
    let bytes = FileName::from(text.as_bytes().to_vec());
    let reader = WaveReader::open(bytes).unwrap();
    assert_eq!(reader.frames(), 10);
}

// === Format Tests ===

#[test]
fn test_describe_formats() {
    let description = describe(FormatCode::WAV | FormatCode::PCM_16).unwrap();
    assert_eq!(description.name.as_deref(), Some("WAV (Microsoft)"));
    assert_eq!(description.subtype.as_deref(), Some("Signed 16 bit PCM"));
    assert_eq!(description.extension.as_deref(), Some("wav"));

    let subtype_only = describe(FormatCode::FLOAT).unwrap();
    assert_eq!(subtype_only.name, None);
    assert_eq!(subtype_only.subtype.as_deref(), Some("32 bit float"));

    assert!(matches!(
        describe(FormatCode::new(0x0029_0000)),
        Err(WavefileError::UnknownFormatCode(_))
    ));
}

#[test]
fn test_check_format_is_stable() {
    let code = FormatCode::WAV | FormatCode::PCM_16;
    assert!(check_format(code, 2, 44100));
    assert!(check_format(code, 2, 44100));
    assert!(!check_format(code, 0, 44100));
    assert!(!check_format(FormatCode::new(0x0029_0002), 2, 44100));
}

#[test]
fn test_oversized_stream_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let options = WriterOptions::new(4_000_000, 2000, FormatCode::WAV | FormatCode::FLOAT);
    assert!(!options.is_supported());
    assert!(!check_format(options.format, 2000, 4_000_000));

    let err = WaveWriter::create(scratch(&dir, "huge.wav"), options).unwrap_err();
    assert_eq!(err.error_code(), "OPEN_ERROR");
}

#[test]
#[cfg(not(feature = "libsndfile"))]
fn test_common_formats_of_builtin_engine() {
    let names: Vec<String> = wavefile::common_formats().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec![
            "WAV (Microsoft 16 bit PCM)".to_string(),
            "WAV (Microsoft 8 bit PCM)".to_string(),
            "WAV (Microsoft 32 bit float)".to_string(),
        ]
    );

    let all: Vec<String> = wavefile::all_formats().map(|r| r.name).collect();
    assert_eq!(
        all,
        vec![
            "WAV (Microsoft) Signed 16 bit PCM".to_string(),
            "WAV (Microsoft) Signed 24 bit PCM".to_string(),
            "WAV (Microsoft) Signed 32 bit PCM".to_string(),
            "WAV (Microsoft) Unsigned 8 bit PCM".to_string(),
            "WAV (Microsoft) 32 bit float".to_string(),
        ]
    );
}

#[test]
fn test_major_formats_start_with_wav() {
    let first = wavefile::major_formats().next().unwrap();
    assert_eq!(first.format, FormatCode::WAV);
    assert_eq!(first.name, "WAV (Microsoft)");
    assert_eq!(first.extension.as_deref(), Some("wav"));
}
