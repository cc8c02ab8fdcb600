//! RIFF `LIST/INFO` chunk
//!
//! hound only deals with `fmt ` and `data`, so tags are handled here: the
//! reader walks the top-level chunk list once on open, the writer appends
//! one `LIST` chunk after hound has finalised the file and then patches
//! the RIFF size.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::metadata::Tag;

/// Raw tag values keyed by tag
pub type InfoTags = BTreeMap<Tag, Vec<u8>>;

/// Why a chunk scan failed
#[derive(Debug)]
pub enum ScanError {
    /// Not a RIFF/WAVE stream
    NotRiff,
    Io(io::Error),
}

impl From<io::Error> for ScanError {
    fn from(err: io::Error) -> Self {
        ScanError::Io(err)
    }
}

/// INFO sub-chunk id of a tag
pub fn fourcc(tag: Tag) -> [u8; 4] {
    match tag {
        Tag::Title => *b"INAM",
        Tag::Copyright => *b"ICOP",
        Tag::Software => *b"ISFT",
        Tag::Artist => *b"IART",
        Tag::Comment => *b"ICMT",
        Tag::Date => *b"ICRD",
        Tag::Album => *b"IPRD",
        Tag::License => *b"ILIC",
        Tag::TrackNumber => *b"ITRK",
        Tag::Genre => *b"IGNR",
    }
}

fn tag_for(id: &[u8; 4]) -> Option<Tag> {
    Tag::ALL.into_iter().find(|tag| &fourcc(*tag) == id)
}

/// `Ok(false)` on a clean end of stream
fn read_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}

/// Walk the top-level chunks of a RIFF/WAVE stream and collect INFO tags
///
/// Truncated trailing chunks end the scan without an error, the audio is
/// still readable in that case.
pub fn read_info_tags<R: Read + Seek>(reader: &mut R) -> Result<InfoTags, ScanError> {
    let mut header = [0u8; 12];
    if !read_or_eof(reader, &mut header)? {
        return Err(ScanError::NotRiff);
    }
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return Err(ScanError::NotRiff);
    }

    let mut tags = InfoTags::new();
    let mut chunk = [0u8; 8];
    while read_or_eof(reader, &mut chunk)? {
        let id = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let size = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]) as u64;
        let padded = size + (size & 1);

        if &id == b"LIST" {
            let mut body = Vec::new();
            (&mut *reader).take(size).read_to_end(&mut body)?;
            if (body.len() as u64) < size {
                break;
            }
            parse_list(&body, &mut tags);
            if size & 1 == 1 {
                reader.seek(SeekFrom::Current(1))?;
            }
        } else {
            reader.seek(SeekFrom::Current(padded as i64))?;
        }
    }
    Ok(tags)
}

fn parse_list(body: &[u8], tags: &mut InfoTags) {
    if body.len() < 4 || &body[0..4] != b"INFO" {
        return;
    }
    let mut cursor = Cursor::new(&body[4..]);
    loop {
        let mut id = [0u8; 4];
        if cursor.read_exact(&mut id).is_err() {
            break;
        }
        let size = match cursor.read_u32::<LittleEndian>() {
            Ok(size) => size as usize,
            Err(_) => break,
        };
        let remaining = cursor.get_ref().len() - cursor.position() as usize;
        if size > remaining {
            break;
        }
        let mut value = vec![0u8; size];
        if cursor.read_exact(&mut value).is_err() {
            break;
        }
        if size & 1 == 1 {
            cursor.set_position(cursor.position() + 1);
        }
        while value.last() == Some(&0) {
            value.pop();
        }
        if let Some(tag) = tag_for(&id) {
            tags.insert(tag, value);
        }
    }
}

/// Serialise tags as a complete `LIST` chunk
pub fn encode_list(tags: &InfoTags) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    body.extend_from_slice(b"INFO");
    for (tag, value) in tags {
        let len = value.len() + 1;
        body.extend_from_slice(&fourcc(*tag));
        body.write_u32::<LittleEndian>(chunk_size(len)?)?;
        body.extend_from_slice(value);
        body.push(0);
        if len & 1 == 1 {
            body.push(0);
        }
    }

    let mut chunk = Vec::with_capacity(body.len() + 8);
    chunk.extend_from_slice(b"LIST");
    chunk.write_u32::<LittleEndian>(chunk_size(body.len())?)?;
    chunk.extend_from_slice(&body);
    Ok(chunk)
}

fn chunk_size(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "chunk exceeds the RIFF size limit")
    })
}

/// Append a `LIST/INFO` chunk to a finished RIFF/WAVE file
pub fn append_info_chunk(path: &Path, tags: &InfoTags) -> io::Result<()> {
    if tags.is_empty() {
        return Ok(());
    }
    let chunk = encode_list(tags)?;

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut end = file.seek(SeekFrom::End(0))?;
    if end & 1 == 1 {
        file.write_all(&[0])?;
        end += 1;
    }
    file.write_all(&chunk)?;

    let riff_size = end + chunk.len() as u64 - 8;
    let riff_size = u32::try_from(riff_size).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "file exceeds the RIFF size limit")
    })?;
    file.seek(SeekFrom::Start(4))?;
    file.write_u32::<LittleEndian>(riff_size)?;
    file.sync_all()
}
