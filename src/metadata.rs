//! Metadata Store
//!
//! Text tags (title, artist, ...) attached to an open stream. The set of
//! tag names is closed: asking for a name outside it is an error, while a
//! known tag that is simply not set reads back as `None`.
//!
//! Values cross the engine boundary as UTF-8.

use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::engine::{Engine, EngineHandle, FileName};
use crate::error::{Result, WavefileError};

// ============================================================================
// Tags
// ============================================================================

/// A text tag the engine can store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Title,
    Copyright,
    Software,
    Artist,
    Comment,
    Date,
    Album,
    License,
    TrackNumber,
    Genre,
}

impl Tag {
    /// Every tag, in definition order
    pub const ALL: [Tag; 10] = [
        Tag::Title,
        Tag::Copyright,
        Tag::Software,
        Tag::Artist,
        Tag::Comment,
        Tag::Date,
        Tag::Album,
        Tag::License,
        Tag::TrackNumber,
        Tag::Genre,
    ];

    /// Engine string id
    pub fn id(self) -> i32 {
        match self {
            Tag::Title => 0x01,
            Tag::Copyright => 0x02,
            Tag::Software => 0x03,
            Tag::Artist => 0x04,
            Tag::Comment => 0x05,
            Tag::Date => 0x06,
            Tag::Album => 0x07,
            Tag::License => 0x08,
            Tag::TrackNumber => 0x09,
            Tag::Genre => 0x10,
        }
    }

    /// Lowercase name used to address the tag
    pub fn name(self) -> &'static str {
        match self {
            Tag::Title => "title",
            Tag::Copyright => "copyright",
            Tag::Software => "software",
            Tag::Artist => "artist",
            Tag::Comment => "comment",
            Tag::Date => "date",
            Tag::Album => "album",
            Tag::License => "license",
            Tag::TrackNumber => "tracknumber",
            Tag::Genre => "genre",
        }
    }

    pub fn from_name(name: &str) -> Option<Tag> {
        Tag::ALL.into_iter().find(|tag| tag.name() == name)
    }
}

impl FromStr for Tag {
    type Err = WavefileError;

    fn from_str(name: &str) -> Result<Tag> {
        Tag::from_name(name).ok_or_else(|| WavefileError::UnknownTag(name.to_string()))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode(raw: Vec<u8>) -> String {
    String::from_utf8(raw).unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

// ============================================================================
// Views
// ============================================================================

/// Read access to the tags of an open stream
#[derive(Clone, Copy)]
pub struct Metadata<'a> {
    handle: &'a (dyn EngineHandle + 'static),
}

impl<'a> Metadata<'a> {
    pub(crate) fn new(handle: &'a (dyn EngineHandle + 'static)) -> Self {
        Self { handle }
    }

    /// Value of the tag called `name`
    ///
    /// # Errors
    /// * `UnknownTag` - if `name` is not one of the recognised tag names
    pub fn get(&self, name: &str) -> Result<Option<String>> {
        let tag: Tag = name.parse()?;
        Ok(self.get_tag(tag))
    }

    /// Value of `tag`, `None` if unset
    pub fn get_tag(&self, tag: Tag) -> Option<String> {
        self.handle.get_string(tag).map(decode)
    }

    /// The tags that are set, in definition order
    pub fn iter(&self) -> MetadataIter<'a> {
        MetadataIter {
            handle: self.handle,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for Metadata<'a> {
    type Item = (Tag, String);
    type IntoIter = MetadataIter<'a>;

    fn into_iter(self) -> MetadataIter<'a> {
        self.iter()
    }
}

impl fmt::Debug for Metadata<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over set tags, see [`Metadata::iter`]
pub struct MetadataIter<'a> {
    handle: &'a (dyn EngineHandle + 'static),
    index: usize,
}

impl Iterator for MetadataIter<'_> {
    type Item = (Tag, String);

    fn next(&mut self) -> Option<(Tag, String)> {
        while self.index < Tag::ALL.len() {
            let tag = Tag::ALL[self.index];
            self.index += 1;
            if let Some(raw) = self.handle.get_string(tag) {
                return Some((tag, decode(raw)));
            }
        }
        None
    }
}

/// Read/write access to the tags of a stream open for writing
pub struct MetadataMut<'a> {
    handle: &'a mut (dyn EngineHandle + 'static),
    engine: &'static dyn Engine,
    name: &'a FileName,
}

impl<'a> MetadataMut<'a> {
    pub(crate) fn new(
        handle: &'a mut (dyn EngineHandle + 'static),
        engine: &'static dyn Engine,
        name: &'a FileName,
    ) -> Self {
        Self {
            handle,
            engine,
            name,
        }
    }

    /// Read-only view of the same tags
    pub fn view(&self) -> Metadata<'_> {
        Metadata::new(&*self.handle)
    }

    pub fn get(&self, name: &str) -> Result<Option<String>> {
        self.view().get(name)
    }

    pub fn get_tag(&self, tag: Tag) -> Option<String> {
        self.view().get_tag(tag)
    }

    pub fn iter(&self) -> MetadataIter<'_> {
        self.view().iter()
    }

    /// Set the tag called `name`
    ///
    /// If the engine refuses the tag for the current container, the
    /// refusal is logged and the call still succeeds, so the rest of the
    /// tags and the audio payload can be written. Use [`try_set`] to get
    /// the refusal as an error instead.
    ///
    /// # Errors
    /// * `UnknownTag` - if `name` is not one of the recognised tag names
    ///
    /// [`try_set`]: MetadataMut::try_set
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let tag: Tag = name.parse()?;
        self.set_tag(tag, value);
        Ok(())
    }

    /// Set `tag`, logging an engine refusal
    pub fn set_tag(&mut self, tag: Tag, value: &str) {
        if let Err(err) = self.try_set_tag(tag, value) {
            warn!("{}: {}", self.name, err);
        }
    }

    /// Set the tag called `name`, failing if the engine refuses it
    pub fn try_set(&mut self, name: &str, value: &str) -> Result<()> {
        let tag: Tag = name.parse()?;
        self.try_set_tag(tag, value)
    }

    pub fn try_set_tag(&mut self, tag: Tag, value: &str) -> Result<()> {
        self.handle
            .set_string(tag, value.as_bytes())
            .map_err(|code| WavefileError::TagRejected {
                tag: tag.name(),
                reason: self.engine.error_message(code),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_round_trip() {
        for tag in Tag::ALL {
            assert_eq!(tag.name().parse::<Tag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_name() {
        let err = "illegalAttribute".parse::<Tag>().unwrap_err();
        match err {
            WavefileError::UnknownTag(name) => assert_eq!(name, "illegalAttribute"),
            other => panic!("Expected UnknownTag error, got: {:?}", other),
        }
    }

    #[test]
    fn test_tag_names_are_case_sensitive() {
        assert!(Tag::from_name("Title").is_none());
        assert_eq!(Tag::from_name("tracknumber"), Some(Tag::TrackNumber));
    }

    #[test]
    fn test_tag_ids() {
        assert_eq!(Tag::Title.id(), 1);
        assert_eq!(Tag::License.id(), 8);
        assert_eq!(Tag::TrackNumber.id(), 9);
        assert_eq!(Tag::Genre.id(), 0x10);
    }

    #[test]
    fn test_decode_falls_back_to_lossy() {
        assert_eq!(decode(b"mytitle".to_vec()), "mytitle");
        assert_eq!(decode("€".as_bytes().to_vec()), "€");
        assert_eq!(decode(vec![b'a', 0xff]), "a\u{fffd}");
    }
}
