//! Audio playability negotiation.

use stowage_core::alloc::HashSet;

use crate::kind::extension;

/// MIME queries used to probe a platform for each audio extension.
pub const AUDIO_MIME_TYPES: [(&str, &str); 5] = [
    ("wav", "audio/wav; codecs=\"1\""),
    ("mp3", "audio/mpeg;"),
    ("ogg", "audio/ogg; codecs=\"vorbis\""),
    ("aac", "audio/aac;"),
    ("m4a", "audio/x-m4a;"),
];

/// The set of audio extensions the runtime can play.
///
/// Built once at startup and handed to the loader; lookups ignore ASCII case.
#[derive(Debug, Clone, Default)]
pub struct AudioCapabilities {
    playable: HashSet<String>,
}

impl AudioCapabilities {
    /// Capabilities from an explicit list of playable extensions.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            playable: extensions
                .into_iter()
                .map(|ext| ext.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// A runtime that plays nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Ask the platform about each known format through `can_play`, which
    /// receives a MIME query and reports whether it is playable.
    ///
    /// `m4a` falls back to the `aac` answer when the platform does not
    /// recognise it directly.
    pub fn probe(can_play: impl Fn(&str) -> bool) -> Self {
        let mut playable = HashSet::default();
        for (ext, mime) in AUDIO_MIME_TYPES {
            if can_play(mime) {
                playable.insert(ext.to_string());
            }
        }
        if playable.contains("aac") {
            playable.insert("m4a".to_string());
        }
        tracing::debug!(formats = ?playable, "probed audio capabilities");
        Self { playable }
    }

    /// Check if the runtime can play files with this extension.
    pub fn can_play(&self, extension: &str) -> bool {
        self.playable.contains(&extension.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.playable.is_empty()
    }

    /// Pick the first candidate whose extension is playable, in candidate order.
    pub fn negotiate<'a, S: AsRef<str>>(&self, candidates: &'a [S]) -> Option<&'a str> {
        candidates
            .iter()
            .map(AsRef::as_ref)
            .find(|candidate| self.can_play(extension(candidate)))
    }
}
