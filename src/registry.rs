use crate::boxes::{BoxBody, BoxKey, FourCC};
use crate::error::Result;
use crate::movie::{
    AudioSampleEntry, HandlerBox, HintSampleEntry, MediaHeader, MovieHeader, SampleDescription,
    TrackHeader, VisualSampleEntry,
};
use crate::parser::BoxReader;
use std::collections::HashMap;

/// Trait for box decoders.
///
/// A decoder consumes the payload of one box through the [`BoxReader`] and
/// returns its body. It must leave exactly zero bytes unread: either decode
/// them, parse them as children, or skip them explicitly.
pub trait BoxDecoder: Send + Sync {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody>;
}

/// Registry of decoders keyed by `BoxKey` (4CC or UUID).
///
/// The registry is immutable once constructed; use [`Registry::with_decoder`]
/// to build it fluently. Keys without a decoder fall back to
/// [`OpaqueDecoder`].
pub struct Registry {
    map: HashMap<BoxKey, BoxDecoderEntry>,
}

struct BoxDecoderEntry {
    inner: Box<dyn BoxDecoder>,
    name: String,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Return a new registry with the given decoder added.
    ///
    /// `name` is human-readable and used for logging and reports.
    pub fn with_decoder(mut self, key: BoxKey, name: &str, dec: Box<dyn BoxDecoder>) -> Self {
        self.map.insert(
            key,
            BoxDecoderEntry {
                inner: dec,
                name: name.to_string(),
            },
        );
        self
    }

    pub fn contains(&self, key: &BoxKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn name_of(&self, key: &BoxKey) -> Option<&str> {
        self.map.get(key).map(|d| d.name.as_str())
    }

    /// Decoder for `key`; never fails.
    pub fn decoder_for(&self, key: &BoxKey) -> &dyn BoxDecoder {
        match self.map.get(key) {
            Some(d) => d.inner.as_ref(),
            None => &OpaqueDecoder,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------- Decoders ----------

/// Records geometry only and skips the payload.
pub struct OpaqueDecoder;

impl BoxDecoder for OpaqueDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        log::debug!(
            "box '{}' at {:#x}: no decoder, skipping {} bytes",
            r.typ(),
            r.offset(),
            r.remaining()
        );
        r.skip_remaining()?;
        Ok(BoxBody::Opaque)
    }
}

/// Payload is nothing but child boxes.
pub struct ContainerDecoder;

impl BoxDecoder for ContainerDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        r.parse_children()?;
        Ok(BoxBody::Container)
    }
}

pub struct MvhdDecoder;

impl BoxDecoder for MvhdDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        Ok(BoxBody::MovieHeader(MovieHeader::parse(r)?))
    }
}

pub struct TkhdDecoder;

impl BoxDecoder for TkhdDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        Ok(BoxBody::TrackHeader(TrackHeader::parse(r)?))
    }
}

pub struct MdhdDecoder;

impl BoxDecoder for MdhdDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        Ok(BoxBody::MediaHeader(MediaHeader::parse(r)?))
    }
}

pub struct HdlrDecoder;

impl BoxDecoder for HdlrDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        Ok(BoxBody::Handler(HandlerBox::parse(r)?))
    }
}

pub struct StsdDecoder;

impl BoxDecoder for StsdDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        Ok(BoxBody::SampleDescription(SampleDescription::parse(r)?))
    }
}

/// Sample entry decoders. These are not registered by 4CC: the sample
/// description picks one per entry from the track's handler type.
pub struct VisualSampleEntryDecoder;

impl BoxDecoder for VisualSampleEntryDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        Ok(BoxBody::VisualSampleEntry(VisualSampleEntry::parse(r)?))
    }
}

pub struct AudioSampleEntryDecoder;

impl BoxDecoder for AudioSampleEntryDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        Ok(BoxBody::AudioSampleEntry(AudioSampleEntry::parse(r)?))
    }
}

pub struct HintSampleEntryDecoder;

impl BoxDecoder for HintSampleEntryDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> Result<BoxBody> {
        Ok(BoxBody::HintSampleEntry(HintSampleEntry::parse(r)?))
    }
}

/// Sample entry decoder for a track handler type.
pub fn sample_entry_decoder(handler: Option<FourCC>) -> &'static dyn BoxDecoder {
    match handler.as_ref().map(|h| &h.0) {
        Some(b"soun") => &AudioSampleEntryDecoder,
        Some(b"vide") => &VisualSampleEntryDecoder,
        Some(b"hint") => &HintSampleEntryDecoder,
        _ => &OpaqueDecoder,
    }
}

// ---------- Default registry ----------

const CONTAINERS: &[&[u8; 4]] = &[
    b"moov", b"trak", b"mdia", b"minf", b"stbl", b"dinf", b"edts", b"mvex", b"udta", b"moof",
    b"traf", b"mfra",
];

pub fn default_registry() -> Registry {
    let mut reg = Registry::new();
    for &cc in CONTAINERS {
        let name = FourCC(*cc).to_string();
        reg = reg.with_decoder(BoxKey::FourCC(FourCC(*cc)), &name, Box::new(ContainerDecoder));
    }

    reg.with_decoder(
        BoxKey::FourCC(FourCC(*b"mvhd")),
        "mvhd",
        Box::new(MvhdDecoder),
    )
    .with_decoder(
        BoxKey::FourCC(FourCC(*b"tkhd")),
        "tkhd",
        Box::new(TkhdDecoder),
    )
    .with_decoder(
        BoxKey::FourCC(FourCC(*b"mdhd")),
        "mdhd",
        Box::new(MdhdDecoder),
    )
    .with_decoder(
        BoxKey::FourCC(FourCC(*b"hdlr")),
        "hdlr",
        Box::new(HdlrDecoder),
    )
    .with_decoder(
        BoxKey::FourCC(FourCC(*b"stsd")),
        "stsd",
        Box::new(StsdDecoder),
    )
}
