use crate::boxes::FourCC;

/// Typed view over common MP4 / ISOBMFF box tags, used for display names.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level / top-level
    Ftyp,
    Moov,
    Mdat,
    Free,
    Skip,
    Moof,
    Mfra,

    // movie structure
    Mvhd,
    Trak,
    Mvex,
    Udta,
    Tkhd,
    Edts,
    Mdia,
    Mdhd,
    Hdlr,
    Minf,
    Dinf,
    Stbl,
    Traf,

    // sample table
    Stsd,
    Stts,
    Stsc,
    Stsz,
    Stco,
    Co64,
    Stss,

    // sample entries
    Avc1,
    Hvc1,
    Mp4a,

    Uuid,

    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"moov" => KnownBox::Moov,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"skip" => KnownBox::Skip,
            b"moof" => KnownBox::Moof,
            b"mfra" => KnownBox::Mfra,

            b"mvhd" => KnownBox::Mvhd,
            b"trak" => KnownBox::Trak,
            b"mvex" => KnownBox::Mvex,
            b"udta" => KnownBox::Udta,
            b"tkhd" => KnownBox::Tkhd,
            b"edts" => KnownBox::Edts,
            b"mdia" => KnownBox::Mdia,
            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,
            b"dinf" => KnownBox::Dinf,
            b"stbl" => KnownBox::Stbl,
            b"traf" => KnownBox::Traf,

            b"stsd" => KnownBox::Stsd,
            b"stts" => KnownBox::Stts,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,
            b"stss" => KnownBox::Stss,

            b"avc1" => KnownBox::Avc1,
            b"hvc1" => KnownBox::Hvc1,
            b"mp4a" => KnownBox::Mp4a,

            b"uuid" => KnownBox::Uuid,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Skip => "Free Space Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Stsc => "Sample To Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "Chunk Large Offset Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Avc1 => "AVC Sample Entry",
            KnownBox::Hvc1 => "HEVC Sample Entry",
            KnownBox::Mp4a => "MPEG-4 Audio Sample Entry",
            KnownBox::Uuid => "User Extension Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}
