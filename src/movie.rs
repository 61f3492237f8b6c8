//! Movie, track and media structure boxes plus sample descriptions.

use crate::boxes::{FourCC, FullBoxHeader};
use crate::error::Result;
use crate::fields::{Field, FieldValue, fixed_8_8, fixed_16_16};
use crate::parser::BoxReader;
use crate::registry::sample_entry_decoder;
use crate::util::{format_mp4_time, iso639_2_from_packed15};

pub type Matrix = [[u32; 3]; 3];

fn read_matrix(r: &mut BoxReader<'_, '_>) -> Result<Matrix> {
    let mut m = [[0u32; 3]; 3];
    for row in m.iter_mut() {
        for cell in row.iter_mut() {
            *cell = r.read_u32()?;
        }
    }
    Ok(m)
}

fn time_fields(creation: u64, modification: u64) -> [Field; 2] {
    [
        Field::formatted(
            "creation time",
            FieldValue::UInt(creation),
            format_mp4_time(creation),
        ),
        Field::formatted(
            "modification time",
            FieldValue::UInt(modification),
            format_mp4_time(modification),
        ),
    ]
}

fn seconds(duration: u64, timescale: u32) -> Option<f64> {
    (timescale != 0).then(|| duration as f64 / timescale as f64)
}

fn duration_field(duration: u64, timescale: u32) -> Field {
    match seconds(duration, timescale) {
        Some(s) => Field::formatted("duration", FieldValue::UInt(duration), format!("{s}s")),
        None => Field::uint("duration", duration),
    }
}

/// `mvhd`
#[derive(Debug, Clone, PartialEq)]
pub struct MovieHeader {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// 16.16 fixed point, 0x00010000 is normal speed.
    pub rate: u32,
    /// 8.8 fixed point.
    pub volume: u16,
    pub matrix: Matrix,
    pub next_track_id: u32,
}

impl MovieHeader {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        let full = r.read_full_box_prefix()?;
        r.require_version(full.version)?;
        let creation_time = r.read_versioned(full.version)?;
        let modification_time = r.read_versioned(full.version)?;
        let timescale = r.read_u32()?;
        let duration = r.read_versioned(full.version)?;
        let rate = r.read_u32()?;
        let volume = r.read_u16()?;
        // reserved u16 + u32[2]
        r.skip(2 + 8)?;
        let matrix = read_matrix(r)?;
        // pre_defined u32[6]
        r.skip(24)?;
        let next_track_id = r.read_u32()?;
        Ok(Self {
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            rate,
            volume,
            matrix,
            next_track_id,
        })
    }

    /// Duration in seconds, `None` when the timescale is zero.
    pub fn duration_secs(&self) -> Option<f64> {
        seconds(self.duration, self.timescale)
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut f = self.full.fields();
        f.extend(time_fields(self.creation_time, self.modification_time));
        f.push(Field::uint("timescale", self.timescale));
        f.push(duration_field(self.duration, self.timescale));
        f.push(Field::formatted(
            "rate",
            FieldValue::hex32(self.rate),
            fixed_16_16(self.rate),
        ));
        f.push(Field::formatted(
            "volume",
            FieldValue::hex16(self.volume),
            fixed_8_8(self.volume),
        ));
        f.push(Field::new("matrix", FieldValue::Matrix(self.matrix)));
        f.push(Field::uint("next track id", self.next_track_id));
        f
    }
}

/// `tkhd`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackHeader {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    /// In the movie timescale.
    pub duration: u64,
    pub layer: u16,
    pub alternate_group: u16,
    pub volume: u16,
    pub matrix: Matrix,
    /// 16.16 fixed point.
    pub width: u32,
    /// 16.16 fixed point.
    pub height: u32,
}

impl TrackHeader {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        let full = r.read_full_box_prefix()?;
        r.require_version(full.version)?;
        let creation_time = r.read_versioned(full.version)?;
        let modification_time = r.read_versioned(full.version)?;
        let track_id = r.read_u32()?;
        r.skip(4)?;
        let duration = r.read_versioned(full.version)?;
        r.skip(8)?;
        let layer = r.read_u16()?;
        let alternate_group = r.read_u16()?;
        let volume = r.read_u16()?;
        r.skip(2)?;
        let matrix = read_matrix(r)?;
        let width = r.read_u32()?;
        let height = r.read_u32()?;
        Ok(Self {
            full,
            creation_time,
            modification_time,
            track_id,
            duration,
            layer,
            alternate_group,
            volume,
            matrix,
            width,
            height,
        })
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut f = self.full.fields();
        f.extend(time_fields(self.creation_time, self.modification_time));
        f.push(Field::uint("track id", self.track_id));
        f.push(Field::uint("duration", self.duration));
        f.push(Field::new("layer", FieldValue::hex16(self.layer)));
        f.push(Field::new(
            "alternate group",
            FieldValue::hex16(self.alternate_group),
        ));
        f.push(Field::formatted(
            "volume",
            FieldValue::hex16(self.volume),
            fixed_8_8(self.volume),
        ));
        f.push(Field::new("matrix", FieldValue::Matrix(self.matrix)));
        f.push(Field::formatted(
            "width",
            FieldValue::UInt(self.width as u64),
            fixed_16_16(self.width),
        ));
        f.push(Field::formatted(
            "height",
            FieldValue::UInt(self.height as u64),
            fixed_16_16(self.height),
        ));
        f
    }
}

/// `mdhd`
#[derive(Debug, Clone, PartialEq)]
pub struct MediaHeader {
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// Packed ISO-639-2/T code, low 15 bits only.
    pub language: u16,
}

impl MediaHeader {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        let full = r.read_full_box_prefix()?;
        r.require_version(full.version)?;
        let creation_time = r.read_versioned(full.version)?;
        let modification_time = r.read_versioned(full.version)?;
        let timescale = r.read_u32()?;
        let duration = r.read_versioned(full.version)?;
        // top bit is padding
        let language = r.read_u16()? & 0x7FFF;
        r.skip(2)?;
        Ok(Self {
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            language,
        })
    }

    pub fn duration_secs(&self) -> Option<f64> {
        seconds(self.duration, self.timescale)
    }

    pub fn language_code(&self) -> String {
        iso639_2_from_packed15(self.language)
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut f = self.full.fields();
        f.extend(time_fields(self.creation_time, self.modification_time));
        f.push(Field::uint("timescale", self.timescale));
        f.push(duration_field(self.duration, self.timescale));
        f.push(Field::formatted(
            "language",
            FieldValue::UInt(self.language as u64),
            self.language_code(),
        ));
        f
    }
}

/// `hdlr`
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerBox {
    pub full: FullBoxHeader,
    /// Media category of the track, e.g. `vide`, `soun`, `hint`.
    pub handler: FourCC,
    pub name: String,
}

impl HandlerBox {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        let full = r.read_full_box_prefix()?;
        // pre_defined
        r.skip(4)?;
        let handler = r.read_fourcc()?;
        // reserved u32[3]
        r.skip(12)?;

        // NUL-terminated, but the terminator may be missing.
        let mut name = String::new();
        while r.remaining() > 0 {
            let c = r.read_u8()?;
            if c == 0 {
                break;
            }
            name.push(c as char);
        }
        if r.remaining() > 0 {
            log::debug!(
                "hdlr at {:#x}: {} bytes of padding after name",
                r.offset(),
                r.remaining()
            );
            r.skip_remaining()?;
        }

        Ok(Self {
            full,
            handler,
            name,
        })
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut f = self.full.fields();
        f.push(Field::text("handler", self.handler.to_string()));
        let name = if self.name.trim().is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(self.name.clone())
        };
        f.push(Field::new("name", name));
        f
    }
}

/// Fields common to every sample entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleEntry {
    pub data_ref_index: u16,
}

impl SampleEntry {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        r.skip(6)?;
        let data_ref_index = r.read_u16()?;
        Ok(Self { data_ref_index })
    }

    pub fn fields(&self) -> Vec<Field> {
        vec![Field::uint("data reference index", self.data_ref_index)]
    }
}

const COMPRESSOR_NAME_FIELD: u64 = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct VisualSampleEntry {
    pub entry: SampleEntry,
    pub width: u16,
    pub height: u16,
    /// 16.16 fixed point pixels per inch.
    pub horiz_resolution: u32,
    pub vert_resolution: u32,
    pub frame_count: u16,
    pub compressor_name: String,
    pub depth: u16,
}

impl VisualSampleEntry {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        let entry = SampleEntry::parse(r)?;
        // pre_defined u16, reserved u16, pre_defined u32[3]
        r.skip(2 + 2 + 12)?;
        let width = r.read_u16()?;
        let height = r.read_u16()?;
        let horiz_resolution = r.read_u32()?;
        let vert_resolution = r.read_u32()?;
        r.skip(4)?;
        let frame_count = r.read_u16()?;

        // Pascal string in a fixed 32-byte field.
        let declared = r.read_u8()? as u64;
        let len = declared.min(COMPRESSOR_NAME_FIELD - 1);
        if len != declared {
            log::warn!(
                "sample entry at {:#x}: compressor name length {} clamped to {}",
                r.offset(),
                declared,
                len
            );
        }
        let compressor_name = r.read_fixed_string(len)?;
        r.skip(COMPRESSOR_NAME_FIELD - len - 1)?;

        let depth = r.read_u16()?;
        // pre_defined = -1
        r.skip(2)?;
        // codec configuration and other extension boxes
        r.parse_children()?;

        Ok(Self {
            entry,
            width,
            height,
            horiz_resolution,
            vert_resolution,
            frame_count,
            compressor_name,
            depth,
        })
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut f = self.entry.fields();
        f.push(Field::uint("width", self.width));
        f.push(Field::uint("height", self.height));
        f.push(Field::formatted(
            "horizontal resolution",
            FieldValue::hex32(self.horiz_resolution),
            fixed_16_16(self.horiz_resolution),
        ));
        f.push(Field::formatted(
            "vertical resolution",
            FieldValue::hex32(self.vert_resolution),
            fixed_16_16(self.vert_resolution),
        ));
        f.push(Field::uint("frame count", self.frame_count));
        f.push(Field::text("compressor name", self.compressor_name.clone()));
        f.push(Field::uint("depth", self.depth));
        f
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSampleEntry {
    pub entry: SampleEntry,
    pub channel_count: u16,
    pub sample_size: u16,
    /// 16.16 fixed point; the integer part is the rate in Hz.
    pub sample_rate: u32,
}

impl AudioSampleEntry {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        let entry = SampleEntry::parse(r)?;
        r.skip(8)?;
        let channel_count = r.read_u16()?;
        let sample_size = r.read_u16()?;
        // pre_defined u16, reserved u16
        r.skip(4)?;
        let sample_rate = r.read_u32()?;
        r.parse_children()?;
        Ok(Self {
            entry,
            channel_count,
            sample_size,
            sample_rate,
        })
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate >> 16
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut f = self.entry.fields();
        f.push(Field::uint("channel count", self.channel_count));
        f.push(Field::uint("sample size", self.sample_size));
        f.push(Field::formatted(
            "sample rate",
            FieldValue::UInt(self.sample_rate as u64),
            format!("{} Hz", fixed_16_16(self.sample_rate)),
        ));
        f
    }
}

/// Hint track sample entry; everything after the common fields is skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct HintSampleEntry {
    pub entry: SampleEntry,
}

impl HintSampleEntry {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        let entry = SampleEntry::parse(r)?;
        r.skip_remaining()?;
        Ok(Self { entry })
    }

    pub fn fields(&self) -> Vec<Field> {
        self.entry.fields()
    }
}

/// `stsd`. Entries are stored as child boxes of the description.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleDescription {
    pub full: FullBoxHeader,
    pub entry_count: u32,
}

impl SampleDescription {
    pub fn parse(r: &mut BoxReader<'_, '_>) -> Result<Self> {
        let full = r.read_full_box_prefix()?;
        let entry_count = r.read_u32()?;
        for i in 0..entry_count {
            let handler = r.media_handler();
            log::debug!(
                "stsd at {:#x}: entry {} with handler {:?}",
                r.offset(),
                i,
                handler
            );
            r.parse_child_with(sample_entry_decoder(handler))?;
        }
        Ok(Self { full, entry_count })
    }

    pub fn fields(&self) -> Vec<Field> {
        let mut f = self.full.fields();
        f.push(Field::uint("entry count", self.entry_count));
        f
    }
}
