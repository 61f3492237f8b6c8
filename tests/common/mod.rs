#![allow(dead_code)]

//! Builders for synthetic box byte streams.

pub const IDENTITY: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

pub fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

pub fn full(typ: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut p = vec![version];
    p.extend_from_slice(&flags.to_be_bytes()[1..]);
    p.extend_from_slice(payload);
    bx(typ, &p)
}

pub fn container(typ: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    bx(typ, &children.concat())
}

fn matrix(p: &mut Vec<u8>) {
    for m in IDENTITY {
        p.extend_from_slice(&m.to_be_bytes());
    }
}

pub fn mvhd_v0(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&3_000_000_000u32.to_be_bytes()); // creation
    p.extend_from_slice(&3_000_000_100u32.to_be_bytes()); // modification
    p.extend_from_slice(&timescale.to_be_bytes());
    p.extend_from_slice(&duration.to_be_bytes());
    p.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate
    p.extend_from_slice(&0x0100u16.to_be_bytes()); // volume
    p.extend_from_slice(&[0u8; 10]);
    matrix(&mut p);
    p.extend_from_slice(&[0u8; 24]);
    p.extend_from_slice(&2u32.to_be_bytes()); // next track id
    full(b"mvhd", 0, 0, &p)
}

pub fn mvhd_v1(timescale: u32, duration: u64) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0x0000_0001_0000_0000u64.to_be_bytes());
    p.extend_from_slice(&0x0000_0001_0000_0001u64.to_be_bytes());
    p.extend_from_slice(&timescale.to_be_bytes());
    p.extend_from_slice(&duration.to_be_bytes());
    p.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    p.extend_from_slice(&0x0100u16.to_be_bytes());
    p.extend_from_slice(&[0u8; 10]);
    matrix(&mut p);
    p.extend_from_slice(&[0u8; 24]);
    p.extend_from_slice(&7u32.to_be_bytes());
    full(b"mvhd", 1, 0, &p)
}

pub fn tkhd_v0(track_id: u32, duration: u32, width: u16, height: u16) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(&track_id.to_be_bytes());
    p.extend_from_slice(&[0u8; 4]);
    p.extend_from_slice(&duration.to_be_bytes());
    p.extend_from_slice(&[0u8; 8]);
    p.extend_from_slice(&0u16.to_be_bytes()); // layer
    p.extend_from_slice(&0u16.to_be_bytes()); // alternate group
    p.extend_from_slice(&0u16.to_be_bytes()); // volume
    p.extend_from_slice(&[0u8; 2]);
    matrix(&mut p);
    p.extend_from_slice(&((width as u32) << 16).to_be_bytes());
    p.extend_from_slice(&((height as u32) << 16).to_be_bytes());
    full(b"tkhd", 0, 3, &p)
}

pub fn mdhd(version: u8, timescale: u32, duration: u64, language: u16) -> Vec<u8> {
    let mut p = Vec::new();
    if version == 1 {
        p.extend_from_slice(&0u64.to_be_bytes());
        p.extend_from_slice(&0u64.to_be_bytes());
        p.extend_from_slice(&timescale.to_be_bytes());
        p.extend_from_slice(&duration.to_be_bytes());
    } else {
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&0u32.to_be_bytes());
        p.extend_from_slice(&timescale.to_be_bytes());
        p.extend_from_slice(&(duration as u32).to_be_bytes());
    }
    p.extend_from_slice(&language.to_be_bytes());
    p.extend_from_slice(&[0u8; 2]);
    full(b"mdhd", version, 0, &p)
}

/// `name` is written verbatim, terminator included if the caller wants one.
pub fn hdlr(handler: &[u8; 4], name: &[u8]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 4]);
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]);
    p.extend_from_slice(name);
    full(b"hdlr", 0, 0, &p)
}

pub fn visual_entry(typ: &[u8; 4], width: u16, height: u16, compressor: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 6]);
    p.extend_from_slice(&1u16.to_be_bytes()); // data reference index
    p.extend_from_slice(&[0u8; 16]);
    p.extend_from_slice(&width.to_be_bytes());
    p.extend_from_slice(&height.to_be_bytes());
    p.extend_from_slice(&0x0048_0000u32.to_be_bytes());
    p.extend_from_slice(&0x0048_0000u32.to_be_bytes());
    p.extend_from_slice(&[0u8; 4]);
    p.extend_from_slice(&1u16.to_be_bytes()); // frame count
    let mut name = [0u8; 32];
    name[0] = compressor.len() as u8;
    name[1..=compressor.len()].copy_from_slice(compressor.as_bytes());
    p.extend_from_slice(&name);
    p.extend_from_slice(&0x0018u16.to_be_bytes()); // depth
    p.extend_from_slice(&0xFFFFu16.to_be_bytes());
    bx(typ, &p)
}

pub fn audio_entry(typ: &[u8; 4], channels: u16, sample_size: u16, rate_hz: u16) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 6]);
    p.extend_from_slice(&1u16.to_be_bytes());
    p.extend_from_slice(&[0u8; 8]);
    p.extend_from_slice(&channels.to_be_bytes());
    p.extend_from_slice(&sample_size.to_be_bytes());
    p.extend_from_slice(&[0u8; 4]);
    p.extend_from_slice(&((rate_hz as u32) << 16).to_be_bytes());
    bx(typ, &p)
}

pub fn stsd(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut p = (entries.len() as u32).to_be_bytes().to_vec();
    p.extend_from_slice(&entries.concat());
    full(b"stsd", 0, 0, &p)
}

/// moov > trak > mdia > (hdlr, minf > stbl > stsd)
pub fn track_with_entries(handler: &[u8; 4], entries: &[Vec<u8>]) -> Vec<u8> {
    let stbl = container(b"stbl", &[stsd(entries)]);
    let minf = container(b"minf", &[stbl]);
    let mdia = container(
        b"mdia",
        &[mdhd(0, 48000, 48000, 0x15C7), hdlr(handler, b"Handler\0"), minf],
    );
    let trak = container(b"trak", &[tkhd_v0(1, 1000, 0, 0), mdia]);
    container(b"moov", &[mvhd_v0(1000, 1000), trak])
}
