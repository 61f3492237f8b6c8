mod common;

use common::*;
use isobox::{
    BoxBody, BoxDecoder, BoxKey, BoxReader, Entry, ErrorKind, Field, FieldSource, FieldValue,
    FourCC, ParseError, ParseOptions, Parser, Registry, default_registry, parse,
};
use std::any::Any;

/// Appends `extra` bytes to a box and patches its 32-bit size.
fn grow(mut b: Vec<u8>, extra: &[u8]) -> Vec<u8> {
    b.extend_from_slice(extra);
    let size = b.len() as u32;
    b[..4].copy_from_slice(&size.to_be_bytes());
    b
}

#[test]
fn movie_with_header_and_track() {
    let data = container(b"moov", &[mvhd_v0(9000, 90000), tkhd_v0(1, 90000, 640, 480)]);
    let tree = parse(&data).expect("parse failed");

    let moov = tree.roots().next().unwrap();
    assert_eq!(moov.typ(), FourCC::MOOV);
    assert!(matches!(moov.body(), BoxBody::Container));
    assert_eq!(moov.consumed(), moov.size());
    assert_eq!(moov.size(), 8 + 108 + 92);

    let kids: Vec<_> = moov.children().collect();
    assert_eq!(kids.len(), 2);
    assert_eq!(kids[0].typ(), FourCC(*b"mvhd"));
    assert_eq!(kids[1].typ(), FourCC(*b"tkhd"));
    assert_eq!(kids[1].parent().unwrap().id(), moov.id());

    let BoxBody::MovieHeader(h) = kids[0].body() else {
        panic!("expected a movie header");
    };
    assert_eq!(h.duration, 90000);
    assert_eq!(h.duration_secs(), Some(10.0));
    let duration = kids[0]
        .fields()
        .into_iter()
        .find(|f| f.label == "duration")
        .unwrap();
    assert_eq!(duration.formatted.as_deref(), Some("10s"));
}

#[test]
fn every_box_consumes_its_declared_size() {
    let data = track_with_entries(
        b"vide",
        &[visual_entry(b"avc1", 1920, 1080, "encoder")],
    );
    let tree = parse(&data).unwrap();
    assert_eq!(tree.len(), 11);
    for b in tree.iter() {
        assert_eq!(b.consumed(), b.size(), "box {:?}", b);
    }
}

#[test]
fn trailing_bytes_fail_in_strict_mode() {
    let data = grow(mvhd_v0(1000, 1000), &[0xAB]);
    let err = parse(&data).unwrap_err();
    match err {
        ParseError::StructuralMismatch {
            typ,
            declared,
            consumed,
            ..
        } => {
            assert_eq!(typ, FourCC(*b"mvhd"));
            assert_eq!(declared, 109);
            assert_eq!(consumed, 108);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn trailing_bytes_are_skipped_in_lenient_mode() {
    let data = container(b"moov", &[grow(mvhd_v0(1000, 1000), &[0xAB, 0xCD])]);
    let parser = Parser::new().with_options(ParseOptions {
        strict: false,
        ..ParseOptions::default()
    });
    let tree = parser.parse(&data).unwrap();
    let mvhd = tree.find_all(FourCC(*b"mvhd")).next().unwrap();
    assert_eq!(mvhd.size(), 110);
    assert_eq!(mvhd.consumed(), 110);
    assert!(matches!(mvhd.body(), BoxBody::MovieHeader(_)));
}

#[test]
fn over_read_is_fatal_even_when_lenient() {
    // mvhd cut short by 4 bytes
    let mut data = mvhd_v0(1000, 1000);
    data.truncate(104);
    data[..4].copy_from_slice(&104u32.to_be_bytes());
    let parser = Parser::new().with_options(ParseOptions {
        strict: false,
        ..ParseOptions::default()
    });
    let err = parser.parse(&data).unwrap_err();
    assert!(matches!(err, ParseError::StructuralMismatch { .. }));
}

#[test]
fn nesting_limit_is_enforced() {
    let data = track_with_entries(b"soun", &[audio_entry(b"mp4a", 2, 16, 44100)]);
    let parser = Parser::new().with_options(ParseOptions {
        max_depth: 2,
        ..ParseOptions::default()
    });
    let err = parser.parse(&data).unwrap_err();
    match err {
        ParseError::TooDeep { typ, depth, .. } => {
            assert_eq!(typ, FourCC(*b"mdhd"));
            assert_eq!(depth, 3);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn deeply_nested_containers_do_not_overflow() {
    let mut data = bx(b"free", &[]);
    for _ in 0..200 {
        data = container(b"udta", &[data]);
    }
    let err = parse(&data).unwrap_err();
    assert!(matches!(err, ParseError::TooDeep { depth: 65, .. }));
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn truncated_child_is_attributed_to_parent() {
    let data = container(b"moov", &[mvhd_v0(1000, 1000), vec![0, 0, 0]]);
    let err = parse(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncated);
    assert!(matches!(err, ParseError::InBox { .. }));
    assert_eq!(err.location().unwrap().0, FourCC::MOOV);
}

#[test]
fn top_level_truncation_has_no_box() {
    let mut data = bx(b"free", &[1, 2, 3]);
    data.extend_from_slice(&[0, 0]);
    let err = parse(&data).unwrap_err();
    assert!(matches!(err, ParseError::Truncated { offset: 11, .. }));
    assert!(err.location().is_none());
}

#[test]
fn unknown_box_is_opaque() {
    let data = bx(b"abcd", &[1, 2, 3, 4, 5]);
    let tree = parse(&data).unwrap();
    let b = tree.roots().next().unwrap();
    assert!(matches!(b.body(), BoxBody::Opaque));
    assert!(b.fields().is_empty());
    assert_eq!(b.consumed(), 13);
    assert_eq!(b.entries().count(), 0);
}

#[test]
fn size_zero_box_runs_to_end_of_input() {
    let mut data = bx(b"free", &[]);
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&[0x55; 40]);

    let tree = parse(&data).unwrap();
    let roots: Vec<_> = tree.roots().collect();
    assert_eq!(roots.len(), 2);
    assert!(roots[1].header().to_end);
    assert_eq!(roots[1].size(), 48);
    assert_eq!(roots[1].header().end(), data.len() as u64);
}

#[test]
fn size_zero_child_runs_to_end_of_parent() {
    let mut inner = 0u32.to_be_bytes().to_vec();
    inner.extend_from_slice(b"free");
    inner.extend_from_slice(&[0u8; 6]);
    let mut data = container(b"udta", &[bx(b"cprt", &[]), inner]);
    data.extend_from_slice(&bx(b"skip", &[]));

    let tree = parse(&data).unwrap();
    let udta = tree.roots().next().unwrap();
    let free = udta.find_child(FourCC(*b"free")).unwrap();
    assert_eq!(free.size(), 14);
    assert_eq!(free.header().end(), udta.header().end());
    assert_eq!(tree.roots().count(), 2);
}

#[test]
fn navigation_helpers() {
    let data = track_with_entries(b"vide", &[visual_entry(b"avc1", 320, 240, "")]);
    let tree = parse(&data).unwrap();

    let stsd = tree.find_all(FourCC(*b"stsd")).next().unwrap();
    assert_eq!(stsd.find_parent(FourCC::TRAK).unwrap().typ(), FourCC::TRAK);
    assert!(stsd.find_parent(FourCC(*b"stsd")).is_none());

    let trak = stsd.find_parent(FourCC::TRAK).unwrap();
    // immediate children only
    assert!(trak.find_child(FourCC::HDLR).is_none());
    assert!(trak.find_child(FourCC::MDIA).is_some());

    let order: Vec<_> = tree.iter().map(|b| b.typ().to_string()).collect();
    assert_eq!(
        order,
        [
            "moov", "mvhd", "trak", "tkhd", "mdia", "mdhd", "hdlr", "minf", "stbl", "stsd", "avc1"
        ]
    );
}

#[test]
fn entries_yield_fields_before_children() {
    let data = container(b"moov", &[mvhd_v0(1000, 1000)]);
    let mut data2 = full(b"stsd", 0, 0, &1u32.to_be_bytes());
    data2 = grow(data2, &bx(b"zzzz", &[]));
    let tree = parse(&[data, data2].concat()).unwrap();

    let stsd = tree.find_all(FourCC(*b"stsd")).next().unwrap();
    let kinds: Vec<_> = stsd
        .entries()
        .map(|e| match e {
            Entry::Field(f) => f.label.to_string(),
            Entry::Box(b) => format!("<{}>", b.typ()),
        })
        .collect();
    assert_eq!(kinds, ["version", "flags", "entry count", "<zzzz>"]);

    let moov = tree.roots().next().unwrap();
    let first = moov.entries().next().unwrap();
    assert!(matches!(first, Entry::Box(b) if b.typ() == FourCC(*b"mvhd")));
}

#[derive(Debug)]
struct FileType {
    major: FourCC,
    minor: u32,
    compatible: Vec<FourCC>,
}

impl FieldSource for FileType {
    fn fields(&self) -> Vec<Field> {
        let brands = self
            .compatible
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            Field::text("major brand", self.major.to_string()),
            Field::uint("minor version", self.minor),
            Field::text("compatible brands", brands),
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FtypDecoder;

impl BoxDecoder for FtypDecoder {
    fn decode(&self, r: &mut BoxReader<'_, '_>) -> isobox::error::Result<BoxBody> {
        let major = r.read_fourcc()?;
        let minor = r.read_u32()?;
        let mut compatible = Vec::new();
        while r.remaining() >= 4 {
            compatible.push(r.read_fourcc()?);
        }
        Ok(BoxBody::Custom(Box::new(FileType {
            major,
            minor,
            compatible,
        })))
    }
}

fn ftyp() -> Vec<u8> {
    bx(b"ftyp", b"isom\0\0\x02\0isomiso2mp41")
}

#[test]
fn registered_decoder_takes_over_a_tag() {
    let registry = default_registry().with_decoder(
        BoxKey::FourCC(FourCC(*b"ftyp")),
        "ftyp",
        Box::new(FtypDecoder),
    );
    assert!(registry.contains(&BoxKey::FourCC(FourCC(*b"ftyp"))));
    assert_eq!(
        registry.name_of(&BoxKey::FourCC(FourCC(*b"ftyp"))),
        Some("ftyp")
    );

    let data = [ftyp(), container(b"moov", &[mvhd_v0(1000, 1000)])].concat();
    let tree = Parser::with_registry(registry).parse(&data).unwrap();
    let b = tree.roots().next().unwrap();

    let BoxBody::Custom(body) = b.body() else {
        panic!("expected a custom body");
    };
    let ft = body.as_any().downcast_ref::<FileType>().unwrap();
    assert_eq!(ft.major, FourCC(*b"isom"));
    assert_eq!(ft.minor, 0x200);
    assert_eq!(ft.compatible.len(), 3);

    let fields = b.fields();
    assert_eq!(fields[2].raw, FieldValue::Text("isom,iso2,mp41".into()));
    // defaults still apply to everything else
    assert!(matches!(
        tree.find_all(FourCC(*b"mvhd")).next().unwrap().body(),
        BoxBody::MovieHeader(_)
    ));
}

#[test]
fn default_registry_leaves_ftyp_opaque() {
    let tree = parse(&ftyp()).unwrap();
    assert!(matches!(
        tree.roots().next().unwrap().body(),
        BoxBody::Opaque
    ));
}

#[test]
fn uuid_boxes_dispatch_on_extended_type() {
    let ext = *b"\x01\x23\x45\x67\x89\xAB\xCD\xEF\x01\x23\x45\x67\x89\xAB\xCD\xEF";
    let mut payload = ext.to_vec();
    payload.extend_from_slice(b"isom\0\0\0\x01");
    let data = bx(b"uuid", &payload);

    let registry = Registry::new().with_decoder(BoxKey::Uuid(ext), "test", Box::new(FtypDecoder));
    let tree = Parser::with_registry(registry).parse(&data).unwrap();
    let b = tree.roots().next().unwrap();
    assert_eq!(b.header().uuid, Some(ext));
    assert!(matches!(b.body(), BoxBody::Custom(_)));

    // same bytes, no decoder for the uuid
    let tree = parse(&data).unwrap();
    assert!(matches!(tree.roots().next().unwrap().body(), BoxBody::Opaque));
}

#[test]
fn decoder_that_under_reads_is_rejected() {
    struct Lazy;
    impl BoxDecoder for Lazy {
        fn decode(&self, r: &mut BoxReader<'_, '_>) -> isobox::error::Result<BoxBody> {
            r.read_u8()?;
            Ok(BoxBody::Opaque)
        }
    }
    let registry = Registry::new().with_decoder(BoxKey::FourCC(FourCC(*b"lazy")), "lazy", Box::new(Lazy));
    let data = bx(b"lazy", &[1, 2, 3]);
    let err = Parser::with_registry(registry).parse(&data).unwrap_err();
    assert!(matches!(
        err,
        ParseError::StructuralMismatch {
            declared: 11,
            consumed: 9,
            ..
        }
    ));
}

#[test]
fn decoder_that_over_reads_is_rejected() {
    struct Greedy;
    impl BoxDecoder for Greedy {
        fn decode(&self, r: &mut BoxReader<'_, '_>) -> isobox::error::Result<BoxBody> {
            r.read_u64()?;
            Ok(BoxBody::Opaque)
        }
    }
    let registry =
        Registry::new().with_decoder(BoxKey::FourCC(FourCC(*b"grdy")), "greedy", Box::new(Greedy));
    // a following box provides bytes the reader must not reach into
    let data = [bx(b"grdy", &[1, 2, 3, 4]), bx(b"free", &[0; 8])].concat();
    let err = Parser::with_registry(registry).parse(&data).unwrap_err();
    assert!(matches!(
        err,
        ParseError::StructuralMismatch {
            declared: 12,
            consumed: 16,
            ..
        }
    ));
}

fn lenient() -> Parser {
    Parser::new().with_options(ParseOptions {
        strict: false,
        ..ParseOptions::default()
    })
}

#[test]
fn short_tail_after_sample_entry_is_skipped_when_lenient() {
    // four zero bytes some muxers append inside the entry span
    let entry = grow(visual_entry(b"avc1", 640, 480, "enc"), &[0; 4]);
    let data = track_with_entries(b"vide", &[entry]);

    let err = parse(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncated);
    assert_eq!(err.location().unwrap().0, FourCC(*b"avc1"));

    let tree = lenient().parse(&data).unwrap();
    let avc1 = tree.find_all(FourCC(*b"avc1")).next().unwrap();
    assert!(matches!(avc1.body(), BoxBody::VisualSampleEntry(_)));
    assert_eq!(avc1.size(), 90);
    assert_eq!(avc1.consumed(), 90);
    assert_eq!(avc1.children().count(), 0);
    for b in tree.iter() {
        assert_eq!(b.consumed(), b.size(), "box {:?}", b);
    }
}

#[test]
fn short_tail_in_container_is_skipped_when_lenient() {
    let data = [
        container(b"moov", &[mvhd_v0(1000, 1000), vec![0, 0, 0]]),
        bx(b"free", &[]),
    ]
    .concat();
    let tree = lenient().parse(&data).unwrap();
    let moov = tree.roots().next().unwrap();
    assert_eq!(moov.children().count(), 1);
    assert_eq!(moov.consumed(), moov.size());
    assert_eq!(tree.roots().count(), 2);
}

#[test]
fn truncated_child_header_reports_parent_span() {
    let data = [
        container(b"moov", &[mvhd_v0(1000, 1000), vec![0, 0, 0]]),
        bx(b"free", &[]),
    ]
    .concat();
    let err = parse(&data).unwrap_err();
    let ParseError::InBox { typ, source, .. } = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(*typ, FourCC::MOOV);
    // the buffer still has the free box, but moov's span does not
    assert!(matches!(
        **source,
        ParseError::Truncated {
            offset: 116,
            needed: 8,
            available: 3
        }
    ));
    assert!(source.to_string().contains("3 left in the enclosing span"));
}
