use chrono::{DateTime, Utc};

// TZ=UTC date +%s -d "1904-01-01 00:00:00"
const SECONDS_1904_TO_UNIX: i64 = 2_082_844_800;

/// Converts an ISOBMFF timestamp (seconds since 1904-01-01 UTC).
///
/// Returns `None` for values chrono cannot represent.
pub fn utc_from_seconds_since_1904(secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    DateTime::from_timestamp(secs.checked_sub(SECONDS_1904_TO_UNIX)?, 0)
}

/// ctime-style rendering of an ISOBMFF timestamp, e.g.
/// `Fri Jan  1 00:00:00 1904`.
pub fn format_mp4_time(secs: u64) -> String {
    match utc_from_seconds_since_1904(secs) {
        Some(t) => t.format("%a %b %e %H:%M:%S %Y").to_string(),
        None => "invalid time".to_string(),
    }
}

/// Decodes a packed ISO-639-2/T code: three 5-bit letters, each offset
/// by 0x60. Anything outside `a..=z` yields `"unknown"`.
pub fn iso639_2_from_packed15(code: u16) -> String {
    let letters = [(code >> 10) & 0x1F, (code >> 5) & 0x1F, code & 0x1F];
    let mut out = String::with_capacity(3);
    for l in letters {
        let c = (l as u8 + 0x60) as char;
        if !c.is_ascii_lowercase() {
            return "unknown".to_string();
        }
        out.push(c);
    }
    out
}

pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}
