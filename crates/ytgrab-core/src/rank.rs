//! Dedup and ranking policy applied to freshly-parsed format lists.

use regex::Regex;

use crate::format::{Format, FormatDetail, TrackKind, UNKNOWN_SIZE};

/// Deduplicate by id (first occurrence wins), order audio by bitrate, and
/// inject generic fallback entries when nothing was recognised.
///
/// Video and subtitle lists keep the parser's natural order.
pub fn rank(formats: Vec<Format>, kind: TrackKind) -> Vec<Format> {
    let mut ranked: Vec<Format> = Vec::with_capacity(formats.len());
    for format in formats {
        if ranked.iter().all(|f| f.id != format.id) {
            ranked.push(format);
        }
    }

    if kind == TrackKind::Audio {
        sort_audio(&mut ranked);
    }

    if ranked.is_empty() {
        ranked = fallback_formats(kind);
    }

    ranked
}

fn sort_audio(formats: &mut [Format]) {
    formats.sort_by(|a, b| {
        let (qa, qb) = (a.quality(), b.quality());
        let (ra, rb) = (extract_bitrate(qa), extract_bitrate(qb));
        if ra == 0 && rb == 0 {
            // Neither label is numeric: reverse-lexicographic on the label,
            // which puts "High quality" above "English audio"
            qb.cmp(qa)
        } else {
            rb.cmp(&ra)
        }
    });
}

/// Pull the number out of a "<n> kbps" quality label; 0 when absent.
pub fn extract_bitrate(quality: &str) -> u32 {
    let Ok(re) = Regex::new(r"(\d+)\s*kbps") else {
        return 0;
    };
    re.captures(quality)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Generic entries the downloader itself understands, used when the probe
/// output yielded no recognisable rows.
fn fallback_formats(kind: TrackKind) -> Vec<Format> {
    match kind {
        TrackKind::Video => vec![
            Format {
                id: "best".to_string(),
                detail: FormatDetail::Video {
                    container: "video".to_string(),
                    quality: "Best quality".to_string(),
                    resolution: "Highest available".to_string(),
                    filesize: UNKNOWN_SIZE.to_string(),
                },
            },
            Format {
                id: "worst".to_string(),
                detail: FormatDetail::Video {
                    container: "video".to_string(),
                    quality: "Low quality".to_string(),
                    resolution: "Lowest available".to_string(),
                    filesize: UNKNOWN_SIZE.to_string(),
                },
            },
        ],
        TrackKind::Audio => vec![
            Format {
                id: "bestaudio".to_string(),
                detail: FormatDetail::Audio {
                    container: "audio".to_string(),
                    quality: "Best quality".to_string(),
                    filesize: UNKNOWN_SIZE.to_string(),
                },
            },
            Format {
                id: "worstaudio".to_string(),
                detail: FormatDetail::Audio {
                    container: "audio".to_string(),
                    quality: "Low quality".to_string(),
                    filesize: UNKNOWN_SIZE.to_string(),
                },
            },
        ],
        TrackKind::Subtitles => vec![Format {
            id: "en".to_string(),
            detail: FormatDetail::Subtitle {
                code: "en".to_string(),
                name: "English".to_string(),
            },
        }],
    }
}
