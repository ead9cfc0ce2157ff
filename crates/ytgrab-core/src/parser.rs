//! yt-dlp output parsing — `-F` format tables and `--list-subs` caption lists.
//!
//! The tables are column-aligned free text aimed at humans, not machines, so
//! parsing is heuristic and line-scoped: a line that doesn't look like a
//! format row is skipped, never an error. Given the same text the result is
//! always the same.

use crate::format::{Format, FormatDetail, TrackKind, UNKNOWN_SIZE};

/// Marker line that opens the caption section of `--list-subs` output.
const CAPTIONS_MARKER: &str = "Available automatic captions for";

/// Substring → label table for video quality, checked in this order.
/// First match in the line wins.
const RESOLUTION_LABELS: &[(&str, &str)] = &[
    ("360p", "360p"),
    ("480p", "480p"),
    ("720p", "720p HD"),
    ("1080p", "1080p Full HD"),
    ("1440p", "1440p Quad HD"),
    ("2160p", "2160p 4K"),
];

/// Parse raw yt-dlp probe output into format records for `kind`.
///
/// The result is unranked and may contain duplicate ids; callers feed it
/// through [`crate::rank::rank`].
pub fn parse_formats(output: &str, kind: TrackKind) -> Vec<Format> {
    match kind {
        TrackKind::Video | TrackKind::Audio => parse_media_formats(output, kind),
        TrackKind::Subtitles => parse_subtitle_languages(output),
    }
}

/// Header banners, separator rules, progress chatter — anything that is
/// never a format row.
fn is_noise_line(line: &str) -> bool {
    line.contains("Available formats")
        || line.contains("ID  EXT")
        || line.contains("----")
        || line.trim().is_empty()
        || line.contains("[youtube]")
}

fn parse_media_formats(output: &str, kind: TrackKind) -> Vec<Format> {
    let mut formats = Vec::new();

    for line in output.lines() {
        if is_noise_line(line) {
            continue;
        }
        let audio_only = line.contains("audio only");
        if (kind == TrackKind::Audio) != audio_only {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        let id = fields[0];

        let detail = if kind == TrackKind::Audio {
            // -drc variants fail to download reliably; skip them
            if id.contains("-drc") {
                continue;
            }
            audio_detail(line, &fields)
        } else {
            video_detail(line, &fields)
        };

        formats.push(Format {
            id: id.to_string(),
            detail,
        });
    }

    formats
}

fn audio_detail(line: &str, fields: &[&str]) -> FormatDetail {
    let mut quality = String::from("Audio");
    let mut filesize = String::from(UNKNOWN_SIZE);

    for field in fields {
        // Bitrate column looks like "129k"
        if let Some(rate) = field.strip_suffix('k') {
            if rate.parse::<f64>().is_ok() {
                quality = format!("{rate} kbps");
            }
        }
        if field.contains("MiB") || field.contains("KiB") {
            filesize = (*field).to_string();
        }
    }

    // No bitrate column — fall back to yt-dlp's own descriptions
    if quality == "Audio" {
        if line.contains("Default, high") {
            quality = "High quality".to_string();
        } else if line.contains("Default, low") {
            quality = "Low quality".to_string();
        } else if line.contains("[en]") {
            quality = "English audio".to_string();
        }
    }

    let container = match fields.get(1).copied() {
        Some("m4a") => "M4A (AAC)",
        Some("webm") => "WebM (Opus)",
        _ => "audio",
    };

    FormatDetail::Audio {
        container: container.to_string(),
        quality,
        filesize,
    }
}

fn video_detail(line: &str, fields: &[&str]) -> FormatDetail {
    let mut resolution = String::from("Unknown resolution");
    let mut filesize = String::from(UNKNOWN_SIZE);

    for field in fields {
        // Resolution column looks like "1920x1080"
        if field.contains('x') && field.chars().any(|c| c.is_ascii_digit()) {
            resolution = (*field).to_string();
        }
        if field.contains("MiB") || field.contains("KiB") {
            filesize = (*field).to_string();
        }
    }

    let quality = RESOLUTION_LABELS
        .iter()
        .find(|(marker, _)| line.contains(marker))
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| resolution.clone());

    FormatDetail::Video {
        container: "video".to_string(),
        quality,
        resolution,
        filesize,
    }
}

fn parse_subtitle_languages(output: &str) -> Vec<Format> {
    let mut languages = Vec::new();
    let mut in_captions = false;

    for line in output.lines() {
        if line.contains(CAPTIONS_MARKER) {
            in_captions = true;
            continue;
        }
        if !in_captions
            || line.contains("Language Name")
            || line.contains("----")
            || line.trim().is_empty()
            || line.contains("[youtube]")
        {
            continue;
        }

        let Some(code) = line.split_whitespace().next() else {
            continue;
        };
        // YouTube-only pseudo-code, not a real language
        if code == "en-orig" {
            continue;
        }

        languages.push(Format {
            id: code.to_string(),
            detail: FormatDetail::Subtitle {
                code: code.to_string(),
                name: language_name(code),
            },
        });
    }

    languages
}

/// Display names for the caption codes YouTube commonly emits. Unknown codes
/// fall back to capitalising the raw code.
pub fn language_name(code: &str) -> String {
    let name = match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh-Hans" => "Chinese (Simplified)",
        "zh-Hant" => "Chinese (Traditional)",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "tr" => "Turkish",
        _ => {
            let mut chars = code.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            };
        }
    };
    name.to_string()
}
