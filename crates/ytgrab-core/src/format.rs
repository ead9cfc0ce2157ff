//! Typed delivery formats produced by probing a source URL.

use std::fmt;

/// Which category of downloadable content a flow is operating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitles,
}

impl TrackKind {
    /// File stem used in the yt-dlp output template (`assets/<stem>.%(ext)s`).
    pub fn output_stem(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
            TrackKind::Subtitles => "subtitles",
        }
    }

    /// Generic identifier yt-dlp understands when an exact format id 403s.
    /// Subtitles have no equivalent — their downloads are never retried.
    pub fn fallback_best_id(&self) -> Option<&'static str> {
        match self {
            TrackKind::Video => Some("best"),
            TrackKind::Audio => Some("bestaudio"),
            TrackKind::Subtitles => None,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.output_stem())
    }
}

/// Sentinel shown when yt-dlp printed no size column for a row.
pub const UNKNOWN_SIZE: &str = "Unknown size";

/// One selectable delivery variant. `id` is passed back to yt-dlp verbatim
/// and is unique within a result set after ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    pub id: String,
    pub detail: FormatDetail,
}

/// Kind-specific descriptive fields. For subtitles the `code` doubles as
/// the download identifier (`--sub-lang`).
#[derive(Debug, Clone, PartialEq)]
pub enum FormatDetail {
    Video {
        container: String,
        quality: String,
        resolution: String,
        filesize: String,
    },
    Audio {
        container: String,
        quality: String,
        filesize: String,
    },
    Subtitle {
        code: String,
        name: String,
    },
}

impl Format {
    pub fn kind(&self) -> TrackKind {
        match self.detail {
            FormatDetail::Video { .. } => TrackKind::Video,
            FormatDetail::Audio { .. } => TrackKind::Audio,
            FormatDetail::Subtitle { .. } => TrackKind::Subtitles,
        }
    }

    /// Human-readable quality label ("720p HD", "160 kbps", language name).
    pub fn quality(&self) -> &str {
        match &self.detail {
            FormatDetail::Video { quality, .. } => quality,
            FormatDetail::Audio { quality, .. } => quality,
            FormatDetail::Subtitle { name, .. } => name,
        }
    }
}
