//! Platform paths and external binary discovery.

use std::path::{Path, PathBuf};

#[cfg(unix)]
fn yt_dlp_binary_names() -> &'static [&'static str] {
    &["yt-dlp"]
}

#[cfg(windows)]
fn yt_dlp_binary_names() -> &'static [&'static str] {
    &["yt-dlp.exe", "yt-dlp"]
}

#[cfg(unix)]
fn ffmpeg_binary_names() -> &'static [&'static str] {
    &["ffmpeg"]
}

#[cfg(windows)]
fn ffmpeg_binary_names() -> &'static [&'static str] {
    &["ffmpeg.exe", "ffmpeg"]
}

pub fn config_dir() -> PathBuf {
    // Use ~/.config/ytgrab on macOS too, for consistency with Linux
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("ytgrab")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ytgrab")
    }
}

pub fn data_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| std::env::temp_dir())
            .join(".local")
            .join("share")
            .join("ytgrab")
    }

    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ytgrab")
    }
}

fn find_in_dir(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    for name in names {
        let candidate = dir.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ':';
    #[cfg(windows)]
    let sep = ';';

    for dir in path.split(sep) {
        for name in names {
            let candidate = PathBuf::from(dir).join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Find the yt-dlp binary.
///
/// Searches in order:
/// 1. YT_DLP_PATH environment variable
/// 2. The configured bin directory (`bin/` by default)
/// 3. PATH
pub fn find_yt_dlp(bin_dir: &Path) -> Option<PathBuf> {
    if let Ok(path) = std::env::var("YT_DLP_PATH") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(p) = find_in_dir(bin_dir, yt_dlp_binary_names()) {
        return Some(p);
    }

    find_on_path(yt_dlp_binary_names())
}

/// Find ffmpeg. Its absence is not an error — downloads simply run without
/// the `--ffmpeg-location` flag.
pub fn find_ffmpeg(bin_dir: &Path) -> Option<PathBuf> {
    if let Ok(path) = std::env::var("FFMPEG_PATH") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(p) = find_in_dir(bin_dir, ffmpeg_binary_names()) {
        return Some(p);
    }

    find_on_path(ffmpeg_binary_names())
}
