//! yt-dlp subprocess runner — probing format lists and executing downloads.
//!
//! Every invocation appends the command line and captured output to an
//! append-only transcript (`output.log`); failures to write it are tolerated
//! silently. Diagnostics go through `tracing` instead.

use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::format::{Format, TrackKind};
use crate::parser::parse_formats;
use crate::platform;
use crate::rank::rank;

/// Fixed name of the append-only invocation transcript.
pub const TRANSCRIPT_LOG: &str = "output.log";

/// Bounded inter-request delays, applied to every download unconditionally.
const RATE_LIMIT_ARGS: &[&str] = &[
    "--sleep-requests",
    "1",
    "--sleep-interval",
    "5",
    "--max-sleep-interval",
    "10",
];

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("yt-dlp not found (looked in $YT_DLP_PATH, {0}, and PATH)")]
    YtDlpMissing(PathBuf),
    #[error("failed to run yt-dlp: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}. Check output.log for details.")]
    CommandFailed(String),
    #[error("Rate limited by YouTube. Please try again later.")]
    RateLimited,
}

/// How a failed download should be handled, decided from captured stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Access denial that a generic best-quality id sometimes gets past.
    RetryWithBest,
    /// Throttled; retrying immediately would make it worse.
    RateLimited,
    /// Anything else — surface the captured error.
    Fatal,
}

pub fn classify_failure(kind: TrackKind, stderr: &str) -> FailureClass {
    match kind {
        TrackKind::Video | TrackKind::Audio
            if stderr.contains("403") || stderr.contains("Forbidden") =>
        {
            FailureClass::RetryWithBest
        }
        TrackKind::Subtitles
            if stderr.contains("429") || stderr.contains("Too Many Requests") =>
        {
            FailureClass::RateLimited
        }
        _ => FailureClass::Fatal,
    }
}

pub struct Runner {
    yt_dlp: PathBuf,
    ffmpeg: Option<PathBuf>,
    downloads_dir: PathBuf,
    transcript: PathBuf,
}

impl Runner {
    pub fn from_config(config: &Config) -> Result<Self, RunnerError> {
        let yt_dlp = platform::find_yt_dlp(&config.paths.bin_dir)
            .ok_or_else(|| RunnerError::YtDlpMissing(config.paths.bin_dir.clone()))?;
        let ffmpeg = platform::find_ffmpeg(&config.paths.bin_dir);
        if ffmpeg.is_none() {
            info!("ffmpeg not found; downloads run without --ffmpeg-location");
        }
        Ok(Self::new(
            yt_dlp,
            ffmpeg,
            config.paths.downloads_dir.clone(),
            PathBuf::from(TRANSCRIPT_LOG),
        ))
    }

    pub fn new(
        yt_dlp: PathBuf,
        ffmpeg: Option<PathBuf>,
        downloads_dir: PathBuf,
        transcript: PathBuf,
    ) -> Self {
        Self {
            yt_dlp,
            ffmpeg,
            downloads_dir,
            transcript,
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Enumerate available formats for `url`. Never retries: a probe failure
    /// is surfaced immediately and the caller unwinds to URL entry.
    pub async fn probe(&self, url: &str, kind: TrackKind) -> Result<Vec<Format>, RunnerError> {
        self.ensure_downloads_dir().await;

        info!("probing {kind} formats for {url}");
        let output = self.run_yt_dlp(&self.probe_args(url, kind)).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("probe failed: {}", first_error_line(&stderr));
            return Err(RunnerError::CommandFailed(format!(
                "Error fetching formats: {}",
                first_error_line(&stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let formats = rank(parse_formats(&stdout, kind), kind);
        debug!("parsed {} {kind} formats", formats.len());
        Ok(formats)
    }

    /// Download `format_id` from `url`, with the one-shot retry/fallback
    /// policy: access-denied video/audio downloads are re-attempted exactly
    /// once with the generic best id; throttled subtitle downloads are not
    /// retried.
    pub async fn download(
        &self,
        url: &str,
        format_id: &str,
        kind: TrackKind,
    ) -> Result<(), RunnerError> {
        self.ensure_downloads_dir().await;

        info!("downloading {kind} format {format_id} from {url}");
        let output = self.run_yt_dlp(&self.download_args(url, format_id, kind)).await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        match classify_failure(kind, &stderr) {
            FailureClass::RateLimited => {
                warn!("{kind} download throttled: {}", first_error_line(&stderr));
                Err(RunnerError::RateLimited)
            }
            FailureClass::RetryWithBest => {
                let fallback = kind.fallback_best_id().unwrap_or(format_id);
                warn!("{kind} download denied; retrying once with '{fallback}'");
                let retry = self
                    .run_yt_dlp(&self.download_args(url, fallback, kind))
                    .await?;
                if retry.status.success() {
                    Ok(())
                } else {
                    let retry_stderr = String::from_utf8_lossy(&retry.stderr);
                    Err(RunnerError::CommandFailed(format!(
                        "Error downloading {kind}: {}",
                        first_error_line(&retry_stderr)
                    )))
                }
            }
            FailureClass::Fatal => Err(RunnerError::CommandFailed(format!(
                "Error downloading {kind}: {}",
                first_error_line(&stderr)
            ))),
        }
    }

    fn probe_args(&self, url: &str, kind: TrackKind) -> Vec<String> {
        let mut args = match kind {
            TrackKind::Subtitles => vec!["--list-subs".to_string(), url.to_string()],
            _ => vec!["-F".to_string(), url.to_string()],
        };
        self.push_ffmpeg_location(&mut args);
        args
    }

    fn download_args(&self, url: &str, format_id: &str, kind: TrackKind) -> Vec<String> {
        let mut args: Vec<String> = match kind {
            TrackKind::Video => vec!["-f", format_id],
            TrackKind::Audio => vec!["-f", format_id, "-x", "--audio-quality", "0"],
            TrackKind::Subtitles => vec![
                "--write-sub",
                "--write-auto-sub",
                "--sub-lang",
                format_id,
                "--skip-download",
            ],
        }
        .into_iter()
        .map(String::from)
        .collect();

        self.push_ffmpeg_location(&mut args);
        args.extend(RATE_LIMIT_ARGS.iter().map(|s| s.to_string()));
        args.push("-o".to_string());
        args.push(format!(
            "{}/{}.%(ext)s",
            self.downloads_dir.display(),
            kind.output_stem()
        ));
        args.push(url.to_string());
        args
    }

    fn push_ffmpeg_location(&self, args: &mut Vec<String>) {
        if let Some(ffmpeg) = &self.ffmpeg {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.display().to_string());
        }
    }

    async fn ensure_downloads_dir(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.downloads_dir).await {
            warn!(
                "could not create downloads dir {}: {e}",
                self.downloads_dir.display()
            );
        }
    }

    async fn run_yt_dlp(&self, args: &[String]) -> Result<Output, RunnerError> {
        debug!("yt-dlp {}", args.join(" "));
        let output = Command::new(&self.yt_dlp)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;
        self.append_transcript(args, &output);
        Ok(output)
    }

    /// Best-effort transcript append; never fails the invocation.
    fn append_transcript(&self, args: &[String], output: &Output) {
        use std::io::Write;

        let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.transcript)
        else {
            return;
        };
        let _ = writeln!(file, "$ yt-dlp {}", args.join(" "));
        let _ = file.write_all(&output.stdout);
        let _ = file.write_all(&output.stderr);
    }
}

/// yt-dlp prints multi-line traces; the first ERROR line is the useful bit.
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|l| l.contains("ERROR"))
        .or_else(|| stderr.lines().find(|l| !l.trim().is_empty()))
        .unwrap_or("yt-dlp exited with an error")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatDetail;
    use tempfile::TempDir;

    fn runner_in(dir: &TempDir, yt_dlp: PathBuf, ffmpeg: Option<PathBuf>) -> Runner {
        Runner::new(
            yt_dlp,
            ffmpeg,
            dir.path().join("assets"),
            dir.path().join(TRANSCRIPT_LOG),
        )
    }

    /// Install a fake yt-dlp shell script into `dir` and return its path.
    /// `body` runs with the tempdir as no particular cwd, so it must use
    /// absolute paths.
    #[cfg(unix)]
    fn fake_yt_dlp(dir: &TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn call_count(dir: &TempDir) -> usize {
        std::fs::read_to_string(dir.path().join("calls"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[test]
    fn classify_failure_matches_known_signatures() {
        let denied = "ERROR: unable to download video data: HTTP Error 403: Forbidden";
        assert_eq!(
            classify_failure(TrackKind::Video, denied),
            FailureClass::RetryWithBest
        );
        assert_eq!(
            classify_failure(TrackKind::Audio, denied),
            FailureClass::RetryWithBest
        );
        // 403 on subtitles is not the retryable case
        assert_eq!(classify_failure(TrackKind::Subtitles, denied), FailureClass::Fatal);

        let throttled = "ERROR: HTTP Error 429: Too Many Requests";
        assert_eq!(
            classify_failure(TrackKind::Subtitles, throttled),
            FailureClass::RateLimited
        );
        assert_eq!(classify_failure(TrackKind::Video, throttled), FailureClass::Fatal);

        assert_eq!(
            classify_failure(TrackKind::Video, "ERROR: This video is private"),
            FailureClass::Fatal
        );
    }

    #[test]
    fn probe_args_select_flag_by_kind() {
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir, PathBuf::from("yt-dlp"), None);

        assert_eq!(
            runner.probe_args("https://example/watch", TrackKind::Video),
            vec!["-F", "https://example/watch"]
        );
        assert_eq!(
            runner.probe_args("https://example/watch", TrackKind::Subtitles),
            vec!["--list-subs", "https://example/watch"]
        );
    }

    #[test]
    fn download_args_carry_rate_limits_and_output_template() {
        let dir = TempDir::new().unwrap();
        let runner = runner_in(&dir, PathBuf::from("yt-dlp"), None);

        let args = runner.download_args("https://example/watch", "140", TrackKind::Audio);
        assert_eq!(&args[..5], &["-f", "140", "-x", "--audio-quality", "0"]);
        for flag in RATE_LIMIT_ARGS {
            assert!(args.contains(&flag.to_string()), "missing {flag}");
        }
        let template = args[args.len() - 2].clone();
        assert!(template.ends_with("assets/audio.%(ext)s"), "{template}");
        assert_eq!(args.last().unwrap(), "https://example/watch");

        let args = runner.download_args("u", "en", TrackKind::Subtitles);
        assert_eq!(
            &args[..5],
            &["--write-sub", "--write-auto-sub", "--sub-lang", "en", "--skip-download"]
        );
        assert!(args[args.len() - 2].ends_with("assets/subtitles.%(ext)s"));
    }

    #[test]
    fn ffmpeg_location_appended_only_when_present() {
        let dir = TempDir::new().unwrap();
        let without = runner_in(&dir, PathBuf::from("yt-dlp"), None);
        assert!(!without
            .download_args("u", "18", TrackKind::Video)
            .contains(&"--ffmpeg-location".to_string()));

        let with = runner_in(
            &dir,
            PathBuf::from("yt-dlp"),
            Some(PathBuf::from("bin/ffmpeg")),
        );
        let args = with.download_args("u", "18", TrackKind::Video);
        let pos = args.iter().position(|a| a == "--ffmpeg-location").unwrap();
        assert_eq!(args[pos + 1], "bin/ffmpeg");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_parses_ranked_formats_from_stdout() {
        let dir = TempDir::new().unwrap();
        let yt_dlp = fake_yt_dlp(
            &dir,
            r#"cat <<'TABLE'
[info] Available formats for x:
249 webm  audio only 2 |  1.59MiB   52k https | audio only opus  52k low, webm_dash
251 webm  audio only 2 |  4.04MiB  132k https | audio only opus 132k medium, webm_dash
TABLE"#,
        );
        let runner = runner_in(&dir, yt_dlp, None);

        let formats = runner.probe("https://example/watch", TrackKind::Audio).await.unwrap();
        let ids: Vec<&str> = formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["251", "249"]);
        match &formats[0].detail {
            FormatDetail::Audio { quality, .. } => assert_eq!(quality, "132 kbps"),
            other => panic!("expected audio detail, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_failure_surfaces_error_with_transcript_pointer() {
        let dir = TempDir::new().unwrap();
        let yt_dlp = fake_yt_dlp(
            &dir,
            r#"echo "ERROR: Unsupported URL: wat" >&2
exit 1"#,
        );
        let runner = runner_in(&dir, yt_dlp, None);

        let err = runner.probe("wat", TrackKind::Video).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Unsupported URL"), "{msg}");
        assert!(msg.contains("Check output.log for details."), "{msg}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn denied_download_retries_exactly_once_with_best_id() {
        let dir = TempDir::new().unwrap();
        let calls = dir.path().join("calls");
        let marker = dir.path().join("failed-once");
        let yt_dlp = fake_yt_dlp(
            &dir,
            &format!(
                r#"echo "$@" >> {calls}
if [ ! -f {marker} ]; then
  touch {marker}
  echo "ERROR: unable to download video data: HTTP Error 403: Forbidden" >&2
  exit 1
fi
exit 0"#,
                calls = calls.display(),
                marker = marker.display()
            ),
        );
        let runner = runner_in(&dir, yt_dlp, None);

        runner
            .download("https://example/watch", "137", TrackKind::Video)
            .await
            .unwrap();

        assert_eq!(call_count(&dir), 2);
        let recorded = std::fs::read_to_string(&calls).unwrap();
        let mut lines = recorded.lines();
        assert!(lines.next().unwrap().contains("-f 137"));
        assert!(lines.next().unwrap().contains("-f best"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_retry_surfaces_the_retry_error() {
        let dir = TempDir::new().unwrap();
        let calls = dir.path().join("calls");
        let yt_dlp = fake_yt_dlp(
            &dir,
            &format!(
                r#"echo "$@" >> {calls}
echo "ERROR: unable to download video data: HTTP Error 403: Forbidden" >&2
exit 1"#,
                calls = calls.display()
            ),
        );
        let runner = runner_in(&dir, yt_dlp, None);

        let err = runner
            .download("https://example/watch", "140", TrackKind::Audio)
            .await
            .unwrap_err();
        assert_eq!(call_count(&dir), 2);
        assert!(err.to_string().contains("403"), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn throttled_subtitles_get_fixed_message_and_no_retry() {
        let dir = TempDir::new().unwrap();
        let calls = dir.path().join("calls");
        let yt_dlp = fake_yt_dlp(
            &dir,
            &format!(
                r#"echo "$@" >> {calls}
echo "ERROR: HTTP Error 429: Too Many Requests" >&2
exit 1"#,
                calls = calls.display()
            ),
        );
        let runner = runner_in(&dir, yt_dlp, None);

        let err = runner
            .download("https://example/watch", "en", TrackKind::Subtitles)
            .await
            .unwrap_err();
        assert_eq!(call_count(&dir), 1);
        assert_eq!(
            err.to_string(),
            "Rate limited by YouTube. Please try again later."
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn transcript_records_every_invocation() {
        let dir = TempDir::new().unwrap();
        let yt_dlp = fake_yt_dlp(&dir, r#"echo "table goes here""#);
        let runner = runner_in(&dir, yt_dlp, None);

        runner.probe("https://example/watch", TrackKind::Video).await.unwrap();
        runner.probe("https://example/watch", TrackKind::Video).await.unwrap();

        let transcript =
            std::fs::read_to_string(dir.path().join(TRANSCRIPT_LOG)).unwrap();
        assert_eq!(
            transcript.matches("$ yt-dlp -F").count(),
            2,
            "transcript should be append-only: {transcript}"
        );
    }
}
