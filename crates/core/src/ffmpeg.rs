//! FFmpeg/FFprobe command utilities.
//!
//! Loops a single remote still image into a fixed-duration MP4 and probes
//! the result.

use std::path::Path;

use serde::Deserialize;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Encoding parameters for [`loop_still_image`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StillVideoOptions {
    pub duration_secs: f64,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for StillVideoOptions {
    /// Vertical 1080x1920 short-form video, 30 fps, 5 seconds.
    fn default() -> Self {
        Self {
            duration_secs: 5.0,
            fps: 30,
            width: 1080,
            height: 1920,
        }
    }
}

impl StillVideoOptions {
    pub fn validate(&self) -> Result<(), FfmpegError> {
        if !(self.duration_secs > 0.0 && self.duration_secs <= 600.0) {
            return Err(FfmpegError::InvalidArgument(format!(
                "duration must be in (0, 600] seconds, got {}",
                self.duration_secs
            )));
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(FfmpegError::InvalidArgument(format!(
                "fps must be in 1..=120, got {}",
                self.fps
            )));
        }
        // libx264 with yuv420p needs even dimensions.
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(FfmpegError::InvalidArgument(format!(
                "dimensions must be even and non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    pub duration: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the ffmpeg argument list for looping `input` into `output`.
pub fn still_video_args(input: &str, output: &Path, options: &StillVideoOptions) -> Vec<String> {
    vec![
        "-y".into(),
        "-protocol_whitelist".into(),
        "http,https,tls,tcp".into(),
        "-loop".into(),
        "1".into(),
        "-i".into(),
        input.into(),
        "-t".into(),
        format!("{:.3}", options.duration_secs),
        "-vf".into(),
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,format=yuv420p",
            w = options.width,
            h = options.height
        ),
        "-r".into(),
        options.fps.to_string(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "fast".into(),
        "-crf".into(),
        "23".into(),
        "-movflags".into(),
        "+faststart".into(),
        output.to_string_lossy().to_string(),
    ]
}

/// Accept only plain `http(s)` URLs as ffmpeg inputs. Local paths and
/// ffmpeg protocol prefixes (`file:`, `concat:`, `subfile,`) are refused.
pub fn check_remote_input(input: &str) -> Result<(), FfmpegError> {
    let lower = input.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .ok_or_else(|| {
            FfmpegError::InvalidArgument("input image must be an http(s) URL".into())
        })?;
    let has_host = !rest.is_empty() && !rest.starts_with('/');
    if !has_host || input.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(FfmpegError::InvalidArgument(format!(
            "input image URL '{input}' is malformed"
        )));
    }
    Ok(())
}

/// Loop a still image fetched from `input` (an `http(s)` URL) into an MP4
/// of the configured duration.
pub async fn loop_still_image(
    input: &str,
    output: &Path,
    options: &StillVideoOptions,
) -> Result<(), FfmpegError> {
    options.validate()?;
    check_remote_input(input)?;

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let result = tokio::process::Command::new("ffmpeg")
        .args(still_video_args(input, output, options))
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !result.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).to_string(),
        });
    }

    Ok(())
}

/// Run `ffprobe` on a media file and return its duration in seconds.
pub async fn probe_duration(path: &Path) -> Result<f64, FfmpegError> {
    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let probe = serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))?;
    Ok(parse_duration(&probe))
}

/// Parse the media duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Try format-level duration first.
    if let Some(secs) = probe.format.duration.as_deref().and_then(|d| d.parse().ok()) {
        return secs;
    }
    // Fall back to the first video stream's duration.
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| s.duration.as_deref())
        .and_then(|d| d.parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn still_video_args_loop_input_for_duration() {
        let args = still_video_args(
            "https://x/1.png",
            Path::new("/tmp/out.mp4"),
            &StillVideoOptions::default(),
        );
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -loop 1 -i https://x/1.png -t 5.000"));
        assert!(joined.contains("scale=1080:1920"));
        assert!(joined.contains("-r 30"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp4"));
    }

    #[test]
    fn validate_rejects_odd_dimensions_and_bad_duration() {
        let odd = StillVideoOptions {
            width: 1081,
            ..Default::default()
        };
        assert_matches!(odd.validate(), Err(FfmpegError::InvalidArgument(_)));

        let zero = StillVideoOptions {
            duration_secs: 0.0,
            ..Default::default()
        };
        assert_matches!(zero.validate(), Err(FfmpegError::InvalidArgument(_)));

        assert!(StillVideoOptions::default().validate().is_ok());
    }

    #[tokio::test]
    async fn loop_still_image_validates_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let options = StillVideoOptions {
            fps: 0,
            ..Default::default()
        };
        let result = loop_still_image("https://x/1.png", &dir.path().join("o.mp4"), &options).await;
        assert_matches!(result, Err(FfmpegError::InvalidArgument(_)));
    }

    #[test]
    fn only_http_inputs_are_accepted() {
        assert!(check_remote_input("https://x/1.png").is_ok());
        assert!(check_remote_input("HTTP://x/1.png").is_ok());
        for input in [
            "/etc/passwd",
            "file:/etc/passwd",
            "concat:/a.png|/b.png",
            "subfile,,start,0,end,0,,:/etc/hosts",
            "tcp://127.0.0.1:22",
            "https://",
            "https:///etc/passwd",
            "https://x/a b.png",
            "",
        ] {
            assert_matches!(
                check_remote_input(input),
                Err(FfmpegError::InvalidArgument(_)),
                "{input}"
            );
        }
    }

    #[tokio::test]
    async fn loop_still_image_refuses_local_paths() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("o.mp4");
        let result = loop_still_image("/etc/hosts", &output, &StillVideoOptions::default()).await;
        assert_matches!(result, Err(FfmpegError::InvalidArgument(_)));
        assert!(!output.parent().unwrap().exists());
    }

    #[test]
    fn parse_duration_prefers_format() {
        let probe: FfprobeOutput = serde_json::from_str(
            r#"{"streams":[{"codec_type":"video","duration":"3.0"}],"format":{"duration":"5.000000"}}"#,
        )
        .unwrap();
        assert!((parse_duration(&probe) - 5.0).abs() < 0.001);
    }

    #[test]
    fn parse_duration_falls_back_to_video_stream() {
        let probe: FfprobeOutput = serde_json::from_str(
            r#"{"streams":[{"codec_type":"audio","duration":"9.0"},{"codec_type":"video","duration":"4.5"}],"format":{}}"#,
        )
        .unwrap();
        assert!((parse_duration(&probe) - 4.5).abs() < 0.001);
    }

    #[test]
    fn parse_duration_defaults_to_zero() {
        let probe: FfprobeOutput = serde_json::from_str(r#"{"format":{}}"#).unwrap();
        assert_eq!(parse_duration(&probe), 0.0);
    }
}
