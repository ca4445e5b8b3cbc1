// Domain models - Core types and data structures

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Default lower bound for a sampled clip, in seconds
pub const DEFAULT_MIN_DURATION_SECS: u32 = 30;
/// Default upper bound for a sampled clip, in seconds
pub const DEFAULT_MAX_DURATION_SECS: u32 = 60;

/// Inclusive range of whole-second clip lengths to sample from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min_secs: u32,
    pub max_secs: u32,
}

impl DurationRange {
    /// Create a new range, rejecting empty or inverted bounds
    pub fn new(min_secs: u32, max_secs: u32) -> Result<Self, DomainError> {
        if min_secs == 0 {
            return Err(DomainError::BadArgs(
                "Minimum clip duration must be at least 1 second".to_string(),
            ));
        }
        if min_secs > max_secs {
            return Err(DomainError::BadArgs(format!(
                "Minimum clip duration ({}s) exceeds maximum ({}s)",
                min_secs, max_secs
            )));
        }
        Ok(Self { min_secs, max_secs })
    }

    /// Override one or both bounds, validating the result
    pub fn with_overrides(
        &self,
        min_secs: Option<u32>,
        max_secs: Option<u32>,
    ) -> Result<Self, DomainError> {
        Self::new(
            min_secs.unwrap_or(self.min_secs),
            max_secs.unwrap_or(self.max_secs),
        )
    }
}

impl Default for DurationRange {
    fn default() -> Self {
        Self {
            min_secs: DEFAULT_MIN_DURATION_SECS,
            max_secs: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

impl fmt::Display for DurationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s..={}s", self.min_secs, self.max_secs)
    }
}

/// What to do when the source is shorter than the sampled clip length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortSourcePolicy {
    /// Use the whole source from the start, capped at the range maximum
    #[default]
    Fallback,
    /// Refuse the request with `ClipTooLong`
    Reject,
}

impl ShortSourcePolicy {
    /// Parse policy from string
    pub fn parse(policy_str: &str) -> Result<Self, DomainError> {
        match policy_str.trim().to_lowercase().as_str() {
            "fallback" => Ok(ShortSourcePolicy::Fallback),
            "reject" => Ok(ShortSourcePolicy::Reject),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid short source policy: {}. Valid policies: fallback, reject",
                policy_str
            ))),
        }
    }
}

impl FromStr for ShortSourcePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ShortSourcePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortSourcePolicy::Fallback => write!(f, "fallback"),
            ShortSourcePolicy::Reject => write!(f, "reject"),
        }
    }
}

/// A probed source video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceVideo {
    pub path: PathBuf,
    pub duration_secs: f64,
}

impl SourceVideo {
    /// Create a source from a probed duration; unusable durations are probe failures
    pub fn new(path: impl Into<PathBuf>, duration_secs: f64) -> Result<Self, DomainError> {
        let path = path.into();
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(DomainError::ProbeFailure(format!(
                "Unusable duration {} for {}",
                duration_secs,
                path.display()
            )));
        }
        Ok(Self {
            path,
            duration_secs,
        })
    }
}

/// Selected sub-interval of a source video
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlan {
    pub start_secs: f64,
    pub duration_secs: f64,
    /// Whether the short-source fallback produced this plan
    pub fallback: bool,
}

impl ClipPlan {
    /// End offset of the clip in the source
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

impl fmt::Display for ClipPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "start={:.2}s duration={}s{}",
            self.start_secs,
            self.duration_secs,
            if self.fallback { " (fallback)" } else { "" }
        )
    }
}

/// Output frame aspect ratio, expressed as width:height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// 9:16 portrait frame
    pub const VERTICAL: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Create a new aspect ratio
    pub fn new(width: u32, height: u32) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::BadArgs(
                "Aspect ratio terms must be non-zero".to_string(),
            ));
        }
        Ok(Self { width, height })
    }

    /// Parse "W:H"
    pub fn parse(ratio_str: &str) -> Result<Self, DomainError> {
        let (w, h) = ratio_str.trim().split_once(':').ok_or_else(|| {
            DomainError::BadArgs(format!("Invalid aspect ratio: {}", ratio_str))
        })?;
        let width = w
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid aspect ratio width: {}", w)))?;
        let height = h
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid aspect ratio height: {}", h)))?;
        Self::new(width, height)
    }

    /// Centred crop filter for ffmpeg that keeps as much of the frame as possible.
    /// Both sides are rounded down to even values for yuv420p encoders.
    pub fn crop_filter(&self) -> String {
        let (w, h) = (self.width, self.height);
        format!(
            "crop='trunc(min(iw,ih*{w}/{h})/2)*2':'trunc(min(ih,iw*{h}/{w})/2)*2':(iw-ow)/2:(ih-oh)/2",
            w = w,
            h = h
        )
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::VERTICAL
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Encoder settings for the re-encode of an extracted clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "fast".to_string(),
        }
    }
}

/// Everything the extraction tool needs to cut one clip
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub plan: ClipPlan,
    pub aspect: AspectRatio,
    pub encode: EncodeSettings,
}

/// Captured result of an external tool run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Last few stderr lines, for error messages
    pub fn stderr_tail(&self, lines: usize) -> String {
        let collected: Vec<&str> = self.stderr.lines().collect();
        let start = collected.len().saturating_sub(lines);
        collected[start..].join("\n")
    }
}

/// Per-request token namespacing every artifact of one generation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    const STAMP_FORMAT: &'static str = "%Y%m%d_%H%M%S_%3f";
    const STAMP_LEN: usize = 19;
    const SUFFIX_LEN: usize = 8;

    /// Generate a fresh id: creation timestamp plus a random suffix
    pub fn generate() -> Self {
        let stamp = chrono::Local::now().format(Self::STAMP_FORMAT);
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", stamp, &suffix[..Self::SUFFIX_LEN]))
    }

    /// Accept an id coming from outside (URL path or directory name).
    ///
    /// Only the shape produced by [`SessionId::generate`] is valid,
    /// `YYYYMMDD_HHMMSS_mmm-xxxxxxxx`, so other directories sharing the
    /// output roots are never mistaken for sessions.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if !Self::is_generated(raw) {
            return Err(DomainError::BadArgs(format!("Invalid session id: {}", raw)));
        }
        Ok(Self(raw.to_string()))
    }

    fn is_generated(raw: &str) -> bool {
        let Some((stamp, suffix)) = raw.split_once('-') else {
            return false;
        };
        let digits_at = |range: std::ops::Range<usize>| {
            stamp.as_bytes()[range].iter().all(u8::is_ascii_digit)
        };
        stamp.len() == Self::STAMP_LEN
            && stamp.is_ascii()
            && digits_at(0..8)
            && digits_at(9..15)
            && digits_at(16..19)
            && stamp.as_bytes()[8] == b'_'
            && stamp.as_bytes()[15] == b'_'
            && chrono::NaiveDateTime::parse_from_str(&stamp[..15], "%Y%m%d_%H%M%S").is_ok()
            && suffix.len() == Self::SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Availability of one external tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub program: String,
    pub available: bool,
}
