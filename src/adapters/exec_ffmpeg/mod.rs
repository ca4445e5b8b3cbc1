//! FFmpeg execution adapter
//!
//! Cuts the planned interval, crops it to the target aspect ratio and re-encodes.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::adapters::process::{is_program_available, ToolCommand};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Builder for the ffmpeg argument list
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    input_args: Vec<String>,
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Seek in the input before decoding
    pub fn seek(mut self, seconds: f64) -> Self {
        self.input_args.push("-ss".to_string());
        self.input_args.push(timestamp(seconds));
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.output_args.push("-t".to_string());
        self.output_args.push(timestamp(seconds));
        self
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.clone()];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Full command for one extraction job
    pub fn for_job(job: &ExtractionJob) -> Self {
        Self::new(&job.source, &job.output)
            .seek(job.plan.start_secs)
            .duration(job.plan.duration_secs)
            .video_filter(job.aspect.crop_filter())
            .video_codec(&job.encode.video_codec)
            .audio_codec(&job.encode.audio_codec)
            .preset(&job.encode.preset)
    }
}

/// Seconds with millisecond precision, truncated so `-ss` + `-t` never pass the planned end
fn timestamp(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).floor() as u64;
    format!("{}.{:03}", millis / 1000, millis % 1000)
}

/// FFmpeg-based execution adapter
pub struct FFmpegAdapter {
    program: String,
    timeout: Option<Duration>,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ExtractPort for FFmpegAdapter {
    async fn extract(&self, job: &ExtractionJob) -> Result<ToolOutput, DomainError> {
        if let Some(parent) = job.output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::io(parent.display(), e))?;
        }

        let args = FfmpegCommand::for_job(job).build_args();
        info!(
            source = %job.source.display(),
            output = %job.output.display(),
            start = job.plan.start_secs,
            duration = job.plan.duration_secs,
            aspect = %job.aspect,
            "Extracting clip"
        );

        let started = Instant::now();
        let output = ToolCommand::new(&self.program)
            .args(args)
            .timeout(self.timeout)
            .run()
            .await
            .map_err(|e| DomainError::ExtractionFailure {
                message: e.to_string(),
                stderr: None,
            })?;

        if !output.success {
            warn!(stderr = %output.stderr_tail(10), "ffmpeg failed");
            return Err(DomainError::ExtractionFailure {
                message: format!("ffmpeg exited with {:?}", output.exit_code),
                stderr: Some(output.stderr_tail(20)),
            });
        }

        info!(
            output = %job.output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Clip extracted"
        );
        Ok(output)
    }

    async fn status(&self) -> ToolStatus {
        ToolStatus {
            name: "extract".to_string(),
            program: self.program.clone(),
            available: is_program_available(&self.program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ExtractionJob {
        ExtractionJob {
            source: PathBuf::from("/videos/source.mp4"),
            output: PathBuf::from("/work/s1/clip.mp4"),
            plan: ClipPlan {
                start_secs: 12.3456,
                duration_secs: 42.0,
                fallback: false,
            },
            aspect: AspectRatio::VERTICAL,
            encode: EncodeSettings::default(),
        }
    }

    #[test]
    fn test_build_args_for_job() {
        let args = FfmpegCommand::for_job(&job()).build_args();
        let expected: Vec<String> = [
            "-y",
            "-v",
            "error",
            "-ss",
            "12.345",
            "-i",
            "/videos/source.mp4",
            "-t",
            "42.000",
            "-vf",
            "crop='trunc(min(iw,ih*9/16)/2)*2':'trunc(min(ih,iw*16/9)/2)*2':(iw-ow)/2:(ih-oh)/2",
            "-c:v",
            "libx264",
            "-c:a",
            "aac",
            "-preset",
            "fast",
            "/work/s1/clip.mp4",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_timestamps_truncate_to_millis() {
        let mut job = job();
        job.plan = ClipPlan {
            start_secs: 57.9996,
            duration_secs: 42.0,
            fallback: false,
        };
        let args = FfmpegCommand::for_job(&job).build_args();
        let value = |flag: &str| {
            let at = args.iter().position(|a| a == flag).unwrap();
            args[at + 1].clone()
        };
        assert_eq!(value("-ss"), "57.999");
        assert_eq!(value("-t"), "42.000");
        let end: f64 = value("-ss").parse::<f64>().unwrap() + value("-t").parse::<f64>().unwrap();
        assert!(end <= 57.9996 + 42.0);

        assert_eq!(timestamp(45.6789), "45.678");
        assert_eq!(timestamp(0.0), "0.000");
        assert_eq!(timestamp(3725.5), "3725.500");
    }

    #[test]
    fn test_seek_precedes_input() {
        let args = FfmpegCommand::for_job(&job()).build_args();
        let seek = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(seek < input);
        assert_eq!(args.last().unwrap(), "/work/s1/clip.mp4");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_tool_is_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job();
        job.output = dir.path().join("nested").join("clip.mp4");

        let adapter = FFmpegAdapter::new("false", None);
        let err = adapter.extract(&job).await.unwrap_err();
        assert_eq!(err.kind(), "extraction_failure");
        assert!(dir.path().join("nested").is_dir());
    }
}
