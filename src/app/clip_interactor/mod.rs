// Clip interactor - Orchestrates the random clip generation use case

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{error, info, warn, Instrument};

use crate::app::session::{CleanupScheduler, SessionManager};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;
use crate::utils::time;

/// Selection and encoding settings shared by every request
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSettings {
    pub range: DurationRange,
    pub policy: ShortSourcePolicy,
    pub aspect: AspectRatio,
    pub encode: EncodeSettings,
    pub retention: Option<Duration>,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            range: DurationRange::default(),
            policy: ShortSourcePolicy::default(),
            aspect: AspectRatio::VERTICAL,
            encode: EncodeSettings::default(),
            retention: None,
        }
    }
}

/// Per-request overrides of the configured duration range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateRequest {
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipInfo {
    pub filename: String,
    pub start_time: f64,
    pub duration: f64,
    pub end_time: f64,
    pub aspect_ratio: String,
    /// The source was shorter than the sampled length
    pub fallback: bool,
    pub download_url: String,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TranscriptStatus {
    Completed { file_path: PathBuf },
    Failed { message: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderInfo {
    pub filename: String,
    pub download_url: String,
    pub file_path: PathBuf,
}

/// Result of one generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipReport {
    pub success: bool,
    pub session_id: SessionId,
    pub source_path: PathBuf,
    pub video_duration: f64,
    pub clip: ClipInfo,
    pub transcript: TranscriptStatus,
    pub render: Option<RenderInfo>,
    pub expires_at: Option<String>,
    pub elapsed_ms: u64,
    pub message: String,
}

/// Relative URL under which a session file is downloadable
pub fn download_url(session: &SessionId, file_name: &str) -> String {
    format!("/clips/{}/{}", session, file_name)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Interactor for the clip generation use case
pub struct ClipInteractor {
    source_port: Arc<dyn SourcePort>,
    probe_port: Arc<dyn ProbePort>,
    extract_port: Arc<dyn ExtractPort>,
    transcribe_port: Option<Arc<dyn TranscribePort>>,
    render_port: Option<Arc<dyn RenderPort>>,
    sessions: Arc<SessionManager>,
    cleanup: CleanupScheduler,
    settings: ClipSettings,
    permits: Arc<Semaphore>,
}

impl ClipInteractor {
    /// Create new clip interactor with injected ports
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_port: Arc<dyn SourcePort>,
        probe_port: Arc<dyn ProbePort>,
        extract_port: Arc<dyn ExtractPort>,
        transcribe_port: Option<Arc<dyn TranscribePort>>,
        render_port: Option<Arc<dyn RenderPort>>,
        sessions: Arc<SessionManager>,
        cleanup: CleanupScheduler,
        settings: ClipSettings,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            source_port,
            probe_port,
            extract_port,
            transcribe_port,
            render_port,
            sessions,
            cleanup,
            settings,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Generations that could start right now without waiting
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Availability of the probe, extraction and source download tools
    pub async fn tool_status(&self) -> Vec<ToolStatus> {
        let mut tools = vec![
            self.probe_port.status().await,
            self.extract_port.status().await,
        ];
        tools.extend(self.source_port.status().await);
        tools
    }

    /// Fetch, probe, select, extract, transcribe and render one clip
    pub async fn execute(&self, request: GenerateRequest) -> Result<ClipReport, DomainError> {
        let range = self
            .settings
            .range
            .with_overrides(request.min_duration, request.max_duration)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DomainError::Io("Job queue is closed".to_string()))?;

        let session = SessionId::generate();
        let span = tracing::info_span!("generate", session = %session);
        let started = Instant::now();

        let result = self
            .generate(&session, range, started)
            .instrument(span)
            .await;

        if let Err(e) = &result {
            error!(session = %session, kind = e.kind(), error = %e, "Clip generation failed");
            if let Err(cleanup_err) = self.sessions.remove(&session).await {
                warn!(session = %session, error = %cleanup_err, "Could not remove failed session");
            }
        }
        result
    }

    async fn generate(
        &self,
        session: &SessionId,
        range: DurationRange,
        started: Instant,
    ) -> Result<ClipReport, DomainError> {
        let source_path = self.source_port.ensure_local().await?;
        let source = self.probe(&source_path).await?;
        let plan = self.select(&source, range)?;

        let scratch = self.sessions.scratch(session)?;
        let scratch_clip = scratch.path().join(self.sessions.clip_name());
        self.extract_port
            .extract(&self.job(&source.path, &scratch_clip, plan))
            .await?;

        let clip_path = self.sessions.clip_path(session);
        self.sessions.publish(&scratch_clip, &clip_path).await?;
        drop(scratch);

        let transcript = self.transcribe(session, &clip_path).await;
        let render = self.render(session, &clip_path).await?;

        let expires_at = self.settings.retention.map(|retention| {
            self.cleanup.schedule(session.clone(), retention);
            time::rfc3339_in(retention)
        });

        let clip_name = file_name_of(&clip_path);
        let report = ClipReport {
            success: true,
            session_id: session.clone(),
            source_path: source.path.clone(),
            video_duration: source.duration_secs,
            clip: ClipInfo {
                download_url: download_url(session, &clip_name),
                filename: clip_name,
                start_time: plan.start_secs,
                duration: plan.duration_secs,
                end_time: plan.end_secs(),
                aspect_ratio: self.settings.aspect.to_string(),
                fallback: plan.fallback,
                file_path: clip_path,
            },
            transcript,
            render,
            expires_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
            message: if plan.fallback {
                "Source shorter than requested; clip covers the whole source".to_string()
            } else {
                "Clip generated successfully".to_string()
            },
        };

        info!(
            session = %session,
            start = plan.start_secs,
            duration = plan.duration_secs,
            fallback = plan.fallback,
            elapsed_ms = report.elapsed_ms,
            "Clip generated"
        );
        Ok(report)
    }

    /// Probe, select and extract a clip from a local file, outside any session
    pub async fn clip_file(
        &self,
        input: &Path,
        output: &Path,
        range: DurationRange,
        policy: ShortSourcePolicy,
    ) -> Result<(SourceVideo, ClipPlan), DomainError> {
        let source = self.probe(input).await?;
        let plan = {
            let mut rng = rand::thread_rng();
            ClipSelector::select_clip(&mut rng, source.duration_secs, range, policy)?
        };
        ClipSelector::validate_plan(&plan, source.duration_secs)?;
        self.extract_port
            .extract(&self.job(&source.path, output, plan))
            .await?;
        Ok((source, plan))
    }

    async fn probe(&self, path: &Path) -> Result<SourceVideo, DomainError> {
        let duration = self.probe_port.probe_duration(path).await?;
        SourceVideo::new(path, duration)
    }

    fn select(&self, source: &SourceVideo, range: DurationRange) -> Result<ClipPlan, DomainError> {
        let mut rng = rand::thread_rng();
        let plan =
            ClipSelector::select_clip(&mut rng, source.duration_secs, range, self.settings.policy)?;
        ClipSelector::validate_plan(&plan, source.duration_secs)?;
        info!(total = source.duration_secs, range = %range, plan = %plan, "Clip selected");
        Ok(plan)
    }

    fn job(&self, source: &Path, output: &Path, plan: ClipPlan) -> ExtractionJob {
        ExtractionJob {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            plan,
            aspect: self.settings.aspect,
            encode: self.settings.encode.clone(),
        }
    }

    async fn transcribe(&self, session: &SessionId, clip_path: &Path) -> TranscriptStatus {
        let Some(port) = &self.transcribe_port else {
            return TranscriptStatus::Skipped;
        };
        let invocation = ToolInvocation {
            session: session.clone(),
            input: clip_path.to_path_buf(),
            output: self.sessions.transcript_path(session),
        };
        match port.transcribe(&invocation).await {
            Ok(_) => TranscriptStatus::Completed {
                file_path: invocation.output,
            },
            Err(e) => {
                warn!(session = %session, error = %e, "Transcription failed, continuing without captions");
                TranscriptStatus::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn render(
        &self,
        session: &SessionId,
        clip_path: &Path,
    ) -> Result<Option<RenderInfo>, DomainError> {
        let Some(port) = &self.render_port else {
            return Ok(None);
        };
        let invocation = ToolInvocation {
            session: session.clone(),
            input: clip_path.to_path_buf(),
            output: self.sessions.render_path(session),
        };
        port.render(&invocation).await?;

        let filename = file_name_of(&invocation.output);
        Ok(Some(RenderInfo {
            download_url: download_url(session, &filename),
            filename,
            file_path: invocation.output,
        }))
    }
}
