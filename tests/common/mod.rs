//! Shared test doubles for the pipeline and HTTP tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use shortclip::adapters::toml_config::AppConfig;
use shortclip::app::{DefaultAppContainer, Ports};
use shortclip::domain::errors::DomainError;
use shortclip::domain::model::{ExtractionJob, ToolOutput, ToolStatus};
use shortclip::ports::*;

fn ok_output() -> ToolOutput {
    ToolOutput {
        success: true,
        exit_code: Some(0),
        ..ToolOutput::default()
    }
}

fn write_file(path: &Path, contents: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Source that is always present locally
pub struct StaticSource {
    pub path: PathBuf,
}

#[async_trait]
impl SourcePort for StaticSource {
    async fn ensure_local(&self) -> Result<PathBuf, DomainError> {
        Ok(self.path.clone())
    }
}

/// Probe answering a fixed duration (or error)
pub struct FixedProbe {
    pub result: Result<f64, DomainError>,
    pub available: bool,
}

impl FixedProbe {
    pub fn secs(total: f64) -> Self {
        Self {
            result: Ok(total),
            available: true,
        }
    }
}

#[async_trait]
impl ProbePort for FixedProbe {
    async fn probe_duration(&self, _file_path: &Path) -> Result<f64, DomainError> {
        self.result.clone()
    }

    async fn status(&self) -> ToolStatus {
        ToolStatus {
            name: "probe".to_string(),
            program: "fake-probe".to_string(),
            available: self.available,
        }
    }
}

/// Extractor that writes a placeholder clip and records every job
#[derive(Default)]
pub struct RecordingExtractor {
    pub calls: AtomicUsize,
    pub jobs: Mutex<Vec<ExtractionJob>>,
    pub fail: bool,
    /// Time each extraction takes
    pub delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingExtractor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most extractions ever running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn last_job(&self) -> Option<ExtractionJob> {
        self.jobs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ExtractPort for RecordingExtractor {
    async fn extract(&self, job: &ExtractionJob) -> Result<ToolOutput, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().unwrap().push(job.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(DomainError::ExtractionFailure {
                message: "ffmpeg exited with Some(1)".to_string(),
                stderr: Some("Invalid data found when processing input".to_string()),
            });
        }
        write_file(&job.output, b"clip");
        Ok(ok_output())
    }

    async fn status(&self) -> ToolStatus {
        ToolStatus {
            name: "extract".to_string(),
            program: "fake-ffmpeg".to_string(),
            available: true,
        }
    }
}

/// Transcriber/renderer that writes its output file unless told to fail
#[derive(Default)]
pub struct FakeTool {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeTool {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn run(&self, invocation: &ToolInvocation, contents: &[u8]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return false;
        }
        assert!(invocation.input.exists(), "tool input must exist");
        write_file(&invocation.output, contents);
        true
    }
}

#[async_trait]
impl TranscribePort for FakeTool {
    async fn transcribe(&self, invocation: &ToolInvocation) -> Result<ToolOutput, DomainError> {
        if self.run(invocation, b"{\"segments\":[]}") {
            Ok(ok_output())
        } else {
            Err(DomainError::TranscriptionFailure("node exited with Some(1)".to_string()))
        }
    }
}

#[async_trait]
impl RenderPort for FakeTool {
    async fn render(&self, invocation: &ToolInvocation) -> Result<ToolOutput, DomainError> {
        if self.run(invocation, b"rendered") {
            Ok(ok_output())
        } else {
            Err(DomainError::RenderFailure("npx exited with Some(1)".to_string()))
        }
    }
}

/// Temp workspace plus the doubles wired into a container
pub struct Harness {
    pub dir: TempDir,
    pub extractor: Arc<RecordingExtractor>,
    pub transcriber: Arc<FakeTool>,
    pub renderer: Arc<FakeTool>,
    pub container: Arc<DefaultAppContainer>,
}

pub struct HarnessBuilder {
    probe: FixedProbe,
    extractor: RecordingExtractor,
    transcriber: FakeTool,
    renderer: FakeTool,
    with_steps: bool,
    configure: Box<dyn FnOnce(&mut AppConfig)>,
}

impl HarnessBuilder {
    pub fn new(total_secs: f64) -> Self {
        Self {
            probe: FixedProbe::secs(total_secs),
            extractor: RecordingExtractor::default(),
            transcriber: FakeTool::default(),
            renderer: FakeTool::default(),
            with_steps: true,
            configure: Box::new(|_| {}),
        }
    }

    pub fn probe(mut self, probe: FixedProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn failing_extractor(mut self) -> Self {
        self.extractor.fail = true;
        self
    }

    pub fn slow_extractor(mut self, delay: Duration) -> Self {
        self.extractor.delay = Some(delay);
        self
    }

    pub fn transcriber(mut self, tool: FakeTool) -> Self {
        self.transcriber = tool;
        self
    }

    pub fn renderer(mut self, tool: FakeTool) -> Self {
        self.renderer = tool;
        self
    }

    /// Leave out transcription and render entirely
    pub fn without_steps(mut self) -> Self {
        self.with_steps = false;
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut AppConfig) + 'static) -> Self {
        self.configure = Box::new(f);
        self
    }

    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source").join("video.mp4");
        write_file(&source, b"source");

        let mut config = AppConfig::default();
        config.source.path = source.clone();
        config.storage.work_dir = dir.path().join("work");
        config.storage.public_dir = dir.path().join("public");
        config.storage.out_dir = dir.path().join("out");
        config
            .storage
            .static_roots
            .insert("public".to_string(), dir.path().join("public"));
        config
            .storage
            .static_roots
            .insert("out".to_string(), dir.path().join("out"));
        config.runtime.max_concurrent_jobs = 2;
        (self.configure)(&mut config);

        let extractor = Arc::new(self.extractor);
        let transcriber = Arc::new(self.transcriber);
        let renderer = Arc::new(self.renderer);
        let ports = Ports {
            source: Arc::new(StaticSource { path: source }),
            probe: Arc::new(self.probe),
            extract: extractor.clone() as Arc<dyn ExtractPort>,
            transcribe: self
                .with_steps
                .then(|| transcriber.clone() as Arc<dyn TranscribePort>),
            render: self
                .with_steps
                .then(|| renderer.clone() as Arc<dyn RenderPort>),
        };
        let container = Arc::new(DefaultAppContainer::with_ports(config, ports).unwrap());

        Harness {
            dir,
            extractor,
            transcriber,
            renderer,
            container,
        }
    }
}

impl Harness {
    pub fn public_dir(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Entries directly under `dir`, or none when it does not exist
    pub fn entries(dir: &Path) -> Vec<String> {
        match std::fs::read_dir(dir) {
            Ok(rd) => rd
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
