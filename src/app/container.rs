use std::sync::Arc;

use crate::adapters::toml_config::{AppConfig, ProbeBackend, SourceBackend};
use crate::adapters::{
    FFmpegAdapter, FFprobeAdapter, HttpSourceAdapter, PipelineRenderer, ScriptTranscriber, YtDlp,
    YtDlpSourceAdapter,
};
use crate::app::{
    clip_interactor::{ClipInteractor, ClipSettings},
    library_interactor::LibraryInteractor,
    session::{CleanupScheduler, SessionManager},
};
use crate::error::{ShortclipError, ShortclipResult};
use crate::ports::{ExtractPort, ProbePort, RenderPort, SourcePort, TranscribePort};

pub trait AppContainer: Send + Sync {
    fn clip_interactor(&self) -> Arc<ClipInteractor>;
    fn library_interactor(&self) -> Arc<LibraryInteractor>;
    fn config(&self) -> &AppConfig;
}

/// The external collaborators of the pipeline
pub struct Ports {
    pub source: Arc<dyn SourcePort>,
    pub probe: Arc<dyn ProbePort>,
    pub extract: Arc<dyn ExtractPort>,
    pub transcribe: Option<Arc<dyn TranscribePort>>,
    pub render: Option<Arc<dyn RenderPort>>,
}

impl Ports {
    /// Real adapters as described by the configuration
    pub fn from_config(config: &AppConfig) -> ShortclipResult<Self> {
        let timeout = config.tools.timeout();

        let source: Arc<dyn SourcePort> = match config.source.backend {
            SourceBackend::Http => {
                let client = reqwest::Client::builder()
                    .user_agent(concat!("shortclip/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .map_err(|e| ShortclipError::HttpClient {
                        message: e.to_string(),
                    })?;
                Arc::new(HttpSourceAdapter::new(
                    client,
                    config.source.url.clone(),
                    config.source.path.clone(),
                    config.source.refresh,
                ))
            }
            SourceBackend::Ytdlp => Arc::new(YtDlpSourceAdapter::new(
                YtDlp::new(&config.tools.ytdlp, timeout),
                config.source.url.clone(),
                config.source.path.clone(),
                config.source.refresh,
            )),
        };

        let probe: Arc<dyn ProbePort> = match config.tools.probe_backend {
            ProbeBackend::Ffprobe => Arc::new(FFprobeAdapter::new(&config.tools.ffprobe, timeout)),
            #[cfg(feature = "libav")]
            ProbeBackend::Libav => Arc::new(crate::adapters::ProbeLibavAdapter::new()?),
            #[cfg(not(feature = "libav"))]
            ProbeBackend::Libav => {
                return Err(ShortclipError::InvalidConfig {
                    message: "probe_backend = \"libav\" requires the libav feature".to_string(),
                })
            }
        };

        let transcribe = config.transcribe.enabled.then(|| {
            Arc::new(ScriptTranscriber::new(config.transcribe.clone(), timeout))
                as Arc<dyn TranscribePort>
        });
        let render = config.render.enabled.then(|| {
            Arc::new(PipelineRenderer::new(config.render.clone(), timeout)) as Arc<dyn RenderPort>
        });

        Ok(Self {
            source,
            probe,
            extract: Arc::new(FFmpegAdapter::new(&config.tools.ffmpeg, timeout)),
            transcribe,
            render,
        })
    }
}

pub struct DefaultAppContainer {
    config: AppConfig,
    clip_interactor: Arc<ClipInteractor>,
    library_interactor: Arc<LibraryInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: AppConfig) -> ShortclipResult<Self> {
        let ports = Ports::from_config(&config)?;
        Self::with_ports(config, ports)
    }

    /// Wire the interactors around the given ports
    pub fn with_ports(config: AppConfig, ports: Ports) -> ShortclipResult<Self> {
        config.validate()?;

        let sessions = Arc::new(SessionManager::new(
            &config.storage,
            &config.transcribe.output_name,
            &config.render.output_name,
        )?);
        let cleanup = CleanupScheduler::new(Arc::clone(&sessions));

        let settings = ClipSettings {
            range: config.clip.duration_range()?,
            policy: config.clip.short_source_policy,
            aspect: config.clip.aspect()?,
            encode: config.clip.encode_settings(),
            retention: config.storage.retention(),
        };

        let clip_interactor = Arc::new(ClipInteractor::new(
            ports.source,
            ports.probe,
            ports.extract,
            ports.transcribe,
            ports.render,
            Arc::clone(&sessions),
            cleanup.clone(),
            settings,
            config.runtime.max_concurrent_jobs,
        ));

        let library_interactor = Arc::new(LibraryInteractor::new(
            sessions,
            cleanup,
            config.storage.retention(),
            &config.storage.static_roots,
        )?);

        Ok(Self {
            config,
            clip_interactor,
            library_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn clip_interactor(&self) -> Arc<ClipInteractor> {
        Arc::clone(&self.clip_interactor)
    }

    fn library_interactor(&self) -> Arc<LibraryInteractor> {
        Arc::clone(&self.library_interactor)
    }

    fn config(&self) -> &AppConfig {
        &self.config
    }
}
