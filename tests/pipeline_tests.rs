//! Generation pipeline tests against test doubles for every external tool

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeTool, FixedProbe, Harness, HarnessBuilder};
use shortclip::app::clip_interactor::{GenerateRequest, TranscriptStatus};
use shortclip::app::AppContainer;
use shortclip::domain::errors::DomainError;
use shortclip::domain::model::{AspectRatio, ShortSourcePolicy};

#[tokio::test]
async fn test_generates_clip_inside_source() {
    let h = HarnessBuilder::new(100.0).build();
    let report = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.video_duration, 100.0);
    assert!((30.0..=60.0).contains(&report.clip.duration));
    assert_eq!(report.clip.duration.fract(), 0.0);
    assert!(report.clip.start_time >= 0.0);
    assert!(report.clip.start_time + report.clip.duration <= 100.0);
    assert!(!report.clip.fallback);
    assert_eq!(report.clip.aspect_ratio, "9:16");

    assert!(report.clip.file_path.is_file());
    assert_eq!(
        report.clip.download_url,
        format!("/clips/{}/clip.mp4", report.session_id)
    );
    assert!(matches!(report.transcript, TranscriptStatus::Completed { .. }));
    let render = report.render.expect("render enabled");
    assert!(render.file_path.is_file());
    assert_eq!(render.filename, "CaptionedVideo.mp4");
    assert!(report.expires_at.is_none());

    // Scratch space does not outlive the request
    assert!(Harness::entries(&h.work_dir()).is_empty());
}

#[tokio::test]
async fn test_extraction_job_carries_plan_and_encoding() {
    let h = HarnessBuilder::new(100.0).build();
    let report = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap();

    let job = h.extractor.last_job().unwrap();
    assert_eq!(job.plan.start_secs, report.clip.start_time);
    assert_eq!(job.plan.duration_secs, report.clip.duration);
    assert_eq!(job.aspect, AspectRatio::VERTICAL);
    assert_eq!(job.encode.video_codec, "libx264");
    assert_eq!(job.encode.audio_codec, "aac");
    assert_eq!(job.encode.preset, "fast");
    assert!(job.source.ends_with("source/video.mp4"));
}

#[tokio::test]
async fn test_short_source_falls_back_to_whole_video() {
    let h = HarnessBuilder::new(45.0).build();
    let report = h
        .container
        .clip_interactor()
        .execute(GenerateRequest {
            min_duration: Some(50),
            max_duration: Some(60),
        })
        .await
        .unwrap();

    assert!(report.clip.fallback);
    assert_eq!(report.clip.start_time, 0.0);
    assert_eq!(report.clip.duration, 45.0);
}

#[tokio::test]
async fn test_reject_policy_refuses_short_source() {
    let h = HarnessBuilder::new(10.0)
        .configure(|c| c.clip.short_source_policy = ShortSourcePolicy::Reject)
        .build();
    let err = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::ClipTooLong { .. }));
    assert_eq!(h.extractor.calls(), 0);
    assert!(Harness::entries(&h.public_dir()).is_empty());
}

#[tokio::test]
async fn test_probe_failure_skips_extraction() {
    let h = HarnessBuilder::new(0.0)
        .probe(FixedProbe {
            result: Err(DomainError::ProbeFailure("ffprobe exited with Some(1)".into())),
            available: true,
        })
        .build();
    let err = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "probe_failure");
    assert_eq!(h.extractor.calls(), 0);
    assert_eq!(h.transcriber.calls(), 0);
}

#[tokio::test]
async fn test_unusable_probe_duration_is_probe_failure() {
    let h = HarnessBuilder::new(f64::NAN).build();
    let err = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "probe_failure");
    assert_eq!(h.extractor.calls(), 0);
}

#[tokio::test]
async fn test_extraction_failure_keeps_stderr() {
    let h = HarnessBuilder::new(100.0).failing_extractor().build();
    let err = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap_err();

    match err {
        DomainError::ExtractionFailure { stderr, .. } => {
            assert!(stderr.unwrap().contains("Invalid data"))
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.transcriber.calls(), 0);
    assert!(Harness::entries(&h.work_dir()).is_empty());
}

#[tokio::test]
async fn test_transcription_failure_is_not_fatal() {
    let h = HarnessBuilder::new(100.0)
        .transcriber(FakeTool::failing())
        .build();
    let report = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap();

    assert!(report.success);
    assert!(matches!(report.transcript, TranscriptStatus::Failed { .. }));
    assert_eq!(h.renderer.calls(), 1);
}

#[tokio::test]
async fn test_render_failure_fails_and_removes_session() {
    let h = HarnessBuilder::new(100.0)
        .renderer(FakeTool::failing())
        .build();
    let err = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "render_failure");
    assert!(Harness::entries(&h.public_dir()).is_empty());
}

#[tokio::test]
async fn test_request_overrides_duration_range() {
    let h = HarnessBuilder::new(100.0).build();
    let report = h
        .container
        .clip_interactor()
        .execute(GenerateRequest {
            min_duration: Some(40),
            max_duration: Some(40),
        })
        .await
        .unwrap();
    assert_eq!(report.clip.duration, 40.0);
    assert!(report.clip.start_time <= 60.0);

    let err = h
        .container
        .clip_interactor()
        .execute(GenerateRequest {
            min_duration: Some(50),
            max_duration: Some(40),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BadArgs(_)));
}

#[tokio::test]
async fn test_concurrent_requests_use_separate_sessions() {
    let h = HarnessBuilder::new(100.0).build();
    let clips = h.container.clip_interactor();

    let (a, b, c) = tokio::join!(
        clips.execute(GenerateRequest::default()),
        clips.execute(GenerateRequest::default()),
        clips.execute(GenerateRequest::default()),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_ne!(a.session_id, b.session_id);
    assert_ne!(b.session_id, c.session_id);
    assert_ne!(a.clip.file_path, c.clip.file_path);
    assert_eq!(Harness::entries(&h.public_dir()).len(), 3);
    assert_eq!(h.extractor.calls(), 3);
    assert_eq!(clips.available_slots(), 2);
}

#[tokio::test]
async fn test_generations_are_limited_to_max_concurrent_jobs() {
    let h = HarnessBuilder::new(100.0)
        .slow_extractor(Duration::from_millis(100))
        .build();
    let clips = h.container.clip_interactor();

    let results = futures::future::join_all(
        (0..5).map(|_| clips.execute(GenerateRequest::default())),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(h.extractor.calls(), 5);
    assert_eq!(h.extractor.peak_in_flight(), 2);
    assert_eq!(clips.available_slots(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_job_limit_serializes_generations() {
    let h = HarnessBuilder::new(100.0)
        .slow_extractor(Duration::from_millis(50))
        .configure(|c| c.runtime.max_concurrent_jobs = 1)
        .build();
    let container = Arc::clone(&h.container);

    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let container = Arc::clone(&container);
            tokio::spawn(async move {
                container
                    .clip_interactor()
                    .execute(GenerateRequest::default())
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.extractor.calls(), 3);
    assert_eq!(h.extractor.peak_in_flight(), 1);
}

#[tokio::test]
async fn test_retention_removes_session_after_expiry() {
    let h = HarnessBuilder::new(100.0)
        .configure(|c| c.storage.retention_secs = Some(1))
        .build();
    let report = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap();
    assert!(report.expires_at.is_some());
    assert!(report.clip.file_path.exists());

    let mut gone = false;
    for _ in 0..60 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if !report.clip.file_path.exists() {
            gone = true;
            break;
        }
    }
    assert!(gone, "session should be removed once retention expires");
}

#[tokio::test]
async fn test_missing_steps_are_skipped() {
    let h = HarnessBuilder::new(100.0).without_steps().build();
    let report = h
        .container
        .clip_interactor()
        .execute(GenerateRequest::default())
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.transcript, TranscriptStatus::Skipped);
    assert!(report.render.is_none());
    assert_eq!(h.transcriber.calls(), 0);
    assert_eq!(h.renderer.calls(), 0);
}
