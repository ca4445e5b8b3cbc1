// Domain rules - Business logic and policies

use rand::Rng;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Business rules for picking a random clip inside a source video
pub struct ClipSelector;

impl ClipSelector {
    /// Sample a whole-second duration from `range` and a start offset that keeps
    /// the clip inside the source.
    ///
    /// When the source cannot hold the sampled duration, `policy` decides between
    /// a degraded plan from offset zero and a `ClipTooLong` rejection.
    pub fn select_clip<R: Rng + ?Sized>(
        rng: &mut R,
        total_secs: f64,
        range: DurationRange,
        policy: ShortSourcePolicy,
    ) -> Result<ClipPlan, DomainError> {
        if !total_secs.is_finite() || total_secs <= 0.0 {
            return Err(DomainError::ProbeFailure(format!(
                "Unusable source duration: {}",
                total_secs
            )));
        }
        let range = DurationRange::new(range.min_secs, range.max_secs)?;

        let clip_secs = f64::from(rng.gen_range(range.min_secs..=range.max_secs));
        let max_start = total_secs - clip_secs;

        if max_start > 0.0 {
            return Ok(ClipPlan {
                start_secs: rng.gen_range(0.0..=max_start),
                duration_secs: clip_secs,
                fallback: false,
            });
        }

        match policy {
            ShortSourcePolicy::Fallback => {
                tracing::warn!(
                    total_secs,
                    requested_secs = clip_secs,
                    "Source shorter than sampled clip, using it from the start"
                );
                Ok(ClipPlan {
                    start_secs: 0.0,
                    duration_secs: total_secs.min(f64::from(range.max_secs)),
                    fallback: true,
                })
            }
            // Exact fit still produces a full-length clip
            ShortSourcePolicy::Reject if max_start == 0.0 => Ok(ClipPlan {
                start_secs: 0.0,
                duration_secs: clip_secs,
                fallback: false,
            }),
            ShortSourcePolicy::Reject => Err(DomainError::ClipTooLong {
                total: total_secs,
                requested: clip_secs,
            }),
        }
    }

    /// Check a plan against the source it was made for
    pub fn validate_plan(plan: &ClipPlan, total_secs: f64) -> Result<(), DomainError> {
        if plan.start_secs < 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Clip start {:.3}s is negative",
                plan.start_secs
            )));
        }
        if plan.duration_secs <= 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Clip duration {:.3}s is not positive",
                plan.duration_secs
            )));
        }
        if plan.end_secs() > total_secs {
            return Err(DomainError::BadArgs(format!(
                "Clip ends at {:.3}s, past the source end at {:.3}s",
                plan.end_secs(),
                total_secs
            )));
        }
        Ok(())
    }
}
