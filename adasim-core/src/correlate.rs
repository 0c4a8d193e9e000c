//! Links alerts to the sensor samples that most plausibly caused them.

use adasim_model::{Alert, AlertId, SampleId, SensorSample, TrackId};
use std::collections::HashMap;

/// Resolve alert-to-sample links by track identity and temporal order.
///
/// Samples are scanned in ascending frame-index order while a map of
/// track id to the most recent sample of that track is maintained. Each
/// alert carrying a track id resolves to that track's recorded sample;
/// an absent track leaves the alert uncorrelated, which is a valid
/// permanent outcome. Alerts without a track id are never correlated.
///
/// When two samples of one track share a frame index, the later sample
/// in batch order wins.
///
/// Pure and deterministic; the caller applies the returned links.
pub fn correlate(
    alerts: &[Alert],
    samples: &[SensorSample],
) -> Vec<(AlertId, SampleId)> {
    let mut latest: HashMap<TrackId, (u32, SampleId)> = HashMap::new();

    let mut ordered: Vec<&SensorSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.frame_index);

    for sample in ordered {
        let Some(track_id) = sample.track_id else {
            continue;
        };
        match latest.get(&track_id) {
            Some((frame, _)) if *frame > sample.frame_index => {}
            _ => {
                latest.insert(track_id, (sample.frame_index, sample.id));
            }
        }
    }

    alerts
        .iter()
        .filter_map(|alert| {
            let track_id = alert.track_id?;
            let (_, sample_id) = latest.get(&track_id)?;
            Some((alert.id, *sample_id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adasim_model::{
        AlertType, LaneStatus, RunId, Severity, UserId, VehicleId,
    };
    use chrono::Utc;

    fn sample(run_id: RunId, frame_index: u32, track_id: Option<i64>) -> SensorSample {
        SensorSample {
            id: SampleId::new(),
            run_id,
            vehicle_id: VehicleId::new(),
            user_id: UserId::new(),
            timestamp: Utc::now(),
            frame_index,
            track_id: track_id.map(TrackId),
            speed: Some(12.5),
            distance_to_object: Some(4.0),
            lane_status: LaneStatus::Within,
            obstacle_detected: false,
            ttc: None,
            camera_frame_url: None,
        }
    }

    fn alert(run_id: RunId, track_id: Option<i64>) -> Alert {
        Alert {
            id: AlertId::new(),
            run_id,
            vehicle_id: VehicleId::new(),
            user_id: UserId::new(),
            alert_type: AlertType::Obstacle,
            severity: Severity::High,
            description: "obstacle ahead".to_string(),
            track_id: track_id.map(TrackId),
            sample_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn resolves_to_latest_sample_of_track() {
        let run_id = RunId::new();
        let early = sample(run_id, 3, Some(7));
        let late = sample(run_id, 10, Some(7));
        let other_track = sample(run_id, 20, Some(9));
        let a = alert(run_id, Some(7));

        let links = correlate(
            &[a.clone()],
            &[late.clone(), early, other_track],
        );

        assert_eq!(links, vec![(a.id, late.id)]);
    }

    #[test]
    fn missing_track_leaves_alert_uncorrelated() {
        let run_id = RunId::new();
        let s = sample(run_id, 5, Some(1));
        let a = alert(run_id, Some(42));

        assert!(correlate(&[a], &[s]).is_empty());
    }

    #[test]
    fn trackless_alerts_are_never_correlated() {
        let run_id = RunId::new();
        let s = sample(run_id, 5, Some(1));
        let a = alert(run_id, None);

        assert!(correlate(&[a], &[s]).is_empty());
    }

    #[test]
    fn trackless_samples_are_skipped() {
        let run_id = RunId::new();
        let untracked = sample(run_id, 50, None);
        let tracked = sample(run_id, 2, Some(3));
        let a = alert(run_id, Some(3));

        let links = correlate(&[a.clone()], &[untracked, tracked.clone()]);

        assert_eq!(links, vec![(a.id, tracked.id)]);
    }

    #[test]
    fn equal_frame_index_prefers_later_batch_entry() {
        let run_id = RunId::new();
        let first = sample(run_id, 8, Some(4));
        let second = sample(run_id, 8, Some(4));
        let a = alert(run_id, Some(4));

        let links = correlate(&[a.clone()], &[first, second.clone()]);

        assert_eq!(links, vec![(a.id, second.id)]);
    }

    #[test]
    fn multiple_alerts_share_one_track_resolution() {
        let run_id = RunId::new();
        let s = sample(run_id, 1, Some(11));
        let a1 = alert(run_id, Some(11));
        let a2 = alert(run_id, Some(11));

        let links = correlate(&[a1.clone(), a2.clone()], &[s.clone()]);

        assert_eq!(links, vec![(a1.id, s.id), (a2.id, s.id)]);
    }
}
