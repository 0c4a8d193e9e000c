use crate::alert::Alert;
use crate::ids::RunId;
use crate::run::{RunStatus, RunSummary};

/// Real-time event pushed to an owner's connected sessions.
///
/// Delivery is at-most-once per connected session; owners with no
/// connected session simply miss the event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "event", content = "data", rename_all = "camelCase")
)]
pub enum ClientEvent {
    /// A new alert was persisted for one of the owner's runs.
    AlertCreated { alert: Alert },
    /// A run reached a terminal status.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    RunStatusChanged {
        run_id: RunId,
        status: RunStatus,
        summary: RunSummary,
        #[cfg_attr(
            feature = "serde",
            serde(skip_serializing_if = "Option::is_none")
        )]
        video_ref: Option<String>,
    },
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use crate::ids::RunId;

    #[test]
    fn run_status_event_serializes_with_tag() {
        let event = ClientEvent::RunStatusChanged {
            run_id: RunId::new(),
            status: RunStatus::Completed,
            summary: RunSummary::default(),
            video_ref: Some("/media/abc.mp4".to_string()),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "runStatusChanged");
        assert_eq!(json["data"]["status"], "completed");
        assert_eq!(json["data"]["videoRef"], "/media/abc.mp4");
    }
}
