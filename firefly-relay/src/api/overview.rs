use axum::{Json, extract::State, response::Html};
use firefly_core::{LedState, StatusRecord};
use serde::Serialize;

use super::ApiState;

/// Relay liveness metadata. This is about the relay process itself, not the
/// device status.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub server: &'static str,
    pub uptime_seconds: u64,
    pub subscribers: usize,
    pub queued: usize,
    pub published: u64,
    pub dropped: u64,
    pub timestamp: String,
}

/// GET /status
pub async fn liveness(State(state): State<ApiState>) -> Json<LivenessResponse> {
    let stats = state.mailbox.stats();
    Json(LivenessResponse {
        server: "firefly-relay",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        subscribers: state.registry.len().await,
        queued: stats.queued,
        published: stats.published,
        dropped: stats.dropped,
        timestamp: jiff::Timestamp::now().to_string(),
    })
}

/// Human-viewable snapshot of the latest status.
///
/// GET /
pub async fn index(State(state): State<ApiState>) -> Html<String> {
    Html(render_index(&state.mailbox.latest()))
}

fn render_index(latest: &StatusRecord) -> String {
    let (class, glyph) = match latest.state {
        LedState::On => ("on", "&#x1F4A1; ON"),
        LedState::Off => ("off", "&#x26AB; OFF"),
        LedState::Unknown => ("off", "UNKNOWN"),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>firefly-relay - latest status</title>
  <style>
    body {{ font-family: sans-serif; max-width: 40em; margin: 2em auto; }}
    .card {{ border: 2px solid #dee2e6; border-radius: 8px; padding: 1.5em; text-align: center; }}
    .card.on {{ border-color: #28a745; background: #d4edda; }}
    .card.off {{ border-color: #6c757d; background: #e9ecef; }}
    dl {{ display: grid; grid-template-columns: max-content auto; gap: .3em 1em; }}
    dt {{ font-weight: bold; }}
  </style>
</head>
<body>
  <h1>Latest reported status</h1>
  <div class="card {class}"><h2>{glyph}</h2></div>
  <dl>
    <dt>Sequence</dt><dd>{sequence}</dd>
    <dt>Board</dt><dd>{board}</dd>
    <dt>Reporter address</dt><dd>{address}</dd>
    <dt>Observed at</dt><dd>{observed_at} s</dd>
  </dl>
</body>
</html>
"#,
        sequence = latest.sequence,
        board = latest.device_label,
        address = latest.reporter_address,
        observed_at = latest.observed_at,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ordered_float::NotNan;

    use super::*;
    use crate::mailbox::StatusMailbox;
    use crate::registry::SubscriberRegistry;

    fn state() -> ApiState {
        let mailbox = Arc::new(StatusMailbox::default());
        let registry = SubscriberRegistry::new(Arc::clone(&mailbox));
        ApiState::new(mailbox, registry)
    }

    #[tokio::test]
    async fn liveness_reports_mailbox_counters() {
        let state = state();
        state.mailbox.publish(StatusRecord::sentinel());

        let Json(liveness) = liveness(State(state)).await;
        assert_eq!(liveness.server, "firefly-relay");
        assert_eq!(liveness.subscribers, 0);
        assert_eq!(liveness.queued, 1);
        assert_eq!(liveness.published, 1);
        assert_eq!(liveness.dropped, 0);
    }

    #[tokio::test]
    async fn index_renders_the_latest_record() {
        let state = state();
        state.mailbox.publish(StatusRecord {
            state: LedState::On,
            sequence: 42,
            device_label: "metro-m4".into(),
            reporter_address: "10.0.0.7".into(),
            observed_at: NotNan::new(1000.0).unwrap(),
        });

        let Html(page) = index(State(state)).await;
        assert!(page.contains("ON"));
        assert!(page.contains("42"));
        assert!(page.contains("metro-m4"));
        assert!(page.contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn index_before_any_report_shows_unknown() {
        let Html(page) = index(State(state())).await;
        assert!(page.contains("UNKNOWN"));
    }
}
