use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use firefly_core::StatusRecord;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::ApiState;

/// Acknowledgment for an accepted status report.
#[derive(Debug, Serialize)]
pub struct StatusAck {
    pub message: &'static str,
    pub status: StatusRecord,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct IngestRejection {
    pub error: String,
}

/// Envelope for the generic passthrough endpoint.
#[derive(Debug, Serialize)]
pub struct DataAck {
    pub message: &'static str,
    pub received_data: Value,
    pub timestamp: String,
}

/// Accept a status report from a reporter.
///
/// POST /status
///
/// The body is parsed by hand rather than through an extractor so that a
/// malformed payload produces our client-error acknowledgment instead of a
/// framework default, and so the mailbox is provably untouched on
/// rejection.
pub async fn report_status(State(state): State<ApiState>, body: Bytes) -> Response {
    let record = match serde_json::from_slice::<StatusRecord>(&body) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "rejected malformed status report");
            return (
                StatusCode::BAD_REQUEST,
                Json(IngestRejection {
                    error: format!("invalid status payload: {e}"),
                }),
            )
                .into_response();
        }
    };

    state.mailbox.publish(record.clone());
    info!(
        status = record.state.as_str(),
        sequence = record.sequence,
        reporter = %record.reporter_address,
        "status report accepted"
    );

    (
        StatusCode::OK,
        Json(StatusAck {
            message: "Status received",
            status: record,
            timestamp: jiff::Timestamp::now().to_string(),
        }),
    )
        .into_response()
}

/// Generic passthrough accepting arbitrary JSON or raw bytes. Compatibility
/// surface only — nothing here touches the relay's status semantics.
///
/// POST /data
pub async fn passthrough_data(body: Bytes) -> Response {
    let (message, received_data) = match serde_json::from_slice::<Value>(&body) {
        Ok(value) => ("Data received successfully", value),
        Err(_) => (
            "Data received (not JSON)",
            Value::String(String::from_utf8_lossy(&body).into_owned()),
        ),
    };

    (
        StatusCode::OK,
        Json(DataAck {
            message,
            received_data,
            timestamp: jiff::Timestamp::now().to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use firefly_core::LedState;

    use super::*;
    use crate::mailbox::StatusMailbox;
    use crate::registry::SubscriberRegistry;

    fn state() -> ApiState {
        let mailbox = Arc::new(StatusMailbox::default());
        let registry = SubscriberRegistry::new(Arc::clone(&mailbox));
        ApiState::new(mailbox, registry)
    }

    fn status_body(status: &str, count: i64) -> Bytes {
        Bytes::from(format!(
            r#"{{"status":"{status}","count":{count},"board":"metro-m4","ip_address":"10.0.0.7","timestamp":1000}}"#
        ))
    }

    #[tokio::test]
    async fn valid_report_is_accepted_and_published() {
        let state = state();

        let response = report_status(State(state.clone()), status_body("ON", 5)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let latest = state.mailbox.latest();
        assert_eq!(latest.state, LedState::On);
        assert_eq!(latest.sequence, 5);
        assert_eq!(state.mailbox.drain_all().len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_client_error_and_leaves_state_untouched() {
        let state = state();

        let response = report_status(State(state.clone()), Bytes::from_static(b"not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Nothing published: latest is still the sentinel, queue empty.
        assert_eq!(state.mailbox.latest(), StatusRecord::sentinel());
        assert!(state.mailbox.drain_all().is_empty());

        // A subsequent valid report still goes through normally.
        let response = report_status(State(state.clone()), status_body("OFF", 6)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.mailbox.latest().sequence, 6);
    }

    #[tokio::test]
    async fn wrong_shape_is_client_error() {
        let state = state();

        // Valid JSON, wrong shape.
        let response =
            report_status(State(state.clone()), Bytes::from_static(b"{\"status\":\"ON\"}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.mailbox.latest(), StatusRecord::sentinel());
    }

    #[tokio::test]
    async fn latest_wins_across_reports() {
        let state = state();

        report_status(State(state.clone()), status_body("ON", 5)).await;
        report_status(State(state.clone()), status_body("OFF", 6)).await;

        let latest = state.mailbox.latest();
        assert_eq!(latest.state, LedState::Off);
        assert_eq!(latest.sequence, 6);
    }

    #[tokio::test]
    async fn passthrough_wraps_json_bodies() {
        let response = passthrough_data(Bytes::from_static(b"{\"temp\": 21.5}")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn passthrough_accepts_raw_bytes() {
        let response = passthrough_data(Bytes::from_static(b"plain text payload")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
