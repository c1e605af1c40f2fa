use std::time::Duration;

use firefly_core::{LedState, StatusRecord};
use ordered_float::NotNan;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::{Adapter, DeliveryOutcome, TransportError};
use crate::indicator::Indicator;
use crate::state::ConnectionState;

#[derive(Debug, Clone)]
pub struct ReporterOptions {
    pub device_label: Box<str>,
    /// How long each half of the blink cycle holds.
    pub hold_interval: Duration,
    /// Wait after an adapter reset before re-associating.
    pub settle_interval: Duration,
    /// Fixed delay between failed recovery rounds. Bounds the retry rate on
    /// a permanently broken link.
    pub retry_backoff: Duration,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            device_label: "firefly".into(),
            hold_interval: Duration::from_secs(2),
            settle_interval: Duration::from_secs(5),
            retry_backoff: Duration::from_secs(10),
        }
    }
}

/// The reporting duty cycle and its connection-recovery state machine.
///
/// One sequential loop: every failure is rated either "retry association
/// directly" or "retry after a full reset", and no error terminates the
/// loop. Each [`tick`](Reporter::tick) advances exactly one transition, so
/// the machine can be driven and observed step by step.
pub struct Reporter<A: Adapter, I: Indicator> {
    adapter: A,
    indicator: I,
    options: ReporterOptions,
    state: ConnectionState,
    sequence: u64,
    address: Box<str>,
}

impl<A: Adapter, I: Indicator> Reporter<A, I> {
    pub fn new(adapter: A, indicator: I, options: ReporterOptions) -> Self {
        Self {
            adapter,
            indicator,
            options,
            state: ConnectionState::Disconnected,
            sequence: 0,
            address: "unknown".into(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Run until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(device = %self.options.device_label, "reporter started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.tick() => {}
            }
        }
        info!("reporter stopped");
    }

    /// Advance the state machine by one transition.
    pub async fn tick(&mut self) {
        match self.state {
            ConnectionState::Disconnected => {
                self.state = ConnectionState::Connecting;
            }
            ConnectionState::Connecting => self.associate_direct().await,
            ConnectionState::Connected => self.duty_cycle().await,
            ConnectionState::Resetting => self.full_recovery().await,
        }
    }

    /// One direct association attempt, the lighter-weight recovery tier.
    /// Failure escalates to a full reset after the fixed backoff.
    async fn associate_direct(&mut self) {
        match self.adapter.associate().await {
            Ok(address) => {
                info!(%address, "associated");
                self.address = address.into();
                self.state = ConnectionState::Connected;
            }
            Err(e) => {
                warn!(error = %e, "association failed, escalating to full reset");
                sleep(self.options.retry_backoff).await;
                self.state = ConnectionState::Resetting;
            }
        }
    }

    /// Reset the adapter, settle, and re-associate once. Success resumes
    /// the duty cycle with the sequence counter intact; failure falls back
    /// to direct association.
    async fn full_recovery(&mut self) {
        match self.reset_and_rejoin().await {
            Ok(address) => {
                info!(%address, sequence = self.sequence, "recovered after reset");
                self.address = address.into();
                self.state = ConnectionState::Connected;
            }
            Err(e) => {
                warn!(error = %e, "reset recovery failed, retrying association directly");
                self.state = ConnectionState::Connecting;
            }
        }
    }

    async fn reset_and_rejoin(&mut self) -> Result<String, TransportError> {
        self.adapter.reset().await?;
        self.adapter.disconnect().await?;
        sleep(self.options.settle_interval).await;
        self.adapter.associate().await
    }

    /// One full blink/report cycle. The sequence counter advances whatever
    /// happens: a record lost to a transport error is superseded by the
    /// next cycle anyway (latest wins downstream).
    async fn duty_cycle(&mut self) {
        let outcome = self.blink_cycle().await;
        self.sequence = self.sequence.wrapping_add(1);

        if let Err(e) = outcome {
            warn!(error = %e, "transport failure during duty cycle, entering reset");
            self.state = ConnectionState::Resetting;
        }
    }

    async fn blink_cycle(&mut self) -> Result<(), TransportError> {
        self.indicator.set(true);
        self.send_report(LedState::On).await?;
        sleep(self.options.hold_interval).await;

        self.indicator.set(false);
        self.send_report(LedState::Off).await?;
        sleep(self.options.hold_interval).await;

        Ok(())
    }

    /// Fire-and-forget delivery. Application-class rejections are logged
    /// and tolerated; only transport-class errors propagate.
    async fn send_report(&mut self, state: LedState) -> Result<(), TransportError> {
        let record = StatusRecord {
            state,
            sequence: self.sequence,
            device_label: self.options.device_label.clone(),
            reporter_address: self.address.clone(),
            observed_at: now_epoch(),
        };

        match self.adapter.deliver(&record).await {
            Ok(DeliveryOutcome::Accepted) => {
                debug!(status = state.as_str(), sequence = self.sequence, "report delivered");
                Ok(())
            }
            Ok(DeliveryOutcome::Rejected(code)) => {
                warn!(code, sequence = self.sequence, "relay rejected report, continuing");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn now_epoch() -> NotNan<f64> {
    let now = jiff::Timestamp::now();
    NotNan::new(now.as_millisecond() as f64 / 1000.0).unwrap_or_default()
}
