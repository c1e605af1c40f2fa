use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use firefly_core::StatusRecord;

use crate::adapter::{Adapter, DeliveryOutcome, TransportError};
use crate::indicator::Indicator;

/// Scriptable [`Adapter`] for tests and offline development.
///
/// Outcomes are queued per operation; once a queue is exhausted the default
/// (success) applies. The handle is cheaply cloneable so a test can keep
/// inspecting calls after the adapter moves into the reporter.
#[derive(Clone, Default)]
pub struct MockAdapter {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Default)]
struct MockInner {
    associate_script: VecDeque<Result<String, TransportError>>,
    deliver_script: VecDeque<Result<DeliveryOutcome, TransportError>>,
    reset_script: VecDeque<Result<(), TransportError>>,
    delivered: Vec<StatusRecord>,
    associations: usize,
    resets: usize,
    disconnects: usize,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_associate(&self, result: Result<String, TransportError>) {
        self.inner.lock().unwrap().associate_script.push_back(result);
    }

    pub fn script_deliver(&self, result: Result<DeliveryOutcome, TransportError>) {
        self.inner.lock().unwrap().deliver_script.push_back(result);
    }

    pub fn script_reset(&self, result: Result<(), TransportError>) {
        self.inner.lock().unwrap().reset_script.push_back(result);
    }

    /// Every record handed to `deliver`, in order, whatever the scripted
    /// outcome was.
    pub fn delivered(&self) -> Vec<StatusRecord> {
        self.inner.lock().unwrap().delivered.clone()
    }

    pub fn associations(&self) -> usize {
        self.inner.lock().unwrap().associations
    }

    pub fn resets(&self) -> usize {
        self.inner.lock().unwrap().resets
    }

    pub fn disconnects(&self) -> usize {
        self.inner.lock().unwrap().disconnects
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn associate(&mut self) -> Result<String, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.associations += 1;
        inner
            .associate_script
            .pop_front()
            .unwrap_or_else(|| Ok("10.0.0.7".to_string()))
    }

    async fn reset(&mut self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.resets += 1;
        inner.reset_script.pop_front().unwrap_or(Ok(()))
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.inner.lock().unwrap().disconnects += 1;
        Ok(())
    }

    async fn deliver(&mut self, record: &StatusRecord) -> Result<DeliveryOutcome, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.delivered.push(record.clone());
        inner
            .deliver_script
            .pop_front()
            .unwrap_or(Ok(DeliveryOutcome::Accepted))
    }
}

/// [`Indicator`] that records every toggle instead of driving a pixel.
#[derive(Clone, Default)]
pub struct MockIndicator {
    toggles: Arc<Mutex<Vec<bool>>>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggles(&self) -> Vec<bool> {
        self.toggles.lock().unwrap().clone()
    }
}

impl Indicator for MockIndicator {
    fn set(&mut self, lit: bool) {
        self.toggles.lock().unwrap().push(lit);
    }
}
