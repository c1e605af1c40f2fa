use tracing::info;

/// Visible status indicator on the device (the LED/NeoPixel stand-in).
/// Simple collaborator: the state machine only ever toggles it.
pub trait Indicator: Send {
    fn set(&mut self, lit: bool);
}

/// Indicator that logs instead of lighting anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set(&mut self, lit: bool) {
        info!(lit, "indicator");
    }
}
