//! Prediction broadcast.
//!
//! Every classified write is announced to the registered observers, whether
//! or not the engine was confident enough to act on it. Observers keep their
//! own accounting and must return promptly.

use super::Fingerprint;

/// Receiver of prediction outcomes.
pub trait PredictionObserver: Send {
    /// Called once per classified write.
    fn on_prediction(&mut self, fingerprint: Fingerprint, address_predicted: bool, data_predicted: bool);
}

/// Fan-out to every registered observer.
#[derive(Default)]
pub struct Broadcaster {
    observers: Vec<Box<dyn PredictionObserver>>,
}

impl Broadcaster {
    /// Creates a broadcaster with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer; observers are notified in registration order.
    pub fn register(&mut self, observer: Box<dyn PredictionObserver>) {
        self.observers.push(observer);
    }

    /// Announces an outcome to every observer.
    pub fn broadcast(&mut self, fingerprint: Fingerprint, address_predicted: bool, data_predicted: bool) {
        for observer in &mut self.observers {
            observer.on_prediction(fingerprint, address_predicted, data_predicted);
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("observers", &self.observers.len())
            .finish()
    }
}
