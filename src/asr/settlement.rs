use super::error::RecognitionError;
use std::sync::Mutex;
use tokio::sync::oneshot;

pub type RecognitionResult = Result<String, RecognitionError>;

/// Single-assignment result slot for one recognition.
///
/// The first call to [`Settlement::settle`] delivers its value to the waiting
/// [`SettlementReceiver`]; every later call is a no-op. Settling after the
/// receiver was dropped still consumes the slot.
#[derive(Debug)]
pub struct Settlement {
    tx: Mutex<Option<oneshot::Sender<RecognitionResult>>>,
}

/// Waiting half of a [`Settlement`]
pub type SettlementReceiver = oneshot::Receiver<RecognitionResult>;

impl Settlement {
    pub fn new() -> (Self, SettlementReceiver) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Assign the outcome. Returns `true` only for the call that won.
    pub fn settle(&self, result: RecognitionResult) -> bool {
        let tx = match self.tx.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match tx {
            Some(tx) => {
                // Receiver may already be gone (caller timed out)
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        match self.tx.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}
