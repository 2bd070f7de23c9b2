//! Hardware challenge-response contract
//!
//! A hardware-token driver implements [`ChallengeHandler`]: it receives the challenge
//! and must call the responder exactly once, either with a non-empty response or with
//! an error. Timeouts are the driver's business. [`perform_challenge`] turns that
//! callback into a blocking call that the unlock flow can cancel.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::crypto::SecureBytes;
use crate::error::{ChallengeResponseError, Result};
use crate::progress::Progress;

/// How often a waiting caller re-checks its cancellation token
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub type ChallengeResult = std::result::Result<SecureBytes, ChallengeResponseError>;

/// Called once with the token's answer
pub type Responder = Box<dyn FnOnce(ChallengeResult) + Send>;

pub trait ChallengeHandler: Send + Sync {
    /// Send `challenge` to the token in `key`'s slot.
    fn challenge(&self, key: &HardwareKey, challenge: SecureBytes, respond: Responder);
}

impl<F> ChallengeHandler for F
where
    F: Fn(&HardwareKey, SecureBytes, Responder) + Send + Sync,
{
    fn challenge(&self, key: &HardwareKey, challenge: SecureBytes, respond: Responder) {
        self(key, challenge, respond)
    }
}

/// Transport a hardware key is reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyInterface {
    Usb,
    Nfc,
    Accessory,
}

/// Which token slot to challenge. Passed through to drivers untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareKey {
    pub interface: KeyInterface,
    pub slot: u8,
}

impl HardwareKey {
    pub fn new(interface: KeyInterface, slot: u8) -> Self {
        Self { interface, slot }
    }
}

impl fmt::Display for HardwareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} slot {}", self.interface, self.slot)
    }
}

/// Send `challenge` to `key` through `handler` and wait for its single response.
///
/// Returns `Cancelled` if `progress` is cancelled while waiting; a late response is
/// then dropped, which erases it.
pub fn perform_challenge(
    handler: &dyn ChallengeHandler,
    key: &HardwareKey,
    challenge: &[u8],
    progress: &Progress,
) -> Result<SecureBytes> {
    progress.check_cancelled()?;

    let (sender, receiver) = mpsc::sync_channel::<ChallengeResult>(1);
    debug!(%key, len = challenge.len(), "sending challenge to hardware key");
    handler.challenge(
        key,
        SecureBytes::from(challenge),
        Box::new(move |result| {
            // The waiting side may be gone after a cancellation.
            let _ = sender.send(result);
        }),
    );

    loop {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(response)) if response.is_empty() => {
                return Err(ChallengeResponseError::CommunicationError(
                    "empty response".to_string(),
                )
                .into());
            }
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(err)) => {
                warn!(error = %err, "challenge-response failed");
                return Err(err.into());
            }
            Err(RecvTimeoutError::Timeout) => progress.check_cancelled()?,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ChallengeResponseError::CommunicationError(
                    "responder dropped without answering".to_string(),
                )
                .into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CancellationReason, CryptoError};
    use std::thread;

    const USB_SLOT_1: HardwareKey = HardwareKey {
        interface: KeyInterface::Usb,
        slot: 1,
    };

    fn reversing_token(_: &HardwareKey, challenge: SecureBytes, respond: Responder) {
        let mut response = challenge.clone();
        response.reverse();
        respond(Ok(response));
    }

    #[test]
    fn test_synchronous_response() {
        let response =
            perform_challenge(&reversing_token, &USB_SLOT_1, &[1, 2, 3], &Progress::new())
                .unwrap();
        assert_eq!(&*response, &[3, 2, 1]);
    }

    #[test]
    fn test_response_from_another_thread() {
        let handler = |_: &HardwareKey, challenge: SecureBytes, respond: Responder| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                respond(Ok(challenge.concat(b"!")));
            });
        };
        let response = perform_challenge(&handler, &USB_SLOT_1, b"hi", &Progress::new()).unwrap();
        assert_eq!(&*response, b"hi!");
    }

    #[test]
    fn test_driver_error_is_propagated() {
        let handler = |_: &HardwareKey, _: SecureBytes, respond: Responder| {
            respond(Err(ChallengeResponseError::NotAvailableInContext));
        };
        assert!(matches!(
            perform_challenge(&handler, &USB_SLOT_1, b"x", &Progress::new()),
            Err(CryptoError::ChallengeResponse(
                ChallengeResponseError::NotAvailableInContext
            ))
        ));
    }

    #[test]
    fn test_empty_response_is_rejected() {
        let handler = |_: &HardwareKey, _: SecureBytes, respond: Responder| {
            respond(Ok(SecureBytes::default()))
        };
        assert!(matches!(
            perform_challenge(&handler, &USB_SLOT_1, b"x", &Progress::new()),
            Err(CryptoError::ChallengeResponse(
                ChallengeResponseError::CommunicationError(_)
            ))
        ));
    }

    #[test]
    fn test_dropped_responder_is_a_communication_error() {
        let handler = |_: &HardwareKey, _: SecureBytes, respond: Responder| drop(respond);
        assert!(matches!(
            perform_challenge(&handler, &USB_SLOT_1, b"x", &Progress::new()),
            Err(CryptoError::ChallengeResponse(
                ChallengeResponseError::CommunicationError(_)
            ))
        ));
    }

    #[test]
    fn test_cancellation_while_waiting() {
        let progress = Progress::new();
        let observer = progress.clone();
        // Never answers until long after the caller gave up.
        let handler = |_: &HardwareKey, _: SecureBytes, respond: Responder| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(500));
                respond(Err(ChallengeResponseError::Cancelled));
            });
        };
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            observer.cancel(CancellationReason::UserRequested);
        });

        let result = perform_challenge(&handler, &USB_SLOT_1, b"x", &progress);
        canceller.join().unwrap();
        assert!(matches!(
            result,
            Err(CryptoError::Cancelled(CancellationReason::UserRequested))
        ));
    }

    #[test]
    fn test_handler_receives_the_requested_slot() {
        let nfc = HardwareKey::new(KeyInterface::Nfc, 2);
        let handler = |key: &HardwareKey, _: SecureBytes, respond: Responder| {
            respond(Ok(SecureBytes::new(vec![key.slot])));
        };
        let response = perform_challenge(&handler, &nfc, b"x", &Progress::new()).unwrap();
        assert_eq!(&*response, &[2]);
    }

    #[test]
    fn test_hardware_key_display() {
        let key = HardwareKey::new(KeyInterface::Nfc, 2);
        assert_eq!(key.to_string(), "Nfc slot 2");
    }
}
