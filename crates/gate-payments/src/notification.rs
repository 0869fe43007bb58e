//! Processor Notification Verification
//!
//! The redirect processor POSTs form-encoded notifications whose
//! authenticity is a SHA-1 digest over nine fields joined with `&`:
//!
//! ```text
//! notification_type & operation_id & amount & currency & datetime &
//! sender & codepro & <tenant secret> & label
//! ```
//!
//! This field set and order is the processor's external contract. A missing
//! field enters the digest as an empty string; only a final digest mismatch
//! fails verification.

use serde::Deserialize;
use sha1::{Digest, Sha1};

/// Notification types that report incoming funds.
const INCOMING_FUNDS_TYPES: [&str; 2] = ["p2p-incoming", "card-incoming"];

/// Form-decoded processor callback body.
///
/// Every field is optional: the digest treats absence as an empty string,
/// and the router decides what a missing `label` means.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProcessorNotification {
    pub notification_type: Option<String>,
    pub operation_id: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub datetime: Option<String>,
    pub sender: Option<String>,
    pub codepro: Option<String>,
    pub label: Option<String>,
    pub sha1_hash: Option<String>,
}

impl ProcessorNotification {
    /// Whether this notification reports incoming funds (as opposed to
    /// e.g. outgoing transfers, which the gateway ignores).
    pub fn is_incoming_funds(&self) -> bool {
        self.notification_type
            .as_deref()
            .is_some_and(|t| INCOMING_FUNDS_TYPES.contains(&t))
    }

    /// Digest input in the processor-mandated field order.
    fn digest_fields<'a>(&'a self, secret: &'a str) -> [&'a str; 9] {
        let field = |f: &'a Option<String>| f.as_deref().unwrap_or("");
        [
            field(&self.notification_type),
            field(&self.operation_id),
            field(&self.amount),
            field(&self.currency),
            field(&self.datetime),
            field(&self.sender),
            field(&self.codepro),
            secret,
            field(&self.label),
        ]
    }
}

/// Verify a notification against a tenant's shared secret.
///
/// Returns true only when the computed digest exactly matches the presented
/// `sha1_hash`.
pub fn verify_notification(secret: &str, notification: &ProcessorNotification) -> bool {
    let joined = notification.digest_fields(secret).join("&");
    let computed = hex::encode(Sha1::digest(joined.as_bytes()));
    let presented = notification.sha1_hash.as_deref().unwrap_or("");

    let matched = computed == presented;
    if !matched {
        tracing::warn!(
            label = notification.label.as_deref().unwrap_or(""),
            "Notification digest mismatch (possible tampering)"
        );
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_notification_secret";

    fn signed(mutate: impl FnOnce(&mut ProcessorNotification)) -> ProcessorNotification {
        let mut n = ProcessorNotification {
            notification_type: Some("p2p-incoming".into()),
            operation_id: Some("op-1".into()),
            amount: Some("600.00".into()),
            currency: Some("643".into()),
            datetime: Some("2024-05-01T10:00:00Z".into()),
            sender: Some("41001000000".into()),
            codepro: Some("false".into()),
            label: Some("lbl-1".into()),
            sha1_hash: None,
        };
        // Sign with the reference algorithm, then apply the mutation.
        let joined = n.digest_fields(SECRET).join("&");
        n.sha1_hash = Some(hex::encode(Sha1::digest(joined.as_bytes())));
        mutate(&mut n);
        n
    }

    #[test]
    fn round_trip_verifies() {
        assert!(verify_notification(SECRET, &signed(|_| {})));
    }

    #[test]
    fn missing_fields_enter_digest_as_empty() {
        let mut n = ProcessorNotification {
            label: Some("lbl-1".into()),
            ..Default::default()
        };
        let joined = n.digest_fields(SECRET).join("&");
        n.sha1_hash = Some(hex::encode(Sha1::digest(joined.as_bytes())));
        assert!(verify_notification(SECRET, &n));
    }

    #[test]
    fn flipping_any_field_fails() {
        let tampered: [fn(&mut ProcessorNotification); 8] = [
            |n| n.notification_type = Some("card-incoming".into()),
            |n| n.operation_id = Some("op-2".into()),
            |n| n.amount = Some("6000.00".into()),
            |n| n.currency = Some("840".into()),
            |n| n.datetime = Some("2024-05-02T10:00:00Z".into()),
            |n| n.sender = Some("41002000000".into()),
            |n| n.codepro = Some("true".into()),
            |n| n.label = Some("lbl-2".into()),
        ];
        for mutate in tampered {
            assert!(!verify_notification(SECRET, &signed(mutate)));
        }
    }

    #[test]
    fn wrong_secret_fails() {
        assert!(!verify_notification("other_secret", &signed(|_| {})));
    }

    #[test]
    fn missing_hash_fails() {
        assert!(!verify_notification(SECRET, &signed(|n| n.sha1_hash = None)));
    }

    #[test]
    fn incoming_funds_types() {
        assert!(signed(|_| {}).is_incoming_funds());
        assert!(
            !signed(|n| n.notification_type = Some("outgoing".into())).is_incoming_funds()
        );
        assert!(!ProcessorNotification::default().is_incoming_funds());
    }
}
