//! Webhook signature verification and event decoding.
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use clb_core::{
    domain::{Amount, ChatId},
    donation::{DonationNotice, DEFAULT_DONOR, DEFAULT_LABEL},
    errors::Error,
    Result,
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Check the signature header against `payload`.
///
/// `now` is unix seconds; events older than `tolerance` are rejected
/// (a zero tolerance disables the age check).
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        let Some((k, v)) = part.trim().split_once('=') else {
            continue;
        };
        match k {
            "t" => timestamp = v.parse::<i64>().ok(),
            "v1" => signatures.push(v),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| Error::Signature("missing or invalid timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(Error::Signature("no v1 signature".to_string()));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Signature(format!("bad secret: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(Error::Signature("no matching signature".to_string()));
    }

    let tolerance = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if tolerance > 0 && timestamp < now.saturating_sub(tolerance) {
        return Err(Error::Signature(format!(
            "timestamp {timestamp} outside tolerance"
        )));
    }

    Ok(())
}

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent> {
    Ok(serde_json::from_slice(payload)?)
}

/// Verify (when a secret is configured) and decode an incoming webhook.
pub fn construct_event(
    payload: &[u8],
    header: Option<&str>,
    secret: Option<&str>,
    tolerance: Duration,
    now: i64,
) -> Result<WebhookEvent> {
    match secret {
        Some(secret) => {
            let header = header
                .ok_or_else(|| Error::Signature(format!("missing {SIGNATURE_HEADER} header")))?;
            verify_signature(payload, header, secret, tolerance, now)?;
        }
        None => tracing::warn!("webhook secret not configured, accepting unverified event"),
    }
    parse_event(payload)
}

/// Extract the donation from a `checkout.session.completed` event.
///
/// Other event types yield `None`.
pub fn donation_from_event(event: &WebhookEvent) -> Option<DonationNotice> {
    if event.kind != CHECKOUT_COMPLETED {
        return None;
    }

    let object = &event.data.object;
    let meta = object.get("metadata");
    let meta_str = |key: &str| -> Option<String> {
        let v = meta?.get(key)?;
        let s = match v {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!s.is_empty()).then_some(s)
    };

    let chat_id = meta_str("chat_id").and_then(|s| s.parse::<i64>().ok().map(ChatId));
    let amount = meta_str("amount").or_else(|| {
        object
            .get("amount_total")
            .and_then(|v| v.as_u64())
            .map(|cents| Amount::from_cents(cents).to_string())
    });

    Some(DonationNotice {
        chat_id,
        user_name: meta_str("user_name").unwrap_or_else(|| DEFAULT_DONOR.to_string()),
        label: meta_str("label").unwrap_or_else(|| DEFAULT_LABEL.to_string()),
        amount: amount.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;
    const TOL: Duration = Duration::from_secs(300);

    fn sign(payload: &[u8], t: i64, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{t}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn completed(meta: serde_json::Value) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "amount_total": 1050, "metadata": meta } }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn accepts_valid_signature() {
        let body = completed(serde_json::json!({}));
        let header = format!("t={NOW},v1={}", sign(&body, NOW, SECRET));
        assert!(verify_signature(&body, &header, SECRET, TOL, NOW + 10).is_ok());
    }

    #[test]
    fn accepts_any_matching_v1() {
        let body = b"{}";
        let header = format!(
            "t={NOW},v1={},v1={}",
            sign(body, NOW, "old_secret"),
            sign(body, NOW, SECRET)
        );
        assert!(verify_signature(body, &header, SECRET, TOL, NOW).is_ok());
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let body = b"{\"a\":1}";
        let header = format!("t={NOW},v1={}", sign(body, NOW, SECRET));
        assert!(verify_signature(b"{\"a\":2}", &header, SECRET, TOL, NOW).is_err());
        assert!(verify_signature(body, &header, "whsec_other", TOL, NOW).is_err());
    }

    #[test]
    fn rejects_malformed_headers() {
        let body = b"{}";
        let sig = sign(body, NOW, SECRET);
        for header in [
            String::new(),
            format!("v1={sig}"),
            format!("t=abc,v1={sig}"),
            format!("t={NOW}"),
            format!("t={NOW},v1=not-hex"),
        ] {
            assert!(
                matches!(
                    verify_signature(body, &header, SECRET, TOL, NOW),
                    Err(Error::Signature(_))
                ),
                "header accepted: {header}"
            );
        }
    }

    #[test]
    fn rejects_stale_timestamp_unless_tolerance_disabled() {
        let body = b"{}";
        let t = NOW - 301;
        let header = format!("t={t},v1={}", sign(body, t, SECRET));
        assert!(verify_signature(body, &header, SECRET, TOL, NOW).is_err());
        assert!(verify_signature(body, &header, SECRET, Duration::ZERO, NOW).is_ok());
    }

    #[test]
    fn huge_tolerance_still_checks_age_without_overflow() {
        let body = b"{}";
        let t = NOW - 301;
        let header = format!("t={t},v1={}", sign(body, t, SECRET));
        let huge = Duration::from_secs(u64::MAX);
        assert!(verify_signature(body, &header, SECRET, huge, NOW).is_ok());

        // A timestamp before the epoch is still older than `now - i64::MAX` allows.
        let header = format!("t={},v1={}", i64::MIN, sign(body, i64::MIN, SECRET));
        assert!(verify_signature(body, &header, SECRET, huge, NOW).is_err());
    }

    #[test]
    fn construct_event_requires_header_when_secret_set() {
        let body = completed(serde_json::json!({}));
        assert!(construct_event(&body, None, Some(SECRET), TOL, NOW).is_err());
        let ev = construct_event(&body, None, None, TOL, NOW).unwrap();
        assert_eq!(ev.kind, CHECKOUT_COMPLETED);
        assert_eq!(ev.id.as_deref(), Some("evt_1"));
    }

    #[test]
    fn donation_reads_metadata() {
        let body = completed(serde_json::json!({
            "chat_id": "-1001", "user_name": "Ann", "label": "Nice Pose", "amount": "10.50"
        }));
        let ev = parse_event(&body).unwrap();
        let d = donation_from_event(&ev).unwrap();
        assert_eq!(d.chat_id, Some(ChatId(-1001)));
        assert_eq!(d.user_name, "Ann");
        assert_eq!(d.label, "Nice Pose");
        assert_eq!(d.amount, "10.50");
    }

    #[test]
    fn donation_falls_back_to_defaults() {
        let body = completed(serde_json::json!({ "chat_id": "not-a-number", "user_name": "" }));
        let d = donation_from_event(&parse_event(&body).unwrap()).unwrap();
        assert_eq!(d.chat_id, None);
        assert_eq!(d.user_name, DEFAULT_DONOR);
        assert_eq!(d.label, DEFAULT_LABEL);
        assert_eq!(d.amount, "10.50");
    }

    #[test]
    fn other_events_are_ignored() {
        let body = serde_json::json!({
            "type": "payment_intent.created",
            "data": { "object": {} }
        })
        .to_string();
        let ev = parse_event(body.as_bytes()).unwrap();
        assert!(donation_from_event(&ev).is_none());
    }
}
