//! Media-session join credentials
//!
//! Mints the short-lived credential a client presents to the media provider
//! after signaling completes. The credential binds the application id, the
//! channel name, a randomly assigned participant id and an expiry under an
//! HMAC-SHA256 signature keyed with the application certificate. The relay
//! never joins the channel itself; each client requests its own credential.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Participant ids are assigned uniformly below this bound
pub const MAX_PARTICIPANT_ID: u32 = 100_000;

/// Errors from credential issuance and verification
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Channel name is required")]
    EmptyChannel,

    #[error("Malformed credential")]
    Malformed,

    #[error("Credential signature mismatch")]
    BadSignature,

    #[error("Credential expired")]
    Expired,
}

/// A freshly minted join credential
#[derive(Debug, Clone, Serialize)]
pub struct JoinCredential {
    /// Signed, base64url-encoded credential for the media provider
    pub token: String,
    /// Participant id assigned for this join
    pub uid: u32,
    /// Expiry, seconds since the epoch
    pub expires_at: i64,
}

/// Contents of a credential that passed verification
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedCredential {
    pub channel: String,
    pub uid: u32,
    pub expires_at: i64,
}

/// Issues join credentials for media channels
pub struct MediaTokenIssuer {
    app_id: String,
    certificate: Vec<u8>,
    ttl: Duration,
}

impl MediaTokenIssuer {
    /// Create an issuer from the configured provider credentials
    pub fn new(app_id: impl Into<String>, certificate: &str, ttl_secs: i64) -> Self {
        Self {
            app_id: app_id.into(),
            certificate: certificate.as_bytes().to_vec(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Mint a credential for joining the named channel
    pub fn issue(&self, channel: &str) -> Result<JoinCredential, MediaError> {
        if channel.is_empty() {
            return Err(MediaError::EmptyChannel);
        }

        let uid = rand::thread_rng().gen_range(0..MAX_PARTICIPANT_ID);
        let expires_at = (Utc::now() + self.ttl).timestamp();

        let message = format!("{}\n{}\n{}\n{}", self.app_id, channel, uid, expires_at);
        let signature = self.sign(message.as_bytes());

        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(message.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        );

        Ok(JoinCredential {
            token,
            uid,
            expires_at,
        })
    }

    /// Check a credential's signature and expiry and return its contents
    pub fn verify(&self, token: &str) -> Result<VerifiedCredential, MediaError> {
        let (message_b64, signature_b64) = token.split_once('.').ok_or(MediaError::Malformed)?;
        let message = URL_SAFE_NO_PAD
            .decode(message_b64)
            .map_err(|_| MediaError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| MediaError::Malformed)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.certificate).expect("HMAC accepts any key length");
        mac.update(&message);
        mac.verify_slice(&signature)
            .map_err(|_| MediaError::BadSignature)?;

        let message = String::from_utf8(message).map_err(|_| MediaError::Malformed)?;
        let fields: Vec<&str> = message.split('\n').collect();
        let &[app_id, channel, uid, expires_at] = fields.as_slice() else {
            return Err(MediaError::Malformed);
        };
        if app_id != self.app_id {
            return Err(MediaError::BadSignature);
        }

        let uid: u32 = uid.parse().map_err(|_| MediaError::Malformed)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| MediaError::Malformed)?;
        if expires_at <= Utc::now().timestamp() {
            return Err(MediaError::Expired);
        }

        Ok(VerifiedCredential {
            channel: channel.to_string(),
            uid,
            expires_at,
        })
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.certificate).expect("HMAC accepts any key length");
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> MediaTokenIssuer {
        MediaTokenIssuer::new("test-app", "test-certificate", 3600)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let issuer = issuer();
        let credential = issuer.issue("standup").unwrap();

        let verified = issuer.verify(&credential.token).unwrap();
        assert_eq!(verified.channel, "standup");
        assert_eq!(verified.uid, credential.uid);
        assert_eq!(verified.expires_at, credential.expires_at);
    }

    #[test]
    fn test_uid_within_assigned_range() {
        let issuer = issuer();
        for _ in 0..50 {
            let credential = issuer.issue("room").unwrap();
            assert!(credential.uid < MAX_PARTICIPANT_ID);
        }
    }

    #[test]
    fn test_empty_channel_rejected() {
        let result = issuer().issue("");
        assert!(matches!(result, Err(MediaError::EmptyChannel)));
    }

    #[test]
    fn test_tampered_credential_rejected() {
        let issuer = issuer();
        let credential = issuer.issue("room").unwrap();

        // Swap the message half for a different channel
        let (_, signature) = credential.token.split_once('.').unwrap();
        let forged_message = URL_SAFE_NO_PAD.encode(
            format!("test-app\nother-room\n{}\n{}", credential.uid, credential.expires_at)
                .as_bytes(),
        );
        let forged = format!("{}.{}", forged_message, signature);

        assert!(matches!(
            issuer.verify(&forged),
            Err(MediaError::BadSignature)
        ));
    }

    #[test]
    fn test_wrong_certificate_rejected() {
        let credential = issuer().issue("room").unwrap();
        let other = MediaTokenIssuer::new("test-app", "other-certificate", 3600);
        assert!(matches!(
            other.verify(&credential.token),
            Err(MediaError::BadSignature)
        ));
    }

    #[test]
    fn test_expired_credential_rejected() {
        let stale = MediaTokenIssuer::new("test-app", "test-certificate", -10);
        let credential = stale.issue("room").unwrap();
        assert!(matches!(
            stale.verify(&credential.token),
            Err(MediaError::Expired)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            issuer().verify("garbage"),
            Err(MediaError::Malformed)
        ));
        assert!(matches!(
            issuer().verify("Z2FyYmFnZQ.Z2FyYmFnZQ"),
            Err(MediaError::BadSignature)
        ));
    }
}
