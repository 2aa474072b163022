//! Callback authentication.
//!
//! The remote function signs its callback with SigV4, using the per-dispatch signing
//! key as secret. Verification recomputes the signature over `PUT <callback_url>`,
//! the inbound `X-Amz-Date` header and the raw body, with the key read back from the
//! record's persisted metadata.

use std::sync::Arc;

use attache_core::{CallbackResult, LambdaError};
use attache_db::RecordRepository;
use http::header::AUTHORIZATION;
use http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::attacher::Attacher;
use crate::sigv4::{AuthorizationHeader, SignError, Signer};

const CALLBACK_METHOD: &str = "PUT";
const X_AMZ_DATE: &str = "x-amz-date";
const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

/// Outcome of authenticating a callback.
///
/// `Rejected` covers every way a callback can fail to prove its origin. It carries no
/// detail on purpose; callers answer it without explaining why.
#[derive(Debug)]
pub enum CallbackAuth {
    Authorized {
        attacher: Attacher,
        result: CallbackResult,
    },
    Rejected,
}

impl CallbackAuth {
    pub fn is_authorized(&self) -> bool {
        matches!(self, CallbackAuth::Authorized { .. })
    }
}

#[derive(Clone)]
pub struct SignatureVerifier {
    callback_url: String,
    repository: Arc<dyn RecordRepository>,
}

impl SignatureVerifier {
    pub fn new(callback_url: impl Into<String>, repository: Arc<dyn RecordRepository>) -> Self {
        Self {
            callback_url: callback_url.into(),
            repository,
        }
    }

    /// Authenticate an inbound callback.
    ///
    /// Malformed bodies, unknown records and empty attachment fields are errors;
    /// anything wrong with the signature itself yields `Ok(CallbackAuth::Rejected)`.
    #[tracing::instrument(skip(self, headers, body), fields(body_len = body.len()))]
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<CallbackAuth, LambdaError> {
        let (context, result) = CallbackResult::parse(body)?;
        let attacher = Attacher::load(self.repository.as_ref(), &context).await?;
        if attacher.file().is_none() {
            return Err(LambdaError::AttachmentMissing {
                record_type: context.record.record_type.clone(),
                record_id: context.record.record_id.clone(),
                name: context.name.clone(),
            });
        }

        let Some(authorization) = header_str(headers, AUTHORIZATION.as_str())
            .and_then(AuthorizationHeader::parse)
        else {
            tracing::warn!(record = %context.record, "Callback without a valid Authorization header");
            return Ok(CallbackAuth::Rejected);
        };
        let Some(amz_date) = header_str(headers, X_AMZ_DATE) else {
            tracing::warn!(record = %context.record, "Callback without X-Amz-Date header");
            return Ok(CallbackAuth::Rejected);
        };
        let Some(signing_key) = attacher.persisted_signing_key() else {
            tracing::warn!(
                record = %context.record,
                attachment = %context.name,
                "Callback for an attachment that is not awaiting processing"
            );
            return Ok(CallbackAuth::Rejected);
        };

        let credential = &authorization.credential;
        let signer = Signer::new(
            credential.access_key_id.as_str(),
            signing_key,
            credential.region.as_str(),
            credential.service.as_str(),
        )
        .with_session_token(header_str(headers, X_AMZ_SECURITY_TOKEN).map(str::to_string));

        let expected = match signer.sign(CALLBACK_METHOD, &self.callback_url, amz_date, body) {
            Ok(expected) => expected,
            Err(SignError::InvalidDate(_)) => {
                tracing::warn!(record = %context.record, "Callback with malformed X-Amz-Date");
                return Ok(CallbackAuth::Rejected);
            }
            Err(e @ SignError::InvalidUrl(_)) => {
                return Err(LambdaError::Configuration(e.to_string()));
            }
            Err(SignError::Signing(e)) => {
                tracing::warn!(record = %context.record, error = %e, "Callback could not be re-signed");
                return Ok(CallbackAuth::Rejected);
            }
        };

        let matches: bool = expected
            .signature
            .as_bytes()
            .ct_eq(authorization.signature.as_bytes())
            .into();
        if !matches {
            tracing::warn!(record = %context.record, "Callback signature mismatch");
            return Ok(CallbackAuth::Rejected);
        }

        tracing::debug!(record = %context.record, "Callback authenticated");
        Ok(CallbackAuth::Authorized { attacher, result })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{flip_last_hex_digit, sign_callback};
    use attache_core::{RecordRef, UploadedFile};
    use attache_db::{InMemoryRecordRepository, Record};
    use http::HeaderValue;

    const CALLBACK_URL: &str = "https://app.example.com/lambda/callback";
    const SIGNING_KEY: &str = "c2VjcmV0LWtleS0xMg==";

    fn body() -> Vec<u8> {
        br#"{"versions":{"original":{"id":"o.jpg","storage":"store","metadata":{"key":"c2VjcmV0LWtleS0xMg=="}},"size40":{"storage":"store","metadata":{"mime_type":"image/jpeg"}}},"context":{"record":["User","1"],"name":"avatar"}}"#
            .to_vec()
    }

    fn verifier_with_key(key: Option<&str>) -> SignatureVerifier {
        let mut cached = UploadedFile::new("abc.jpg", "cache");
        if let Some(key) = key {
            cached.set_signing_key(key.to_string());
        }
        let repo = InMemoryRecordRepository::new();
        repo.insert(Record::new(RecordRef::new("User", "1")).with_attribute(
            "avatar_data",
            Some(serde_json::to_string(&cached).unwrap()),
        ));
        SignatureVerifier::new(CALLBACK_URL, Arc::new(repo))
    }

    #[tokio::test]
    async fn test_valid_signature_is_authorized() {
        let verifier = verifier_with_key(Some(SIGNING_KEY));
        let headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());

        let auth = verifier.authenticate(&headers, &body()).await.unwrap();
        match auth {
            CallbackAuth::Authorized { attacher, result } => {
                assert_eq!(attacher.record(), &RecordRef::new("User", "1"));
                assert_eq!(attacher.name(), "avatar");
                assert!(matches!(result, CallbackResult::Versions(ref v) if v.len() == 2));
            }
            CallbackAuth::Rejected => panic!("expected callback to be authorized"),
        }
    }

    #[tokio::test]
    async fn test_callback_url_with_reserved_path_characters() {
        for url in [
            "https://app.example.com/hooks/lambda:callback",
            "https://app.example.com/hooks/lambda%20callback",
            "https://app.example.com/hooks/@uploads(1)/done",
        ] {
            let cached = {
                let mut file = UploadedFile::new("abc.jpg", "cache");
                file.set_signing_key(SIGNING_KEY.to_string());
                file
            };
            let repo = InMemoryRecordRepository::new();
            repo.insert(Record::new(RecordRef::new("User", "1")).with_attribute(
                "avatar_data",
                Some(serde_json::to_string(&cached).unwrap()),
            ));
            let verifier = SignatureVerifier::new(url, Arc::new(repo));
            let headers = sign_callback(url, SIGNING_KEY, &body());

            let auth = verifier.authenticate(&headers, &body()).await.unwrap();
            assert!(auth.is_authorized(), "{} should verify", url);
        }
    }

    #[tokio::test]
    async fn test_flipped_signature_is_rejected() {
        let verifier = verifier_with_key(Some(SIGNING_KEY));
        let mut headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());
        let tampered = flip_last_hex_digit(headers[AUTHORIZATION].to_str().unwrap());
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&tampered).unwrap());

        let auth = verifier.authenticate(&headers, &body()).await.unwrap();
        assert!(!auth.is_authorized());
    }

    #[tokio::test]
    async fn test_mutated_body_is_rejected() {
        let verifier = verifier_with_key(Some(SIGNING_KEY));
        let headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());

        let mut mutated = body();
        let pos = mutated.iter().position(|b| *b == b'4').unwrap();
        mutated[pos] ^= 0x01;

        let auth = verifier.authenticate(&headers, &mutated).await.unwrap();
        assert!(!auth.is_authorized());
    }

    #[tokio::test]
    async fn test_wrong_key_or_missing_headers_are_rejected() {
        let verifier = verifier_with_key(Some(SIGNING_KEY));

        let headers = sign_callback(CALLBACK_URL, "some-other-key", &body());
        assert!(!verifier.authenticate(&headers, &body()).await.unwrap().is_authorized());

        let mut headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());
        headers.remove(X_AMZ_DATE);
        assert!(!verifier.authenticate(&headers, &body()).await.unwrap().is_authorized());

        let mut headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer token"));
        assert!(!verifier.authenticate(&headers, &body()).await.unwrap().is_authorized());

        let mut headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());
        headers.insert(X_AMZ_DATE, HeaderValue::from_static("yesterday"));
        assert!(!verifier.authenticate(&headers, &body()).await.unwrap().is_authorized());
    }

    #[tokio::test]
    async fn test_no_persisted_key_is_rejected() {
        let verifier = verifier_with_key(None);
        let headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());

        let auth = verifier.authenticate(&headers, &body()).await.unwrap();
        assert!(!auth.is_authorized());
    }

    #[tokio::test]
    async fn test_security_token_is_bound() {
        let verifier = verifier_with_key(Some(SIGNING_KEY));
        let mut headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());
        headers.insert(X_AMZ_SECURITY_TOKEN, HeaderValue::from_static("session"));

        let auth = verifier.authenticate(&headers, &body()).await.unwrap();
        assert!(!auth.is_authorized());
    }

    #[tokio::test]
    async fn test_unknown_record_is_an_error() {
        let verifier = SignatureVerifier::new(CALLBACK_URL, Arc::new(InMemoryRecordRepository::new()));
        let headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());

        let err = verifier.authenticate(&headers, &body()).await.unwrap_err();
        assert!(matches!(err, LambdaError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_attachment_field_is_an_error() {
        let repo = InMemoryRecordRepository::new();
        repo.insert(Record::new(RecordRef::new("User", "1")).with_attribute("avatar_data", None));
        let verifier = SignatureVerifier::new(CALLBACK_URL, Arc::new(repo));
        let headers = sign_callback(CALLBACK_URL, SIGNING_KEY, &body());

        let err = verifier.authenticate(&headers, &body()).await.unwrap_err();
        assert!(matches!(err, LambdaError::AttachmentMissing { ref name, .. } if name == "avatar"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let verifier = verifier_with_key(Some(SIGNING_KEY));
        let headers = sign_callback(CALLBACK_URL, SIGNING_KEY, b"{}");

        let err = verifier.authenticate(&headers, b"{}").await.unwrap_err();
        assert!(matches!(err, LambdaError::InvalidCallback(_)));
    }
}
