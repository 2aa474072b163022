//! AWS Signature Version 4 request signing.
//!
//! Canonicalisation and signing are delegated to `aws-sigv4` with its default settings
//! (normalized, double-encoded path), so signatures agree with any AWS SDK signer. The
//! signed headers are `host`, `x-amz-date` and, with a session token,
//! `x-amz-security-token`.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::SystemTime;

use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, SignableBody, SignableRequest, SigningParams, SigningSettings,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use chrono::NaiveDateTime;
use http::Uri;
use thiserror::Error;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

const SCOPE_TERMINATOR: &str = "aws4_request";
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const CREDENTIALS_PROVIDER: &str = "attache-callback";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignError {
    #[error("Invalid URL to sign: {0}")]
    InvalidUrl(String),
    #[error("Invalid X-Amz-Date value: {0}")]
    InvalidDate(String),
    #[error("Request could not be signed: {0}")]
    Signing(String),
}

/// `AKID/20200307/us-east-1/handler/aws4_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    pub access_key_id: String,
    pub date: String,
    pub region: String,
    pub service: String,
}

impl CredentialScope {
    pub fn parse(credential: &str) -> Option<Self> {
        let parts: Vec<&str> = credential.split('/').collect();
        match parts.as_slice() {
            [akid, date, region, service, SCOPE_TERMINATOR]
                if !akid.is_empty() && !region.is_empty() && !service.is_empty() =>
            {
                Some(Self {
                    access_key_id: akid.to_string(),
                    date: date.to_string(),
                    region: region.to_string(),
                    service: service.to_string(),
                })
            }
            _ => None,
        }
    }

    fn scope(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.date, self.region, self.service, SCOPE_TERMINATOR
        )
    }
}

/// Parsed `Authorization` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeader {
    pub credential: CredentialScope,
    pub signed_headers: Vec<String>,
    pub signature: String,
}

impl AuthorizationHeader {
    /// Parse `AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...`.
    ///
    /// Pairs may be separated by commas, spaces or both. Returns `None` for any other
    /// algorithm or when one of the three fields is missing.
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix(ALGORITHM)?;

        let mut credential = None;
        let mut signed_headers = None;
        let mut signature = None;
        for pair in rest.split([',', ' ']).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=')?;
            match key {
                "Credential" => credential = CredentialScope::parse(value),
                "SignedHeaders" => {
                    signed_headers = Some(value.split(';').map(str::to_string).collect())
                }
                "Signature" => signature = Some(value.to_string()),
                _ => {}
            }
        }

        Some(Self {
            credential: credential?,
            signed_headers: signed_headers?,
            signature: signature?,
        })
    }

    pub fn to_header_value(&self) -> String {
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.credential.access_key_id,
            self.credential.scope(),
            self.signed_headers.join(";"),
            self.signature
        )
    }
}

/// Request signer bound to one set of credentials and one region/service.
#[derive(Clone)]
pub struct Signer {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    service: String,
    session_token: Option<String>,
}

impl Debug for Signer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Signer")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl Signer {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            service: service.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, session_token: Option<String>) -> Self {
        self.session_token = session_token;
        self
    }

    /// Sign a request and return the resulting `Authorization` header.
    ///
    /// `url` must already be in encoded form. `amz_date` is the `X-Amz-Date` header
    /// value (`20200307T000000Z`) and fixes the signing time.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        amz_date: &str,
        body: &[u8],
    ) -> Result<AuthorizationHeader, SignError> {
        let time = NaiveDateTime::parse_from_str(amz_date, AMZ_DATE_FORMAT)
            .map_err(|_| SignError::InvalidDate(amz_date.to_string()))?
            .and_utc();
        let uri: Uri = url
            .parse()
            .map_err(|_| SignError::InvalidUrl(url.to_string()))?;
        if uri.host().is_none() {
            return Err(SignError::InvalidUrl(url.to_string()));
        }

        let identity: Identity = Credentials::new(
            self.access_key_id.as_str(),
            self.secret_access_key.as_str(),
            self.session_token.clone(),
            None,
            CREDENTIALS_PROVIDER,
        )
        .into();
        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(&self.service)
            .time(SystemTime::from(time))
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| SignError::Signing(e.to_string()))?
            .into();

        let method = method.to_ascii_uppercase();
        let request = SignableRequest::new(
            &method,
            url,
            std::iter::empty(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| SignError::Signing(e.to_string()))?;
        let (instructions, _signature) = sign(request, &params)
            .map_err(|e| SignError::Signing(e.to_string()))?
            .into_parts();

        let header = instructions
            .headers()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .and_then(|(_, value)| AuthorizationHeader::parse(value))
            .ok_or_else(|| SignError::Signing("no Authorization header produced".to_string()));
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_HEADER: &str = "AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20200307/us-east-1/handler/aws4_request, SignedHeaders=host;x-amz-date, Signature=0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_parse_authorization_header() {
        let header = AuthorizationHeader::parse(FIXTURE_HEADER).unwrap();
        assert_eq!(header.credential.access_key_id, "AKIAEXAMPLE");
        assert_eq!(header.credential.date, "20200307");
        assert_eq!(header.credential.region, "us-east-1");
        assert_eq!(header.credential.service, "handler");
        assert_eq!(header.signed_headers, vec!["host", "x-amz-date"]);
        assert_eq!(header.signature.len(), 64);
        assert_eq!(header.to_header_value(), FIXTURE_HEADER);
    }

    #[test]
    fn test_parse_rejects_garbled_headers() {
        assert!(AuthorizationHeader::parse("Bearer abc").is_none());
        assert!(AuthorizationHeader::parse("AWS4-HMAC-SHA256 Signature=abc").is_none());
        assert!(AuthorizationHeader::parse(
            "AWS4-HMAC-SHA256 Credential=AKID/20200307/us-east-1, SignedHeaders=host, Signature=abc"
        )
        .is_none());
        assert!(AuthorizationHeader::parse("AWS4-HMAC-SHA256 Credential").is_none());
    }

    #[test]
    fn test_sign_get_vanilla() {
        // aws-sig-v4-test-suite: get-vanilla
        let signer = Signer::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "us-east-1",
            "service",
        );
        let header = signer
            .sign("GET", "https://example.amazonaws.com/", "20150830T123600Z", b"")
            .unwrap();
        assert_eq!(
            header.to_header_value(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, SignedHeaders=host;x-amz-date, Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn test_signature_depends_on_every_input() {
        let signer = Signer::new("AKID", "secret", "us-east-1", "handler");
        let url = "https://app.example.com/lambda/callback";
        let base = signer.sign("PUT", url, "20200307T000000Z", b"{}").unwrap();

        let other_body = signer.sign("PUT", url, "20200307T000000Z", b"{ }").unwrap();
        let other_date = signer.sign("PUT", url, "20200307T000001Z", b"{}").unwrap();
        let other_key = Signer::new("AKID", "secret2", "us-east-1", "handler")
            .sign("PUT", url, "20200307T000000Z", b"{}")
            .unwrap();
        let with_token = signer
            .clone()
            .with_session_token(Some("token".to_string()))
            .sign("PUT", url, "20200307T000000Z", b"{}")
            .unwrap();

        for other in [&other_body, &other_date, &other_key, &with_token] {
            assert_ne!(base.signature, other.signature);
        }
        assert_eq!(
            with_token.signed_headers,
            vec!["host", "x-amz-date", "x-amz-security-token"]
        );
    }

    #[test]
    fn test_sign_rejects_bad_inputs() {
        let signer = Signer::new("AKID", "secret", "us-east-1", "handler");
        assert!(matches!(
            signer.sign("PUT", "https://app.example.com/cb", "2020-03-07", b""),
            Err(SignError::InvalidDate(_))
        ));
        assert!(matches!(
            signer.sign("PUT", "/relative/only", "20200307T000000Z", b""),
            Err(SignError::InvalidUrl(_))
        ));
    }

    fn suite_signer() -> Signer {
        Signer::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "us-east-1",
            "service",
        )
    }

    #[test]
    fn test_sign_aws_suite_vectors() {
        let signer = suite_signer();
        let date = "20150830T123600Z";

        // get-vanilla-query-order-key-case
        let header = signer
            .sign(
                "GET",
                "https://example.amazonaws.com/?Param2=value2&Param1=value1",
                date,
                b"",
            )
            .unwrap();
        assert_eq!(
            header.signature,
            "b97d918cfa904a5beff61c982a1b6f458b799221646efd99d3219ec94cdf2500"
        );

        // get-slash-dot-slash-normalized
        let header = signer
            .sign("GET", "https://example.amazonaws.com/./", date, b"")
            .unwrap();
        assert_eq!(
            header.signature,
            "5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );

        // get-vanilla-with-session-token
        let header = signer
            .with_session_token(Some(
                "6e86291e8372ff2a2260956d9b8aae1d763fbf315fa00fa31553b73ebf194267".to_string(),
            ))
            .sign("GET", "https://example.amazonaws.com/", date, b"")
            .unwrap();
        assert_eq!(
            header.signature,
            "07ec1639c89043aa0e3e2de82b96708f198cceab042d4a97044c66dd9f74e7f8"
        );
    }

    #[test]
    fn test_sign_double_encodes_path_segments() {
        let signer = Signer::new("AKID", "k3y", "us-east-1", "handler");
        let sign = |url: &str| {
            signer
                .sign("PUT", url, "20200307T000000Z", b"{}")
                .unwrap()
                .signature
        };

        // Canonical path /hooks/lambda%2520callback
        assert_eq!(
            sign("https://app.example.com/hooks/lambda%20callback"),
            "61b38505dbf97389b04d441aae4107a30ec8673ea29ed61106d4c6bf38371cd6"
        );
        // Canonical path /hooks/lambda%3Acallback
        assert_eq!(
            sign("https://app.example.com/hooks/lambda:callback"),
            "201493f6b9c611c99982992335e5b5a9953f1cd22fae6509e837fa7c93c6c4d2"
        );
        // Canonical path /hooks/%25E1%2588%25B4
        assert_eq!(
            sign("https://app.example.com/hooks/%E1%88%B4"),
            "71b34a830f621a2c420d11aa599735a7f71cbf0a1bd905ea1b8d2c7e94424fdf"
        );
    }
}
