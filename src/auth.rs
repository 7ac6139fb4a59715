use crate::schemas::MemberId;
use actix_web::{http::header::HeaderValue, HttpRequest};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::num::ParseIntError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, PartialEq)]
pub enum AuthorizationLevel {
    /// The upstream identity service, which may act on behalf of anyone.
    Service,
    Member(MemberId),
}

impl AuthorizationLevel {
    pub fn member(&self) -> Option<&str> {
        match self {
            AuthorizationLevel::Service => None,
            AuthorizationLevel::Member(id) => Some(id),
        }
    }
}

/// Checks `Authorization` headers against the service token and signed member tokens.
///
/// Member tokens look like `{member_id}.{hex hmac}` where the HMAC-SHA256 key is the
/// SHA-256 digest of the service token.
#[derive(Clone)]
pub struct Authenticator {
    service_token: String,
    key: Vec<u8>,
}

impl Authenticator {
    pub fn new(service_token: impl Into<String>) -> Self {
        let service_token = service_token.into();
        let mut sha256_hasher = Sha256::new();
        sha256_hasher.update(service_token.as_bytes());
        let key = sha256_hasher.finalize().to_vec();
        Self { service_token, key }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.key).expect("hmac key of any size")
    }

    pub fn issue_token(&self, member: &str) -> String {
        let mut hmac_hasher = self.mac();
        hmac_hasher.update(member.as_bytes());
        let signature = hmac_hasher.finalize().into_bytes();
        format!("{}.{}", member, encode_hex(&signature))
    }

    pub fn verify_token(&self, token: &str) -> Option<MemberId> {
        let (member, signature) = token.rsplit_once('.')?;
        if member.is_empty() {
            return None;
        }
        let signature = decode_hex(signature).ok()?;
        let mut hmac_hasher = self.mac();
        hmac_hasher.update(member.as_bytes());
        hmac_hasher.verify_slice(&signature).ok()?;
        Some(member.to_string())
    }

    pub fn check_authorization_level(&self, request: &HttpRequest) -> Option<AuthorizationLevel> {
        let authorization = request
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .map(HeaderValue::to_str)?
            .ok()?;
        let authorization = authorization
            .strip_prefix("Bearer ")
            .unwrap_or(authorization);
        if authorization == self.service_token {
            return Some(AuthorizationLevel::Service);
        }
        match self.verify_token(authorization) {
            Some(member) => Some(AuthorizationLevel::Member(member)),
            None => {
                tracing::warn!(path = %request.path(), "rejected authorization token");
                None
            }
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, ParseIntError> {
    hex.as_bytes()
        .chunks(2)
        .map(|pair| u8::from_str_radix(&String::from_utf8_lossy(pair), 16))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::{fixture, rstest};

    #[fixture]
    fn authenticator() -> Authenticator {
        Authenticator::new("service-secret")
    }

    fn request(header: Option<&str>) -> HttpRequest {
        let mut builder = TestRequest::default();
        if let Some(value) = header {
            builder = builder.insert_header((actix_web::http::header::AUTHORIZATION, value));
        }
        builder.to_http_request()
    }

    #[rstest]
    fn issued_tokens_verify(authenticator: Authenticator) {
        let token = authenticator.issue_token("65f0c0ffee");
        assert!(token.starts_with("65f0c0ffee."));
        assert_eq!(authenticator.verify_token(&token), Some("65f0c0ffee".to_string()));
    }

    #[rstest]
    #[case::other_member("bob")]
    #[case::truncated("alice.00")]
    #[case::not_hex("alice.zz")]
    #[case::no_member(".abcd")]
    #[case::no_signature("alice")]
    fn rejects_forged_tokens(authenticator: Authenticator, #[case] suffix: &str) {
        let signature = authenticator.issue_token("alice");
        let forged = if suffix == "bob" {
            signature.replacen("alice", "bob", 1)
        } else {
            suffix.to_string()
        };
        assert_eq!(authenticator.verify_token(&forged), None);
    }

    #[rstest]
    fn tokens_from_another_service_are_rejected(authenticator: Authenticator) {
        let token = Authenticator::new("other-secret").issue_token("alice");
        assert_eq!(authenticator.verify_token(&token), None);
    }

    #[rstest]
    fn classifies_headers(authenticator: Authenticator) {
        let member_token = authenticator.issue_token("alice");
        let bearer = format!("Bearer {}", member_token);

        assert_eq!(
            authenticator.check_authorization_level(&request(Some("service-secret"))),
            Some(AuthorizationLevel::Service)
        );
        assert_eq!(
            authenticator.check_authorization_level(&request(Some(&member_token))),
            Some(AuthorizationLevel::Member("alice".to_string()))
        );
        assert_eq!(
            authenticator.check_authorization_level(&request(Some(&bearer))),
            Some(AuthorizationLevel::Member("alice".to_string()))
        );
        assert_eq!(
            authenticator.check_authorization_level(&request(Some("garbage"))),
            None
        );
        assert_eq!(authenticator.check_authorization_level(&request(None)), None);
    }
}
