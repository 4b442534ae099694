use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};

use crate::config::{JwtConfig, MAX_EXPIRY_MINUTES};
use crate::error::{AppError, Result};
use crate::middleware::Claims;

/// Issues and verifies HMAC-signed bearer tokens. Stateless: a token is valid
/// iff its signature checks out and `exp` has not passed.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    expiry: Duration,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

impl AuthService {
    pub fn new(config: &JwtConfig) -> anyhow::Result<Self> {
        let algorithm = config.algorithm()?;
        if !(1..=MAX_EXPIRY_MINUTES).contains(&config.expiry_minutes) {
            anyhow::bail!("JWT expiry must be between 1 and {} minutes", MAX_EXPIRY_MINUTES);
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            header: Header::new(algorithm),
            validation,
            expiry: Duration::minutes(config.expiry_minutes),
        })
    }

    /// Development-mode login: any caller may obtain a token for any user id.
    pub fn issue(&self, user_id: i64) -> Result<IssuedToken> {
        let exp = Utc::now() + self.expiry;
        let access_token = self.issue_with_expiry(user_id, exp)?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.expiry.num_seconds(),
        })
    }

    pub fn issue_with_expiry(&self, user_id: i64, exp: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: Utc::now().timestamp(),
            exp: exp.timestamp(),
        };

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Token generation failed: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<i64> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Rejected expired token");
                    AppError::TokenExpired
                }
                _ => {
                    tracing::debug!(error = %e, "Rejected invalid token");
                    AppError::Unauthorized
                }
            })?
            .claims;

        claims.sub.parse::<i64>().map_err(|_| {
            tracing::debug!(sub = %claims.sub, "Token subject is not a user id");
            AppError::Unauthorized
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret".to_string(),
            algorithm: "HS256".to_string(),
            expiry_minutes: 60,
        }
    }

    fn flip_signature(token: &str) -> String {
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{}.{}", head, chars.into_iter().collect::<String>())
    }

    #[test]
    fn test_issue_then_verify_returns_user_id() {
        let auth = AuthService::new(&config()).unwrap();
        let issued = auth.issue(42).unwrap();

        assert_eq!(issued.expires_in, 3600);
        assert_eq!(issued.access_token.matches('.').count(), 2);
        assert_eq!(auth.verify(&issued.access_token).unwrap(), 42);
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let auth = AuthService::new(&config()).unwrap();
        let token = auth.issue(42).unwrap().access_token;

        let err = auth.verify(&flip_signature(&token)).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_expired_token_rejected_as_expired() {
        let auth = AuthService::new(&config()).unwrap();
        let token = auth
            .issue_with_expiry(42, Utc::now() - Duration::minutes(5))
            .unwrap();

        let err = auth.verify(&token).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let auth = AuthService::new(&config()).unwrap();
        let other = AuthService::new(&JwtConfig {
            secret: "another-secret".to_string(),
            ..config()
        })
        .unwrap();

        let token = other.issue(42).unwrap().access_token;
        assert!(matches!(auth.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let auth = AuthService::new(&config()).unwrap();
        let hs512 = AuthService::new(&JwtConfig {
            algorithm: "HS512".to_string(),
            ..config()
        })
        .unwrap();

        let token = hs512.issue(42).unwrap().access_token;
        assert!(matches!(auth.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let auth = AuthService::new(&config()).unwrap();
        assert!(matches!(auth.verify("not-a-jwt"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_rsa_algorithm_refused_at_construction() {
        let result = AuthService::new(&JwtConfig {
            algorithm: "RS256".to_string(),
            ..config()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_unbounded_expiry_refused_at_construction() {
        let result = AuthService::new(&JwtConfig {
            expiry_minutes: i64::MAX,
            ..config()
        });
        assert!(result.is_err());
    }
}
