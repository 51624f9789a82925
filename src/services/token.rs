//! JWT access tokens for the admin and client APIs.
//!
//! Tokens are issued by the billing front end with a shared secret. The
//! subject is the billing client ID (or admin ID) and `role` selects which
//! route group the bearer may call.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Caller role carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
}

/// JWT claims structure for access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - the billing client or admin ID as a string
    pub sub: String,
    pub role: Role,
    /// Expiration time as Unix timestamp
    pub exp: i64,
    /// Issued at time as Unix timestamp
    pub iat: i64,
}

/// Creates a signed access token.
///
/// # Example
///
/// ```
/// use ptero_provisioner::services::token::{create_access_token, Role};
///
/// let token = create_access_token(42, Role::Client, "my_secret", 3600).expect("Failed to create token");
/// assert_eq!(token.matches('.').count(), 2);
/// ```
pub fn create_access_token(
    subject: i64,
    role: Role,
    secret: &str,
    expiry_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: subject.to_string(),
        role,
        exp: now + expiry_secs,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decodes and validates an access token (signature and expiry).
pub fn decode_access_token(
    token: &str,
    secret: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_access_token() {
        let token = create_access_token(7, Role::Admin, "test_secret_key_12345", 3600)
            .expect("Failed to create access token");
        assert!(!token.is_empty());
        // JWT has three parts separated by dots
        assert_eq!(token.matches('.').count(), 2);
    }

    #[test]
    fn test_decode_access_token_valid() {
        let secret = "test_secret_key_12345";
        let token = create_access_token(7, Role::Client, secret, 3600)
            .expect("Failed to create access token");
        let claims = decode_access_token(&token, secret).expect("Failed to decode access token");

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, Role::Client);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_decode_access_token_wrong_secret() {
        let token = create_access_token(7, Role::Client, "correct_secret", 3600)
            .expect("Failed to create access token");
        assert!(decode_access_token(&token, "wrong_secret").is_err());
    }

    #[test]
    fn test_decode_access_token_expired() {
        // Well past the default leeway
        let token = create_access_token(7, Role::Client, "test_secret", -120)
            .expect("Failed to create access token");
        assert!(decode_access_token(&token, "test_secret").is_err());
    }

    #[test]
    fn test_claims_serialization() {
        let claims = Claims {
            sub: "123".to_string(),
            role: Role::Admin,
            exp: 1700000000,
            iat: 1699996400,
        };

        let json = serde_json::to_string(&claims).expect("Failed to serialize claims");
        assert!(json.contains("\"sub\":\"123\""));
        assert!(json.contains("\"role\":\"admin\""));
        assert!(json.contains("\"exp\":1700000000"));
    }
}
