use std::fmt;

use serde_json::Value;

/// An OAuth credential obtained from the token endpoint.
///
/// `raw` is the provider response exactly as received; it is what gets
/// persisted and what a later refresh reads `refresh_token` from.
#[derive(Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub raw: Value,
}

/// Reasons a token response body is rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResponseViolation {
    NotAnObject,
    MissingAccessToken,
    EmptyAccessToken,
    AccessTokenNotString,
    RefreshTokenNotString,
}

impl fmt::Display for TokenResponseViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenResponseViolation::NotAnObject => write!(f, "response body is not a JSON object"),
            TokenResponseViolation::MissingAccessToken => write!(f, "access_token is missing"),
            TokenResponseViolation::EmptyAccessToken => write!(f, "access_token is empty"),
            TokenResponseViolation::AccessTokenNotString => write!(f, "access_token is not a string"),
            TokenResponseViolation::RefreshTokenNotString => write!(f, "refresh_token is not a string"),
        }
    }
}

impl Credential {
    /// Validate a token response payload and build a credential from it.
    ///
    /// Fields other than `access_token` and `refresh_token` are kept in
    /// `raw` untouched.
    pub fn from_token_response(raw: Value) -> Result<Self, TokenResponseViolation> {
        let obj = raw.as_object().ok_or(TokenResponseViolation::NotAnObject)?;

        let access_token = match obj.get("access_token") {
            None | Some(Value::Null) => return Err(TokenResponseViolation::MissingAccessToken),
            Some(Value::String(s)) if s.is_empty() => return Err(TokenResponseViolation::EmptyAccessToken),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(TokenResponseViolation::AccessTokenNotString),
        };

        let refresh_token = match obj.get("refresh_token") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(TokenResponseViolation::RefreshTokenNotString),
        };

        Ok(Self {
            access_token,
            refresh_token,
            raw,
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}
