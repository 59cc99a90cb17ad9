//! Visitor sessions
//!
//! Session is entirely client-held. It is kept in a cookie as a PASETO `v4.local` token, which
//! makes it both opaque and tamper-evident for the visitor. There is no server-side session table -
//! whoever holds the token holds the session.

use std::time::Duration;

use base64::prelude::*;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use color_eyre::Result;
use color_eyre::eyre::OptionExt;
use derivative::Derivative;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::version4::V4;
use pasetors::{Local, local};
use sha3::{Digest, Sha3_256};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::model::signatures::SignatureId;
use crate::model::users::UserId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Session secret has to be at least 32 bytes long")]
    SecretTooShort,
    #[error("Invalid session claim {0}")]
    InvalidSessionClaim(&'static str),
    #[error("Session lifetime of {0} days is out of range")]
    MaxAgeOutOfRange(u64),
}

/// PASETO implicit assertion for session tokens
const SESSION_APP_SECRET: &[u8] = b"PetitionSessionTokenSecret";

const MIN_SECRET_LEN: usize = 32;

/// Where the visitor is in the petition workflow
///
/// Having signed and being logged in are independent, so every combination is a valid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Fresh visitor
    #[default]
    Anonymous,
    /// Visitor signed the petition
    Signed(SignatureId),
    /// Visitor registered or logged in
    Authenticated(UserId),
    /// Visitor both signed and is logged in
    SignedAndAuthenticated {
        signature: SignatureId,
        user: UserId,
    },
}

impl SessionState {
    /// Builds the state from its independent parts
    pub fn from_parts(signature: Option<SignatureId>, user: Option<UserId>) -> Self {
        match (signature, user) {
            (None, None) => Self::Anonymous,
            (Some(signature), None) => Self::Signed(signature),
            (None, Some(user)) => Self::Authenticated(user),
            (Some(signature), Some(user)) => Self::SignedAndAuthenticated { signature, user },
        }
    }

    /// Signature made in this session, if any
    pub fn signature(self) -> Option<SignatureId> {
        match self {
            Self::Signed(signature) | Self::SignedAndAuthenticated { signature, .. } => {
                Some(signature)
            }
            Self::Anonymous | Self::Authenticated(_) => None,
        }
    }

    /// User logged in within this session, if any
    pub fn user(self) -> Option<UserId> {
        match self {
            Self::Authenticated(user) | Self::SignedAndAuthenticated { user, .. } => Some(user),
            Self::Anonymous | Self::Signed(_) => None,
        }
    }

    /// Transition after the petition got signed. Authentication is kept untouched.
    pub fn signed(self, signature: SignatureId) -> Self {
        Self::from_parts(Some(signature), self.user())
    }

    /// Transition after the visitor authenticated. Signature is kept untouched.
    pub fn authenticated(self, user: UserId) -> Self {
        Self::from_parts(self.signature(), Some(user))
    }
}

/// Anti-forgery token issued once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    fn generate() -> Self {
        Self(BASE64_URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes()))
    }

    /// Token value to be embedded in forms
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the submitted token against this one
    ///
    /// Both sides are hashed before comparison so the comparison time tells nothing about the
    /// expected token.
    pub fn matches(&self, submitted: &str) -> bool {
        Sha3_256::digest(self.0.as_bytes()) == Sha3_256::digest(submitted.as_bytes())
    }
}

/// Session of a single visitor
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Workflow progress
    pub state: SessionState,
    /// Anti-forgery token for the forms
    pub csrf: CsrfToken,
    /// Fixed moment the session dies, no matter how it is used until then
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Remaining session lifetime
    pub fn remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or_default()
    }

    fn append(&self, mut claims: Claims) -> Result<Claims> {
        if let Some(signature) = self.state.signature() {
            claims.add_additional("sig", i64::from(signature))?;
        }
        if let Some(user) = self.state.user() {
            claims.add_additional("usr", i64::from(user))?;
        }
        claims.add_additional("csrf", self.csrf.as_str())?;
        claims.expiration(&self.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true))?;
        Ok(claims)
    }

    fn from_claims(claims: &Claims) -> Result<Self> {
        let id = |claim: &'static str| -> Result<Option<i64>> {
            claims
                .get_claim(claim)
                .map(|value| {
                    value
                        .as_i64()
                        .ok_or_eyre(Error::InvalidSessionClaim(claim))
                })
                .transpose()
        };

        let signature = id("sig")?.map(SignatureId::from);
        let user = id("usr")?.map(UserId::from);

        let csrf = claims
            .get_claim("csrf")
            .and_then(|csrf| csrf.as_str())
            .ok_or(Error::InvalidSessionClaim("csrf"))?;

        let expires_at = claims
            .get_claim("exp")
            .and_then(|exp| exp.as_str())
            .ok_or(Error::InvalidSessionClaim("exp"))?;

        Ok(Self {
            state: SessionState::from_parts(signature, user),
            csrf: CsrfToken(csrf.to_owned()),
            expires_at: expires_at.parse()?,
        })
    }
}

/// Keys and policy for sealing sessions into tokens
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SessionKeys {
    #[derivative(Debug = "ignore")]
    key: SymmetricKey<V4>,
    /// Lifetime of newly started sessions
    ttl: TimeDelta,
    /// Whether the cookie is restricted to HTTPS
    secure: bool,
}

impl SessionKeys {
    /// Derives session keys from the configured secret
    pub fn with_config(config: &config::Session) -> Result<Self> {
        if config.secret.len() < MIN_SECRET_LEN {
            return Err(Error::SecretTooShort.into());
        }

        let ttl = i64::try_from(config.max_age_days)
            .ok()
            .and_then(TimeDelta::try_days)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or(Error::MaxAgeOutOfRange(config.max_age_days))?;

        let key = Sha3_256::digest(config.secret.as_bytes());
        Ok(Self {
            key: SymmetricKey::<V4>::from(key.as_slice())?,
            ttl,
            secure: config.secure,
        })
    }

    /// Whether the session cookie should be marked `Secure`
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Starts a new anonymous session
    pub fn start(&self) -> Result<Session> {
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or(Error::MaxAgeOutOfRange(self.ttl.num_days().unsigned_abs()))?;

        Ok(Session {
            state: SessionState::Anonymous,
            csrf: CsrfToken::generate(),
            expires_at,
        })
    }

    /// Seals the session into a token
    ///
    /// Expiration is taken from the session, so resealing a changed session never extends it.
    pub fn seal(&self, session: &Session) -> Result<String> {
        let claims = session.append(Claims::new()?)?;
        let token = local::encrypt(&self.key, &claims, None, Some(SESSION_APP_SECRET))?;
        Ok(token)
    }

    /// Opens a session token, failing if it was tampered with or expired
    pub fn open(&self, token: &str) -> Result<Session> {
        let token = UntrustedToken::<Local, V4>::try_from(token)?;

        let rules = ClaimsValidationRules::new();
        let token = local::decrypt(&self.key, &token, &rules, None, Some(SESSION_APP_SECRET))?;

        let claims = token
            .payload_claims()
            .ok_or(Error::InvalidSessionClaim("payload"))?;
        Session::from_claims(claims)
    }
}
