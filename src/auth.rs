// src/auth.rs
use anyhow::Result;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::core::config_manager::AuthSettings;
use crate::models::User;
use crate::repository::UserRepository;
use crate::services::{AppState, BetaService};

const FIREBASE_KEYS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub exp: usize,
    pub iat: usize,
}

pub struct AuthConfig {
    pub project_id: String,
    pub shared_secret: Option<String>,
    pub firebase_keys: HashMap<String, String>, // kid -> x509 PEM
}

impl AuthConfig {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self {
            project_id: settings.firebase_project_id.clone(),
            shared_secret: settings
                .shared_secret
                .clone()
                .filter(|s| !s.trim().is_empty()),
            firebase_keys: HashMap::new(),
        }
    }

    pub fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    /// Fetch Firebase public keys for JWT verification
    pub async fn update_firebase_keys(&mut self) -> Result<()> {
        let response = reqwest::get(FIREBASE_KEYS_URL).await?;
        if !response.status().is_success() {
            anyhow::bail!("Firebase key endpoint returned {}", response.status());
        }
        let keys: HashMap<String, String> = response.json().await?;

        info!("Updated Firebase public keys ({} keys)", keys.len());
        self.firebase_keys = keys;
        Ok(())
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation
    }

    /// RS256 Firebase ID tokens, or HS256 tokens signed with the shared secret when one is set
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let header = jsonwebtoken::decode_header(token)?;

        let claims = match header.alg {
            Algorithm::RS256 => {
                let kid = header
                    .kid
                    .ok_or_else(|| anyhow::anyhow!("Missing kid in token header"))?;
                let public_key = self
                    .firebase_keys
                    .get(&kid)
                    .ok_or_else(|| anyhow::anyhow!("Unknown key ID: {}", kid))?;
                let key = DecodingKey::from_rsa_pem(public_key.as_bytes())?;
                decode::<Claims>(token, &key, &self.validation(Algorithm::RS256))?.claims
            }
            Algorithm::HS256 => {
                let secret = self
                    .shared_secret
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("Shared-secret tokens are not enabled"))?;
                let key = DecodingKey::from_secret(secret.as_bytes());
                decode::<Claims>(token, &key, &self.validation(Algorithm::HS256))?.claims
            }
            other => anyhow::bail!("Unsupported token algorithm: {:?}", other),
        };

        if claims.email.trim().is_empty() {
            anyhow::bail!("Token carries no email");
        }
        Ok(claims)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenVerificationFailed,
    BetaApprovalRequired,
    AdminRequired,
    DatabaseError,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Authorization token required",
            AuthError::InvalidToken => "Invalid authorization token format",
            AuthError::TokenVerificationFailed => "Token verification failed",
            AuthError::BetaApprovalRequired => {
                "Your beta access request has not been approved yet"
            }
            AuthError::AdminRequired => "Administrator access required",
            AuthError::DatabaseError => "Database error occurred",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenVerificationFailed => Status::Unauthorized,
            AuthError::BetaApprovalRequired | AuthError::AdminRequired => Status::Forbidden,
            AuthError::DatabaseError => Status::InternalServerError,
        }
    }
}

/// Request-local record of why authentication failed, read back by the catchers
pub struct AuthFailure(pub Option<AuthError>);

fn fail<T>(req: &Request<'_>, error: AuthError) -> Outcome<T, AuthError> {
    req.local_cache(|| AuthFailure(Some(error)));
    Outcome::Error((error.status(), error))
}

pub struct AuthenticatedUser {
    pub user: User,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_config = match req.guard::<&State<AuthConfig>>().await {
            Outcome::Success(config) => config,
            Outcome::Error(_) | Outcome::Forward(_) => {
                error!("AuthConfig is not managed");
                return fail(req, AuthError::DatabaseError);
            }
        };

        let state = match req.guard::<&State<AppState>>().await {
            Outcome::Success(state) => state,
            Outcome::Error(_) | Outcome::Forward(_) => {
                error!("AppState is not managed");
                return fail(req, AuthError::DatabaseError);
            }
        };

        let token = match req.headers().get_one("Authorization") {
            Some(header) => match header.strip_prefix("Bearer ") {
                Some(token) if !token.trim().is_empty() => token.trim(),
                _ => {
                    warn!("Invalid Authorization header format");
                    return fail(req, AuthError::InvalidToken);
                }
            },
            None => return fail(req, AuthError::MissingToken),
        };

        let claims = match auth_config.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Token verification failed: {}", e);
                return fail(req, AuthError::TokenVerificationFailed);
            }
        };

        let user = match UserRepository::new(state.db.pool())
            .upsert_identity(
                &claims.sub,
                &claims.email,
                claims.name.as_deref(),
                claims.picture.as_deref(),
            )
            .await
        {
            Ok(user) => user,
            Err(e) => {
                error!("Failed to record user {}: {:#}", claims.email, e);
                return fail(req, AuthError::DatabaseError);
            }
        };

        let is_admin = state.config.is_admin(&user.email);

        if state.config.auth.require_beta_approval && !is_admin {
            match BetaService::new(&state.db).is_approved(&user.email).await {
                Ok(true) => {}
                Ok(false) => {
                    info!("Rejecting {}: beta access not approved", user.email);
                    return fail(req, AuthError::BetaApprovalRequired);
                }
                Err(e) => {
                    error!("Beta approval lookup failed for {}: {}", user.email, e);
                    return fail(req, AuthError::DatabaseError);
                }
            }
        }

        Outcome::Success(AuthenticatedUser { user, is_admin })
    }
}

pub struct AdminUser(pub AuthenticatedUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = AuthError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthenticatedUser::from_request(req).await {
            Outcome::Success(auth) if auth.is_admin => Outcome::Success(AdminUser(auth)),
            Outcome::Success(auth) => {
                warn!("{} attempted an admin operation", auth.email());
                fail(req, AuthError::AdminRequired)
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

// Optional auth guard that doesn't fail if no auth is provided
pub struct OptionalAuth {
    pub user: Option<AuthenticatedUser>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuth {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthenticatedUser::from_request(req).await {
            Outcome::Success(auth) => Outcome::Success(OptionalAuth { user: Some(auth) }),
            _ => Outcome::Success(OptionalAuth { user: None }),
        }
    }
}
