use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::*;
use crate::logger::*;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub signing_key: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = true;
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);
        v
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user: UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let iat = Utc::now();
        let exp = iat + self.cfg.access_ttl;
        let claims = AccessClaims {
            sub: user.to_string(),
            exp: exp.timestamp(),
            iat: iat.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

        Ok((AccessToken(token), exp))
    }

    async fn verify_access_token(&self, token: &AccessToken) -> Result<UserId, AuthError> {
        let data = decode::<AccessClaims>(
            &token.0,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &self.validation(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })?;

        data.claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::TokenInvalid)
    }
}

fn store_err(e: anyhow::Error) -> AuthError {
    AuthError::Store(e.to_string())
}

pub struct RealAuthService {
    auth_repo: Arc<dyn AuthRepo>,
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    tx_manager: Arc<dyn TxManager>,
    min_username_len: usize,
    min_password_len: usize,
}

impl RealAuthService {
    pub fn new(
        auth_repo: Arc<dyn AuthRepo>,
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            auth_repo,
            user_repo,
            credential_hasher,
            token_codec,
            tx_manager,
            min_username_len: 3,
            min_password_len: 6,
        }
    }

    fn validate_register(&self, request: &RegisterInput) -> Result<(), AuthError> {
        if request.full_name.trim().is_empty() {
            return Err(AuthError::InvalidInput("full name is required".to_string()));
        }
        if request.username.chars().count() < self.min_username_len {
            return Err(AuthError::InvalidInput("username too short".to_string()));
        }
        if request.username.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidInput(
                "username must not contain whitespace".to_string(),
            ));
        }
        if request.password.chars().count() < self.min_password_len {
            return Err(AuthError::InvalidInput("password too short".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<UserRecord, AuthError> {
        self.validate_register(&request)?;

        if self
            .user_repo
            .get_by_username(&request.username)
            .await
            .map_err(store_err)?
            .is_some()
        {
            return Err(AuthError::UserExists);
        }

        // hashing happens before the transaction so no store lock is held meanwhile
        let password_hash = self
            .credential_hasher
            .hash_password(&request.password)
            .await?;

        let RegisterInput {
            full_name,
            username,
            account_type,
            dob,
            ..
        } = request;
        let new_user = NewUserRecord {
            user_id: UserId::new_v4(),
            full_name,
            username,
            account_type,
            dob,
            avatar: DEFAULT_AVATAR.to_string(),
        };

        let mut tx = self.tx_manager.begin().await.map_err(store_err)?;

        match self
            .user_repo
            .create_in_tx(&mut *tx, &new_user)
            .await
            .map_err(store_err)?
        {
            InsertOutcome::Inserted => {}
            InsertOutcome::Duplicate => return Err(AuthError::UserExists),
            InsertOutcome::MissingReference => {
                return Err(AuthError::InternalError(
                    "user insert reported a missing reference".to_string(),
                ));
            }
        }

        self.auth_repo
            .create_credentials_in_tx(&mut *tx, new_user.user_id, &password_hash)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        info!(user_id = %new_user.user_id, username = %new_user.username, "user registered");

        self.user_repo
            .get_by_id(new_user.user_id)
            .await
            .map_err(store_err)?
            .ok_or(AuthError::UserNotFound)
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { username, password } = request;

        let rec = self
            .auth_repo
            .get_by_username(&username)
            .await
            .map_err(store_err)?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .user_repo
            .get_by_id(rec.user_id)
            .await
            .map_err(store_err)?
            .ok_or(AuthError::InvalidCredentials)?;

        let (access_token, expires_at) = self.token_codec.issue_access_token(rec.user_id).await?;

        Ok(LoginResult {
            user,
            access_token,
            expires_at,
        })
    }

    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let user_id = self
            .token_codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await?;

        if !self.user_repo.id_exists(user_id).await.map_err(store_err)? {
            return Err(AuthError::UserNotFound);
        }

        Ok(user_id)
    }
}
