use std::time::Duration as StdDuration;

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::Role;

const FILE_TOKEN_AUDIENCE_SUFFIX: &str = "-files";

#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    expiry: Duration,
    file_audience: String,
}

impl JwtService {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if config.jwt_secret.is_empty() {
            return Err(anyhow!("JWT secret must not be empty"));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            expiry: Duration::minutes(config.jwt_expiry_minutes),
            file_audience: format!("{}{FILE_TOKEN_AUDIENCE_SUFFIX}", config.jwt_audience),
        })
    }

    pub fn generate_token(&self, user_id: Uuid, name: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let exp = now + self.expiry;
        let claims = Claims {
            sub: user_id,
            name: name.to_owned(),
            role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Token granting read access to one stored object.
    pub fn generate_file_token(&self, key: &str, expires_in: StdDuration) -> Result<String> {
        let now = Utc::now();
        let lifetime = Duration::from_std(expires_in)?;
        let claims = FileClaims {
            key: key.to_owned(),
            iss: self.issuer.clone(),
            aud: self.file_audience.clone(),
            iat: now.timestamp() as usize,
            exp: (now + lifetime).timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_file_token(&self, token: &str) -> Result<FileClaims> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.file_audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<FileClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileClaims {
    pub key: String,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}
