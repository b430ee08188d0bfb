use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info};
use rand::RngCore;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::entity::{session, user};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid user")]
    InvalidUser,
    #[error("Invalid password")]
    InvalidPassword,
    #[error(transparent)]
    App(#[from] AppError),
}

/// An established login. `token` is what goes into the session cookie.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: i32,
    pub sid: String,
    pub token: String,
}

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i32,
    pub sid: String,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "loginId")]
    login_id: i32,
    sid: String,
    exp: usize,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let db = match req.app_data::<web::Data<DatabaseConnection>>() {
            Some(db) => db.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let config = match req.app_data::<web::Data<AppConfig>>() {
            Some(cfg) => cfg.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let token = extract_token(req, &config);

        Box::pin(async move {
            let token = token.ok_or_else(AppError::need_login)?;
            let auth = authenticate(&db, &config, &token).await?;
            Ok(auth)
        })
    }
}

pub fn extract_token(req: &HttpRequest, config: &AppConfig) -> Option<String> {
    req.cookie(&config.session_cookie)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Checks credentials and records a new server-side session.
pub async fn login(
    db: &DatabaseConnection,
    config: &AppConfig,
    login: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let user = user::Entity::find()
        .filter(user::Column::Login.eq(login))
        .one(db)
        .await
        .map_err(AppError::from)?
        .ok_or(AuthError::InvalidUser)?;

    if !verify_password(password, &user.password).await? {
        return Err(AuthError::InvalidPassword);
    }

    let now = Utc::now();
    purge_expired(db).await?;

    let expires = now + Duration::hours(config.session_ttl_hours);
    let sid = new_sid();
    let active = session::ActiveModel {
        sid: Set(sid.clone()),
        user_id: Set(user.id),
        created: Set(now),
        expires: Set(expires),
        ..Default::default()
    };
    active.insert(db).await.map_err(AppError::from)?;

    let claims = Claims {
        login_id: user.id,
        sid: sid.clone(),
        exp: expires.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret_key.as_bytes()),
    )
    .map_err(|e| {
        error!("session token encode failed: {}", e);
        AppError::system_exception()
    })?;

    info!("user {} logged in", user.id);
    Ok(Session {
        user_id: user.id,
        sid,
        token,
    })
}

/// Drops the server-side session; its token stops authenticating.
pub async fn logout(db: &DatabaseConnection, auth: &AuthUser) -> Result<(), AppError> {
    session::Entity::delete_many()
        .filter(session::Column::Sid.eq(auth.sid.as_str()))
        .exec(db)
        .await?;
    info!("user {} logged out", auth.user_id);
    Ok(())
}

pub async fn is_authenticated(db: &DatabaseConnection, config: &AppConfig, token: Option<&str>) -> bool {
    match token {
        Some(token) => authenticate(db, config, token).await.is_ok(),
        None => false,
    }
}

pub async fn authenticate(
    db: &DatabaseConnection,
    config: &AppConfig,
    token: &str,
) -> Result<AuthUser, AppError> {
    let claims = decode_token(config, token)?;
    let live = session::Entity::find()
        .filter(session::Column::Sid.eq(claims.sid.as_str()))
        .filter(session::Column::UserId.eq(claims.login_id))
        .filter(session::Column::Expires.gt(Utc::now()))
        .one(db)
        .await?
        .is_some();
    if !live {
        return Err(AppError::need_login());
    }
    Ok(AuthUser {
        user_id: claims.login_id,
        sid: claims.sid,
    })
}

fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(config.secret_key.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::need_login())
}

async fn purge_expired(db: &DatabaseConnection) -> Result<(), AppError> {
    session::Entity::delete_many()
        .filter(session::Column::Expires.lte(Utc::now()))
        .exec(db)
        .await?;
    Ok(())
}

fn new_sid() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    web::block(move || bcrypt::hash(password, cost))
        .await
        .map_err(|_| AppError::system_exception())?
        .map_err(|e| {
            error!("password hash failed: {}", e);
            AppError::system_exception()
        })
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    web::block(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|_| AppError::system_exception())?
        .map_err(|e| {
            error!("password verify failed: {}", e);
            AppError::system_exception()
        })
}
