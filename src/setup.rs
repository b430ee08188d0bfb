use log::info;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::auth;
use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;

#[derive(Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyExists,
}

/// Inserts the admin account unless that login is already present.
pub async fn seed_admin(
    db: &DatabaseConnection,
    login: &str,
    password: &str,
    cost: u32,
) -> Result<SeedOutcome, AppError> {
    let existing = user::Entity::find()
        .filter(user::Column::Login.eq(login))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(SeedOutcome::AlreadyExists);
    }

    let hash = auth::hash_password(password, cost).await?;
    user::ActiveModel {
        login: Set(login.to_string()),
        password: Set(hash),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(SeedOutcome::Created)
}

/// The `--create` command. The schema already exists once connected, so this
/// only seeds the admin from `EGM_USER`/`EGM_PASS`.
pub async fn create_data(db: &DatabaseConnection, config: &AppConfig) -> Result<SeedOutcome, AppError> {
    let (login, password) = match (&config.admin_login, &config.admin_password) {
        (Some(login), Some(password)) => (login.trim(), password.as_str()),
        _ => return Err(AppError::param_error("EGM_USER and EGM_PASS must be set")),
    };
    let outcome = seed_admin(db, login, password, config.bcrypt_cost).await?;
    match outcome {
        SeedOutcome::Created => info!("admin user {:?} created", login),
        SeedOutcome::AlreadyExists => info!("admin user {:?} already exists, left unchanged", login),
    }
    Ok(outcome)
}
