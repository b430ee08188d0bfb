use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::response::response_from_error;

pub const LOGIN_PATH: &str = "/admin/login/";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    ParamError(String),
    #[error("page not found")]
    NotFound,
    #[error("please login first")]
    NeedLogin,
    #[error("system_exception")]
    SystemException,
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::ParamError(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn need_login() -> Self {
        Self::NeedLogin
    }

    pub fn system_exception() -> Self {
        Self::SystemException
    }

    pub fn msg(&self) -> String {
        self.to_string()
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        log::error!("store error: {}", err);
        Self::SystemException
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParamError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NeedLogin => StatusCode::SEE_OTHER,
            Self::SystemException => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        response_from_error(self)
    }
}
