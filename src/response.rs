use actix_web::{
    error::UrlencodedError,
    http::header::{self, ContentType},
    HttpRequest, HttpResponse,
};
use log::error;
use tera::{Context, Tera};

use crate::error::{AppError, LOGIN_PATH};

pub fn render(tera: &Tera, template: &str, ctx: &Context) -> Result<HttpResponse, AppError> {
    render_with(tera, HttpResponse::Ok(), template, ctx)
}

/// Renders `template` into a response builder that already carries a status.
pub fn render_with(
    tera: &Tera,
    mut builder: actix_web::HttpResponseBuilder,
    template: &str,
    ctx: &Context,
) -> Result<HttpResponse, AppError> {
    let body = tera.render(template, ctx).map_err(|e| {
        error!("render {} failed: {:?}", template, e);
        AppError::system_exception()
    })?;
    Ok(builder.content_type(ContentType::html()).body(body))
}

pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = match err {
        UrlencodedError::ContentType => AppError::param_error("unsupported form encoding"),
        UrlencodedError::Overflow { .. } => AppError::param_error("form too large"),
        _ => AppError::param_error("invalid form"),
    };
    app_err.into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    if let AppError::NeedLogin = err {
        return see_other(LOGIN_PATH);
    }
    let status = actix_web::ResponseError::status_code(err);
    let body = format!(
        "<!doctype html><html><head><title>{code}</title></head>\
         <body><h1>{code}</h1><p>{msg}</p></body></html>",
        code = status.as_u16(),
        msg = tera::escape_html(&err.msg()),
    );
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(body)
}
