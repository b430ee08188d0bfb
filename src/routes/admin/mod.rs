use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    http::{header, StatusCode},
    web, HttpRequest, HttpResponse, Scope,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

use crate::auth::{self, AuthError, AuthUser};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::response::{render_with, see_other};

mod biography;
mod blog;
mod event;
mod user;
mod work;

pub const ADMIN_INDEX: &str = "/admin/";

#[derive(Serialize)]
struct Section {
    slug: &'static str,
    title: &'static str,
}

const SECTIONS: [Section; 5] = [
    Section { slug: blog::SLUG, title: "Blog" },
    Section { slug: biography::SLUG, title: "Biography" },
    Section { slug: event::SLUG, title: "Event" },
    Section { slug: work::SLUG, title: "Work" },
    Section { slug: user::SLUG, title: "User" },
];

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(to_index)))
        .service(web::resource("/").route(web::get().to(index)))
        .service(
            web::resource("/login/")
                .route(web::get().to(login_view))
                .route(web::post().to(login_submit)),
        )
        .service(
            web::resource("/logout/")
                .route(web::get().to(logout_view))
                .route(web::post().to(logout_view)),
        )
        .service(section(blog::SLUG, blog::config))
        .service(section(biography::SLUG, biography::config))
        .service(section(event::SLUG, event::config))
        .service(section(work::SLUG, work::config))
        .service(section(user::SLUG, user::config));
}

// nested scopes fall back to the app default, not ours, so each gets its own
fn section(slug: &str, routes: fn(&mut web::ServiceConfig)) -> Scope {
    web::scope(&format!("/{}", slug))
        .configure(routes)
        .default_service(web::to(append_slash))
}

#[derive(Serialize, Clone, Debug)]
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Serialize, Clone, Debug)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: &'static str,
    pub value: String,
    pub choices: Vec<Choice>,
}

impl FieldView {
    fn with_kind(kind: &'static str, name: &'static str, label: &'static str, value: &str) -> Self {
        Self {
            name,
            label,
            kind,
            value: value.to_string(),
            choices: Vec::new(),
        }
    }

    pub fn text(name: &'static str, label: &'static str, value: &str) -> Self {
        Self::with_kind("text", name, label, value)
    }

    pub fn text_area(name: &'static str, label: &'static str, value: &str) -> Self {
        Self::with_kind("textarea", name, label, value)
    }

    /// Never carries a value back to the page.
    pub fn password(name: &'static str, label: &'static str) -> Self {
        Self::with_kind("password", name, label, "")
    }

    pub fn select(name: &'static str, label: &'static str, value: &str, choices: Vec<Choice>) -> Self {
        Self {
            choices,
            ..Self::with_kind("select", name, label, value)
        }
    }
}

#[derive(Serialize)]
pub struct ListRow {
    pub id: i32,
    pub cells: Vec<String>,
}

#[derive(Serialize)]
struct ListPage<'a> {
    slug: &'a str,
    title: &'a str,
    columns: &'a [&'a str],
    rows: Vec<ListRow>,
}

#[derive(Serialize)]
pub struct FormPage<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub action: String,
    pub fields: Vec<FieldView>,
}

fn admin_context(authenticated: bool, error: Option<&str>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("authenticated", &authenticated);
    ctx.insert("sections", &SECTIONS);
    ctx.insert("error", &error.unwrap_or(""));
    ctx
}

pub fn render_list(
    tera: &Tera,
    slug: &str,
    title: &str,
    columns: &[&str],
    rows: Vec<ListRow>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = admin_context(true, None);
    let page = ListPage {
        slug,
        title,
        columns,
        rows,
    };
    ctx.extend(Context::from_serialize(&page).map_err(|_| AppError::system_exception())?);
    render_with(tera, HttpResponse::Ok(), "admin/list.html", &ctx)
}

/// Renders an entity form; a validation `error` turns the response into a 400.
pub fn render_form(tera: &Tera, page: FormPage<'_>, error: Option<&str>) -> Result<HttpResponse, AppError> {
    let mut ctx = admin_context(true, error);
    ctx.extend(Context::from_serialize(&page).map_err(|_| AppError::system_exception())?);
    let status = if error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    render_with(tera, HttpResponse::build(status), "admin/form.html", &ctx)
}

pub fn list_path(slug: &str) -> String {
    format!("{}{}/", ADMIN_INDEX, slug)
}

pub fn new_path(slug: &str) -> String {
    format!("{}new/", list_path(slug))
}

pub fn edit_path(slug: &str, id: i32) -> String {
    format!("{}{}/edit/", list_path(slug), id)
}

/// Form of the entities that carry nothing but a multi-line `text`.
#[derive(Deserialize)]
pub struct TextForm {
    pub text: Option<String>,
}

impl TextForm {
    pub fn validate(&self) -> Result<String, String> {
        required_text(&self.text, "Text")
    }

    pub fn page(&self, slug: &'static str, action: String, title: &'static str) -> FormPage<'static> {
        text_page(slug, action, title, self.text.as_deref().unwrap_or_default())
    }
}

pub fn text_page(slug: &'static str, action: String, title: &'static str, text: &str) -> FormPage<'static> {
    FormPage {
        slug,
        title,
        action,
        fields: vec![FieldView::text_area("text", "Text", text)],
    }
}

pub fn required(value: &Option<String>, label: &str) -> Result<String, String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(format!("{}: this field is required.", label)),
    }
}

/// Like [`required`], but keeps the value as typed so leading indentation
/// of multi-line text survives.
pub fn required_text(value: &Option<String>, label: &str) -> Result<String, String> {
    required(value, label)?;
    Ok(value.clone().unwrap_or_default())
}

pub fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn optional_text(value: &Option<String>) -> Option<String> {
    optional(value).and(value.clone())
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM`, `YYYY-MM-DD` or RFC 3339,
/// truncated to whole seconds in UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    let parsed = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| Utc.from_utc_datetime(&dt))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })?;
    parsed.with_nanosecond(0)
}

pub fn format_date(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn date_field(value: &Option<String>, label: &str) -> Result<DateTime<Utc>, String> {
    let raw = required(value, label)?;
    parse_date(&raw).ok_or_else(|| format!("{}: expected a date like 2014-06-07 18:00:00.", label))
}

async fn to_index() -> HttpResponse {
    see_other(ADMIN_INDEX)
}

/// Fallback of the admin scope: a path missing its trailing slash is
/// redirected to the slashed form, anything else is a 404.
pub async fn append_slash(req: HttpRequest) -> Result<HttpResponse, AppError> {
    let path = req.path();
    if path.ends_with('/') {
        return Err(AppError::not_found());
    }
    let location = match req.query_string() {
        "" => format!("{}/", path),
        query => format!("{}/?{}", path, query),
    };
    Ok(HttpResponse::PermanentRedirect()
        .insert_header((header::LOCATION, location))
        .finish())
}

async fn index(tera: web::Data<Tera>, _auth: AuthUser) -> Result<HttpResponse, AppError> {
    render_with(&tera, HttpResponse::Ok(), "admin/index.html", &admin_context(true, None))
}

#[derive(Deserialize)]
struct LoginForm {
    login: Option<String>,
    password: Option<String>,
}

fn render_login(tera: &Tera, login: &str, error: Option<&str>) -> Result<HttpResponse, AppError> {
    let mut ctx = admin_context(false, error);
    ctx.insert("login", login);
    let builder = if error.is_some() {
        HttpResponse::BadRequest()
    } else {
        HttpResponse::Ok()
    };
    render_with(tera, builder, "admin/login.html", &ctx)
}

async fn login_view(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let token = auth::extract_token(&req, &config);
    if auth::is_authenticated(&db, &config, token.as_deref()).await {
        return Ok(see_other(ADMIN_INDEX));
    }
    render_login(&tera, "", None)
}

async fn login_submit(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    tera: web::Data<Tera>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let login = form.login.clone().unwrap_or_default();
    let password = form.password.clone().unwrap_or_default();
    if login.trim().is_empty() || password.is_empty() {
        return render_login(&tera, &login, Some("This field is required."));
    }

    let session = match auth::login(&db, &config, login.trim(), &password).await {
        Ok(session) => session,
        Err(AuthError::App(e)) => return Err(e),
        Err(e) => return render_login(&tera, &login, Some(e.to_string().as_str())),
    };

    let cookie = Cookie::build(config.session_cookie.clone(), session.token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(config.session_ttl_hours))
        .finish();
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, ADMIN_INDEX))
        .cookie(cookie)
        .finish())
}

async fn logout_view(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    auth::logout(&db, &auth).await?;

    let mut cookie = Cookie::build(config.session_cookie.clone(), "").path("/").finish();
    cookie.make_removal();
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, ADMIN_INDEX))
        .cookie(cookie)
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_service, init_service, TestRequest};

    use crate::error::LOGIN_PATH;
    use crate::test_utils::{
        body_string, login_cookie, seeded_db, test_app, test_config, RecordingMailer, ADMIN_LOGIN,
        ADMIN_PASSWORD,
    };

    #[test]
    fn dates_accept_common_shapes() {
        assert_eq!(
            format_date(parse_date("2014-06-07 18:00:00").unwrap()),
            "2014-06-07 18:00:00"
        );
        assert_eq!(format_date(parse_date(" 2014-06-07 ").unwrap()), "2014-06-07 00:00:00");
        assert_eq!(format_date(parse_date("2014-06-07 18:05").unwrap()), "2014-06-07 18:05:00");
        assert_eq!(
            format_date(parse_date("2014-06-07T20:00:00.250+02:00").unwrap()),
            "2014-06-07 18:00:00"
        );
        assert!(parse_date("June 7th").is_none());
        assert!(parse_date("2014-13-01").is_none());
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(&Some("  x ".into()), "Text"), Ok("x".to_string()));
        assert!(required(&Some("   ".into()), "Text").is_err());
        assert!(required(&None, "Text").is_err());
    }

    #[actix_web::test]
    async fn unauthenticated_admin_routes_redirect_to_login() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db, config, RecordingMailer::default())).await;

        for path in [
            "/admin/",
            "/admin/blog/",
            "/admin/biography/new/",
            "/admin/work/1/edit/",
            "/admin/event/",
            "/admin/user/",
            "/admin/logout/",
        ] {
            let res = call_service(&app, TestRequest::get().uri(path).to_request()).await;
            assert_eq!(res.status(), StatusCode::SEE_OTHER, "{}", path);
            assert_eq!(res.headers().get(header::LOCATION).unwrap(), LOGIN_PATH, "{}", path);
        }

        let req = TestRequest::post()
            .uri("/admin/blog/new/")
            .set_form([("text", "sneaky")])
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }

    #[test]
    fn multi_line_text_keeps_its_indentation() {
        let poem = Some("  first line\n    second line\n".to_string());
        assert_eq!(required_text(&poem, "Text").unwrap(), "  first line\n    second line\n");
        assert!(required_text(&Some(" \n ".into()), "Text").is_err());
        assert_eq!(optional_text(&poem), poem);
        assert_eq!(optional_text(&Some("\n".into())), None);
    }

    #[actix_web::test]
    async fn missing_trailing_slash_redirects() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db, config, RecordingMailer::default())).await;

        for (path, location) in [
            ("/admin/blog", "/admin/blog/"),
            ("/admin/work/1/edit", "/admin/work/1/edit/"),
            ("/admin/login", "/admin/login/"),
            ("/admin/event/new?x=1", "/admin/event/new/?x=1"),
        ] {
            let res = call_service(&app, TestRequest::get().uri(path).to_request()).await;
            assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT, "{}", path);
            assert_eq!(res.headers().get(header::LOCATION).unwrap(), location, "{}", path);
        }

        let res = call_service(&app, TestRequest::get().uri("/admin/blog").to_request()).await;
        let next = res.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string();
        let res = call_service(&app, TestRequest::get().uri(&next).to_request()).await;
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);

        for path in ["/admin/nothing/", "/admin/blog/1/nothing/"] {
            let res = call_service(&app, TestRequest::get().uri(path).to_request()).await;
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", path);
        }
    }

    #[actix_web::test]
    async fn forged_cookie_is_redirected() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let cookie_name = config.session_cookie.clone();
        let app = init_service(test_app(db, config, RecordingMailer::default())).await;

        let req = TestRequest::get()
            .uri("/admin/")
            .cookie(Cookie::new(cookie_name, "forged"))
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }

    #[actix_web::test]
    async fn login_sets_cookie_and_opens_index() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db, config, RecordingMailer::default())).await;

        let cookie = login_cookie(&app, ADMIN_LOGIN, ADMIN_PASSWORD).await;
        let req = TestRequest::get().uri("/admin/").cookie(cookie.clone()).to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("/admin/work/"));

        let req = TestRequest::get().uri("/admin/login/").cookie(cookie).to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), ADMIN_INDEX);
    }

    #[actix_web::test]
    async fn bad_credentials_show_form_errors() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db, config, RecordingMailer::default())).await;

        for (login, password, message) in [
            ("nobody", ADMIN_PASSWORD, "Invalid user"),
            (ADMIN_LOGIN, "wrong", "Invalid password"),
            (ADMIN_LOGIN, "", "This field is required."),
        ] {
            let req = TestRequest::post()
                .uri("/admin/login/")
                .set_form([("login", login), ("password", password)])
                .to_request();
            let res = call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            assert!(res.response().cookies().next().is_none());
            assert!(body_string(res).await.contains(message), "{}", message);
        }
    }

    #[actix_web::test]
    async fn logout_ends_the_session() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db, config, RecordingMailer::default())).await;
        let cookie = login_cookie(&app, ADMIN_LOGIN, ADMIN_PASSWORD).await;

        let req = TestRequest::post().uri("/admin/logout/").cookie(cookie.clone()).to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let req = TestRequest::get().uri("/admin/").cookie(cookie).to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }
}
