use std::sync::{Arc, Mutex};

use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse},
    test, web, App, Error,
};
use futures_util::future::BoxFuture;
use sea_orm::DatabaseConnection;

use crate::config::{AppConfig, MailConfig};
use crate::db::connect_db;
use crate::mail::{ContactMessage, MailError, Mailer};
use crate::response::form_error_handler;
use crate::{routes, setup, templates};

pub const ADMIN_LOGIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse";

pub fn test_config() -> AppConfig {
    AppConfig {
        server_port: 0,
        sqlite_path: "sqlite::memory:".to_string(),
        database_url: Some("sqlite::memory:".to_string()),
        db_logging: false,
        secret_key: "test-secret".to_string(),
        session_cookie: "egm_session".to_string(),
        session_ttl_hours: 1,
        bcrypt_cost: 4,
        admin_login: Some(ADMIN_LOGIN.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        mail: MailConfig {
            server: "localhost".to_string(),
            port: 2525,
            use_tls: false,
            use_ssl: false,
            username: None,
            password: None,
            recipient: Some("owner@example.com".to_string()),
        },
    }
}

pub async fn test_db() -> DatabaseConnection {
    connect_db(&test_config()).await.unwrap()
}

pub async fn seeded_db(config: &AppConfig) -> DatabaseConnection {
    let db = connect_db(config).await.unwrap();
    setup::create_data(&db, config).await.unwrap();
    db
}

pub fn test_app<M: Mailer + 'static>(
    db: DatabaseConnection,
    config: AppConfig,
    mailer: M,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = Error,
        InitError = (),
    >,
> {
    let mailer: Arc<dyn Mailer> = Arc::new(mailer);
    App::new()
        .app_data(web::Data::new(db))
        .app_data(web::Data::new(config))
        .app_data(web::Data::from(mailer))
        .app_data(web::Data::new(templates::load().unwrap()))
        .app_data(web::FormConfig::default().error_handler(form_error_handler))
        .configure(routes::config)
}

pub async fn body_string<B: MessageBody>(res: ServiceResponse<B>) -> String {
    let bytes = test::read_body(res).await;
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Logs in through the form and returns the session cookie.
pub async fn login_cookie<S, B>(app: &S, login: &str, password: &str) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = Error>,
{
    let req = test::TestRequest::post()
        .uri("/admin/login/")
        .set_form([("login", login), ("password", password)])
        .to_request();
    let res = test::call_service(app, req).await;
    assert_eq!(res.status(), actix_web::http::StatusCode::SEE_OTHER, "login as {} failed", login);
    // bound before returning: the cookie iterator borrows `res`
    let cookie = res
        .response()
        .cookies()
        .next()
        .expect("login sets a session cookie")
        .into_owned();
    cookie
}

#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<ContactMessage>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<ContactMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: ContactMessage) -> BoxFuture<'_, Result<(), MailError>> {
        self.sent.lock().unwrap().push(message);
        Box::pin(async { Ok(()) })
    }
}

pub struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(&self, _message: ContactMessage) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async { Err(MailError::NoRecipient) })
    }
}
