use actix_web::{web, HttpResponse};
use log::info;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tera::Tera;

use super::{
    edit_path, list_path, new_path, render_form, render_list, required, FieldView, FormPage, ListRow,
};
use crate::auth::{self, AuthUser};
use crate::config::AppConfig;
use crate::entity::{session, user};
use crate::error::AppError;
use crate::response::see_other;

pub const SLUG: &str = "user";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(list)))
        .service(
            web::resource("/new/")
                .route(web::get().to(new_form))
                .route(web::post().to(create)),
        )
        .service(
            web::resource("/{id}/edit/")
                .route(web::get().to(edit_form))
                .route(web::post().to(update)),
        )
        .service(web::resource("/{id}/delete/").route(web::post().to(remove)));
}

#[derive(Deserialize, Default)]
struct UserForm {
    login: Option<String>,
    password: Option<String>,
}

impl UserForm {
    /// The password field is always rendered empty.
    fn page(&self, action: String, title: &'static str, password_label: &'static str) -> FormPage<'static> {
        FormPage {
            slug: SLUG,
            title,
            action,
            fields: vec![
                FieldView::text("login", "Login", self.login.as_deref().unwrap_or_default()),
                FieldView::password("password", password_label),
            ],
        }
    }

    fn new_page(&self) -> FormPage<'static> {
        self.page(new_path(SLUG), "New user", "Password")
    }

    fn edit_page(&self, id: i32) -> FormPage<'static> {
        self.page(edit_path(SLUG, id), "Edit user", "Password (leave blank to keep)")
    }
}

async fn login_taken(db: &DatabaseConnection, login: &str, except: Option<i32>) -> Result<bool, AppError> {
    let mut query = user::Entity::find().filter(user::Column::Login.eq(login));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

async fn list(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let rows = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|u| ListRow {
            id: u.id,
            cells: vec![u.login],
        })
        .collect();
    render_list(&tera, SLUG, "Users", &["Login"], rows)
}

async fn new_form(_auth: AuthUser, tera: web::Data<Tera>) -> Result<HttpResponse, AppError> {
    render_form(&tera, UserForm::default().new_page(), None)
}

async fn create(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    tera: web::Data<Tera>,
    form: web::Form<UserForm>,
) -> Result<HttpResponse, AppError> {
    let login = match required(&form.login, "Login") {
        Ok(login) => login,
        Err(msg) => return render_form(&tera, form.new_page(), Some(msg.as_str())),
    };
    let password = match form.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => password,
        None => return render_form(&tera, form.new_page(), Some("Password: this field is required.")),
    };
    if login_taken(&db, &login, None).await? {
        return render_form(&tera, form.new_page(), Some("Duplicate username"));
    }

    let hash = auth::hash_password(password, config.bcrypt_cost).await?;
    let created = user::ActiveModel {
        login: Set(login),
        password: Set(hash),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;
    info!("user {} created", created.id);
    Ok(see_other(&list_path(SLUG)))
}

async fn edit_form(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let row = user::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;
    let form = UserForm {
        login: Some(row.login),
        password: None,
    };
    render_form(&tera, form.edit_page(id), None)
}

async fn update(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    tera: web::Data<Tera>,
    path: web::Path<i32>,
    form: web::Form<UserForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    user::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;

    let login = match required(&form.login, "Login") {
        Ok(login) => login,
        Err(msg) => return render_form(&tera, form.edit_page(id), Some(msg.as_str())),
    };
    if login_taken(&db, &login, Some(id)).await? {
        return render_form(&tera, form.edit_page(id), Some("Duplicate username"));
    }

    // a blank password keeps the stored hash
    let password = match form.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => Set(auth::hash_password(password, config.bcrypt_cost).await?),
        None => NotSet,
    };
    user::ActiveModel {
        id: Set(id),
        login: Set(login),
        password,
    }
    .update(db.get_ref())
    .await?;
    Ok(see_other(&list_path(SLUG)))
}

async fn remove(
    auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if id == auth.user_id {
        return Err(AppError::param_error("you cannot delete your own account"));
    }
    user::Entity::delete_by_id(id).exec(db.get_ref()).await?;
    session::Entity::delete_many()
        .filter(session::Column::UserId.eq(id))
        .exec(db.get_ref())
        .await?;
    info!("user {} deleted by {}", id, auth.user_id);
    Ok(see_other(&list_path(SLUG)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        http::StatusCode,
        test::{call_service, init_service, TestRequest},
    };

    use crate::test_utils::{
        body_string, login_cookie, seeded_db, test_app, test_config, RecordingMailer, ADMIN_LOGIN,
        ADMIN_PASSWORD,
    };

    async fn find_login(db: &DatabaseConnection, login: &str) -> Option<user::Model> {
        user::Entity::find()
            .filter(user::Column::Login.eq(login))
            .one(db)
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn created_user_gets_a_hash_and_can_log_in() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db.clone(), config, RecordingMailer::default())).await;
        let cookie = login_cookie(&app, ADMIN_LOGIN, ADMIN_PASSWORD).await;

        let req = TestRequest::post()
            .uri("/admin/user/new/")
            .cookie(cookie.clone())
            .set_form([("login", "editor"), ("password", "letmein")])
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let stored = find_login(&db, "editor").await.unwrap();
        assert_ne!(stored.password, "letmein");
        assert!(auth::verify_password("letmein", &stored.password).await.unwrap());

        let req = TestRequest::get().uri("/admin/user/").cookie(cookie).to_request();
        let body = body_string(call_service(&app, req).await).await;
        assert!(body.contains("editor"));
        assert!(!body.contains(&stored.password));

        login_cookie(&app, "editor", "letmein").await;
    }

    #[actix_web::test]
    async fn duplicate_login_is_rejected() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db.clone(), config, RecordingMailer::default())).await;
        let cookie = login_cookie(&app, ADMIN_LOGIN, ADMIN_PASSWORD).await;

        let req = TestRequest::post()
            .uri("/admin/user/new/")
            .cookie(cookie)
            .set_form([("login", ADMIN_LOGIN), ("password", "other")])
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_string(res).await;
        assert!(body.contains("Duplicate username"));
        assert!(!body.contains("value=\"other\""));
        assert_eq!(user::Entity::find().all(&db).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn blank_password_on_edit_keeps_the_hash() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db.clone(), config, RecordingMailer::default())).await;
        let cookie = login_cookie(&app, ADMIN_LOGIN, ADMIN_PASSWORD).await;
        let before = find_login(&db, ADMIN_LOGIN).await.unwrap();

        let req = TestRequest::post()
            .uri(&format!("/admin/user/{}/edit/", before.id))
            .cookie(cookie)
            .set_form([("login", "renamed"), ("password", "")])
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let after = user::Entity::find_by_id(before.id).one(&db).await.unwrap().unwrap();
        assert_eq!(after.login, "renamed");
        assert_eq!(after.password, before.password);
    }

    #[actix_web::test]
    async fn own_account_cannot_be_deleted() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db.clone(), config, RecordingMailer::default())).await;
        let cookie = login_cookie(&app, ADMIN_LOGIN, ADMIN_PASSWORD).await;
        let me = find_login(&db, ADMIN_LOGIN).await.unwrap();

        let req = TestRequest::post()
            .uri(&format!("/admin/user/{}/delete/", me.id))
            .cookie(cookie)
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(find_login(&db, ADMIN_LOGIN).await.is_some());
    }

    #[actix_web::test]
    async fn deleting_a_user_ends_their_sessions() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db.clone(), config, RecordingMailer::default())).await;
        let admin = login_cookie(&app, ADMIN_LOGIN, ADMIN_PASSWORD).await;

        let req = TestRequest::post()
            .uri("/admin/user/new/")
            .cookie(admin.clone())
            .set_form([("login", "guest"), ("password", "pw")])
            .to_request();
        call_service(&app, req).await;
        let guest_cookie = login_cookie(&app, "guest", "pw").await;
        let guest = find_login(&db, "guest").await.unwrap();

        let req = TestRequest::post()
            .uri(&format!("/admin/user/{}/delete/", guest.id))
            .cookie(admin)
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
        assert!(find_login(&db, "guest").await.is_none());

        let req = TestRequest::get().uri("/admin/").cookie(guest_cookie).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
    }
}
