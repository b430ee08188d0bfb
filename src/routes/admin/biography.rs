use actix_web::{web, HttpResponse};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use tera::Tera;

use super::{edit_path, list_path, new_path, render_form, render_list, text_page, ListRow, TextForm};
use crate::auth::AuthUser;
use crate::entity::biography;
use crate::error::AppError;
use crate::response::see_other;

pub const SLUG: &str = "biography";

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

async fn list(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let rows = biography::Entity::find()
        .order_by_asc(biography::Column::Id)
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|row| ListRow {
            id: row.id,
            cells: vec![row.text],
        })
        .collect();
    render_list(&tera, SLUG, "Biography", &["Text"], rows)
}

async fn new_form(_auth: AuthUser, tera: web::Data<Tera>) -> Result<HttpResponse, AppError> {
    render_form(&tera, text_page(SLUG, new_path(SLUG), "New biography", ""), None)
}

async fn create(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    form: web::Form<TextForm>,
) -> Result<HttpResponse, AppError> {
    let text = match form.validate() {
        Ok(text) => text,
        Err(msg) => {
            return render_form(&tera, form.page(SLUG, new_path(SLUG), "New biography"), Some(msg.as_str()))
        }
    };

    biography::ActiveModel {
        text: Set(text),
        ..Default::default()
    }
    .insert(db.get_ref())
    .await?;
    Ok(see_other(&list_path(SLUG)))
}

async fn edit_form(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let row = biography::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;
    render_form(&tera, text_page(SLUG, edit_path(SLUG, id), "Edit biography", &row.text), None)
}

async fn update(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    path: web::Path<i32>,
    form: web::Form<TextForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    biography::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;

    let text = match form.validate() {
        Ok(text) => text,
        Err(msg) => {
            return render_form(&tera, form.page(SLUG, edit_path(SLUG, id), "Edit biography"), Some(msg.as_str()))
        }
    };

    biography::ActiveModel {
        id: Set(id),
        text: Set(text),
    }
    .update(db.get_ref())
    .await?;
    Ok(see_other(&list_path(SLUG)))
}

async fn remove(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    biography::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await?;
    Ok(see_other(&list_path(SLUG)))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        http::StatusCode,
        test::{call_service, init_service, TestRequest},
    };
    use sea_orm::{EntityTrait, QueryOrder};

    use crate::entity::biography;
    use crate::routes::site;
    use crate::test_utils::{
        login_cookie, seeded_db, test_app, test_config, RecordingMailer, ADMIN_LOGIN, ADMIN_PASSWORD,
    };

    #[actix_web::test]
    async fn edited_biography_shows_on_about() {
        let config = test_config();
        let db = seeded_db(&config).await;
        let app = init_service(test_app(db.clone(), config, RecordingMailer::default())).await;
        let cookie = login_cookie(&app, ADMIN_LOGIN, ADMIN_PASSWORD).await;

        let req = TestRequest::post()
            .uri("/admin/biography/new/")
            .cookie(cookie.clone())
            .set_form([("text", "Poet.\nTranslator.")])
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
        assert_eq!(site::about(&db).await.unwrap(), "Poet.\nTranslator.");

        let id = biography::Entity::find()
            .order_by_desc(biography::Column::Id)
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .id;
        let req = TestRequest::post()
            .uri(&format!("/admin/biography/{}/edit/", id))
            .cookie(cookie)
            .set_form([("text", "Poet and translator.")])
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
        assert_eq!(site::about(&db).await.unwrap(), "Poet and translator.");
    }
}
