use actix_web::{web, HttpResponse};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use tera::Tera;

use super::{edit_path, list_path, new_path, render_form, render_list, text_page, ListRow, TextForm};
use crate::auth::AuthUser;
use crate::entity::blog;
use crate::error::AppError;
use crate::response::see_other;

pub const SLUG: &str = "blog";

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
    let rows = blog::Entity::find()
        .order_by_asc(blog::Column::Id)
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|row| ListRow {
            id: row.id,
            cells: vec![row.text],
        })
        .collect();
    render_list(&tera, SLUG, "Blog", &["Text"], rows)
}

async fn new_form(_auth: AuthUser, tera: web::Data<Tera>) -> Result<HttpResponse, AppError> {
    render_form(&tera, text_page(SLUG, new_path(SLUG), "New blog post", ""), None)
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
            return render_form(&tera, form.page(SLUG, new_path(SLUG), "New blog post"), Some(msg.as_str()))
        }
    };

    blog::ActiveModel {
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
    let row = blog::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;
    render_form(&tera, text_page(SLUG, edit_path(SLUG, id), "Edit blog post", &row.text), None)
}

async fn update(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    path: web::Path<i32>,
    form: web::Form<TextForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    blog::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;

    let text = match form.validate() {
        Ok(text) => text,
        Err(msg) => {
            return render_form(&tera, form.page(SLUG, edit_path(SLUG, id), "Edit blog post"), Some(msg.as_str()))
        }
    };

    blog::ActiveModel {
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
    blog::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await?;
    Ok(see_other(&list_path(SLUG)))
}
