use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use tera::Tera;

use super::{
    date_field, edit_path, format_date, list_path, new_path, optional, optional_text, render_form,
    render_list, required, FieldView, FormPage, ListRow,
};
use crate::auth::AuthUser;
use crate::entity::event;
use crate::error::AppError;
use crate::response::see_other;

pub const SLUG: &str = "event";

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
struct EventForm {
    event_title: Option<String>,
    event_description: Option<String>,
    event_date: Option<String>,
    event_date_text: Option<String>,
}

#[derive(Debug)]
struct ValidEvent {
    event_title: String,
    event_description: Option<String>,
    event_date: DateTime<Utc>,
    event_date_text: Option<String>,
}

impl EventForm {
    fn from_model(model: &event::Model) -> Self {
        Self {
            event_title: Some(model.event_title.clone()),
            event_description: model.event_description.clone(),
            event_date: Some(format_date(model.event_date)),
            event_date_text: model.event_date_text.clone(),
        }
    }

    fn validate(&self) -> Result<ValidEvent, String> {
        Ok(ValidEvent {
            event_title: required(&self.event_title, "Event title")?,
            event_description: optional_text(&self.event_description),
            event_date: date_field(&self.event_date, "Event date")?,
            event_date_text: optional(&self.event_date_text),
        })
    }

    fn page(&self, action: String, title: &'static str) -> FormPage<'static> {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        FormPage {
            slug: SLUG,
            title,
            action,
            fields: vec![
                FieldView::text("event_title", "Event title", &value(&self.event_title)),
                FieldView::text_area(
                    "event_description",
                    "Event description",
                    &value(&self.event_description),
                ),
                FieldView::text(
                    "event_date",
                    "Event date (e.g. 2014-06-07 18:00:00)",
                    &value(&self.event_date),
                ),
                FieldView::text("event_date_text", "Event date text", &value(&self.event_date_text)),
            ],
        }
    }
}

async fn list(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let rows = event::Entity::find()
        .order_by_desc(event::Column::EventDate)
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|e| ListRow {
            id: e.id,
            cells: vec![
                e.event_title,
                format_date(e.event_date),
                e.event_date_text.unwrap_or_default(),
            ],
        })
        .collect();
    render_list(
        &tera,
        SLUG,
        "Events",
        &["Event title", "Event date", "Event date text"],
        rows,
    )
}

async fn new_form(_auth: AuthUser, tera: web::Data<Tera>) -> Result<HttpResponse, AppError> {
    render_form(&tera, EventForm::default().page(new_path(SLUG), "New event"), None)
}

async fn create(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    form: web::Form<EventForm>,
) -> Result<HttpResponse, AppError> {
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return render_form(&tera, form.page(new_path(SLUG), "New event"), Some(msg.as_str())),
    };

    event::ActiveModel {
        event_title: Set(valid.event_title),
        event_description: Set(valid.event_description),
        event_date: Set(valid.event_date),
        event_date_text: Set(valid.event_date_text),
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
    let row = event::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;
    render_form(&tera, EventForm::from_model(&row).page(edit_path(SLUG, id), "Edit event"), None)
}

async fn update(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    path: web::Path<i32>,
    form: web::Form<EventForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    event::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return render_form(&tera, form.page(edit_path(SLUG, id), "Edit event"), Some(msg.as_str())),
    };

    event::ActiveModel {
        id: Set(id),
        event_title: Set(valid.event_title),
        event_description: Set(valid.event_description),
        event_date: Set(valid.event_date),
        event_date_text: Set(valid.event_date_text),
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
    event::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await?;
    Ok(see_other(&list_path(SLUG)))
}
