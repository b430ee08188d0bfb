use actix_web::{web, HttpResponse};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use tera::Tera;

use super::{
    date_field, edit_path, format_date, list_path, new_path, render_form, render_list, required,
    required_text, Choice, FieldView, FormPage, ListRow,
};
use crate::auth::AuthUser;
use crate::entity::work::{self, WorkType};
use crate::error::AppError;
use crate::response::see_other;

pub const SLUG: &str = "work";

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
struct WorkForm {
    work_text: Option<String>,
    work_type: Option<String>,
    work_date: Option<String>,
}

#[derive(Debug)]
struct ValidWork {
    work_text: String,
    work_type: WorkType,
    work_date: String,
}

impl WorkForm {
    fn from_model(model: &work::Model) -> Self {
        Self {
            work_text: Some(model.work_text.clone()),
            work_type: Some(model.work_type.clone()),
            work_date: Some(model.work_date.clone()),
        }
    }

    fn validate(&self) -> Result<ValidWork, String> {
        let work_text = required_text(&self.work_text, "Work text")?;
        let work_type = required(&self.work_type, "Work type")?
            .parse::<WorkType>()
            .map_err(|_| "Work type: not a valid choice.".to_string())?;
        let work_date = format_date(date_field(&self.work_date, "Work date")?);
        Ok(ValidWork {
            work_text,
            work_type,
            work_date,
        })
    }

    fn fields(&self) -> Vec<FieldView> {
        let choices = WorkType::ALL
            .iter()
            .map(|t| Choice {
                value: t.code(),
                label: t.label(),
            })
            .collect();
        vec![
            FieldView::text_area("work_text", "Work text", self.work_text.as_deref().unwrap_or_default()),
            FieldView::select(
                "work_type",
                "Work type",
                self.work_type.as_deref().unwrap_or_default(),
                choices,
            ),
            FieldView::text(
                "work_date",
                "Work date (e.g. 2014-06-07 18:00:00)",
                self.work_date.as_deref().unwrap_or_default(),
            ),
        ]
    }

    fn page(&self, action: String, title: &'static str) -> FormPage<'static> {
        FormPage {
            slug: SLUG,
            title,
            action,
            fields: self.fields(),
        }
    }
}

async fn list(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let rows = work::Entity::find()
        .order_by_asc(work::Column::Id)
        .all(db.get_ref())
        .await?
        .into_iter()
        .map(|w| ListRow {
            id: w.id,
            cells: vec![w.work_text.clone(), w.type_label().to_string(), w.work_date.clone()],
        })
        .collect();
    render_list(&tera, SLUG, "Work", &["Work text", "Work type", "Work date"], rows)
}

async fn new_form(_auth: AuthUser, tera: web::Data<Tera>) -> Result<HttpResponse, AppError> {
    render_form(&tera, WorkForm::default().page(new_path(SLUG), "New work"), None)
}

async fn create(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    form: web::Form<WorkForm>,
) -> Result<HttpResponse, AppError> {
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return render_form(&tera, form.page(new_path(SLUG), "New work"), Some(msg.as_str())),
    };

    work::ActiveModel {
        work_text: Set(valid.work_text),
        work_type: Set(valid.work_type.code().to_string()),
        work_date: Set(valid.work_date),
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
    let row = work::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;
    render_form(&tera, WorkForm::from_model(&row).page(edit_path(SLUG, id), "Edit work"), None)
}

async fn update(
    _auth: AuthUser,
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
    path: web::Path<i32>,
    form: web::Form<WorkForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    work::Entity::find_by_id(id)
        .one(db.get_ref())
        .await?
        .ok_or_else(AppError::not_found)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(msg) => return render_form(&tera, form.page(edit_path(SLUG, id), "Edit work"), Some(msg.as_str())),
    };

    work::ActiveModel {
        id: Set(id),
        work_text: Set(valid.work_text),
        work_type: Set(valid.work_type.code().to_string()),
        work_date: Set(valid.work_date),
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
    work::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await?;
    Ok(see_other(&list_path(SLUG)))
}
