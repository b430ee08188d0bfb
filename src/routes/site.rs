use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use log::warn;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

use crate::config::AppConfig;
use crate::entity::{biography, blog, event, work};
use crate::error::AppError;
use crate::mail::{self, Mailer};
use crate::response::render;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/about").route(web::get().to(about_page)))
        .service(web::resource("/work").route(web::get().to(work_page)))
        .service(web::resource("/events").route(web::get().to(events_page)))
        .service(web::resource("/blog").route(web::get().to(blog_page)))
        .service(
            web::resource("/contact")
                .route(web::get().to(contact_form))
                .route(web::post().to(contact_submit)),
        );
}

#[derive(Serialize)]
struct WorkView {
    id: i32,
    work_text: String,
    work_type: String,
    type_label: String,
    work_date: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventRow {
    pub event: event::Model,
    pub upcoming: bool,
}

#[derive(Debug, Serialize)]
pub struct EventListing {
    pub events_and_upcoming: Vec<EventRow>,
    pub events_and_upcoming_reversed: Vec<EventRow>,
}

#[derive(Deserialize)]
struct ContactForm {
    subject: Option<String>,
    email: Option<String>,
    message: Option<String>,
}

/// Text of the biography singleton, the newest row if several exist.
pub async fn about(db: &DatabaseConnection) -> Result<String, AppError> {
    let bio = biography::Entity::find()
        .order_by_desc(biography::Column::Id)
        .one(db)
        .await?;
    Ok(bio.map(|b| b.text).unwrap_or_default())
}

pub async fn work(db: &DatabaseConnection) -> Result<Vec<work::Model>, AppError> {
    let works = work::Entity::find()
        .order_by_desc(work::Column::WorkDate)
        .all(db)
        .await?;
    Ok(works)
}

pub async fn events(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<EventListing, AppError> {
    let rows = event::Entity::find()
        .order_by_desc(event::Column::EventDate)
        .all(db)
        .await?;
    Ok(pair_upcoming(rows, now))
}

fn pair_upcoming(events: Vec<event::Model>, now: DateTime<Utc>) -> EventListing {
    let events_and_upcoming: Vec<EventRow> = events
        .into_iter()
        .map(|event| EventRow {
            upcoming: now < event.event_date,
            event,
        })
        .collect();
    let events_and_upcoming_reversed = events_and_upcoming.iter().rev().cloned().collect();
    EventListing {
        events_and_upcoming,
        events_and_upcoming_reversed,
    }
}

pub async fn blog(db: &DatabaseConnection) -> Result<Vec<blog::Model>, AppError> {
    Ok(blog::Entity::find().all(db).await?)
}

async fn index(tera: web::Data<Tera>) -> Result<HttpResponse, AppError> {
    render(&tera, "home.html", &Context::new())
}

async fn about_page(
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("bio_text", &about(db.get_ref()).await?);
    render(&tera, "about.html", &ctx)
}

async fn work_page(
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let works: Vec<WorkView> = work(db.get_ref())
        .await?
        .into_iter()
        .map(|w| WorkView {
            type_label: w.type_label().to_string(),
            id: w.id,
            work_text: w.work_text,
            work_type: w.work_type,
            work_date: w.work_date,
        })
        .collect();
    let mut ctx = Context::new();
    ctx.insert("works", &works);
    render(&tera, "work.html", &ctx)
}

async fn events_page(
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let listing = events(db.get_ref(), Utc::now()).await?;
    let ctx = Context::from_serialize(&listing).map_err(|_| AppError::system_exception())?;
    render(&tera, "events.html", &ctx)
}

async fn blog_page(
    db: web::Data<DatabaseConnection>,
    tera: web::Data<Tera>,
) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("blogs", &blog(db.get_ref()).await?);
    render(&tera, "blog.html", &ctx)
}

async fn contact_form(tera: web::Data<Tera>) -> Result<HttpResponse, AppError> {
    let mut ctx = Context::new();
    ctx.insert("submitted", &false);
    render(&tera, "contact.html", &ctx)
}

async fn contact_submit(
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
    tera: web::Data<Tera>,
    form: web::Form<ContactForm>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    match (form.subject, form.email, form.message) {
        (Some(subject), Some(sender), Some(body)) => {
            mail::relay(
                mailer.get_ref(),
                config.mail.recipient.as_deref(),
                &subject,
                &sender,
                &body,
            )
            .await;
        }
        _ => warn!("contact form submitted with missing fields, nothing sent"),
    }

    let mut ctx = Context::new();
    ctx.insert("submitted", &true);
    render(&tera, "contact.html", &ctx)
}
