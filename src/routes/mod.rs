use actix_web::web;

pub mod admin;
pub mod site;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .configure(admin::config)
            .default_service(web::to(admin::append_slash)),
    )
    .configure(site::config);
}
