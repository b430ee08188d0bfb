use tera::Tera;

/// Templates are compiled into the binary so the server runs from any cwd.
pub fn load() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../templates/base.html")),
        ("home.html", include_str!("../templates/home.html")),
        ("about.html", include_str!("../templates/about.html")),
        ("work.html", include_str!("../templates/work.html")),
        ("events.html", include_str!("../templates/events.html")),
        ("blog.html", include_str!("../templates/blog.html")),
        ("contact.html", include_str!("../templates/contact.html")),
        ("admin/master.html", include_str!("../templates/admin/master.html")),
        ("admin/index.html", include_str!("../templates/admin/index.html")),
        ("admin/login.html", include_str!("../templates/admin/login.html")),
        ("admin/list.html", include_str!("../templates/admin/list.html")),
        ("admin/form.html", include_str!("../templates/admin/form.html")),
    ])?;
    Ok(tera)
}
