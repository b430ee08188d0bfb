use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "t_event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub event_title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub event_description: Option<String>,
    pub event_date: DateTimeUtc,
    pub event_date_text: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
