use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "t_work")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Text")]
    pub work_text: String,
    /// Stored as the short code of [`WorkType`].
    pub work_type: String,
    /// `YYYY-MM-DD HH:MM:SS`, so string order is chronological.
    pub work_date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn type_label(&self) -> &str {
        self.work_type
            .parse::<WorkType>()
            .map(|t| t.label())
            .unwrap_or(self.work_type.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkType {
    Poetry,
    Project,
    Other,
}

impl WorkType {
    pub const ALL: [WorkType; 3] = [WorkType::Poetry, WorkType::Project, WorkType::Other];

    pub fn code(self) -> &'static str {
        match self {
            Self::Poetry => "PO",
            Self::Project => "PR",
            Self::Other => "OT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Poetry => "Poetry",
            Self::Project => "Project",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownWorkType;

impl FromStr for WorkType {
    type Err = UnknownWorkType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PO" => Ok(Self::Poetry),
            "PR" => Ok(Self::Project),
            "OT" => Ok(Self::Other),
            _ => Err(UnknownWorkType),
        }
    }
}
