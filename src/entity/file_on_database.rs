use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_on_database")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Filename without its extension.
    pub name: String,
    /// Extension including the leading dot, empty if the filename had none.
    pub extension: String,
    pub content_type: String,
    pub description: String,

    /// Full file content, stored inline.
    pub data: Vec<u8>,

    pub created_on: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
