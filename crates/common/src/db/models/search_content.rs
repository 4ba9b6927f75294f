//! Searchable content entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::retrieval::SearchableRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "search_content")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// product, vendor, hub, ...
    #[sea_orm(column_type = "Text")]
    pub content_type: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Column indexed for full-text matching
    #[sea_orm(column_type = "Text")]
    pub searchable_text: String,

    /// Free-form attributes (price, unit, location, rating, category)
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub metadata: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SearchableRecord {
    fn from(model: Model) -> Self {
        SearchableRecord {
            id: model.id,
            content_type: model.content_type,
            title: model.title,
            description: model.description,
            searchable_text: model.searchable_text,
            metadata: model.metadata,
        }
    }
}
