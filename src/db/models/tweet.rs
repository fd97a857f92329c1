//! Tweet entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tweets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Post origin label (client name on the originating platform)
    #[sea_orm(column_type = "Text")]
    pub source: String,

    /// Identifier assigned by the originating platform. Not unique here:
    /// the bulk loader dedupes on the full record, not this field.
    #[sea_orm(column_type = "Text")]
    pub external_id: String,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    pub created_at: DateTimeWithTimeZone,

    pub retweet_count: i32,

    pub favorite_count: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub in_reply_to_user_id: Option<String>,

    pub is_retweet: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::annotation::Entity")]
    Annotations,
}

impl Related<super::annotation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Annotations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
