use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Connection settings for the accounting firm's own Odoo, used for
/// collaborator attribution. At most one row exists; the admin API always
/// writes id 1. The API key is stored encrypted and never serialized out.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "firm_config")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub url: String,
    pub db_name: String,
    pub api_user: String,
    #[serde(skip_serializing, default)]
    pub encrypted_api_key: String,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
