use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One configured client Odoo instance. Managed by the admin API;
/// read-only to the extraction pipeline.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub url: String,
    pub db_name: String,
    pub api_user: String,
    #[serde(skip_serializing, default)]
    pub encrypted_api_key: String,
    pub is_premium_tier: bool,
    pub contact_email: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::client_statuses::Entity")]
    ClientStatuses,
    #[sea_orm(has_many = "super::indicator_snapshots::Entity")]
    IndicatorSnapshots,
}

impl Related<super::client_statuses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientStatuses.def()
    }
}

impl Related<super::indicator_snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IndicatorSnapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
