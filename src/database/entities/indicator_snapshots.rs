use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only fact row: one indicator value for one client at one run.
/// All rows of a run share the same `extraction_timestamp`, which is the
/// join key for "the latest full snapshot". Values are stringified because
/// indicators are heterogeneous (counts, formatted amounts, dates, labels,
/// sentinels).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "indicator_snapshots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub client_id: i32,
    pub indicator_name: String,
    pub indicator_value: String,
    pub extraction_timestamp: ChronoDateTimeUtc,
    pub collaborator_id: String,
    pub collaborator_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id"
    )]
    Clients,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
