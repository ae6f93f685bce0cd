use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row of the administrative audit trail.
///
/// Rows are never updated. The auto-increment `id` is the insertion order
/// used by retention pruning.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Acting username, or `Unknown`
    pub username: String,

    /// Audit action code (e.g. `LOGIN_FAILED`)
    pub action: String,

    #[sea_orm(column_type = "Text")]
    pub details: String,

    pub ip_address: String,

    pub timestamp: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
