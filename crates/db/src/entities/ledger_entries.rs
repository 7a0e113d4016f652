//! `SeaORM` Entity for ledger_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{AccountKind, LedgerFlow, OperationType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub account_kind: AccountKind,
    pub operation_type: OperationType,
    pub flow: LedgerFlow,
    pub delta: i64,
    pub balance_after: i64,
    pub reason: Option<String>,
    pub resource_traded: Option<String>,
    pub external_reference: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_entry_relations::Entity")]
    LedgerEntryRelations,
}

impl Related<super::ledger_entry_relations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntryRelations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
