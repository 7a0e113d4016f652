//! `SeaORM` entity definitions.

pub mod prelude;

pub mod accounts;
pub mod external_references;
pub mod ledger_entries;
pub mod ledger_entry_relations;
pub mod sea_orm_active_enums;
pub mod social_credentials;
