//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::external_references::Entity as ExternalReferences;
pub use super::ledger_entries::Entity as LedgerEntries;
pub use super::ledger_entry_relations::Entity as LedgerEntryRelations;
pub use super::social_credentials::Entity as SocialCredentials;
