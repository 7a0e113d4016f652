//! Initial database migration.
//!
//! Creates the enum types, account and ledger tables, dedup and credential
//! tables, and the triggers that keep the ledger append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: LEDGER
        // ============================================================
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRY_RELATIONS_SQL).await?;

        // ============================================================
        // PART 4: DEDUP & CREDENTIALS
        // ============================================================
        db.execute_unprepared(EXTERNAL_REFERENCES_SQL).await?;
        db.execute_unprepared(SOCIAL_CREDENTIALS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_kind AS ENUM ('credit', 'funds', 'points');

CREATE TYPE ledger_flow AS ENUM ('income', 'outcome');

CREATE TYPE operation_type AS ENUM (
    'post',
    'reply',
    'contribute_post',
    'contribute_reply',
    'bind_social',
    'ai_usage',
    'buy',
    'sell',
    'deposit',
    'withdraw'
);

CREATE TYPE social_provider AS ENUM ('twitter', 'discord', 'telegram', 'github');

CREATE TYPE related_entity_type AS ENUM ('post', 'reply', 'resource', 'ai_usage', 'user');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    kind account_kind NOT NULL,
    balance BIGINT NOT NULL DEFAULT 0,
    acquired_count BIGINT NOT NULL DEFAULT 0,
    consumed_count BIGINT NOT NULL DEFAULT 0,
    total_deposit BIGINT NOT NULL DEFAULT 0,
    total_deposit_count BIGINT NOT NULL DEFAULT 0,
    total_withdraw BIGINT NOT NULL DEFAULT 0,
    total_withdraw_count BIGINT NOT NULL DEFAULT 0,
    withdraw_address VARCHAR(255),
    free_posts TIMESTAMPTZ[] NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_accounts_owner_kind UNIQUE (owner_id, kind),
    CONSTRAINT chk_accounts_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_accounts_counters_non_negative CHECK (
        acquired_count >= 0 AND consumed_count >= 0
        AND total_deposit >= 0 AND total_deposit_count >= 0
        AND total_withdraw >= 0 AND total_withdraw_count >= 0
    ),
    CONSTRAINT chk_accounts_funds_address CHECK (kind <> 'funds' OR withdraw_address IS NOT NULL)
);

CREATE INDEX idx_accounts_owner ON accounts(owner_id);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    account_kind account_kind NOT NULL,
    operation_type operation_type NOT NULL,
    flow ledger_flow NOT NULL,
    delta BIGINT NOT NULL CHECK (delta > 0),
    balance_after BIGINT NOT NULL CHECK (balance_after >= 0),
    reason TEXT,
    resource_traded VARCHAR(255),
    external_reference VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_ledger_entries_owner_created ON ledger_entries(owner_id, created_at DESC);
CREATE INDEX idx_ledger_entries_owner_kind ON ledger_entries(owner_id, account_kind, created_at DESC);
CREATE INDEX idx_ledger_entries_operation ON ledger_entries(operation_type);
CREATE INDEX idx_ledger_entries_reference ON ledger_entries(external_reference)
    WHERE external_reference IS NOT NULL;
";

const LEDGER_ENTRY_RELATIONS_SQL: &str = r"
CREATE TABLE ledger_entry_relations (
    id UUID PRIMARY KEY,
    ledger_entry_id UUID NOT NULL REFERENCES ledger_entries(id),
    entity_type related_entity_type NOT NULL,
    entity_id VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_ledger_entry_relations_entry ON ledger_entry_relations(ledger_entry_id);
CREATE INDEX idx_ledger_entry_relations_entity ON ledger_entry_relations(entity_type, entity_id);
";

const EXTERNAL_REFERENCES_SQL: &str = r"
CREATE TABLE external_references (
    reference VARCHAR(255) PRIMARY KEY,
    owner_id UUID NOT NULL,
    operation_type operation_type NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const SOCIAL_CREDENTIALS_SQL: &str = r"
CREATE TABLE social_credentials (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    provider social_provider NOT NULL,
    details JSONB NOT NULL,
    last_used_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_social_credentials_owner_provider UNIQUE (owner_id, provider)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: reject_ledger_mutation
-- Ledger rows are written once and never changed.
-- ============================================================
CREATE OR REPLACE FUNCTION reject_ledger_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION '% is append-only: % rejected', TG_TABLE_NAME, TG_OP
        USING ERRCODE = 'restrict_violation';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledger_entries_append_only
BEFORE UPDATE OR DELETE ON ledger_entries
FOR EACH ROW
EXECUTE FUNCTION reject_ledger_mutation();

CREATE TRIGGER trg_ledger_entry_relations_append_only
BEFORE UPDATE OR DELETE ON ledger_entry_relations
FOR EACH ROW
EXECUTE FUNCTION reject_ledger_mutation();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS social_credentials CASCADE;
DROP TABLE IF EXISTS external_references CASCADE;
DROP TABLE IF EXISTS ledger_entry_relations CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP FUNCTION IF EXISTS reject_ledger_mutation() CASCADE;

DROP TYPE IF EXISTS related_entity_type;
DROP TYPE IF EXISTS social_provider;
DROP TYPE IF EXISTS operation_type;
DROP TYPE IF EXISTS ledger_flow;
DROP TYPE IF EXISTS account_kind;
";
