//! Ledger writer: append-only entries and history queries.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
};
use tally_core::account::AccountKind;
use tally_core::ledger::{
    LedgerEntry, LedgerError, LedgerFilter, LedgerSort, NewLedgerEntry, SortDirection, SortField,
};
use tally_shared::types::{PageRequest, PageResponse, UserId};
use uuid::Uuid;

use crate::entities::{ledger_entries, ledger_entry_relations, sea_orm_active_enums as db};
use crate::error::db_err;
use crate::mapper::entry_from_model;

/// Appends and reads ledger entries.
#[derive(Debug, Clone)]
pub struct LedgerWriter {
    db: DatabaseConnection,
}

impl LedgerWriter {
    /// Creates a new ledger writer.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts an entry and its related-entity rows.
    pub async fn append<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, LedgerError> {
        let now = Utc::now().into();
        let entry_id = Uuid::now_v7();

        let model = ledger_entries::ActiveModel {
            id: Set(entry_id),
            owner_id: Set(entry.owner_id.into_inner()),
            account_kind: Set(entry.account_kind.into()),
            operation_type: Set(entry.operation.into()),
            flow: Set(entry.flow.into()),
            delta: Set(entry.delta),
            balance_after: Set(entry.balance_after),
            reason: Set(entry.reason),
            resource_traded: Set(entry.resource_traded),
            external_reference: Set(entry.external_reference),
            created_at: Set(now),
        };
        let inserted = model.insert(conn).await.map_err(db_err)?;

        let mut relations = Vec::with_capacity(entry.related_entities.len());
        for related in entry.related_entities {
            let relation = ledger_entry_relations::ActiveModel {
                id: Set(Uuid::now_v7()),
                ledger_entry_id: Set(entry_id),
                entity_type: Set(related.entity_type.into()),
                entity_id: Set(related.entity_id),
                created_at: Set(now),
            };
            relations.push(relation.insert(conn).await.map_err(db_err)?);
        }

        Ok(entry_from_model(inserted, relations))
    }

    /// Filtered, sorted, paginated history.
    ///
    /// `per_page` is clamped to `1..=100`.
    ///
    /// # Errors
    ///
    /// `Validation` for an inverted time range.
    pub async fn query(
        &self,
        filter: &LedgerFilter,
        sort: LedgerSort,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerEntry>, LedgerError> {
        filter.validate()?;
        let page = page.normalized();

        let query = apply_sort(apply_filter(ledger_entries::Entity::find(), filter), sort);
        let paginator = query.paginate(&self.db, page.limit());
        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator
            .fetch_page(u64::from(page.page - 1))
            .await
            .map_err(db_err)?;

        let entries = load_relations(&self.db, models).await?;
        Ok(PageResponse::new(entries, page.page, page.per_page, total))
    }

    /// Entries carrying an external reference.
    pub async fn find_by_reference(&self, reference: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::ExternalReference.eq(reference))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .order_by_asc(ledger_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        load_relations(&self.db, models).await
    }

    /// Newest entry of one account.
    pub async fn latest_for(
        &self,
        owner_id: UserId,
        kind: AccountKind,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let model = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(ledger_entries::Column::AccountKind.eq(db::AccountKind::from(kind)))
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .order_by_desc(ledger_entries::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match model {
            Some(model) => Ok(load_relations(&self.db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Every entry of one account, oldest first.
    pub async fn history_of(
        &self,
        owner_id: UserId,
        kind: AccountKind,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(ledger_entries::Column::AccountKind.eq(db::AccountKind::from(kind)))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .order_by_asc(ledger_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        load_relations(&self.db, models).await
    }
}

/// Loads relation rows for `models` in one query, preserving order.
async fn load_relations<C: ConnectionTrait>(
    conn: &C,
    models: Vec<ledger_entries::Model>,
) -> Result<Vec<LedgerEntry>, LedgerError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let relations = ledger_entry_relations::Entity::find()
        .filter(ledger_entry_relations::Column::LedgerEntryId.is_in(ids))
        .order_by_asc(ledger_entry_relations::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?;

    let mut by_entry: HashMap<Uuid, Vec<ledger_entry_relations::Model>> = HashMap::new();
    for relation in relations {
        by_entry
            .entry(relation.ledger_entry_id)
            .or_default()
            .push(relation);
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let relations = by_entry.remove(&model.id).unwrap_or_default();
            entry_from_model(model, relations)
        })
        .collect())
}

fn apply_filter(
    mut query: Select<ledger_entries::Entity>,
    filter: &LedgerFilter,
) -> Select<ledger_entries::Entity> {
    if let Some(owner_id) = filter.owner_id {
        query = query.filter(ledger_entries::Column::OwnerId.eq(owner_id.into_inner()));
    }
    if let Some(operation) = filter.operation {
        query = query.filter(ledger_entries::Column::OperationType.eq(db::OperationType::from(operation)));
    }
    if let Some(kind) = filter.account_kind {
        query = query.filter(ledger_entries::Column::AccountKind.eq(db::AccountKind::from(kind)));
    }
    if let Some(flow) = filter.flow {
        query = query.filter(ledger_entries::Column::Flow.eq(db::LedgerFlow::from(flow)));
    }
    if let Some(from) = filter.created_from {
        query = query.filter(ledger_entries::Column::CreatedAt.gte(from));
    }
    if let Some(to) = filter.created_to {
        query = query.filter(ledger_entries::Column::CreatedAt.lt(to));
    }
    query
}

fn apply_sort(query: Select<ledger_entries::Entity>, sort: LedgerSort) -> Select<ledger_entries::Entity> {
    let column = match sort.field {
        SortField::CreatedAt => ledger_entries::Column::CreatedAt,
        SortField::Delta => ledger_entries::Column::Delta,
        SortField::BalanceAfter => ledger_entries::Column::BalanceAfter,
        SortField::OperationType => ledger_entries::Column::OperationType,
        SortField::AccountKind => ledger_entries::Column::AccountKind,
        SortField::Flow => ledger_entries::Column::Flow,
    };
    let order = match sort.direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    query
        .order_by(column, order.clone())
        .order_by(ledger_entries::Column::Id, order)
}
