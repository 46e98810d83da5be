//! PostgreSQL ledger store adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};

use orders_types::{
    ContactReveal, DomainError, LedgerStore, LedgerTx, Listing, ListingId, NewContactReveal,
    NewVoucherEntry, Order, OrderId, OrderItem, OrderRef, RepoError, User, UserId, VoucherChange,
    VoucherEntry, legacy_voucher_count,
};

use crate::BackfillReport;
use crate::types::{
    CONTACT_REVEAL_COLUMNS, DbContactReveal, DbLegacyVoucherItem, DbListing, DbOrder,
    DbOrderItem, DbUser, DbVoucherEntry, LISTING_COLUMNS, ORDER_COLUMNS, ORDER_ITEM_COLUMNS,
    USER_COLUMNS, VOUCHER_ENTRY_COLUMNS, db_err, write_err,
};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL ledger store with row-level locking.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), RepoError> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| RepoError::Database(format!("Migration {} failed: {}", name, e)))?;
        }
    }
    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        execute_migration(
            &self.pool,
            include_str!("../migrations/0001_create_tables_pg.sql"),
            "0001",
        )
        .await
    }

    /// Inserts a user row. The user service owns these rows; this exists for
    /// seeding and tests.
    pub async fn insert_user(&self, name: &str, contact_voucher_num: i32) -> Result<User, RepoError> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO users (name, contact_voucher_num, updated_at) VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(name)
        .bind(contact_voucher_num)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(User {
            id: UserId::new(id),
            name: name.to_string(),
            contact_voucher_num,
            updated_at: now,
        })
    }

    /// Inserts a listing row without any top window. For seeding and tests.
    pub async fn insert_listing(&self, owner: UserId, title: &str) -> Result<Listing, RepoError> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO listings (user_id, title, updated_at) VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(owner.get())
        .bind(title)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(Listing {
            id: ListingId::new(id),
            user_id: owner,
            title: title.to_string(),
            top_start_time: None,
            top_end_time: None,
            refresh_time: None,
            updated_at: now,
        })
    }

    /// Copies voucher counts out of legacy item titles into the structured column.
    pub async fn backfill_voucher_counts(&self) -> Result<BackfillReport, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let rows: Vec<DbLegacyVoucherItem> = sqlx::query_as(
            r#"SELECT id, title_snapshot FROM order_items
               WHERE product_type = 'CONTACT_VOUCHER'
                 AND (contact_voucher_num IS NULL OR contact_voucher_num <= 0)
               FOR UPDATE"#,
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;

        let mut report = BackfillReport::default();
        for row in rows {
            match legacy_voucher_count(&row.title_snapshot) {
                Some(count) => {
                    sqlx::query(r#"UPDATE order_items SET contact_voucher_num = $1 WHERE id = $2"#)
                        .bind(count)
                        .bind(row.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_err)?;
                    report.updated += 1;
                }
                None => {
                    tracing::warn!(item_id = %row.id, title = %row.title_snapshot, "Unparseable voucher title");
                    report.unparseable += 1;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;
        Ok(report)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for PostgresRepo {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, RepoError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;
        Ok(Box::new(PostgresLedgerTx { tx }))
    }

    async fn get_order(&self, order: &OrderRef) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> = match order {
            OrderRef::Id(id) => {
                let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
                sqlx::query_as::<_, DbOrder>(&sql)
                    .bind(id.into_uuid())
                    .fetch_optional(&self.pool)
                    .await
            }
            OrderRef::No(no) => {
                let sql = format!("SELECT {} FROM orders WHERE order_no = $1", ORDER_COLUMNS);
                sqlx::query_as::<_, DbOrder>(&sql)
                    .bind(no)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        row.map(DbOrder::into_domain).transpose()
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepoError> {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
            ORDER_ITEM_COLUMNS
        );
        let rows: Vec<DbOrderItem> = sqlx::query_as(&sql)
            .bind(order_id.into_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(DbOrderItem::into_domain).collect()
    }

    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, RepoError> {
        let sql = format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS);
        let row: Option<DbListing> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.map(DbListing::into_domain))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.map(DbUser::into_domain))
    }

    async fn list_voucher_entries(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<VoucherEntry>, RepoError> {
        let sql = format!(
            "SELECT {} FROM contact_voucher_history WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
            VOUCHER_ENTRY_COLUMNS
        );
        let rows: Vec<DbVoucherEntry> = sqlx::query_as(&sql)
            .bind(user_id.get())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(DbVoucherEntry::into_domain).collect()
    }

    async fn count_voucher_entries(&self, user_id: UserId) -> Result<i64, RepoError> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM contact_voucher_history WHERE user_id = $1"#)
            .bind(user_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn list_contact_reveals(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ContactReveal>, RepoError> {
        let sql = format!(
            "SELECT {} FROM contact_reveals WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
            CONTACT_REVEAL_COLUMNS
        );
        let rows: Vec<DbContactReveal> = sqlx::query_as(&sql)
            .bind(user_id.get())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(DbContactReveal::into_domain).collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit of work
// ─────────────────────────────────────────────────────────────────────────────

/// An open PostgreSQL transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PostgresLedgerTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PostgresLedgerTx {
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO orders (id, order_no, user_id, amount_total, amount_paid, currency, status,
                   pay_channel, pay_trade_no, paid_at, canceled_at, refunded_at, remark, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
        )
        .bind(order.id.into_uuid())
        .bind(&order.order_no)
        .bind(order.user_id.get())
        .bind(order.amount_total.as_str())
        .bind(order.amount_paid.as_str())
        .bind(order.currency.code())
        .bind(order.status.to_string())
        .bind(&order.pay_channel)
        .bind(&order.pay_trade_no)
        .bind(order.paid_at)
        .bind(order.canceled_at)
        .bind(order.refunded_at)
        .bind(&order.remark)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO order_items (id, order_id, product_type, title_snapshot, unit_price_snapshot,
                   target_type, target_id, top_hour, contact_voucher_num, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(item.id.into_uuid())
        .bind(item.order_id.into_uuid())
        .bind(item.product_type.to_string())
        .bind(&item.title_snapshot)
        .bind(item.unit_price_snapshot.as_str())
        .bind(item.target_type.map(|t| t.to_string()))
        .bind(item.target_id.map(|id| id.get()))
        .bind(item.top_hour)
        .bind(item.contact_voucher_num)
        .bind(item.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepoError> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS);
        let row: Option<DbOrder> = sqlx::query_as(&sql)
            .bind(id.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;

        row.map(DbOrder::into_domain).transpose()
    }

    async fn mark_order_paid(&mut self, order: &Order) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"UPDATE orders
               SET status = 'PAID', amount_paid = $1, pay_channel = $2, pay_trade_no = $3, paid_at = $4, updated_at = $5
               WHERE id = $6 AND status = 'PENDING'"#,
        )
        .bind(order.amount_paid.as_str())
        .bind(&order.pay_channel)
        .bind(&order.pay_trade_no)
        .bind(order.paid_at)
        .bind(order.updated_at)
        .bind(order.id.into_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, RepoError> {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
            ORDER_ITEM_COLUMNS
        );
        let rows: Vec<DbOrderItem> = sqlx::query_as(&sql)
            .bind(order_id.into_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;

        rows.into_iter().map(DbOrderItem::into_domain).collect()
    }

    async fn lock_listing(&mut self, id: ListingId) -> Result<Option<Listing>, RepoError> {
        let sql = format!("SELECT {} FROM listings WHERE id = $1 FOR UPDATE", LISTING_COLUMNS);
        let row: Option<DbListing> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;

        Ok(row.map(DbListing::into_domain))
    }

    async fn save_listing_schedule(&mut self, listing: &Listing) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE listings SET top_start_time = $1, top_end_time = $2, refresh_time = $3, updated_at = $4 WHERE id = $5"#,
        )
        .bind(listing.top_start_time)
        .bind(listing.top_end_time)
        .bind(listing.refresh_time)
        .bind(listing.updated_at)
        .bind(listing.id.get())
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn adjust_voucher_balance(
        &mut self,
        user_id: UserId,
        delta: i32,
        at: DateTime<Utc>,
    ) -> Result<VoucherChange, RepoError> {
        let next: Option<i32> = sqlx::query_scalar(
            r#"UPDATE users SET contact_voucher_num = contact_voucher_num + $1, updated_at = $2
               WHERE id = $3 AND contact_voucher_num + $4 >= 0
               RETURNING contact_voucher_num"#,
        )
        .bind(delta)
        .bind(at)
        .bind(user_id.get())
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if let Some(next_num) = next {
            return Ok(VoucherChange {
                last_num: next_num - delta,
                next_num,
            });
        }

        // Nothing updated: either no such user or the balance is too low.
        let available: Option<i32> =
            sqlx::query_scalar(r#"SELECT contact_voucher_num FROM users WHERE id = $1"#)
                .bind(user_id.get())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(db_err)?;

        match available {
            Some(available) => Err(RepoError::Domain(DomainError::InsufficientVoucher {
                available,
                requested: delta.saturating_neg(),
            })),
            None => Err(RepoError::NotFound),
        }
    }

    async fn append_voucher_entry(
        &mut self,
        entry: &NewVoucherEntry,
    ) -> Result<VoucherEntry, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO contact_voucher_history (user_id, biz_type, change_num, last_num, next_num, remark, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id"#,
        )
        .bind(entry.user_id.get())
        .bind(entry.biz_type.to_string())
        .bind(entry.change_num)
        .bind(entry.last_num)
        .bind(entry.next_num)
        .bind(&entry.remark)
        .bind(entry.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(write_err)?;

        Ok(VoucherEntry {
            id,
            user_id: entry.user_id,
            biz_type: entry.biz_type,
            change_num: entry.change_num,
            last_num: entry.last_num,
            next_num: entry.next_num,
            remark: entry.remark.clone(),
            created_at: entry.created_at,
        })
    }

    async fn append_contact_reveal(
        &mut self,
        user_id: UserId,
        reveal: &NewContactReveal,
        at: DateTime<Utc>,
    ) -> Result<ContactReveal, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO contact_reveals (user_id, purpose_id, purpose_type, purpose_user_id, purpose_user_phone, created_at)
               VALUES ($1, $2, $3, $4, $5, $6) RETURNING id"#,
        )
        .bind(user_id.get())
        .bind(reveal.purpose_id)
        .bind(reveal.purpose_type)
        .bind(reveal.purpose_user_id.map(|u| u.get()))
        .bind(&reveal.purpose_user_phone)
        .bind(at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(write_err)?;

        Ok(ContactReveal {
            id,
            user_id,
            purpose_id: reveal.purpose_id,
            purpose_type: reveal.purpose_type,
            purpose_user_id: reveal.purpose_user_id,
            purpose_user_phone: reveal.purpose_user_phone.clone(),
            created_at: at,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let this = *self;
        this.tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }
}
