//! Transaction operations and the balance recompute they all share.
//!
//! Every mutation runs inside one DB transaction: change the row, then
//! rewrite the running balances of the whole account from scratch. The
//! recompute orders rows by `(transaction_date_time, id)` ascending so a
//! backdated insert shifts every later balance, and ties on the timestamp
//! resolve by insertion order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use crate::{EngineError, ResultEngine, Transaction, transactions};

use super::{Actor, Engine, normalize_optional_text, normalize_page, normalize_title, page_offset, with_tx};

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 120;

#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub account_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    /// Effective timestamp; defaults to now when absent.
    pub transaction_date_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct UpdateTransactionCmd {
    pub account_id: i64,
    pub transaction_id: i64,
    pub title: Option<String>,
    /// `None` leaves the description alone, `Some(None)` clears it.
    pub description: Option<Option<String>>,
    pub amount: Option<Decimal>,
    pub transaction_date_time: Option<DateTime<Utc>>,
}

fn validate_amount(amount: Decimal) -> ResultEngine<Decimal> {
    if amount.is_zero() {
        return Err(EngineError::Validation(
            "amount must not be zero".to_string(),
        ));
    }
    Ok(amount)
}

impl Engine {
    /// Record a transaction on an account (editors and admins).
    pub async fn create_transaction(
        &self,
        cmd: CreateTransactionCmd,
        actor: &Actor,
    ) -> ResultEngine<Transaction> {
        let title = normalize_title(&cmd.title, "transaction", TITLE_MIN, TITLE_MAX)?;
        let description = normalize_optional_text(cmd.description.as_deref());
        let amount = validate_amount(cmd.amount)?;
        let transaction_date_time = cmd.transaction_date_time.unwrap_or_else(Utc::now);

        with_tx!(self, |tx| {
            async {
                self.require_account_editor(&tx, cmd.account_id, actor)
                    .await?;
                let model = transactions::ActiveModel {
                    account_id: Set(cmd.account_id),
                    created_by: Set(actor.user_id.clone()),
                    title: Set(title),
                    description: Set(description),
                    amount: Set(amount),
                    balance: Set(Decimal::ZERO),
                    transaction_date_time: Set(transaction_date_time),
                    ..Default::default()
                }
                .insert(&tx)
                .await?;
                self.recompute_account_balances(&tx, cmd.account_id).await?;
                self.reload_transaction(&tx, cmd.account_id, model.id).await
            }
            .await
        })
    }

    /// List an account's transactions, newest first, with the total count.
    pub async fn list_transactions(
        &self,
        account_id: i64,
        page: u64,
        per_page: u64,
        actor: &Actor,
    ) -> ResultEngine<(Vec<Transaction>, u64)> {
        let (page, per_page) = normalize_page(page, per_page);

        with_tx!(self, |tx| {
            async {
                self.require_account_read(&tx, account_id, actor).await?;
                let query = transactions::Entity::find()
                    .filter(transactions::Column::AccountId.eq(account_id));
                let total = query.clone().count(&tx).await?;
                let models = query
                    .order_by_desc(transactions::Column::TransactionDateTime)
                    .order_by_desc(transactions::Column::Id)
                    .offset(page_offset(page, per_page))
                    .limit(per_page)
                    .all(&tx)
                    .await?;
                Ok((models.into_iter().map(Transaction::from).collect(), total))
            }
            .await
        })
    }

    pub async fn get_transaction(
        &self,
        account_id: i64,
        transaction_id: i64,
        actor: &Actor,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |tx| {
            async {
                self.require_account_read(&tx, account_id, actor).await?;
                self.reload_transaction(&tx, account_id, transaction_id)
                    .await
            }
            .await
        })
    }

    /// Patch a transaction (editors and admins). An empty patch is rejected
    /// before any row is touched; amount and timestamp changes trigger the
    /// account-wide balance recompute.
    pub async fn update_transaction(
        &self,
        cmd: UpdateTransactionCmd,
        actor: &Actor,
    ) -> ResultEngine<Transaction> {
        if cmd.title.is_none()
            && cmd.description.is_none()
            && cmd.amount.is_none()
            && cmd.transaction_date_time.is_none()
        {
            return Err(EngineError::Validation("no fields to update".to_string()));
        }
        let title = cmd
            .title
            .as_deref()
            .map(|t| normalize_title(t, "transaction", TITLE_MIN, TITLE_MAX))
            .transpose()?;
        let amount = cmd.amount.map(validate_amount).transpose()?;

        with_tx!(self, |tx| {
            async {
                self.require_account_editor(&tx, cmd.account_id, actor)
                    .await?;
                let model = self
                    .find_transaction(&tx, cmd.account_id, cmd.transaction_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("transaction".to_string()))?;

                let mut active: transactions::ActiveModel = model.into();
                if let Some(title) = title {
                    active.title = Set(title);
                }
                if let Some(description) = cmd.description {
                    active.description = Set(normalize_optional_text(description.as_deref()));
                }
                if let Some(amount) = amount {
                    active.amount = Set(amount);
                }
                if let Some(transaction_date_time) = cmd.transaction_date_time {
                    active.transaction_date_time = Set(transaction_date_time);
                }
                active.update(&tx).await?;

                self.recompute_account_balances(&tx, cmd.account_id).await?;
                self.reload_transaction(&tx, cmd.account_id, cmd.transaction_id)
                    .await
            }
            .await
        })
    }

    /// Remove a transaction (editors and admins) and close the balance gap
    /// it leaves behind.
    pub async fn delete_transaction(
        &self,
        account_id: i64,
        transaction_id: i64,
        actor: &Actor,
    ) -> ResultEngine<()> {
        with_tx!(self, |tx| {
            async {
                self.require_account_editor(&tx, account_id, actor).await?;
                self.find_transaction(&tx, account_id, transaction_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("transaction".to_string()))?;
                transactions::Entity::delete_by_id(transaction_id)
                    .exec(&tx)
                    .await?;
                self.recompute_account_balances(&tx, account_id).await?;
                Ok(())
            }
            .await
        })
    }

    /// Rewrite every running balance of an account on demand (editors and
    /// admins). A no-op on a consistent ledger.
    pub async fn recompute_balances(&self, account_id: i64, actor: &Actor) -> ResultEngine<()> {
        with_tx!(self, |tx| {
            async {
                self.require_account_editor(&tx, account_id, actor).await?;
                self.recompute_account_balances(&tx, account_id).await
            }
            .await
        })
    }

    async fn find_transaction(
        &self,
        db: &DatabaseTransaction,
        account_id: i64,
        transaction_id: i64,
    ) -> ResultEngine<Option<transactions::Model>> {
        transactions::Entity::find_by_id(transaction_id)
            .filter(transactions::Column::AccountId.eq(account_id))
            .one(db)
            .await
            .map_err(Into::into)
    }

    async fn reload_transaction(
        &self,
        db: &DatabaseTransaction,
        account_id: i64,
        transaction_id: i64,
    ) -> ResultEngine<Transaction> {
        self.find_transaction(db, account_id, transaction_id)
            .await?
            .map(Transaction::from)
            .ok_or_else(|| EngineError::NotFound("transaction".to_string()))
    }

    /// Walk the whole account in `(transaction_date_time, id)` order and
    /// rewrite each row whose stored balance drifted from the prefix sum.
    pub(super) async fn recompute_account_balances(
        &self,
        db: &DatabaseTransaction,
        account_id: i64,
    ) -> ResultEngine<()> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .order_by_asc(transactions::Column::TransactionDateTime)
            .order_by_asc(transactions::Column::Id)
            .all(db)
            .await?;

        let mut running = Decimal::ZERO;
        for model in models {
            running += model.amount;
            if model.balance != running {
                let mut active: transactions::ActiveModel = model.into();
                active.balance = Set(running);
                active.update(db).await?;
            }
        }
        Ok(())
    }
}
