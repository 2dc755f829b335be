//! Transaction primitives.
//!
//! A `Transaction` is a single signed monetary entry against an account. Its
//! `balance` field caches the running prefix sum of amounts in
//! `(transaction_date_time, id)` order and is rewritten by the engine after
//! every mutation; it is never authoritative on its own.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub balance: Decimal,
    pub transaction_date_time: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance: Decimal,
    pub transaction_date_time: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    // No cascade: deleting an account with transactions is a conflict,
    // enforced in the engine before any row is removed.
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Transaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            created_by: model.created_by,
            title: model.title,
            description: model.description,
            amount: model.amount,
            balance: model.balance,
            transaction_date_time: model.transaction_date_time,
        }
    }
}
