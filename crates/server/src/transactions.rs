//! Transactions API endpoints

use api_types::{
    Data, Page,
    transaction::{TransactionListQuery, TransactionNew, TransactionUpdate, TransactionView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use engine::Transaction;

use crate::{
    ServerError, auth::AuthUser, server::ServerState, timestamp::parse_transaction_date_time,
};

fn view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        account_id: tx.account_id,
        title: tx.title,
        description: tx.description,
        amount: tx.amount,
        balance: tx.balance,
        transaction_date_time: tx.transaction_date_time,
        created_by: tx.created_by,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(account_id): Path<i64>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<Data<TransactionView>>), ServerError> {
    let transaction_date_time = payload
        .transaction_date_time
        .as_deref()
        .map(|raw| parse_transaction_date_time(Some(raw), state.default_tz, Utc::now()))
        .transpose()?;

    let tx = state
        .engine
        .create_transaction(
            engine::CreateTransactionCmd {
                account_id,
                title: payload.title,
                description: payload.description,
                amount: payload.amount,
                transaction_date_time,
            },
            &user.actor(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(Data { data: view(tx) })))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(account_id): Path<i64>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<Page<TransactionView>>, ServerError> {
    let (page, per_page) = engine::normalize_page(query.page, query.per_page);
    let (transactions, total) = state
        .engine
        .list_transactions(account_id, page, per_page, &user.actor())
        .await?;

    Ok(Json(Page {
        data: transactions.into_iter().map(view).collect(),
        total,
        page,
        per_page,
    }))
}

pub async fn get_one(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((account_id, tx_id)): Path<(i64, i64)>,
) -> Result<Json<Data<TransactionView>>, ServerError> {
    let tx = state
        .engine
        .get_transaction(account_id, tx_id, &user.actor())
        .await?;
    Ok(Json(Data { data: view(tx) }))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((account_id, tx_id)): Path<(i64, i64)>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<Data<TransactionView>>, ServerError> {
    let transaction_date_time = payload
        .transaction_date_time
        .as_deref()
        .map(|raw| parse_transaction_date_time(Some(raw), state.default_tz, Utc::now()))
        .transpose()?;

    let tx = state
        .engine
        .update_transaction(
            engine::UpdateTransactionCmd {
                account_id,
                transaction_id: tx_id,
                title: payload.title,
                description: payload.description,
                amount: payload.amount,
                transaction_date_time,
            },
            &user.actor(),
        )
        .await?;

    Ok(Json(Data { data: view(tx) }))
}

pub async fn remove(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((account_id, tx_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(account_id, tx_id, &user.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn recompute(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(account_id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .recompute_balances(account_id, &user.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
