//! Accounts API endpoints

use api_types::{
    Data, Page,
    account::{AccountDetailView, AccountListQuery, AccountNew, AccountUpdate, AccountView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use engine::{Account, AccountDetail, AccountListPage, AccountSort, SortOrder};

use crate::{ServerError, auth::AuthUser, server::ServerState};

fn account_view(account: Account) -> AccountView {
    AccountView {
        id: account.id,
        title: account.title,
        description: account.description,
        created_by: account.created_by,
        created_at: account.created_at,
    }
}

fn detail_view(detail: AccountDetail) -> AccountDetailView {
    AccountDetailView {
        id: detail.account.id,
        title: detail.account.title,
        description: detail.account.description,
        created_by: detail.account.created_by,
        created_at: detail.account.created_at,
        editors: detail.editors,
        viewers: detail.viewers,
    }
}

fn parse_sort(sort: Option<&str>) -> Result<AccountSort, ServerError> {
    match sort {
        None | Some("created_at") => Ok(AccountSort::CreatedAt),
        Some("title") => Ok(AccountSort::Title),
        Some(other) => Err(ServerError::Generic(format!("invalid sort field: {other}"))),
    }
}

fn parse_order(order: Option<&str>) -> Result<SortOrder, ServerError> {
    match order {
        None | Some("desc") => Ok(SortOrder::Desc),
        Some("asc") => Ok(SortOrder::Asc),
        Some(other) => Err(ServerError::Generic(format!("invalid sort order: {other}"))),
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<Data<AccountDetailView>>), ServerError> {
    let detail = state
        .engine
        .create_account(
            engine::CreateAccountCmd {
                title: payload.title,
                description: payload.description,
                editors: payload.editors.unwrap_or_default(),
                viewers: payload.viewers.unwrap_or_default(),
            },
            &user.actor(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Data {
            data: detail_view(detail),
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<Page<AccountView>>, ServerError> {
    let (page, per_page) = engine::normalize_page(query.page, query.per_page);
    let list_page = AccountListPage {
        page,
        per_page,
        sort: parse_sort(query.sort.as_deref())?,
        order: parse_order(query.order.as_deref())?,
    };
    let (accounts, total) = state.engine.list_accounts(list_page, &user.actor()).await?;

    Ok(Json(Page {
        data: accounts.into_iter().map(account_view).collect(),
        total,
        page,
        per_page,
    }))
}

pub async fn get_one(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<Data<AccountDetailView>>, ServerError> {
    let detail = state.engine.get_account(id, &user.actor()).await?;
    Ok(Json(Data {
        data: detail_view(detail),
    }))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<Data<AccountDetailView>>, ServerError> {
    // Supplying either list replaces both; an omitted one empties out.
    let memberships = if payload.editors.is_some() || payload.viewers.is_some() {
        Some((
            payload.editors.unwrap_or_default(),
            payload.viewers.unwrap_or_default(),
        ))
    } else {
        None
    };

    let detail = state
        .engine
        .update_account(
            engine::UpdateAccountCmd {
                account_id: id,
                title: payload.title,
                description: payload.description,
                memberships,
            },
            &user.actor(),
        )
        .await?;

    Ok(Json(Data {
        data: detail_view(detail),
    }))
}

pub async fn remove(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_account(id, &user.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}
