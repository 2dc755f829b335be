//! Account operations: create, list, fetch, update, delete.
//!
//! Accounts are created and deleted by administrators only. Membership lists
//! on create/update are replace-all: the caller sends the full editor and
//! viewer sets and the previous rows are discarded.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use crate::{Account, EngineError, MembershipRole, ResultEngine, accounts, memberships, transactions};

use super::{Actor, Engine, normalize_optional_text, normalize_page, normalize_title, page_offset, with_tx};

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 80;

#[derive(Clone, Debug, Default)]
pub struct CreateAccountCmd {
    pub title: String,
    pub description: Option<String>,
    pub editors: Vec<String>,
    pub viewers: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UpdateAccountCmd {
    pub account_id: i64,
    pub title: Option<String>,
    /// `None` leaves the description alone, `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// Full replacement editor/viewer sets, when either list was supplied.
    pub memberships: Option<(Vec<String>, Vec<String>)>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccountSort {
    Title,
    #[default]
    CreatedAt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Clone, Debug)]
pub struct AccountListPage {
    pub page: u64,
    pub per_page: u64,
    pub sort: AccountSort,
    pub order: SortOrder,
}

impl Default for AccountListPage {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            sort: AccountSort::default(),
            order: SortOrder::default(),
        }
    }
}

/// One account together with its resolved membership lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountDetail {
    pub account: Account,
    pub editors: Vec<String>,
    pub viewers: Vec<String>,
}

fn validate_membership_lists(editors: &[String], viewers: &[String]) -> ResultEngine<()> {
    let mut editor_set = HashSet::new();
    for user_id in editors {
        if user_id.trim().is_empty() {
            return Err(EngineError::Validation(
                "membership user id must not be empty".to_string(),
            ));
        }
        if !editor_set.insert(user_id.as_str()) {
            return Err(EngineError::Validation(format!(
                "duplicate membership for user {user_id}"
            )));
        }
    }
    let mut viewer_set = HashSet::new();
    for user_id in viewers {
        if user_id.trim().is_empty() {
            return Err(EngineError::Validation(
                "membership user id must not be empty".to_string(),
            ));
        }
        if !viewer_set.insert(user_id.as_str()) {
            return Err(EngineError::Validation(format!(
                "duplicate membership for user {user_id}"
            )));
        }
        if editor_set.contains(user_id.as_str()) {
            return Err(EngineError::Validation(format!(
                "user {user_id} cannot be both editor and viewer"
            )));
        }
    }
    Ok(())
}

impl Engine {
    /// Create an account (admins only) with its initial membership lists.
    pub async fn create_account(
        &self,
        cmd: CreateAccountCmd,
        actor: &Actor,
    ) -> ResultEngine<AccountDetail> {
        Self::require_admin(actor)?;
        let title = normalize_title(&cmd.title, "account", TITLE_MIN, TITLE_MAX)?;
        let description = normalize_optional_text(cmd.description.as_deref());
        validate_membership_lists(&cmd.editors, &cmd.viewers)?;

        with_tx!(self, |tx| {
            async {
                let model = accounts::ActiveModel {
                    title: Set(title),
                    description: Set(description),
                    created_by: Set(actor.user_id.clone()),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(&tx)
                .await?;
                self.replace_memberships(&tx, model.id, &cmd.editors, &cmd.viewers)
                    .await?;
                self.account_detail_for(&tx, model).await
            }
            .await
        })
    }

    /// List accounts visible to the actor, newest first by default.
    ///
    /// Admins see every account; other users only the ones they hold a
    /// membership on. Returns the page plus the total matching count.
    pub async fn list_accounts(
        &self,
        page: AccountListPage,
        actor: &Actor,
    ) -> ResultEngine<(Vec<Account>, u64)> {
        let (page_number, per_page) = normalize_page(page.page, page.per_page);

        with_tx!(self, |tx| {
            async {
                let mut query = accounts::Entity::find();
                if !actor.admin {
                    let account_ids: Vec<i64> = memberships::Entity::find()
                        .filter(memberships::Column::UserId.eq(actor.user_id.clone()))
                        .all(&tx)
                        .await?
                        .into_iter()
                        .map(|m| m.account_id)
                        .collect();
                    query = query.filter(accounts::Column::Id.is_in(account_ids));
                }

                let total = query.clone().count(&tx).await?;

                let column = match page.sort {
                    AccountSort::Title => accounts::Column::Title,
                    AccountSort::CreatedAt => accounts::Column::CreatedAt,
                };
                query = match page.order {
                    SortOrder::Asc => query.order_by_asc(column),
                    SortOrder::Desc => query.order_by_desc(column),
                };
                // Stable order for rows with equal sort keys.
                query = query.order_by_asc(accounts::Column::Id);

                let models = query
                    .offset(page_offset(page_number, per_page))
                    .limit(per_page)
                    .all(&tx)
                    .await?;
                Ok((models.into_iter().map(Account::from).collect(), total))
            }
            .await
        })
    }

    /// Fetch one account, with membership lists, for a reader.
    pub async fn get_account(&self, account_id: i64, actor: &Actor) -> ResultEngine<AccountDetail> {
        with_tx!(self, |tx| {
            async {
                let model = self.require_account_read(&tx, account_id, actor).await?;
                self.account_detail_for(&tx, model).await
            }
            .await
        })
    }

    /// Patch an account (admins only). Empty patches are rejected before any
    /// row is touched; membership lists replace the existing ones wholesale.
    pub async fn update_account(
        &self,
        cmd: UpdateAccountCmd,
        actor: &Actor,
    ) -> ResultEngine<AccountDetail> {
        Self::require_admin(actor)?;
        if cmd.title.is_none() && cmd.description.is_none() && cmd.memberships.is_none() {
            return Err(EngineError::Validation("no fields to update".to_string()));
        }
        let title = cmd
            .title
            .as_deref()
            .map(|t| normalize_title(t, "account", TITLE_MIN, TITLE_MAX))
            .transpose()?;
        if let Some((editors, viewers)) = &cmd.memberships {
            validate_membership_lists(editors, viewers)?;
        }

        with_tx!(self, |tx| {
            async {
                let model = self
                    .find_account_by_id(&tx, cmd.account_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("account".to_string()))?;

                let mut active: accounts::ActiveModel = model.into();
                if let Some(title) = title {
                    active.title = Set(title);
                }
                if let Some(description) = cmd.description {
                    active.description =
                        Set(normalize_optional_text(description.as_deref()));
                }
                let model = active.update(&tx).await?;

                if let Some((editors, viewers)) = cmd.memberships {
                    self.replace_memberships(&tx, model.id, &editors, &viewers)
                        .await?;
                }
                self.account_detail_for(&tx, model).await
            }
            .await
        })
    }

    /// Delete an account (admins only). Accounts still holding transactions
    /// are a conflict; membership rows are removed alongside the account.
    pub async fn delete_account(&self, account_id: i64, actor: &Actor) -> ResultEngine<()> {
        Self::require_admin(actor)?;
        with_tx!(self, |tx| {
            async {
                self.find_account_by_id(&tx, account_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("account".to_string()))?;
                let transaction_count = transactions::Entity::find()
                    .filter(transactions::Column::AccountId.eq(account_id))
                    .count(&tx)
                    .await?;
                if transaction_count > 0 {
                    return Err(EngineError::Conflict(
                        "account has transactions".to_string(),
                    ));
                }
                memberships::Entity::delete_many()
                    .filter(memberships::Column::AccountId.eq(account_id))
                    .exec(&tx)
                    .await?;
                accounts::Entity::delete_by_id(account_id).exec(&tx).await?;
                Ok(())
            }
            .await
        })
    }

    async fn replace_memberships(
        &self,
        db: &DatabaseTransaction,
        account_id: i64,
        editors: &[String],
        viewers: &[String],
    ) -> ResultEngine<()> {
        memberships::Entity::delete_many()
            .filter(memberships::Column::AccountId.eq(account_id))
            .exec(db)
            .await?;
        let rows: Vec<memberships::ActiveModel> = editors
            .iter()
            .map(|user_id| (user_id, MembershipRole::Editor))
            .chain(viewers.iter().map(|user_id| (user_id, MembershipRole::Viewer)))
            .map(|(user_id, role)| memberships::ActiveModel {
                account_id: Set(account_id),
                user_id: Set(user_id.clone()),
                role: Set(role.as_str().to_string()),
            })
            .collect();
        if !rows.is_empty() {
            memberships::Entity::insert_many(rows).exec(db).await?;
        }
        Ok(())
    }

    async fn account_detail_for(
        &self,
        db: &DatabaseTransaction,
        model: accounts::Model,
    ) -> ResultEngine<AccountDetail> {
        let rows = memberships::Entity::find()
            .filter(memberships::Column::AccountId.eq(model.id))
            .order_by_asc(memberships::Column::UserId)
            .all(db)
            .await?;
        let mut editors = Vec::new();
        let mut viewers = Vec::new();
        for row in rows {
            match MembershipRole::try_from(row.role.as_str())? {
                MembershipRole::Editor => editors.push(row.user_id),
                MembershipRole::Viewer => viewers.push(row.user_id),
            }
        }
        Ok(AccountDetail {
            account: Account::from(model),
            editors,
            viewers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_lists_reject_overlap() {
        let editors = vec!["alice".to_string()];
        let viewers = vec!["alice".to_string()];
        let err = validate_membership_lists(&editors, &viewers).unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("user alice cannot be both editor and viewer".to_string())
        );
    }

    #[test]
    fn membership_lists_reject_duplicates() {
        let editors = vec!["alice".to_string(), "alice".to_string()];
        let err = validate_membership_lists(&editors, &[]).unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("duplicate membership for user alice".to_string())
        );
    }

    #[test]
    fn membership_lists_accept_disjoint_sets() {
        let editors = vec!["alice".to_string()];
        let viewers = vec!["bob".to_string()];
        assert!(validate_membership_lists(&editors, &viewers).is_ok());
    }
}
