use sea_orm::{DatabaseTransaction, prelude::*};

use crate::{EngineError, MembershipRole, ResultEngine, accounts, memberships};

use super::Engine;

/// The authenticated caller of an engine operation.
///
/// Administrators bypass membership checks entirely; everyone else is
/// resolved against the membership rows of the target account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub admin: bool,
}

impl Actor {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            admin: true,
        }
    }
}

impl Engine {
    pub(super) async fn find_account_by_id(
        &self,
        db: &DatabaseTransaction,
        account_id: i64,
    ) -> ResultEngine<Option<accounts::Model>> {
        accounts::Entity::find_by_id(account_id)
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn membership_role(
        &self,
        db: &DatabaseTransaction,
        account_id: i64,
        user_id: &str,
    ) -> ResultEngine<Option<MembershipRole>> {
        let row = memberships::Entity::find_by_id((account_id, user_id.to_string()))
            .one(db)
            .await?;
        row.as_ref()
            .map(|m| MembershipRole::try_from(m.role.as_str()))
            .transpose()
    }

    /// Load an account the actor may read. Absent rows are `NotFound`; an
    /// existing account without a membership is `Forbidden`, so callers can
    /// tell "no such book" from "not your book".
    pub(super) async fn require_account_read(
        &self,
        db: &DatabaseTransaction,
        account_id: i64,
        actor: &Actor,
    ) -> ResultEngine<accounts::Model> {
        let model = self
            .find_account_by_id(db, account_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("account".to_string()))?;
        if actor.admin {
            return Ok(model);
        }
        if self
            .membership_role(db, account_id, &actor.user_id)
            .await?
            .is_none()
        {
            return Err(EngineError::Forbidden(
                "not a member of this account".to_string(),
            ));
        }
        Ok(model)
    }

    pub(super) async fn require_account_editor(
        &self,
        db: &DatabaseTransaction,
        account_id: i64,
        actor: &Actor,
    ) -> ResultEngine<accounts::Model> {
        let model = self
            .find_account_by_id(db, account_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("account".to_string()))?;
        if actor.admin {
            return Ok(model);
        }
        let role = self
            .membership_role(db, account_id, &actor.user_id)
            .await?
            .ok_or_else(|| EngineError::Forbidden("not a member of this account".to_string()))?;
        if !role.can_write() {
            return Err(EngineError::Forbidden("editor access required".to_string()));
        }
        Ok(model)
    }

    pub(super) fn require_admin(actor: &Actor) -> ResultEngine<()> {
        if !actor.admin {
            return Err(EngineError::Forbidden(
                "administrator access required".to_string(),
            ));
        }
        Ok(())
    }
}
