use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod access;
mod accounts;
mod transactions;

pub use access::Actor;
pub use accounts::{
    AccountDetail, AccountListPage, AccountSort, CreateAccountCmd, SortOrder, UpdateAccountCmd,
};
pub use transactions::{CreateTransactionCmd, UpdateTransactionCmd};

pub const PER_PAGE_MAX: u64 = 200;

/// Clamp caller-supplied pagination to the values a list query actually runs
/// with. Callers echoing pagination back must use the returned pair.
pub fn normalize_page(page: u64, per_page: u64) -> (u64, u64) {
    (page.max(1), per_page.clamp(1, PER_PAGE_MAX))
}

/// Row offset for a normalized page, saturating instead of overflowing and
/// capped to what the store can bind.
fn page_offset(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1)
        .saturating_mul(per_page)
        .min(i64::MAX as u64)
}

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_title(value: &str, label: &str, min: usize, max: usize) -> ResultEngine<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(EngineError::Validation(format!(
            "{label} title must be between {min} and {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
