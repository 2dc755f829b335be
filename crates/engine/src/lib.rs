pub use accounts::Account;
pub use error::EngineError;
pub use memberships::MembershipRole;
pub use ops::{
    AccountDetail, AccountListPage, AccountSort, Actor, CreateAccountCmd, CreateTransactionCmd,
    Engine, EngineBuilder, PER_PAGE_MAX, SortOrder, UpdateAccountCmd, UpdateTransactionCmd,
    normalize_page,
};
pub use transactions::Transaction;

mod accounts;
mod error;
mod memberships;
mod ops;
mod transactions;

type ResultEngine<T> = Result<T, EngineError>;
