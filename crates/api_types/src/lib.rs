use serde::{Deserialize, Deserializer, Serialize};

/// Success envelope for single-item responses: `{"data": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// Success envelope for paginated collections.
///
/// `total` is the number of matching items across all pages and is stable
/// while the underlying data set is unchanged.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    #[serde(rename = "perPage")]
    pub per_page: u64,
}

/// Error envelope: `{"error": "<message>"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Deserializes a field that distinguishes "absent" from "present but null".
///
/// A plain `Option` collapses both to `None`; wrapping the value in a second
/// `Option` keeps the distinction: `None` = field absent, `Some(None)` =
/// explicit null.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    50
}

pub mod account {
    use super::*;
    use chrono::{DateTime, Utc};

    /// Query string for `GET /accounts`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountListQuery {
        #[serde(default = "default_page")]
        pub page: u64,
        #[serde(rename = "perPage", default = "default_per_page")]
        pub per_page: u64,
        /// `title` or `created_at` (default).
        pub sort: Option<String>,
        /// `asc` or `desc` (default).
        pub order: Option<String>,
    }

    /// Request body for `POST /accounts`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub title: String,
        pub description: Option<String>,
        /// User ids granted write access.
        pub editors: Option<Vec<String>>,
        /// User ids granted read-only access.
        pub viewers: Option<Vec<String>>,
    }

    /// Request body for `PATCH /accounts/{id}`.
    ///
    /// Membership lists, when present, replace the stored lists wholesale.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountUpdate {
        pub title: Option<String>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub description: Option<Option<String>>,
        pub editors: Option<Vec<String>>,
        pub viewers: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: i64,
        pub title: String,
        pub description: Option<String>,
        pub created_by: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountDetailView {
        pub id: i64,
        pub title: String,
        pub description: Option<String>,
        pub created_by: String,
        pub created_at: DateTime<Utc>,
        pub editors: Vec<String>,
        pub viewers: Vec<String>,
    }
}

pub mod transaction {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    /// Query string for `GET /accounts/{id}/transactions`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        #[serde(default = "default_page")]
        pub page: u64,
        #[serde(rename = "perPage", default = "default_per_page")]
        pub per_page: u64,
    }

    /// Request body for `POST /accounts/{id}/transactions`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub title: String,
        pub description: Option<String>,
        /// Signed, non-zero amount; the sign encodes deposit vs. withdrawal.
        pub amount: Decimal,
        /// RFC 3339 with offset, or a naive local timestamp interpreted in the
        /// server's configured default input timezone. Absent = server now.
        pub transaction_date_time: Option<String>,
    }

    /// Request body for `PATCH /accounts/{id}/transactions/{txId}`.
    ///
    /// At least one field must be present; an empty patch is rejected.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub title: Option<String>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub description: Option<Option<String>>,
        pub amount: Option<Decimal>,
        pub transaction_date_time: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: i64,
        pub account_id: i64,
        pub title: String,
        pub description: Option<String>,
        pub amount: Decimal,
        /// Running balance after this transaction in
        /// `(transaction_date_time, id)` order. Derived, never user-settable.
        pub balance: Decimal,
        pub transaction_date_time: DateTime<Utc>,
        pub created_by: String,
    }
}
