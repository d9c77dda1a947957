//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::settlements;

/// Database row for a settlement entry.
///
/// Amounts are stored as decimal text so `u128` payouts and exact TON
/// values survive the round trip; timestamps are RFC 3339 UTC text with
/// fixed precision so they order lexically.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = settlements)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SettlementRow {
    pub hash: String,
    pub state: String,
    pub sender: String,
    pub ton_amount: String,
    pub payout_minor: String,
    pub attempts: i32,
    pub external_ref: Option<String>,
    pub last_error: Option<String>,
    pub reserved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
