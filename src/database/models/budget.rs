use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetEntry {
    pub id: i64,
    pub owner_id: i64,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
}

/// An entry as its owner sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetView {
    #[serde(flatten)]
    pub entry: BudgetEntry,
    pub is_public: bool,
}

/// An entry in the public listing, joined to its owner's username.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicBudget {
    #[serde(flatten)]
    pub entry: BudgetEntry,
    pub username: String,
    pub is_public: bool,
}
