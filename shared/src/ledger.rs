use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub village: String,
    pub joined_on: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_data_uri: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Active,
    Closed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,
    pub user_id: String,
    pub principal_paise: u64,
    pub annual_rate_bps: u32,
    pub tenure_months: u32,
    pub emi_paise: u64,
    pub outstanding_paise: u64,
    pub status: LoanStatus,
    pub issued_on: NaiveDate,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Disbursement,
    Repayment,
    FundDeposit,
    FundWithdrawal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<String>,
    pub kind: TransactionKind,
    pub amount_paise: u64,
    pub at: DateTime<Utc>,
}

/// A user together with everything the dashboard shows on their page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: User,
    pub loans: Vec<Loan>,
    pub transactions: Vec<Transaction>,
    pub diwali_fund_balance_paise: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VaultSummary {
    pub opening_capital_paise: u64,
    pub cash_in_vault_paise: u64,
    pub total_disbursed_paise: u64,
    pub total_repaid_paise: u64,
    pub total_outstanding_paise: u64,
    pub diwali_fund_total_paise: u64,
    pub active_loans: usize,
    pub users: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub name: String,
    pub phone: String,
    pub village: String,
    #[serde(default)]
    pub photo_data_uri: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoan {
    pub user_id: String,
    pub principal_paise: u64,
    pub annual_rate_bps: u32,
    pub tenure_months: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordRepayment {
    pub amount_paise: u64,
}

/// Deposit into or withdrawal from a user's Diwali Fund.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FundMovement {
    pub amount_paise: u64,
}
