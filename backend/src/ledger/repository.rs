use async_trait::async_trait;
use shared::ledger::{
    CreateLoan, FundMovement, Loan, RecordRepayment, RegisterUser, Transaction, User, UserProfile,
    VaultSummary,
};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("Loan {0} not found")]
    LoanNotFound(String),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
    #[error("Phone number {0} is already registered")]
    DuplicatePhone(String),
    #[error("Loan {0} is already closed")]
    LoanClosed(String),
    #[error("Amount of {amount_paise} paise exceeds the per-command limit of {limit_paise} paise")]
    AmountTooLarge { amount_paise: u64, limit_paise: u64 },
    #[error("Ledger totals would overflow")]
    AmountOverflow,
    #[error(
        "Repayment of {amount_paise} paise exceeds the outstanding balance of {outstanding_paise} paise"
    )]
    RepaymentExceedsBalance {
        amount_paise: u64,
        outstanding_paise: u64,
    },
    #[error("Loan of {requested_paise} paise exceeds the {available_paise} paise held in the vault")]
    InsufficientVaultFunds {
        requested_paise: u64,
        available_paise: u64,
    },
    #[error("Withdrawal of {requested_paise} paise exceeds the Diwali Fund balance of {balance_paise} paise")]
    InsufficientFundBalance {
        requested_paise: u64,
        balance_paise: u64,
    },
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::UserNotFound(_) | RepositoryError::LoanNotFound(_)
        )
    }
}

/// Read and write access to the dashboard's users, loans, transactions and
/// the Diwali Fund. Rejected commands leave the store unchanged.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError>;

    /// Newest first.
    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError>;

    async fn vault_summary(&self) -> Result<VaultSummary, RepositoryError>;

    async fn register_user(&self, command: RegisterUser) -> Result<User, RepositoryError>;

    async fn create_loan(&self, command: CreateLoan) -> Result<Loan, RepositoryError>;

    async fn record_repayment(
        &self,
        loan_id: &str,
        command: RecordRepayment,
    ) -> Result<Loan, RepositoryError>;

    /// Returns the user's new fund balance.
    async fn deposit_to_fund(
        &self,
        user_id: &str,
        command: FundMovement,
    ) -> Result<u64, RepositoryError>;

    /// Returns the user's new fund balance.
    async fn withdraw_from_fund(
        &self,
        user_id: &str,
        command: FundMovement,
    ) -> Result<u64, RepositoryError>;
}
