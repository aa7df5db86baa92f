use async_trait::async_trait;
use chrono::Utc;
use shared::ledger::{
    CreateLoan, FundMovement, Loan, LoanStatus, RecordRepayment, RegisterUser, Transaction,
    TransactionKind, User, UserProfile, VaultSummary,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::emi::monthly_installment;
use super::repository::{LedgerRepository, RepositoryError};
use super::seed::SeedDocument;
use crate::verification::image_reference::ImageReference;

pub const MAX_TENURE_MONTHS: u32 = 60;
pub const MAX_ANNUAL_RATE_BPS: u32 = 10_000;
/// Ceiling on any single loan, repayment or fund movement (₹100 crore).
pub const MAX_COMMAND_AMOUNT_PAISE: u64 = 100_000_000_000;

#[derive(Debug, Default)]
struct LedgerState {
    opening_capital_paise: u64,
    users: Vec<User>,
    loans: Vec<Loan>,
    transactions: Vec<Transaction>,
}

impl LedgerState {
    fn user(&self, user_id: &str) -> Result<&User, RepositoryError> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| RepositoryError::UserNotFound(user_id.to_string()))
    }

    fn sum_of(
        &self,
        kind: TransactionKind,
        user_id: Option<&str>,
    ) -> Result<u64, RepositoryError> {
        self.transactions
            .iter()
            .filter(|tx| tx.kind == kind)
            .filter(|tx| user_id.is_none_or(|id| tx.user_id == id))
            .try_fold(0u64, |total, tx| checked_add(total, tx.amount_paise))
    }

    fn fund_balance(&self, user_id: Option<&str>) -> Result<u64, RepositoryError> {
        Ok(self
            .sum_of(TransactionKind::FundDeposit, user_id)?
            .saturating_sub(self.sum_of(TransactionKind::FundWithdrawal, user_id)?))
    }

    fn inflows(&self) -> Result<u64, RepositoryError> {
        let repaid = self.sum_of(TransactionKind::Repayment, None)?;
        let deposited = self.sum_of(TransactionKind::FundDeposit, None)?;
        checked_add(checked_add(self.opening_capital_paise, repaid)?, deposited)
    }

    fn outflows(&self) -> Result<u64, RepositoryError> {
        checked_add(
            self.sum_of(TransactionKind::Disbursement, None)?,
            self.sum_of(TransactionKind::FundWithdrawal, None)?,
        )
    }

    fn cash_in_vault(&self) -> Result<u64, RepositoryError> {
        Ok(self.inflows()?.saturating_sub(self.outflows()?))
    }

    fn record(&mut self, user_id: &str, loan_id: Option<&str>, kind: TransactionKind, amount: u64) {
        self.transactions.push(Transaction {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            loan_id: loan_id.map(str::to_string),
            kind,
            amount_paise: amount,
            at: Utc::now(),
        });
    }
}

fn next_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let highest = existing
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", prefix, highest + 1)
}

fn checked_add(total: u64, amount: u64) -> Result<u64, RepositoryError> {
    total.checked_add(amount).ok_or(RepositoryError::AmountOverflow)
}

fn validate_amount(amount_paise: u64) -> Result<(), RepositoryError> {
    if amount_paise == 0 {
        return Err(RepositoryError::InvalidData(
            "amount must be greater than zero".to_string(),
        ));
    }
    if amount_paise > MAX_COMMAND_AMOUNT_PAISE {
        return Err(RepositoryError::AmountTooLarge {
            amount_paise,
            limit_paise: MAX_COMMAND_AMOUNT_PAISE,
        });
    }
    Ok(())
}

fn validate_registration(command: &RegisterUser) -> Result<(), RepositoryError> {
    if command.name.trim().is_empty() {
        return Err(RepositoryError::InvalidData("name is required".to_string()));
    }
    if command.village.trim().is_empty() {
        return Err(RepositoryError::InvalidData("village is required".to_string()));
    }
    if command.phone.len() != 10 || !command.phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(RepositoryError::InvalidData(
            "phone must be exactly 10 digits".to_string(),
        ));
    }
    if let Some(photo) = &command.photo_data_uri {
        ImageReference::parse(photo)
            .map_err(|e| RepositoryError::InvalidData(format!("photo: {}", e)))?;
    }
    Ok(())
}

fn validate_loan_terms(command: &CreateLoan) -> Result<(), RepositoryError> {
    validate_amount(command.principal_paise)?;
    if command.tenure_months == 0 || command.tenure_months > MAX_TENURE_MONTHS {
        return Err(RepositoryError::InvalidData(format!(
            "tenure must be between 1 and {} months",
            MAX_TENURE_MONTHS
        )));
    }
    if command.annual_rate_bps > MAX_ANNUAL_RATE_BPS {
        return Err(RepositoryError::InvalidData(
            "annual rate cannot exceed 100%".to_string(),
        ));
    }
    Ok(())
}

/// Ledger held in process memory, seeded from a [`SeedDocument`].
#[derive(Clone)]
pub struct InMemoryLedgerRepository {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerRepository {
    pub fn new(seed: SeedDocument) -> Self {
        let state = LedgerState {
            opening_capital_paise: seed.opening_capital_paise,
            users: seed.users,
            loans: seed.loans,
            transactions: seed.transactions,
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.state.read().await.users.clone())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError> {
        let state = self.state.read().await;
        let Ok(user) = state.user(user_id) else {
            return Ok(None);
        };

        let loans = state
            .loans
            .iter()
            .filter(|loan| loan.user_id == user_id)
            .cloned()
            .collect();
        let mut transactions: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.at.cmp(&a.at));

        Ok(Some(UserProfile {
            user: user.clone(),
            loans,
            transactions,
            diwali_fund_balance_paise: state.fund_balance(Some(user_id))?,
        }))
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, RepositoryError> {
        let mut transactions = self.state.read().await.transactions.clone();
        transactions.sort_by(|a, b| b.at.cmp(&a.at));
        Ok(transactions)
    }

    async fn vault_summary(&self) -> Result<VaultSummary, RepositoryError> {
        let state = self.state.read().await;
        let active: Vec<&Loan> = state
            .loans
            .iter()
            .filter(|loan| loan.status == LoanStatus::Active)
            .collect();

        let total_outstanding_paise = active
            .iter()
            .try_fold(0u64, |total, loan| checked_add(total, loan.outstanding_paise))?;

        Ok(VaultSummary {
            opening_capital_paise: state.opening_capital_paise,
            cash_in_vault_paise: state.cash_in_vault()?,
            total_disbursed_paise: state.sum_of(TransactionKind::Disbursement, None)?,
            total_repaid_paise: state.sum_of(TransactionKind::Repayment, None)?,
            total_outstanding_paise,
            diwali_fund_total_paise: state.fund_balance(None)?,
            active_loans: active.len(),
            users: state.users.len(),
        })
    }

    async fn register_user(&self, command: RegisterUser) -> Result<User, RepositoryError> {
        validate_registration(&command)?;

        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.phone == command.phone) {
            return Err(RepositoryError::DuplicatePhone(command.phone));
        }

        let user = User {
            id: next_id("USR", state.users.iter().map(|u| u.id.as_str())),
            name: command.name.trim().to_string(),
            phone: command.phone,
            village: command.village.trim().to_string(),
            joined_on: Utc::now().date_naive(),
            photo_data_uri: command.photo_data_uri,
        };
        state.users.push(user.clone());
        log::info!("Registered user {}", user.id);
        Ok(user)
    }

    async fn create_loan(&self, command: CreateLoan) -> Result<Loan, RepositoryError> {
        validate_loan_terms(&command)?;

        let mut state = self.state.write().await;
        state.user(&command.user_id)?;

        let available = state.cash_in_vault()?;
        if command.principal_paise > available {
            return Err(RepositoryError::InsufficientVaultFunds {
                requested_paise: command.principal_paise,
                available_paise: available,
            });
        }

        checked_add(state.outflows()?, command.principal_paise)?;

        let emi_paise = monthly_installment(
            command.principal_paise,
            command.annual_rate_bps,
            command.tenure_months,
        );
        let outstanding_paise = emi_paise
            .checked_mul(u64::from(command.tenure_months))
            .ok_or(RepositoryError::AmountOverflow)?;
        let loan = Loan {
            id: next_id("LN", state.loans.iter().map(|l| l.id.as_str())),
            user_id: command.user_id,
            principal_paise: command.principal_paise,
            annual_rate_bps: command.annual_rate_bps,
            tenure_months: command.tenure_months,
            emi_paise,
            outstanding_paise,
            status: LoanStatus::Active,
            issued_on: Utc::now().date_naive(),
        };

        state.record(
            &loan.user_id,
            Some(loan.id.as_str()),
            TransactionKind::Disbursement,
            loan.principal_paise,
        );
        state.loans.push(loan.clone());
        log::info!(
            "Issued loan {} to {}: principal {} paise, EMI {} paise",
            loan.id,
            loan.user_id,
            loan.principal_paise,
            loan.emi_paise
        );
        Ok(loan)
    }

    async fn record_repayment(
        &self,
        loan_id: &str,
        command: RecordRepayment,
    ) -> Result<Loan, RepositoryError> {
        validate_amount(command.amount_paise)?;

        let mut state = self.state.write().await;
        checked_add(state.inflows()?, command.amount_paise)?;
        let loan = state
            .loans
            .iter_mut()
            .find(|loan| loan.id == loan_id)
            .ok_or_else(|| RepositoryError::LoanNotFound(loan_id.to_string()))?;

        if loan.status == LoanStatus::Closed {
            return Err(RepositoryError::LoanClosed(loan.id.clone()));
        }
        if command.amount_paise > loan.outstanding_paise {
            return Err(RepositoryError::RepaymentExceedsBalance {
                amount_paise: command.amount_paise,
                outstanding_paise: loan.outstanding_paise,
            });
        }

        loan.outstanding_paise -= command.amount_paise;
        if loan.outstanding_paise == 0 {
            loan.status = LoanStatus::Closed;
        }
        let updated = loan.clone();

        state.record(
            &updated.user_id,
            Some(updated.id.as_str()),
            TransactionKind::Repayment,
            command.amount_paise,
        );
        if updated.status == LoanStatus::Closed {
            log::info!("Loan {} fully repaid and closed", updated.id);
        }
        Ok(updated)
    }

    async fn deposit_to_fund(
        &self,
        user_id: &str,
        command: FundMovement,
    ) -> Result<u64, RepositoryError> {
        validate_amount(command.amount_paise)?;

        let mut state = self.state.write().await;
        state.user(user_id)?;
        checked_add(state.inflows()?, command.amount_paise)?;
        let balance = checked_add(state.fund_balance(Some(user_id))?, command.amount_paise)?;

        state.record(
            user_id,
            None,
            TransactionKind::FundDeposit,
            command.amount_paise,
        );
        Ok(balance)
    }

    async fn withdraw_from_fund(
        &self,
        user_id: &str,
        command: FundMovement,
    ) -> Result<u64, RepositoryError> {
        validate_amount(command.amount_paise)?;

        let mut state = self.state.write().await;
        state.user(user_id)?;
        let balance = state.fund_balance(Some(user_id))?;
        checked_add(state.outflows()?, command.amount_paise)?;
        if command.amount_paise > balance {
            return Err(RepositoryError::InsufficientFundBalance {
                requested_paise: command.amount_paise,
                balance_paise: balance,
            });
        }
        state.record(
            user_id,
            None,
            TransactionKind::FundWithdrawal,
            command.amount_paise,
        );
        Ok(balance - command.amount_paise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> InMemoryLedgerRepository {
        InMemoryLedgerRepository::new(SeedDocument::bundled().unwrap())
    }

    fn registration(phone: &str) -> RegisterUser {
        RegisterUser {
            name: "Meena Devi".into(),
            phone: phone.into(),
            village: "Rampur".into(),
            photo_data_uri: None,
        }
    }

    #[actix_web::test]
    async fn vault_summary_reflects_seed() {
        let summary = repo().vault_summary().await.unwrap();
        assert_eq!(summary.opening_capital_paise, 20_000_000);
        assert_eq!(summary.total_disbursed_paise, 8_500_000);
        assert_eq!(summary.total_repaid_paise, 2_018_143);
        assert_eq!(summary.diwali_fund_total_paise, 225_000);
        assert_eq!(summary.cash_in_vault_paise, 13_743_143);
        assert_eq!(summary.total_outstanding_paise, 8_142_965);
        assert_eq!(summary.active_loans, 2);
        assert_eq!(summary.users, 4);
    }

    #[actix_web::test]
    async fn profile_collects_loans_transactions_and_fund() {
        let profile = repo().get_user("USR001").await.unwrap().unwrap();
        assert_eq!(profile.user.name, "Lakshmi Devi");
        assert_eq!(profile.loans.len(), 1);
        assert_eq!(profile.transactions.len(), 6);
        assert_eq!(profile.diwali_fund_balance_paise, 100_000);
        assert!(
            profile
                .transactions
                .windows(2)
                .all(|pair| pair[0].at >= pair[1].at)
        );
    }

    #[actix_web::test]
    async fn unknown_user_has_no_profile() {
        assert_eq!(repo().get_user("USR999").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn registration_assigns_next_id() {
        let repo = repo();
        let user = repo.register_user(registration("9123456789")).await.unwrap();
        assert_eq!(user.id, "USR005");
        assert_eq!(repo.list_users().await.unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn registration_rejects_duplicate_and_malformed_phones() {
        let repo = repo();
        assert_eq!(
            repo.register_user(registration("9876500011")).await,
            Err(RepositoryError::DuplicatePhone("9876500011".into()))
        );
        assert!(matches!(
            repo.register_user(registration("12345")).await,
            Err(RepositoryError::InvalidData(_))
        ));
        assert_eq!(repo.list_users().await.unwrap().len(), 4);
    }

    #[actix_web::test]
    async fn registration_validates_photo() {
        let mut command = registration("9123456789");
        command.photo_data_uri = Some("data:image/gif;base64,R0lGODlh".into());
        assert!(matches!(
            repo().register_user(command).await,
            Err(RepositoryError::InvalidData(msg)) if msg.starts_with("photo")
        ));
    }

    #[actix_web::test]
    async fn new_loan_disburses_from_vault() {
        let repo = repo();
        let loan = repo
            .create_loan(CreateLoan {
                user_id: "USR004".into(),
                principal_paise: 1_000_000,
                annual_rate_bps: 1_200,
                tenure_months: 12,
            })
            .await
            .unwrap();

        assert_eq!(loan.id, "LN004");
        assert_eq!(loan.emi_paise, 88_849);
        assert_eq!(loan.outstanding_paise, 88_849 * 12);
        assert_eq!(loan.status, LoanStatus::Active);

        let summary = repo.vault_summary().await.unwrap();
        assert_eq!(summary.cash_in_vault_paise, 13_743_143 - 1_000_000);
        assert_eq!(summary.active_loans, 3);

        let latest = &repo.list_transactions().await.unwrap()[0];
        assert_eq!(latest.kind, TransactionKind::Disbursement);
        assert_eq!(latest.loan_id.as_deref(), Some("LN004"));
    }

    #[actix_web::test]
    async fn loan_cannot_exceed_vault_cash() {
        let result = repo()
            .create_loan(CreateLoan {
                user_id: "USR004".into(),
                principal_paise: 50_000_000,
                annual_rate_bps: 1_200,
                tenure_months: 12,
            })
            .await;
        assert_eq!(
            result,
            Err(RepositoryError::InsufficientVaultFunds {
                requested_paise: 50_000_000,
                available_paise: 13_743_143,
            })
        );
    }

    #[actix_web::test]
    async fn loan_terms_are_validated() {
        let repo = repo();
        for (principal, rate, tenure) in [(0, 1_200, 12), (1_000, 1_200, 0), (1_000, 1_200, 61), (1_000, 10_001, 12)] {
            let result = repo
                .create_loan(CreateLoan {
                    user_id: "USR004".into(),
                    principal_paise: principal,
                    annual_rate_bps: rate,
                    tenure_months: tenure,
                })
                .await;
            assert!(matches!(result, Err(RepositoryError::InvalidData(_))));
        }
        assert!(matches!(
            repo.create_loan(CreateLoan {
                user_id: "USR404".into(),
                principal_paise: 1_000,
                annual_rate_bps: 1_200,
                tenure_months: 12,
            })
            .await,
            Err(RepositoryError::UserNotFound(_))
        ));
    }

    #[actix_web::test]
    async fn repayment_above_balance_is_rejected_without_change() {
        let repo = repo();
        let before = repo.list_transactions().await.unwrap().len();

        let result = repo
            .record_repayment("LN001", RecordRepayment { amount_paise: 2_062_801 })
            .await;

        assert_eq!(
            result,
            Err(RepositoryError::RepaymentExceedsBalance {
                amount_paise: 2_062_801,
                outstanding_paise: 2_062_800,
            })
        );
        assert_eq!(repo.list_transactions().await.unwrap().len(), before);
        let profile = repo.get_user("USR001").await.unwrap().unwrap();
        assert_eq!(profile.loans[0].outstanding_paise, 2_062_800);
    }

    #[actix_web::test]
    async fn full_repayment_closes_loan() {
        let repo = repo();
        let partial = repo
            .record_repayment("LN001", RecordRepayment { amount_paise: 229_200 })
            .await
            .unwrap();
        assert_eq!(partial.outstanding_paise, 1_833_600);
        assert_eq!(partial.status, LoanStatus::Active);

        let closed = repo
            .record_repayment("LN001", RecordRepayment { amount_paise: 1_833_600 })
            .await
            .unwrap();
        assert_eq!(closed.outstanding_paise, 0);
        assert_eq!(closed.status, LoanStatus::Closed);

        assert_eq!(
            repo.record_repayment("LN001", RecordRepayment { amount_paise: 1 })
                .await,
            Err(RepositoryError::LoanClosed("LN001".into()))
        );
    }

    #[actix_web::test]
    async fn repayment_requires_known_loan_and_positive_amount() {
        let repo = repo();
        assert_eq!(
            repo.record_repayment("LN404", RecordRepayment { amount_paise: 10 })
                .await,
            Err(RepositoryError::LoanNotFound("LN404".into()))
        );
        assert!(matches!(
            repo.record_repayment("LN001", RecordRepayment { amount_paise: 0 })
                .await,
            Err(RepositoryError::InvalidData(_))
        ));
    }

    #[actix_web::test]
    async fn diwali_fund_deposits_and_withdrawals() {
        let repo = repo();
        let balance = repo
            .deposit_to_fund("USR004", FundMovement { amount_paise: 5_000 })
            .await
            .unwrap();
        assert_eq!(balance, 30_000);

        let balance = repo
            .withdraw_from_fund("USR004", FundMovement { amount_paise: 10_000 })
            .await
            .unwrap();
        assert_eq!(balance, 20_000);

        assert_eq!(
            repo.withdraw_from_fund("USR004", FundMovement { amount_paise: 20_001 })
                .await,
            Err(RepositoryError::InsufficientFundBalance {
                requested_paise: 20_001,
                balance_paise: 20_000,
            })
        );
        assert_eq!(
            repo.vault_summary().await.unwrap().diwali_fund_total_paise,
            220_000
        );
    }

    #[actix_web::test]
    async fn oversized_deposit_is_rejected_without_change() {
        let repo = repo();

        assert_eq!(
            repo.deposit_to_fund("USR004", FundMovement { amount_paise: u64::MAX })
                .await,
            Err(RepositoryError::AmountTooLarge {
                amount_paise: u64::MAX,
                limit_paise: MAX_COMMAND_AMOUNT_PAISE,
            })
        );

        assert_eq!(repo.list_transactions().await.unwrap().len(), 12);
        let summary = repo.vault_summary().await.unwrap();
        assert_eq!(summary.cash_in_vault_paise, 13_743_143);
        assert_eq!(summary.diwali_fund_total_paise, 225_000);
    }

    #[actix_web::test]
    async fn loan_principal_above_ceiling_is_rejected() {
        let repo = repo();
        for principal in [u64::MAX, MAX_COMMAND_AMOUNT_PAISE + 1] {
            let result = repo
                .create_loan(CreateLoan {
                    user_id: "USR004".into(),
                    principal_paise: principal,
                    annual_rate_bps: 10_000,
                    tenure_months: 60,
                })
                .await;
            assert!(matches!(result, Err(RepositoryError::AmountTooLarge { .. })));
        }
        assert_eq!(repo.list_transactions().await.unwrap().len(), 12);
        assert_eq!(repo.vault_summary().await.unwrap().active_loans, 2);
    }

    #[actix_web::test]
    async fn commands_that_would_overflow_totals_change_nothing() {
        let mut seed = SeedDocument::bundled().unwrap();
        seed.opening_capital_paise = u64::MAX - 3_000_000;
        let repo = InMemoryLedgerRepository::new(seed);

        assert_eq!(
            repo.deposit_to_fund("USR004", FundMovement { amount_paise: 1_000_000 })
                .await,
            Err(RepositoryError::AmountOverflow)
        );
        assert_eq!(
            repo.record_repayment("LN001", RecordRepayment { amount_paise: 1_000_000 })
                .await,
            Err(RepositoryError::AmountOverflow)
        );

        assert_eq!(repo.list_transactions().await.unwrap().len(), 12);
        let profile = repo.get_user("USR001").await.unwrap().unwrap();
        assert_eq!(profile.loans[0].outstanding_paise, 2_062_800);
        assert_eq!(
            repo.get_user("USR004")
                .await
                .unwrap()
                .unwrap()
                .diwali_fund_balance_paise,
            25_000
        );
    }

    #[actix_web::test]
    async fn overflowing_seed_totals_fail_reads_instead_of_panicking() {
        let mut seed = SeedDocument::bundled().unwrap();
        seed.opening_capital_paise = u64::MAX;
        let repo = InMemoryLedgerRepository::new(seed);

        assert_eq!(repo.vault_summary().await, Err(RepositoryError::AmountOverflow));
        assert!(repo.list_users().await.is_ok());
    }

    #[test]
    fn next_id_follows_highest_existing() {
        assert_eq!(next_id("LN", ["LN001", "LN007", "X"].into_iter()), "LN008");
        assert_eq!(next_id("USR", std::iter::empty()), "USR001");
    }
}
