use serde::Deserialize;
use serde_yaml;
use shared::ledger::{Loan, LoanStatus, Transaction, User};
use std::collections::HashSet;
use std::path::Path;

const BUNDLED_SEED: &str = include_str!("../../../config/seed.yaml");

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse seed data: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Inconsistent seed data: {0}")]
    Inconsistent(String),
}

/// Initial contents of the in-memory ledger.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedDocument {
    pub opening_capital_paise: u64,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl SeedDocument {
    pub fn bundled() -> Result<Self, SeedError> {
        Self::from_yaml(BUNDLED_SEED)
    }

    pub fn load(path: Option<&Path>) -> Result<Self, SeedError> {
        match path {
            Some(path) => {
                let seed_str = std::fs::read_to_string(path)?;
                Self::from_yaml(&seed_str)
            }
            None => Self::bundled(),
        }
    }

    pub fn from_yaml(seed_str: &str) -> Result<Self, SeedError> {
        let seed: SeedDocument = serde_yaml::from_str(seed_str)?;
        seed.check_references()?;
        Ok(seed)
    }

    fn check_references(&self) -> Result<(), SeedError> {
        let mut user_ids = HashSet::new();
        for user in &self.users {
            if !user_ids.insert(user.id.as_str()) {
                return Err(SeedError::Inconsistent(format!(
                    "duplicate user id {}",
                    user.id
                )));
            }
        }

        let mut loan_ids = HashSet::new();
        for loan in &self.loans {
            if !user_ids.contains(loan.user_id.as_str()) {
                return Err(SeedError::Inconsistent(format!(
                    "loan {} belongs to unknown user {}",
                    loan.id, loan.user_id
                )));
            }
            if loan.status == LoanStatus::Closed && loan.outstanding_paise > 0 {
                return Err(SeedError::Inconsistent(format!(
                    "closed loan {} still has an outstanding balance",
                    loan.id
                )));
            }
            if !loan_ids.insert(loan.id.as_str()) {
                return Err(SeedError::Inconsistent(format!(
                    "duplicate loan id {}",
                    loan.id
                )));
            }
        }

        for tx in &self.transactions {
            if !user_ids.contains(tx.user_id.as_str()) {
                return Err(SeedError::Inconsistent(format!(
                    "transaction {} belongs to unknown user {}",
                    tx.id, tx.user_id
                )));
            }
            if let Some(loan_id) = &tx.loan_id {
                if !loan_ids.contains(loan_id.as_str()) {
                    return Err(SeedError::Inconsistent(format!(
                        "transaction {} references unknown loan {}",
                        tx.id, loan_id
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_seed_is_consistent() {
        let seed = SeedDocument::bundled().unwrap();
        assert!(seed.opening_capital_paise > 0);
        assert!(!seed.users.is_empty());
        assert!(!seed.loans.is_empty());
        assert!(!seed.transactions.is_empty());
    }

    #[test]
    fn rejects_loans_for_unknown_users() {
        let yaml = r#"
openingCapitalPaise: 1000
users: []
loans:
  - id: LN001
    userId: USR404
    principalPaise: 100
    annualRateBps: 0
    tenureMonths: 1
    emiPaise: 100
    outstandingPaise: 100
    status: ACTIVE
    issuedOn: 2024-01-01
"#;
        let err = SeedDocument::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, SeedError::Inconsistent(msg) if msg.contains("USR404")));
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(matches!(
            SeedDocument::from_yaml("openingCapitalPaise: [not a number"),
            Err(SeedError::Yaml(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SeedDocument::load(Some(Path::new("/nonexistent/seed.yaml"))).unwrap_err();
        assert!(matches!(err, SeedError::Io(_)));
    }
}
