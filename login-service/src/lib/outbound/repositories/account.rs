use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden::LoginInfo;

use crate::account::errors::AccountError;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::ports::AccountRepository;

/// Process-local account store.
///
/// Accounts are lost on restart, which suits a single node and tests.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, AccountError> {
        let mut accounts = self.accounts.write().await;

        if accounts.values().any(|existing| existing.email == account.email) {
            return Err(AccountError::EmailAlreadyExists(account.email.to_string()));
        }

        accounts.insert(account.id, account.clone());
        tracing::debug!(account_id = %account.id, "Account stored");
        Ok(account)
    }

    async fn find_by_login(&self, login_info: &LoginInfo) -> Result<Option<Account>, AccountError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.has_login(login_info))
            .cloned())
    }
}
