use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use warden::auth_info::OAuth2Info;
use warden::password::PasswordHasherRegistry;
use warden::providers::CommonSocialProfile;
use warden::providers::Credentials;
use warden::providers::CredentialsError;
use warden::providers::CredentialsProvider;
use warden::AuthInfoRegistry;
use warden::LoginInfo;

use crate::account::errors::AccountError;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::DisplayName;
use crate::account::models::EmailAddress;
use crate::account::models::SignUpCommand;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;

/// Domain service implementation for account operations.
///
/// Passwords and access tokens live in the auth-info stores, keyed by login;
/// the repository only links logins to accounts.
pub struct AccountService<AR>
where
    AR: AccountRepository,
{
    repository: Arc<AR>,
    auth_info: AuthInfoRegistry,
    hashers: PasswordHasherRegistry,
    credentials: CredentialsProvider,
}

impl<AR> AccountService<AR>
where
    AR: AccountRepository,
{
    pub fn new(
        repository: Arc<AR>,
        auth_info: AuthInfoRegistry,
        hashers: PasswordHasherRegistry,
    ) -> Self {
        Self {
            credentials: CredentialsProvider::new(auth_info.clone(), hashers.clone()),
            repository,
            auth_info,
            hashers,
        }
    }
}

#[async_trait]
impl<AR> AccountServicePort for AccountService<AR>
where
    AR: AccountRepository,
{
    async fn sign_up(&self, command: SignUpCommand) -> Result<Account, AccountError> {
        let login_info = CredentialsProvider::login_info(command.email.as_str());
        let password_info = self
            .hashers
            .current()
            .hash(command.password.as_str())
            .map_err(|e| AccountError::CredentialStorage(e.to_string()))?;

        let account = self
            .repository
            .create(Account {
                id: AccountId::new(),
                email: command.email,
                display_name: command.display_name,
                logins: vec![login_info.clone()],
                created_at: Utc::now(),
            })
            .await?;

        self.auth_info
            .add(&login_info, password_info.into())
            .await
            .map_err(|e| AccountError::CredentialStorage(e.to_string()))?;

        tracing::info!(account_id = %account.id, login = %login_info, "Account registered");
        Ok(account)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Account, AccountError> {
        let login_info = self
            .credentials
            .authenticate(credentials)
            .await
            .map_err(|e| match e {
                CredentialsError::IdentityNotFound { .. }
                | CredentialsError::InvalidPassword { .. } => {
                    tracing::info!(error = %e, "Credentials rejected");
                    AccountError::InvalidCredentials
                }
                _ => AccountError::CredentialStorage(e.to_string()),
            })?;

        self.get_account(&login_info).await
    }

    async fn sign_in_social(
        &self,
        profile: CommonSocialProfile,
        info: OAuth2Info,
    ) -> Result<Account, AccountError> {
        let login_info = profile.login_info.clone();

        let account = match self.repository.find_by_login(&login_info).await? {
            Some(account) => account,
            None => {
                let email = profile
                    .email
                    .clone()
                    .and_then(|email| EmailAddress::new(email).ok())
                    .ok_or_else(|| AccountError::IncompleteProfile(login_info.provider_id.clone()))?;

                let account = self
                    .repository
                    .create(Account {
                        id: AccountId::new(),
                        display_name: social_display_name(&profile, &email)?,
                        email,
                        logins: vec![login_info.clone()],
                        created_at: Utc::now(),
                    })
                    .await?;
                tracing::info!(account_id = %account.id, login = %login_info, "Account registered");
                account
            }
        };

        self.auth_info
            .save(&login_info, info.into())
            .await
            .map_err(|e| AccountError::CredentialStorage(e.to_string()))?;

        Ok(account)
    }

    async fn get_account(&self, login_info: &LoginInfo) -> Result<Account, AccountError> {
        self.repository
            .find_by_login(login_info)
            .await?
            .ok_or(AccountError::NotFound(login_info.to_string()))
    }
}

/// Full name, else first and last name, else the local part of the email.
fn social_display_name(
    profile: &CommonSocialProfile,
    email: &EmailAddress,
) -> Result<DisplayName, AccountError> {
    let joined = [profile.first_name.as_deref(), profile.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let candidates = profile.full_name.iter().cloned().chain(Some(joined));
    for candidate in candidates {
        if let Ok(name) = DisplayName::new(candidate) {
            return Ok(name);
        }
    }

    let local_part = email.as_str().split('@').next().unwrap_or_default();
    Ok(DisplayName::new(local_part.to_string())?)
}
