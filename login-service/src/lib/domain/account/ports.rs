use async_trait::async_trait;
use warden::auth_info::OAuth2Info;
use warden::providers::CommonSocialProfile;
use warden::providers::Credentials;
use warden::LoginInfo;

use crate::account::errors::AccountError;
use crate::account::models::Account;
use crate::account::models::SignUpCommand;

/// Port for account domain service operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register an account that signs in with email and password.
    ///
    /// The password is hashed with the current hasher and stored as the
    /// credentials login of the account.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `CredentialStorage` - Password could not be hashed or stored
    async fn sign_up(&self, command: SignUpCommand) -> Result<Account, AccountError>;

    /// Verify email and password.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password
    /// * `CredentialStorage` - Password store failed
    async fn sign_in(&self, credentials: &Credentials) -> Result<Account, AccountError>;

    /// Find or register the account behind a social login and remember its
    /// access token.
    ///
    /// # Errors
    /// * `IncompleteProfile` - A new account is needed but the profile has no email
    /// * `EmailAlreadyExists` - The profile email belongs to another account
    /// * `CredentialStorage` - Access token could not be stored
    async fn sign_in_social(
        &self,
        profile: CommonSocialProfile,
        info: OAuth2Info,
    ) -> Result<Account, AccountError>;

    /// Retrieve the account a login leads to.
    ///
    /// # Errors
    /// * `NotFound` - No account has this login
    async fn get_account(&self, login_info: &LoginInfo) -> Result<Account, AccountError>;
}

/// Persistence operations for account aggregate.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Persist new account to storage.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    async fn create(&self, account: Account) -> Result<Account, AccountError>;

    /// Retrieve the account owning a login.
    async fn find_by_login(&self, login_info: &LoginInfo) -> Result<Option<Account>, AccountError>;
}
