use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "travel-admin";

/// App secrets kept in the OS keychain, keyed by app id.
pub struct CredentialStore;

impl CredentialStore {
    /// Store the app secret for an app id in the OS keychain
    pub fn store(app_id: &str, app_secret: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, app_id).context("Failed to create keyring entry")?;
        entry
            .set_password(app_secret)
            .context("Failed to store app secret in keychain")?;
        Ok(())
    }

    /// Retrieve the app secret for an app id from the OS keychain
    pub fn get_secret(app_id: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, app_id).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve app secret from keychain")
    }

    /// Delete the stored secret for an app id
    pub fn delete(app_id: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, app_id).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete app secret from keychain")?;
        Ok(())
    }
}
