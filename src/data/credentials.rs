//! API credential lookup.
//!
//! The pipeline never embeds key material: it asks a `CredentialSource` for a
//! secret by *name*, and the name itself comes from configuration
//! (`source.credential_env`).

use crate::error::AppError;

pub trait CredentialSource {
    fn get_credential(&self, name: &str) -> Result<String, AppError>;
}

/// Reads credentials from the process environment, after loading `.env`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get_credential(&self, name: &str) -> Result<String, AppError> {
        dotenvy::dotenv().ok();
        let value = std::env::var(name)
            .map_err(|_| AppError::config(format!("Missing {name} in environment (.env).")))?;
        if value.trim().is_empty() {
            return Err(AppError::config(format!("{name} is set but empty.")));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_names_the_variable() {
        let err = EnvCredentials
            .get_credential("NIV_ENGINE_TEST_UNSET_CREDENTIAL")
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("NIV_ENGINE_TEST_UNSET_CREDENTIAL"));
    }
}
