use keyring::Entry;
use tracing::{info, warn};

use crate::error::ArogyaError;

pub const KEYRING_SERVICE: &str = "arogya-gemini-api";
pub const KEYRING_USER: &str = "arogya";

fn entry(service: &str) -> Result<Entry, ArogyaError> {
    Entry::new(service, KEYRING_USER).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", service, e);
        ArogyaError::Keychain(e.to_string())
    })
}

pub fn set_api_key(key: &str) -> Result<(), ArogyaError> {
    store_secret(KEYRING_SERVICE, key)
}

pub fn get_api_key() -> Result<Option<String>, ArogyaError> {
    read_secret(KEYRING_SERVICE)
}

pub fn delete_api_key() -> Result<(), ArogyaError> {
    delete_secret(KEYRING_SERVICE)
}

/// Store `key` and read it back. A backend that accepts the write but keeps
/// nothing is reported as an error.
fn store_secret(service: &str, key: &str) -> Result<(), ArogyaError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ArogyaError::Keychain("API key is empty".to_string()));
    }
    info!("Setting API key for service: {}", service);
    entry(service)?.set_password(key).map_err(|e| {
        warn!("Failed to set password for {}: {}", service, e);
        ArogyaError::Keychain(e.to_string())
    })?;

    match read_secret(service)? {
        Some(stored) if stored == key => Ok(()),
        _ => {
            warn!("Keychain did not retain the API key for {}", service);
            Err(ArogyaError::Keychain(
                "The OS keychain did not retain the API key; set AROGYA_API_KEY instead"
                    .to_string(),
            ))
        }
    }
}

fn read_secret(service: &str) -> Result<Option<String>, ArogyaError> {
    info!("Getting API key for service: {}", service);
    match entry(service)?.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            info!("No API key found for service: {}", service);
            Ok(None)
        }
        Err(e) => {
            warn!("Failed to get password for {}: {}", service, e);
            Err(ArogyaError::Keychain(e.to_string()))
        }
    }
}

fn delete_secret(service: &str) -> Result<(), ArogyaError> {
    info!("Deleting API key for service: {}", service);
    match entry(service)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to delete credential for {}: {}", service, e);
            Err(ArogyaError::Keychain(e.to_string()))
        }
    }
}

/// `sk-...abcd` style preview so `key get` never prints the whole secret.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("AIzaSyExampleExample1234"), "AIza...1234");
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key(""), "");
    }

    #[test]
    fn test_set_rejects_empty_key() {
        assert!(matches!(set_api_key("   "), Err(ArogyaError::Keychain(_))));
    }

    #[test]
    fn test_stored_key_is_readable_or_set_fails() {
        let service = "arogya-gemini-api-test";
        let key = "AIzaSyStoredKeyRoundTrip1234";

        // Headless machines may have no keychain at all; what must never
        // happen is a successful store followed by an empty read.
        match store_secret(service, key) {
            Ok(()) => {
                assert_eq!(read_secret(service).unwrap(), Some(key.to_string()));
                delete_secret(service).unwrap();
                assert_eq!(read_secret(service).unwrap(), None);
            }
            Err(e) => assert!(matches!(e, ArogyaError::Keychain(_))),
        }
    }
}
