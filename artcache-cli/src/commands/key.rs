//! Key command - print the cache key for one or more source URLs.

use artcache::key::{derive_composite_key, derive_key, CacheKey};

use crate::error::CliError;

/// Derives the key the service would use for `urls`.
///
/// One URL gives a single-source key; several give the order-independent
/// composite key.
pub fn key_for(urls: &[String]) -> Result<CacheKey, CliError> {
    match urls {
        [] => Err(CliError::Config("at least one URL is required".to_string())),
        [single] => Ok(derive_key(single)),
        many => Ok(derive_composite_key(many)),
    }
}

/// Run the key command.
pub fn run(urls: Vec<String>) -> Result<(), CliError> {
    println!("{}", key_for(&urls)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_composite_keys() {
        let a = "https://is1.mzstatic.com/a.jpg".to_string();
        let b = "https://is1.mzstatic.com/b.jpg".to_string();

        assert_eq!(key_for(&[a.clone()]).unwrap(), derive_key(&a));
        assert_eq!(
            key_for(&[a.clone(), b.clone()]).unwrap(),
            key_for(&[b, a]).unwrap()
        );
        assert!(key_for(&[]).is_err());
    }
}
