//! API credential pools with rotation for rate-limit spreading.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;

use crate::{ProviderError, ProviderId};

#[derive(PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// One API key plus its display-safe form.
pub struct Credential {
    secret: SecretString,
    masked: String,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = SecretString::new(secret);
        let masked = mask_secret(secret.expose());
        Self { secret, masked }
    }

    pub fn expose(&self) -> &str {
        self.secret.expose()
    }

    pub fn masked(&self) -> &str {
        &self.masked
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&self.masked).finish()
    }
}

fn mask_secret(secret: &str) -> String {
    let chars = secret.chars().collect::<Vec<_>>();
    if chars.len() <= 8 {
        return "***".to_string();
    }

    let head = chars[..4].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}...{tail}")
}

/// Splits a key list such as `"k1, k2; k3"` into trimmed, non-empty keys.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ordered credentials for one provider with a rotation cursor.
///
/// The pool is never empty: construction fails with
/// [`ProviderErrorKind::PoolEmpty`](crate::ProviderErrorKind::PoolEmpty)
/// instead. The cursor only moves through [`CredentialPool::rotate`].
///
/// ```rust
/// use dprovider::{CredentialPool, ProviderErrorKind, ProviderId};
///
/// let pool = CredentialPool::with_cursor(ProviderId::Zhipu, ["a-key-0001", "b-key-0002"], 1)
///     .expect("pool should build");
/// assert_eq!(pool.current().expose(), "b-key-0002");
/// assert!(pool.rotate());
/// assert_eq!(pool.current().expose(), "a-key-0001");
///
/// let empty = CredentialPool::new(ProviderId::Zhipu, Vec::<String>::new());
/// assert_eq!(empty.err().map(|err| err.kind), Some(ProviderErrorKind::PoolEmpty));
/// ```
#[derive(Debug)]
pub struct CredentialPool {
    provider: ProviderId,
    credentials: Vec<Arc<Credential>>,
    cursor: Mutex<usize>,
}

impl CredentialPool {
    /// Builds a pool whose starting cursor is chosen at random, so independent
    /// processes sharing one key list do not all start on the first key.
    pub fn new<I, S>(provider: ProviderId, keys: I) -> Result<Self, ProviderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials = collect_unique(keys);
        if credentials.is_empty() {
            return Err(empty_pool(provider));
        }

        let cursor = rand::thread_rng().gen_range(0..credentials.len());
        Ok(Self::from_parts(provider, credentials, cursor))
    }

    pub fn with_cursor<I, S>(provider: ProviderId, keys: I, cursor: usize) -> Result<Self, ProviderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials = collect_unique(keys);
        if credentials.is_empty() {
            return Err(empty_pool(provider));
        }

        let cursor = cursor % credentials.len();
        Ok(Self::from_parts(provider, credentials, cursor))
    }

    fn from_parts(provider: ProviderId, credentials: Vec<Arc<Credential>>, cursor: usize) -> Self {
        Self {
            provider,
            credentials,
            cursor: Mutex::new(cursor),
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn cursor(&self) -> usize {
        *self.cursor_guard()
    }

    pub fn current(&self) -> Arc<Credential> {
        let cursor = self.cursor_guard();
        Arc::clone(&self.credentials[*cursor])
    }

    /// Advances to the next credential. Returns `false` without moving when
    /// the pool holds a single credential.
    pub fn rotate(&self) -> bool {
        if self.credentials.len() <= 1 {
            return false;
        }

        let mut cursor = self.cursor_guard();
        *cursor = (*cursor + 1) % self.credentials.len();
        true
    }

    fn cursor_guard(&self) -> MutexGuard<'_, usize> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn collect_unique<I, S>(keys: I) -> Vec<Arc<Credential>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = Vec::<String>::new();
    for key in keys {
        let key = key.into().trim().to_string();
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
    }

    seen.into_iter()
        .map(|key| Arc::new(Credential::new(key)))
        .collect()
}

fn empty_pool(provider: ProviderId) -> ProviderError {
    ProviderError::pool_empty(format!(
        "no API credentials configured for {}",
        provider.display_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn single_credential_pool_never_rotates() {
        let pool = CredentialPool::new(ProviderId::Gemini, ["only-key-123"]).expect("pool");
        let before = pool.current().expose().to_string();

        for _ in 0..5 {
            assert!(!pool.rotate());
            assert_eq!(pool.current().expose(), before);
        }
    }

    #[test]
    fn rotating_len_times_returns_to_start() {
        let keys = ["key-aaaa-0001", "key-bbbb-0002", "key-cccc-0003"];
        let pool = CredentialPool::new(ProviderId::Gemini, keys).expect("pool");
        let start = pool.current().expose().to_string();

        let mut visited = Vec::new();
        for _ in 0..pool.len() {
            assert!(pool.rotate());
            visited.push(pool.current().expose().to_string());
        }

        assert_eq!(pool.current().expose(), start);
        visited.sort();
        assert_eq!(visited, keys.map(str::to_string).to_vec());
    }

    #[test]
    fn random_start_stays_in_range() {
        for _ in 0..32 {
            let pool = CredentialPool::new(ProviderId::Gemini, ["a1", "b2", "c3", "d4"]).expect("pool");
            assert!(pool.cursor() < pool.len());
        }
    }

    #[test]
    fn duplicates_and_blanks_are_dropped() {
        let pool = CredentialPool::with_cursor(
            ProviderId::DeepSeek,
            ["dup-key-0001", " ", "dup-key-0001", "other-key-02"],
            0,
        )
        .expect("pool");

        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn blank_only_pool_is_fatal() {
        let error = CredentialPool::new(ProviderId::Zhipu, ["", "  "]).expect_err("empty");
        assert_eq!(error.kind, ProviderErrorKind::PoolEmpty);
        assert!(error.message.contains("Zhipu GLM"));
    }

    #[test]
    fn masked_form_hides_middle_of_secret() {
        assert_eq!(Credential::new("AIzaSyABCDEFGH1234").masked(), "AIza...1234");
        assert_eq!(Credential::new("short").masked(), "***");
        assert_eq!(format!("{:?}", Credential::new("short")), "Credential(\"***\")");
    }

    #[test]
    fn key_lists_split_on_commas_and_semicolons() {
        assert_eq!(
            parse_key_list(" k1, k2;k3 ,, ;"),
            vec!["k1".to_string(), "k2".to_string(), "k3".to_string()]
        );
        assert!(parse_key_list("").is_empty());
    }
}
