use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use common::env_config::TokenConfig;
use db::PendingAccount;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_DOMAIN: &[u8] = b"pending-account-verification";

/// Mints and checks email verification tokens.
///
/// A token is an HMAC over the account's id, creation time, email key and
/// confirmation flag. Nothing is stored: confirming the account changes the
/// MAC input, which retires every token minted before.
#[derive(Clone)]
pub struct TokenService {
    mac: HmacSha256,
    ttl: Option<Duration>,
}

impl TokenService {
    /// `ttl` of `None` makes tokens valid until the account is confirmed.
    pub fn new(secret: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length"),
            ttl,
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        let ttl = (config.ttl_hours > 0).then(|| Duration::hours(config.ttl_hours));
        Self::new(config.secret.as_bytes(), ttl)
    }

    /// Same account state, same token. Resending a link keeps older links working.
    pub fn mint(&self, account: &PendingAccount) -> String {
        let tag = self.keyed(account).finalize().into_bytes();
        URL_SAFE_NO_PAD.encode(tag)
    }

    pub fn verify(&self, account: &PendingAccount, token: &str) -> bool {
        self.verify_at(account, token, Utc::now())
    }

    /// Checks `token` against the current state of `account` as of `now`.
    pub fn verify_at(&self, account: &PendingAccount, token: &str, now: DateTime<Utc>) -> bool {
        if account.confirmed {
            return false;
        }

        if let Some(ttl) = self.ttl {
            if now - account.created_at > ttl {
                return false;
            }
        }

        let Ok(tag) = URL_SAFE_NO_PAD.decode(token) else {
            return false;
        };

        // constant-time comparison
        self.keyed(account).verify_slice(&tag).is_ok()
    }

    fn keyed(&self, account: &PendingAccount) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(TOKEN_DOMAIN);
        mac.update(account.id.as_bytes());
        mac.update(&account.created_at.timestamp_micros().to_be_bytes());
        mac.update(&[account.confirmed as u8]);
        // variable-length field last
        mac.update(account.email_key.as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use chrono::SubsecRound;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    fn account() -> PendingAccount {
        PendingAccount {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            email_key: "a@x.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            postal_code: "60601".to_string(),
            created_at: Utc::now().trunc_subsecs(6),
            confirmed: false,
            confirmed_at: None,
        }
    }

    fn service() -> TokenService {
        TokenService::new(b"test-secret", Some(Duration::hours(72)))
    }

    #[test]
    fn minting_is_deterministic() {
        let account = account();
        assert_eq!(service().mint(&account), service().mint(&account));
    }

    #[test]
    fn token_is_url_safe() {
        let token = service().mint(&account());
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn valid_until_confirmed() {
        let service = service();
        let mut account = account();
        let token = service.mint(&account);

        assert!(service.verify(&account, &token));

        account.confirmed = true;
        account.confirmed_at = Some(Utc::now());
        assert!(!service.verify(&account, &token));
    }

    #[test]
    fn bound_to_its_account() {
        let service = service();
        let first = account();
        let second = account();

        assert!(!service.verify(&second, &service.mint(&first)));
    }

    #[test]
    fn different_secret_rejects() {
        let account = account();
        let other = TokenService::new(b"another-secret", None);
        assert!(!service().verify(&account, &other.mint(&account)));
    }

    #[test]
    fn garbage_and_tampered_tokens_rejected() {
        let service = service();
        let account = account();
        let mut token = service.mint(&account);

        assert!(!service.verify(&account, ""));
        assert!(!service.verify(&account, "not base64 !!"));

        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });
        assert!(!service.verify(&account, &token));
    }

    #[test]
    fn expires_after_ttl() {
        let service = service();
        let account = account();
        let token = service.mint(&account);

        let just_inside = account.created_at + Duration::hours(72);
        let just_outside = just_inside + Duration::seconds(1);

        assert!(service.verify_at(&account, &token, just_inside));
        assert!(!service.verify_at(&account, &token, just_outside));
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        let service = TokenService::from_config(&TokenConfig {
            secret: "test-secret".to_string(),
            ttl_hours: 0,
        });
        let account = account();
        let token = service.mint(&account);

        let much_later = account.created_at + Duration::days(3650);
        assert!(service.verify_at(&account, &token, much_later));
    }
}
