use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A token closer than this to its expiration is replaced instead of handed out again.
const TOKEN_REFRESH_MARGIN: i64 = 60;

fn generate_token() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Normalizes a username or email as entered. Blank input gives `None`.
pub fn identity_field(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub token: Option<String>,
    pub token_expiration: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        User {
            username,
            email,
            password_hash,
            token: None,
            token_expiration: None,
        }
    }

    /// Returns the current token, issuing a new one valid for `lifetime` if there is
    /// none or it is about to expire.
    pub fn get_token(&mut self, now: DateTime<Utc>, lifetime: Duration) -> String {
        if let (Some(token), Some(expiration)) = (&self.token, self.token_expiration) {
            if expiration > now + Duration::seconds(TOKEN_REFRESH_MARGIN) {
                return token.clone();
            }
        }
        let token = generate_token();
        self.token = Some(token.clone());
        self.token_expiration = Some(now + lifetime);
        token
    }

    pub fn revoke_token(&mut self, now: DateTime<Utc>) {
        self.token_expiration = Some(now - Duration::seconds(1));
    }

    pub fn token_valid(&self, now: DateTime<Utc>) -> bool {
        matches!(self.token_expiration, Some(expiration) if expiration >= now)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Movie {
    pub name: String,
    pub year: i32,
    pub oscars: u32,
    pub user_id: u64,
}
