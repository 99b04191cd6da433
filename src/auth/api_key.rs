//! API-key resolution: hashes the bearer token from `Authorization: TOKEN
//! <api_key>` and looks it up against `users.api_key_hash`.

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct ResolvedUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn resolve(pool: &PgPool, api_key: &str) -> Option<ResolvedUser> {
    let hash = hash_api_key(api_key);
    let row: Option<(Uuid, bool)> =
        sqlx::query_as("SELECT id, is_admin FROM users WHERE api_key_hash = $1")
            .bind(&hash)
            .fetch_optional(pool)
            .await
            .ok()
            .flatten();

    row.map(|(user_id, is_admin)| ResolvedUser { user_id, is_admin })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_not_the_plaintext() {
        let h1 = hash_api_key("sk_live_abc123");
        let h2 = hash_api_key("sk_live_abc123");
        assert_eq!(h1, h2);
        assert_ne!(h1, "sk_live_abc123");
    }
}
