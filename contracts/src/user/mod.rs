pub use login::*;
pub use register::*;

mod login;
mod register;

/// Lowercases `username` and strips everything that is not `[a-z0-9]`.
///
/// The result is both the display identity of a user and the name of their
/// storage directory, so it can never contain path separators or dots.
pub fn normalize_username(username: &str) -> String {
    username
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TokenResponse {
    pub token: String,
}

impl TokenResponse {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_username_test() {
        assert_eq!(normalize_username("Alice!1"), "alice1");
        assert_eq!(normalize_username("  Bob_the.Builder "), "bobthebuilder");
        assert_eq!(normalize_username("../../etc/passwd"), "etcpasswd");
        assert_eq!(normalize_username("!!!"), "");
        assert_eq!(normalize_username("ÅSA42"), "sa42");
    }
}
