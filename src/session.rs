//! Session context injected into the feed and the write paths.
//!
//! Authentication happens elsewhere; this crate only receives the result
//! (who is signed in, the bearer token to forward, and the display language).
use secrecy::SecretString;
use uuid::Uuid;

/// Display language for bilingual reference names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Thai,
    English,
}

impl Language {
    /// Parse a language code. Anything other than `th` falls back to English,
    /// matching how the reference tables only carry `name_th` and `name_en`.
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("th") {
            Language::Thai
        } else {
            Language::English
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Thai => "th",
            Language::English => "en",
        }
    }
}

/// Snapshot of the signed-in session.
///
/// Custom Debug impl masks `access_token`.
#[derive(Clone, Default)]
pub struct SessionContext {
    pub user_id: Option<Uuid>,
    pub access_token: Option<SecretString>,
    pub language: Language,
}

impl SessionContext {
    /// Anonymous session: reads only, bearer falls back to the anon key.
    pub fn anonymous(language: Language) -> Self {
        Self {
            user_id: None,
            access_token: None,
            language,
        }
    }

    pub fn signed_in(user_id: Uuid, access_token: SecretString, language: Language) -> Self {
        Self {
            user_id: Some(user_id),
            access_token: Some(access_token),
            language,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("user_id", &self.user_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("language", &self.language)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_code() {
        assert_eq!(Language::from_code("th"), Language::Thai);
        assert_eq!(Language::from_code(" TH "), Language::Thai);
        assert_eq!(Language::from_code("en"), Language::English);
        assert_eq!(Language::from_code("de"), Language::English);
    }

    #[test]
    fn test_debug_masks_token() {
        let session = SessionContext::signed_in(
            Uuid::nil(),
            SecretString::from("very-secret-token"),
            Language::English,
        );
        let output = format!("{:?}", session);
        assert!(!output.contains("very-secret-token"));
        assert!(output.contains("[REDACTED]"));
    }

    #[test]
    fn test_anonymous_is_not_signed_in() {
        assert!(!SessionContext::anonymous(Language::Thai).is_signed_in());
    }
}
