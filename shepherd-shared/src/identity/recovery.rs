//! Password recovery links
//!
//! A recovery email links back to the application with the session tokens in
//! the URL fragment:
//!
//! ```text
//! https://app.example.org/reset#access_token=eyJ...&refresh_token=abc&type=recovery
//! ```
//!
//! The fragment never reaches a server, so the client hands it over
//! explicitly and [`parse_recovery_fragment`] extracts the tokens.

use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use super::IdentityError;

/// Tokens carried by a recovery link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryTokens {
    pub access_token: String,

    pub refresh_token: Option<String>,
}

/// Extracts recovery tokens from a full link, a `#...` fragment, or the bare
/// fragment text
///
/// # Errors
///
/// Returns [`IdentityError::InvalidRecoveryLink`] when the link carries an
/// error from the provider, is not of type `recovery`, or has no access token.
pub fn parse_recovery_fragment(input: &str) -> Result<RecoveryTokens, IdentityError> {
    let input = input.trim();
    let fragment = match Url::parse(input) {
        Ok(url) => url.fragment().unwrap_or_default().to_string(),
        Err(_) => input.trim_start_matches('#').to_string(),
    };

    let mut access_token = None;
    let mut refresh_token = None;
    let mut link_type = None;
    let mut error_description = None;

    for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" if !value.is_empty() => access_token = Some(value.into_owned()),
            "refresh_token" if !value.is_empty() => refresh_token = Some(value.into_owned()),
            "type" => link_type = Some(value.into_owned()),
            "error_description" => error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(description) = error_description {
        return Err(IdentityError::InvalidRecoveryLink(description));
    }

    if link_type.as_deref() != Some("recovery") {
        return Err(IdentityError::InvalidRecoveryLink(
            "link is not a password recovery link".to_string(),
        ));
    }

    let access_token = access_token.ok_or_else(|| {
        IdentityError::InvalidRecoveryLink("missing access token".to_string())
    })?;

    Ok(RecoveryTokens {
        access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_link() {
        let tokens = parse_recovery_fragment(
            "https://app.example.org/reset#access_token=abc.def&refresh_token=r1&expires_in=3600&type=recovery",
        )
        .unwrap();

        assert_eq!(tokens.access_token, "abc.def");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_parse_bare_fragment() {
        let tokens = parse_recovery_fragment("#type=recovery&access_token=tok").unwrap();
        assert_eq!(tokens.access_token, "tok");
        assert!(tokens.refresh_token.is_none());

        let tokens = parse_recovery_fragment("access_token=tok&type=recovery").unwrap();
        assert_eq!(tokens.access_token, "tok");
    }

    #[test]
    fn test_rejects_other_link_types() {
        let result = parse_recovery_fragment("#access_token=tok&type=signup");
        assert!(matches!(result, Err(IdentityError::InvalidRecoveryLink(_))));
    }

    #[test]
    fn test_rejects_missing_token() {
        let result = parse_recovery_fragment("#type=recovery&access_token=");
        assert!(matches!(result, Err(IdentityError::InvalidRecoveryLink(_))));
    }

    #[test]
    fn test_surfaces_provider_error() {
        let result = parse_recovery_fragment(
            "https://app.example.org/reset#error=access_denied&error_description=Email+link+is+invalid+or+has+expired",
        );

        match result {
            Err(IdentityError::InvalidRecoveryLink(msg)) => {
                assert_eq!(msg, "Email link is invalid or has expired")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
