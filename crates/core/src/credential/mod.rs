//! Social credentials bound to a user.
//!
//! Per-provider details form a tagged union validated once at the boundary, so
//! the rest of the system only ever sees well-formed shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{CredentialId, UserId};

use crate::ledger::LedgerError;

/// External social provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Twitter / X.
    Twitter,
    /// Discord.
    Discord,
    /// Telegram.
    Telegram,
    /// GitHub.
    Github,
}

impl Provider {
    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Discord => "discord",
            Self::Telegram => "telegram",
            Self::Github => "github",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(Self::Twitter),
            "discord" => Ok(Self::Discord),
            "telegram" => Ok(Self::Telegram),
            "github" => Ok(Self::Github),
            other => Err(LedgerError::Validation(format!(
                "unknown social provider '{other}'"
            ))),
        }
    }
}

/// Provider-specific account details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderDetails {
    /// Twitter account.
    Twitter {
        /// Handle without the leading `@`.
        handle: String,
        /// Numeric account id as issued by the provider.
        user_id: String,
    },
    /// Discord account.
    Discord {
        /// Username.
        username: String,
        /// Snowflake user id.
        user_id: String,
        /// Guild the binding was made through.
        guild_id: Option<String>,
    },
    /// Telegram account.
    Telegram {
        /// Username.
        username: String,
        /// Chat id.
        chat_id: i64,
    },
    /// GitHub account.
    Github {
        /// Login name.
        login: String,
        /// Numeric user id.
        user_id: i64,
    },
}

impl ProviderDetails {
    /// The provider of these details.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            Self::Twitter { .. } => Provider::Twitter,
            Self::Discord { .. } => Provider::Discord,
            Self::Telegram { .. } => Provider::Telegram,
            Self::Github { .. } => Provider::Github,
        }
    }

    /// Checks the shape of the details.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the first malformed field.
    pub fn validate(&self) -> Result<(), LedgerError> {
        fn required(field: &str, value: &str) -> Result<(), LedgerError> {
            if value.trim().is_empty() {
                return Err(LedgerError::Validation(format!("{field} is required")));
            }
            Ok(())
        }

        match self {
            Self::Twitter { handle, user_id } => {
                required("twitter handle", handle)?;
                if handle.starts_with('@') {
                    return Err(LedgerError::Validation(
                        "twitter handle must not start with '@'".to_string(),
                    ));
                }
                required("twitter user id", user_id)?;
                if !user_id.chars().all(|c| c.is_ascii_digit()) {
                    return Err(LedgerError::Validation(
                        "twitter user id must be numeric".to_string(),
                    ));
                }
            }
            Self::Discord {
                username, user_id, ..
            } => {
                required("discord username", username)?;
                required("discord user id", user_id)?;
            }
            Self::Telegram { username, chat_id } => {
                required("telegram username", username)?;
                if *chat_id == 0 {
                    return Err(LedgerError::Validation(
                        "telegram chat id must be non-zero".to_string(),
                    ));
                }
            }
            Self::Github { login, user_id } => {
                required("github login", login)?;
                if *user_id <= 0 {
                    return Err(LedgerError::Validation(
                        "github user id must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A social account bound to a platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialCredential {
    /// Credential identifier.
    pub id: CredentialId,
    /// The owning user.
    pub owner_id: UserId,
    /// Provider details.
    pub details: ProviderDetails,
    /// Last time the credential was used for attribution.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the credential was bound.
    pub created_at: DateTime<Utc>,
    /// When the row was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl SocialCredential {
    /// The provider of this credential.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.details.provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_serialize_with_provider_tag() {
        let details = ProviderDetails::Github {
            login: "octocat".into(),
            user_id: 583_231,
        };
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(
            value,
            json!({"provider": "github", "login": "octocat", "user_id": 583_231})
        );
        let back: ProviderDetails = serde_json::from_value(value).unwrap();
        assert_eq!(back.provider(), Provider::Github);
    }

    #[test]
    fn test_unknown_tag_fails_to_parse() {
        let value = json!({"provider": "myspace", "name": "tom"});
        assert!(serde_json::from_value::<ProviderDetails>(value).is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_details() {
        let bad = [
            ProviderDetails::Twitter {
                handle: "@alice".into(),
                user_id: "1".into(),
            },
            ProviderDetails::Twitter {
                handle: "alice".into(),
                user_id: "abc".into(),
            },
            ProviderDetails::Discord {
                username: " ".into(),
                user_id: "1".into(),
                guild_id: None,
            },
            ProviderDetails::Telegram {
                username: "bob".into(),
                chat_id: 0,
            },
            ProviderDetails::Github {
                login: "carol".into(),
                user_id: -1,
            },
        ];
        for details in bad {
            assert!(
                matches!(details.validate(), Err(LedgerError::Validation(_))),
                "{details:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_details() {
        let details = ProviderDetails::Telegram {
            username: "dave".into(),
            chat_id: -100_123,
        };
        details.validate().unwrap();
    }

    #[test]
    fn test_provider_parse() {
        use std::str::FromStr;
        assert_eq!(Provider::from_str("X").unwrap(), Provider::Twitter);
        assert_eq!(Provider::from_str("discord").unwrap(), Provider::Discord);
        assert!(Provider::from_str("myspace").is_err());
    }
}
