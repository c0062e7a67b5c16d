//! Concrete identifiers for the providers which have an adapter.

use strum_macros;

/// The `ProviderIdentifier` is a unique per-provider identifier. It is used to
/// differentiate providers at runtime in code which is generic over different
/// providers.
///
/// The `to_string` and `FromStr` forms match the provider ids used by the
/// catalog and the settings store, and should remain stable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
pub enum ProviderIdentifier {
    #[strum(serialize = "google")]
    Google,
    #[strum(serialize = "deepseek")]
    DeepSeek,
    #[strum(serialize = "coze")]
    Coze,
    #[strum(serialize = "coze-local")]
    CozeLocal,
}

impl ProviderIdentifier {
    /// The shortest secret accepted for this provider, if it takes one.
    pub fn min_secret_len(&self) -> Option<usize> {
        match self {
            ProviderIdentifier::Google => Some(20),
            ProviderIdentifier::DeepSeek | ProviderIdentifier::Coze => Some(10),
            ProviderIdentifier::CozeLocal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_stable_names() {
        for id in ProviderIdentifier::iter() {
            assert_eq!(ProviderIdentifier::from_str(&id.to_string()).unwrap(), id);
        }

        assert_eq!(ProviderIdentifier::CozeLocal.to_string(), "coze-local");
        assert!(ProviderIdentifier::from_str("acme").is_err());
    }
}
