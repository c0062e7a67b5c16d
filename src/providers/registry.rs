//! The adapter table. Every [`ProviderIdentifier`] has exactly one adapter, looked
//! up by the provider id a catalog model names.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::str::FromStr;
use strum::IntoEnumIterator;

use super::coze::CozeAdapter;
use super::deepseek::DeepSeekAdapter;
use super::google::GoogleAdapter;
use super::{ProviderAdapter, ProviderIdentifier};

fn adapter_for(id: ProviderIdentifier) -> Box<dyn ProviderAdapter> {
    match id {
        ProviderIdentifier::Google => Box::new(GoogleAdapter::new()),
        ProviderIdentifier::DeepSeek => Box::new(DeepSeekAdapter::new()),
        ProviderIdentifier::Coze => Box::new(CozeAdapter::hosted()),
        ProviderIdentifier::CozeLocal => Box::new(CozeAdapter::local()),
    }
}

lazy_static! {
    static ref ADAPTERS: HashMap<ProviderIdentifier, Box<dyn ProviderAdapter>> =
        ProviderIdentifier::iter()
            .map(|id| (id, adapter_for(id)))
            .collect();
}

/// The adapter registered for `provider_id`, or `None` if the provider has none.
pub fn lookup(provider_id: &str) -> Option<&'static dyn ProviderAdapter> {
    let id = ProviderIdentifier::from_str(provider_id).ok()?;

    ADAPTERS.get(&id).map(|adapter| adapter.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_provider_has_an_adapter() {
        for id in ProviderIdentifier::iter() {
            let adapter = lookup(&id.to_string()).expect("adapter should be registered");
            assert_eq!(adapter.id(), id);
        }

        assert!(lookup("acme").is_none());
        assert!(lookup("").is_none());
    }
}
