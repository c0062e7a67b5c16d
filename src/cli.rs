use std::io::{self, IsTerminal};
use std::sync::Arc;

use switchboard::catalog::Catalog;
use switchboard::config::Config;
use switchboard::providers::ReqwestTransport;
use switchboard::store::FileStore;
use switchboard::{Dispatcher, Settings};

use crate::{die, RequestedColorMode};

pub(crate) mod chat;
pub(crate) mod list;
pub(crate) mod settings;

#[derive(Clone, Copy, strum_macros::Display)]
pub(crate) enum ColorMode {
    On,
    Off,
}

impl ColorMode {
    /// Returns whether ANSI color should be used
    /// If the user has specified a preference, this is honored. This preference
    /// can be specified through the command line or the "NO_COLOR" environment
    /// variable. If the user hasn't stated a preference, color is enabled if
    /// standard error is a terminal.
    pub(crate) fn resolve_auto(cm: RequestedColorMode) -> ColorMode {
        match cm {
            RequestedColorMode::Auto => {
                let disable_color =
                    std::env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal();

                if disable_color {
                    ColorMode::Off
                } else {
                    ColorMode::On
                }
            }
            RequestedColorMode::On => ColorMode::On,
            RequestedColorMode::Off => ColorMode::Off,
        }
    }
}

/// Everything a command needs, built once from the configuration.
pub(crate) struct Context {
    pub(crate) settings: Arc<Settings>,
    pub(crate) dispatcher: Dispatcher,
}

impl Context {
    pub(crate) async fn load(config: &Config) -> Context {
        let catalog = match Catalog::load(&config.catalog_source()).await {
            Ok(catalog) => catalog,
            Err(err) => die!("{}", err),
        };

        let store = match FileStore::open(config.store_path()) {
            Ok(store) => store,
            Err(err) => die!("{}", err),
        };

        let settings = Arc::new(Settings::new(Arc::new(catalog), Arc::new(store)));
        let dispatcher = Dispatcher::new(settings.clone(), Arc::new(ReqwestTransport::new()));

        Context {
            settings,
            dispatcher,
        }
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        self.settings.catalog()
    }
}
