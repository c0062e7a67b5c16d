//! An umbrella module for the Google Gemini provider

mod adapter;
mod api;

pub(crate) use self::adapter::GoogleAdapter;
