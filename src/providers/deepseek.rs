//! An umbrella module for the DeepSeek provider

mod adapter;
mod api;

pub(crate) use self::adapter::DeepSeekAdapter;
