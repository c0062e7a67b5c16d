//! An umbrella module for Coze workflow deployments, hosted and local

mod adapter;
mod api;

pub(crate) use self::adapter::CozeAdapter;
pub use self::api::LOCAL_DEFAULT_ENDPOINT as COZE_LOCAL_DEFAULT_ENDPOINT;
