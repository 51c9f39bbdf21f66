pub mod error;
pub mod fetch;
pub mod http;
pub mod layout;
pub mod matcher;
pub mod model;
pub mod reconcile;
pub mod store;
