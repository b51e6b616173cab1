//! Single-call HTTP dispatch against the monitored API.
mod auth;
mod client;
mod dispatcher;
mod spec;


pub use auth::BearerToken;
pub use client::build_client;
pub use dispatcher::{Dispatch, ReqwestDispatcher};
pub use spec::{CallKind, MANIFEST_FIELD, ParamValue, RequestSpec};
pub(crate) use spec::flag_text;
