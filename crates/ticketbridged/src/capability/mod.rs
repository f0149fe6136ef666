//! Capability resolvers and transport guards.
//!
//! A resolver is a step that fills one [`RequestContext`] cell. It returns
//! immediately when the cell is already populated, otherwise it runs its
//! prerequisites, consults a collaborator, stores the result and moves on.
//! Composing resolvers in a [`Script`] therefore never repeats collaborator
//! calls, whatever order they are listed in.
//!
//! [`RequestContext`]: crate::dispatch::RequestContext
//! [`Script`]: crate::dispatch::Script

mod guards;
mod resolvers;

pub use self::guards::{
    require_command_action, require_http_action, require_http_delete, require_http_get,
    require_http_post, require_http_put,
};
pub use self::resolvers::{
    require_backend_client, require_backend_user, require_caller_id, require_caller_identity,
    require_signed_token, require_sys_admin, require_upstream,
};

/// Tracing target for capability resolution.
pub(crate) const CAPABILITY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::capability");
