//! Request dispatch core.
//!
//! Every inbound request, whether an HTTP call or a slash command, becomes an
//! [`Action`] carrying a [`RequestContext`]. The [`Router`] maps the request's
//! route key to a [`Route`] and runs its [`Script`] between the router-wide
//! Before and After scripts.
//!
//! ## Route keys
//!
//! HTTP keys are the request path below the plugin root, for example
//! `/api/v2/userinfo`. Command keys join the command tokens after the trigger,
//! for example `settings/notifications`. A key ending in `/*` matches any
//! descendant:
//!
//! ```text
//! /ac/*            matches /ac/user_config and /ac/a/b/c
//! /*               matches everything not matched more specifically
//! ```

mod action;
mod context;
mod errors;
mod responder;
mod route;
mod router;
mod script;

pub use self::action::{Action, BasicAction, BasicResponse, Surface};
pub use self::context::RequestContext;
pub use self::errors::{ActionError, SharedSource};
pub use self::responder::Responder;
pub use self::route::{CommandMetadata, Route};
pub use self::router::{Resolution, Router, RouterBuilder, respond_not_found};
pub use self::script::{Script, Step, StepFn, run_prerequisites};

pub(crate) use self::responder::{encode_json, render_template};
