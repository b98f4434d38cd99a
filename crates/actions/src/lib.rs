//! `actions` crate — the `ActionHandler` contract and reference handlers.
//!
//! Every side-effecting rule step (tagging, categorisation, notifications, …)
//! is dispatched by the engine through [`ActionHandler`]. The concrete
//! implementations live outside the engine; this crate only fixes the
//! contract, the closed set of [`ActionType`]s, and a couple of test doubles.

pub mod action_type;
pub mod error;
pub mod logging;
pub mod mock;
pub mod traits;

pub use action_type::ActionType;
pub use error::ActionError;
pub use traits::{ActionContext, ActionHandler};
