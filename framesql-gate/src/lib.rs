//! Query gatekeeping for framesql.
//!
//! Every expression is parsed with `sqlparser` before it reaches an engine. The
//! [`Gatekeeper`] walks the parsed statement and accepts it only when it is a single
//! read-only query whose every node kind ([`NodeKind`]) and function name is on the
//! [`AllowListPolicy`]; anything the policy does not name is rejected with
//! `blocked_node_or_func`. The same parse yields the list of tables the query reads,
//! which the evaluator checks against the expression's inputs.
//!
//! [`allow_query`] and [`tables_list`] are the stateless entry points with the
//! standard policy.

mod allow;
pub mod dialect;
pub mod gatekeeper;
pub mod policy;
mod tables;

pub use dialect::SqlDialect;
pub use gatekeeper::{Gatekeeper, allow_query, tables_list};
pub use policy::{AllowListPolicy, AllowListPolicyBuilder, NodeKind};
