//! # Reconcile
//!
//! Declarative reconciliation of a log cluster's users, repositories, views
//! and default queries.
//!
//! ## Core Concepts
//!
//! - **DesiredConfig**: the four desired-state collections, decoded from YAML
//! - **Targets**: an entry names one entity exactly, or many through a regex
//!   (see [`resolve_targets`])
//! - **Passes**: users, then default queries, then repositories, then views;
//!   each compares entries with live state and issues one mutation per
//!   differing field
//! - **Report**: one [`Outcome`] per decision, failures included; a failed
//!   entry never stops the run
//!
//! ## Example
//!
//! ```
//! use logapi::{MockBackend, Repository};
//! use reconcile::{Action, DesiredConfig, reconcile};
//!
//! let mock = MockBackend::new();
//! mock.add_repository(Repository {
//!     id: "r1".into(),
//!     name: "prod-eu".into(),
//!     ..Default::default()
//! });
//!
//! let config = DesiredConfig::from_yaml(
//!     "repos:\n  - { name: \"prod-.*\", automaticSearch: true, regex: true }\n",
//! )?;
//!
//! let report = reconcile(&config, &mock);
//! assert!(matches!(report.outcomes()[0].action, Action::Updated { .. }));
//! assert!(mock.repository("prod-eu").unwrap().automatic_search);
//! # Ok::<(), reconcile::Error>(())
//! ```
//!
//! The engine never retries and never creates missing repositories or views;
//! those are reported as [`Action::WouldCreate`].

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod report;
pub mod resolve;

pub use config::{
    DesiredConfig, DesiredDefaultQuery, DesiredRepo, DesiredSearchDomain, DesiredUser,
    DesiredView, RoleGrant,
};
pub use context::{NoProgress, ProgressCallback, ReconcileOptions};
pub use engine::{reconcile, reconcile_with};
pub use error::{Error, Result};
pub use report::{Action, Change, Collection, Outcome, Report, Summary};
pub use resolve::resolve_targets;
