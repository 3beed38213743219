//! Per-entry outcomes of a reconciliation run.

use serde::Serialize;
use std::fmt;

/// The four desired-state collections, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Users,
    DefaultQueries,
    Repos,
    Views,
}

impl Collection {
    /// Processing order.
    #[must_use]
    pub fn all() -> &'static [Collection] {
        &[Self::Users, Self::DefaultQueries, Self::Repos, Self::Views]
    }

    /// Label used at the start of status lines.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Users => "User",
            Self::DefaultQueries => "Query",
            Self::Repos => "Repo",
            Self::Views => "View",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Users => "users",
            Self::DefaultQueries => "defaultQueries",
            Self::Repos => "repos",
            Self::Views => "views",
        };
        f.write_str(name)
    }
}

/// A single-field change to a remote entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "field")]
pub enum Change {
    /// Grant `role` on `search_domain`.
    RoleGrant { role: String, search_domain: String },
    AutomaticSearch { value: bool },
    DefaultQuery { value: String },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleGrant {
                role,
                search_domain,
            } => write!(f, "on {search_domain} as {role}"),
            Self::AutomaticSearch { value } => write!(f, "automatic search = {value}"),
            Self::DefaultQuery { value } => write!(f, "default query = {value:?}"),
        }
    }
}

/// What happened to one entry (or one target of a regex entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum Action {
    /// Entity created.
    Created,
    /// Already in the desired state, nothing issued.
    Exists,
    /// One field updated.
    Updated { change: Change },
    /// Missing and not created, either because of a dry run or because the
    /// pass does not create this kind of entity.
    WouldCreate,
    /// Dry run: a field differs and would be updated.
    WouldUpdate { change: Change },
    /// Entry not acted on.
    Skipped { reason: String },
    /// A remote call or a check failed; see the outcome's error.
    Failed,
}

impl Action {
    /// Whether a mutation was issued.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Created | Self::Updated { .. })
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub collection: Collection,
    /// Name of the entity acted on.
    pub entry: String,
    /// Search domain the action happened in, when not the entry itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn new(collection: Collection, entry: impl Into<String>, action: Action) -> Self {
        Self {
            collection,
            entry: entry.into(),
            target: None,
            action,
            error: None,
        }
    }

    /// A failure with its error message.
    pub fn failed(collection: Collection, entry: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(collection, entry, Action::Failed)
        }
    }

    #[must_use]
    pub fn in_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.action, Action::Failed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.collection.label();
        let entry = &self.entry;
        let place = self
            .target
            .as_ref()
            .map(|t| format!(" in {t}"))
            .unwrap_or_default();
        match &self.action {
            Action::Created => write!(f, "{label} created: {entry}{place}"),
            Action::Exists => write!(f, "{label} exists: {entry}{place}"),
            Action::Updated { change } => write!(f, "{label} updated: {entry} {change}"),
            Action::WouldCreate => write!(f, "{label} missing, not created: {entry}{place}"),
            Action::WouldUpdate { change } => write!(f, "{label} would update: {entry} {change}"),
            Action::Skipped { reason } => write!(f, "{label} skipped: {entry} ({reason})"),
            Action::Failed => write!(
                f,
                "{label} failed: {entry}{place}: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

/// Counts per action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub exists: usize,
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    /// Number of mutations issued.
    pub fn total_changes(&self) -> usize {
        self.created + self.updated
    }

    /// Check if the run had no failures
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.exists + self.planned + self.skipped + self.failed
    }

    /// Add an outcome to the summary
    pub fn add(&mut self, action: &Action) {
        match action {
            Action::Created => self.created += 1,
            Action::Updated { .. } => self.updated += 1,
            Action::Exists => self.exists += 1,
            Action::WouldCreate | Action::WouldUpdate { .. } => self.planned += 1,
            Action::Skipped { .. } => self.skipped += 1,
            Action::Failed => self.failed += 1,
        }
    }
}

/// Ordered outcomes of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    outcomes: Vec<Outcome>,
}

impl Report {
    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Outcomes of one collection.
    pub fn for_collection(&self, collection: Collection) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(move |o| o.collection == collection)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(Outcome::is_failure)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for outcome in &self.outcomes {
            summary.add(&outcome.action);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        let created = Outcome::new(Collection::Users, "alice", Action::Created);
        assert_eq!(created.to_string(), "User created: alice");

        let granted = Outcome::new(
            Collection::Users,
            "alice",
            Action::Updated {
                change: Change::RoleGrant {
                    role: "Member".into(),
                    search_domain: "prod".into(),
                },
            },
        );
        assert_eq!(granted.to_string(), "User updated: alice on prod as Member");

        let query = Outcome::new(Collection::DefaultQueries, "errors", Action::Exists).in_target("prod");
        assert_eq!(query.to_string(), "Query exists: errors in prod");

        let failed = Outcome::failed(Collection::Repos, "prod", "boom");
        assert_eq!(failed.to_string(), "Repo failed: prod: boom");
    }

    #[test]
    fn test_summary_counts() {
        let mut report = Report::default();
        report.push(Outcome::new(Collection::Users, "a", Action::Created));
        report.push(Outcome::new(Collection::Repos, "b", Action::Exists));
        report.push(Outcome::new(
            Collection::Repos,
            "c",
            Action::WouldUpdate {
                change: Change::AutomaticSearch { value: true },
            },
        ));
        report.push(Outcome::failed(Collection::Views, "d", "nope"));

        let summary = report.summary();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.exists, 1);
        assert_eq!(summary.planned, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.total_changes(), 1);
        assert!(!summary.is_success());
        assert!(report.has_failures());
        assert_eq!(report.for_collection(Collection::Repos).count(), 2);
    }

    #[test]
    fn test_action_is_mutation() {
        assert!(Action::Created.is_mutation());
        assert!(!Action::WouldCreate.is_mutation());
        assert!(!Action::Exists.is_mutation());
    }

    #[test]
    fn test_collection_order() {
        assert_eq!(
            Collection::all(),
            &[
                Collection::Users,
                Collection::DefaultQueries,
                Collection::Repos,
                Collection::Views
            ]
        );
    }
}
