use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Admin CLI for log clusters", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Cluster address, e.g. https://logs.example.com
    #[arg(long, env = "LOGCTL_ADDRESS", global = true)]
    pub address: Option<String>,

    /// API token
    #[arg(long, env = "LOGCTL_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Profile from the config file
    #[arg(long, env = "LOGCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile the cluster against a desired-state document
    Apply(ApplyArgs),

    /// Manage repositories
    #[command(subcommand)]
    Repos(ReposCommand),

    /// Manage views
    #[command(subcommand)]
    Views(ViewsCommand),

    /// Manage users
    #[command(subcommand)]
    Users(UsersCommand),

    /// Manage roles
    #[command(subcommand)]
    Roles(RolesCommand),

    /// Manage saved queries
    #[command(subcommand)]
    SavedQueries(SavedQueriesCommand),

    /// Manage API tokens
    #[command(subcommand)]
    Tokens(TokensCommand),

    /// Inspect permissions
    #[command(subcommand)]
    Permissions(PermissionsCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Desired-state YAML file
    #[arg(short, long, conflicts_with = "url", required_unless_present = "url")]
    pub file: Option<PathBuf>,

    /// Fetch the desired-state YAML from a URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Repositories
// ============================================================================

#[derive(Subcommand)]
pub enum ReposCommand {
    /// List repositories
    List,

    /// Show a repository
    Show {
        /// Repository name
        name: String,
    },

    /// Create an empty repository
    Create {
        /// Repository name
        name: String,
    },

    /// Update repository settings
    Update(RepoUpdateArgs),

    /// Delete a repository
    Delete {
        /// Repository name
        name: String,

        /// Reason recorded in the audit log
        #[arg(long, default_value = "")]
        reason: String,

        /// Allow deleting a repository that holds data
        #[arg(long)]
        allow_data_deletion: bool,
    },
}

#[derive(Args)]
pub struct RepoUpdateArgs {
    /// Repository name
    pub name: String,

    /// Repository description
    #[arg(long)]
    pub description: Option<String>,

    /// Retention time in days
    #[arg(long)]
    pub retention_time: Option<f64>,

    /// Ingest size based retention in GB
    #[arg(long)]
    pub ingest_size_based_retention: Option<f64>,

    /// Storage size based retention in GB
    #[arg(long)]
    pub storage_size_based_retention: Option<f64>,

    /// Search automatically when the search page loads
    #[arg(long)]
    pub automatic_search: Option<bool>,

    /// Saved query (name or id) to use as default on the search page
    #[arg(long)]
    pub default_query: Option<String>,

    /// Allow retention changes that delete data from a non-empty repository
    #[arg(long)]
    pub allow_data_deletion: bool,
}

impl RepoUpdateArgs {
    /// Whether any setting was given.
    pub fn has_changes(&self) -> bool {
        self.description.is_some()
            || self.retention_time.is_some()
            || self.ingest_size_based_retention.is_some()
            || self.storage_size_based_retention.is_some()
            || self.automatic_search.is_some()
            || self.default_query.is_some()
    }
}

// ============================================================================
// Views
// ============================================================================

#[derive(Subcommand)]
pub enum ViewsCommand {
    /// List views
    List,

    /// Show a view and its connections
    Show {
        /// View name
        name: String,
    },

    /// Create a view over one or more repositories
    Create {
        /// View name
        name: String,

        /// View description
        #[arg(long, default_value = "")]
        description: String,

        /// Connection as `repository=filter` (filter defaults to `*`)
        #[arg(short, long = "connection", required = true)]
        connections: Vec<String>,
    },

    /// Update view settings
    Update {
        /// View name
        name: String,

        /// View description
        #[arg(long)]
        description: Option<String>,

        /// Replace connections, each as `repository=filter`
        #[arg(short, long = "connection")]
        connections: Vec<String>,

        /// Search automatically when the search page loads
        #[arg(long)]
        automatic_search: Option<bool>,

        /// Saved query (name or id) to use as default on the search page
        #[arg(long)]
        default_query: Option<String>,
    },

    /// Delete a view
    Delete {
        /// View name
        name: String,

        /// Reason recorded in the audit log
        #[arg(long, default_value = "")]
        reason: String,
    },
}

// ============================================================================
// Users
// ============================================================================

#[derive(Subcommand)]
pub enum UsersCommand {
    /// Add a user (root only)
    Add {
        /// Username, usually an email address
        username: String,

        /// Grant root access
        #[arg(long)]
        root: Option<bool>,

        /// Full name
        #[arg(long)]
        name: Option<String>,

        /// Company
        #[arg(long)]
        company: Option<String>,

        /// Two letter country code
        #[arg(long)]
        country_code: Option<String>,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Avatar URL
        #[arg(long)]
        picture: Option<String>,
    },

    /// Show a user
    Show {
        /// Username
        username: String,
    },

    /// Rename a user
    UpdateUsername {
        /// Current username
        username: String,

        /// New username
        new_username: String,

        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },
}

// ============================================================================
// Roles
// ============================================================================

#[derive(Subcommand)]
pub enum RolesCommand {
    /// List roles
    List,

    /// Show a role
    Show {
        /// Role name
        name: String,
    },

    /// Remove a role
    Remove {
        /// Role name
        name: String,
    },
}

// ============================================================================
// Saved Queries
// ============================================================================

#[derive(Subcommand)]
pub enum SavedQueriesCommand {
    /// List saved queries in a repository or view
    List {
        /// Repository or view name
        search_domain: String,

        /// Include query string and time range
        #[arg(long)]
        detail: bool,
    },

    /// Show a saved query
    Show {
        /// Repository or view name
        search_domain: String,

        /// Saved query name or id
        name: String,
    },

    /// Create a saved query
    Create {
        /// Repository or view name
        search_domain: String,

        /// Saved query name
        name: String,

        /// Query string
        query_string: String,

        /// Query start time
        #[arg(long, default_value = "1h")]
        start: String,

        /// Query end time
        #[arg(long, default_value = "now")]
        end: String,

        /// Run the query in live mode
        #[arg(long)]
        live: bool,

        /// Widget used to display results
        #[arg(long, default_value = "list-view")]
        widget_type: String,
    },

    /// Delete a saved query
    Delete {
        /// Repository or view name
        search_domain: String,

        /// Saved query name or id
        name: String,
    },
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Subcommand)]
pub enum TokensCommand {
    /// List tokens
    List,

    /// Create a token and print its secret
    Create {
        /// Token name
        name: String,

        /// Token type: system, organization or view
        #[arg(short = 't', long = "type")]
        token_type: String,

        /// Permission to grant (repeat or comma-separate)
        #[arg(short, long = "permission", value_delimiter = ',', required = true)]
        permissions: Vec<String>,

        /// View the token is scoped to (view tokens only)
        #[arg(long, default_value = "")]
        view: String,
    },

    /// Delete a token
    Delete {
        /// Token id
        id: String,
    },
}

// ============================================================================
// Permissions
// ============================================================================

#[derive(Subcommand)]
pub enum PermissionsCommand {
    /// List valid permission names
    List {
        /// Only this permission type
        #[arg(short = 't', long = "type", value_enum)]
        permission_type: Option<PermissionTypeArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PermissionTypeArg {
    View,
    Organization,
    System,
}

impl From<PermissionTypeArg> for logapi::PermissionType {
    fn from(arg: PermissionTypeArg) -> Self {
        match arg {
            PermissionTypeArg::View => Self::View,
            PermissionTypeArg::Organization => Self::Organization,
            PermissionTypeArg::System => Self::System,
        }
    }
}
