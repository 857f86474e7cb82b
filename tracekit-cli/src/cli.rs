use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Requirements traceability matrix and quality scoring"
)]
pub struct Cli {
    /// Project to operate on (defaults to TRACEKIT_PROJECT or the configured project)
    #[clap(long, short = 'p', global = true)]
    pub project: Option<String>,

    /// Directory holding project files (overrides TRACEKIT_DATA_DIR)
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print JSON instead of formatted text
    #[clap(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[clap(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage projects
    #[clap(subcommand)]
    Project(ProjectCommand),

    /// Manage requirements
    #[clap(subcommand)]
    Req(ReqCommand),

    /// Manage test suites
    #[clap(subcommand)]
    Suite(SuiteCommand),

    /// Manage test cases
    #[clap(subcommand)]
    Case(CaseCommand),

    /// Link a test case to a requirement
    Link {
        /// Requirement code (REQ-001) or UUID
        requirement: String,

        /// Test case ID
        test_case: String,
    },

    /// Remove a test case link from a requirement
    Unlink {
        /// Requirement code (REQ-001) or UUID
        requirement: String,

        /// Test case ID
        test_case: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Record an execution of a test suite
    Run {
        /// Suite name or UUID
        suite: String,

        /// Environment the suite ran in
        #[clap(long, default_value = "default")]
        environment: String,

        /// Who ran the suite (defaults to the configured actor)
        #[clap(long)]
        executor: Option<String>,

        /// Result for a test case, as ID=STATUS (passed, failed, blocked, skipped).
        /// Prompts for every case when omitted.
        #[clap(long = "result", short = 'r')]
        results: Vec<String>,
    },

    /// Show the traceability matrix
    Matrix {
        /// Only show the row of this requirement
        #[clap(long)]
        requirement: Option<String>,
    },

    /// Show the coverage summary
    Coverage,

    /// Generate a quality report
    Report {
        /// Do not store the report in the history
        #[clap(long)]
        preview: bool,

        /// Leave out the quality metrics section
        #[clap(long)]
        no_metrics: bool,

        /// Leave out the risk analysis section
        #[clap(long)]
        no_risk: bool,

        /// Leave out the coverage matrix and summary
        #[clap(long)]
        no_coverage: bool,
    },

    /// Browse stored reports
    #[clap(subcommand)]
    Reports(ReportsCommand),

    /// Show or initialize the configuration file
    #[clap(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a new, empty project
    Init {
        /// Name of the project (letters, digits, '-' and '_')
        name: Option<String>,

        /// Make this the default project
        #[clap(long)]
        default: bool,
    },

    /// List all projects in the data directory
    List,
}

#[derive(Subcommand, Debug)]
pub enum ReqCommand {
    /// Add a new requirement
    Add {
        /// Name of the requirement
        #[clap(long)]
        name: Option<String>,

        /// Description of the requirement
        #[clap(long, default_value = "")]
        description: String,

        /// Priority (low, medium, high, critical; Spanish labels accepted)
        #[clap(long)]
        priority: Option<String>,

        /// Comma-separated tags
        #[clap(long)]
        tags: Option<String>,
    },

    /// List requirements
    List {
        /// Filter by priority
        #[clap(long)]
        priority: Option<String>,

        /// Filter by status
        #[clap(long)]
        status: Option<String>,

        /// Filter by tag
        #[clap(long)]
        tag: Option<String>,
    },

    /// Show details of a requirement
    Show {
        /// Requirement code (REQ-001) or UUID
        id: String,
    },

    /// Update fields of a requirement
    Update {
        /// Requirement code (REQ-001) or UUID
        id: String,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        description: Option<String>,

        #[clap(long)]
        priority: Option<String>,

        #[clap(long)]
        status: Option<String>,

        /// Comma-separated tags, replacing the current ones
        #[clap(long)]
        tags: Option<String>,
    },

    /// Show the audit history of a requirement
    History {
        /// Requirement code (REQ-001) or UUID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SuiteCommand {
    /// Add a new test suite
    Add {
        /// Name of the suite
        name: Option<String>,
    },

    /// List test suites with their statistics
    List,
}

#[derive(Subcommand, Debug)]
pub enum CaseCommand {
    /// Add a test case to a suite
    Add {
        /// Suite name or UUID
        suite: String,

        /// Test case ID, unique within the project
        id: String,

        /// Name of the test case
        #[clap(long)]
        name: Option<String>,

        #[clap(long, default_value = "")]
        description: String,

        #[clap(long)]
        priority: Option<String>,

        /// manual, automated or exploratory
        #[clap(long = "type", default_value = "manual")]
        test_type: String,

        /// A step of the test; repeat for several steps
        #[clap(long = "step")]
        steps: Vec<String>,

        #[clap(long, default_value = "")]
        prerequisites: String,

        #[clap(long, default_value = "")]
        expected: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportsCommand {
    /// List stored reports of the project, newest first
    List,

    /// Show a stored report
    Show {
        /// Report UUID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with the current settings
    Init {
        /// Overwrite an existing file
        #[clap(long)]
        force: bool,
    },
}
