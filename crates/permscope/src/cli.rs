//! Clap derive structures for the `permscope` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// permscope -- permissions-audit exports from the command line
#[derive(Debug, Parser)]
#[command(
    name = "permscope",
    version,
    about = "Audit who holds which system permissions, and export the pivot",
    long_about = "A CLI for auditing system permissions through a permscope\n\
        audit service: browse the permission catalog, analyze a single\n\
        permission's grant sources, and generate multi-sheet XLSX exports\n\
        covering profiles, permission sets, groups, and users.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "PERMSCOPE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Audit service URL (overrides profile)
    #[arg(long, short = 's', env = "PERMSCOPE_SERVICE", global = true)]
    pub service: Option<String>,

    /// API token
    #[arg(long, env = "PERMSCOPE_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PERMSCOPE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PERMSCOPE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "PERMSCOPE_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse the permission catalog and analyze single permissions
    #[command(alias = "perm", alias = "p")]
    Permissions(PermissionsArgs),

    /// Generate multi-sheet XLSX exports
    #[command(alias = "x")]
    Export(ExportArgs),

    /// Browse the active-user roster
    #[command(alias = "u")]
    Users(UsersArgs),

    /// Manage saved export templates
    #[command(alias = "tpl")]
    Templates(TemplatesArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Permissions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PermissionsArgs {
    #[command(subcommand)]
    pub command: PermissionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PermissionsCommand {
    /// List the permission catalog
    #[command(alias = "ls")]
    List(PermissionsListArgs),

    /// Analyze one permission's grant sources
    Show(PermissionsShowArgs),
}

#[derive(Debug, Args)]
pub struct PermissionsListArgs {
    /// Only show privileged permissions
    #[arg(long)]
    pub privileged: bool,
}

#[derive(Debug, Args)]
pub struct PermissionsShowArgs {
    /// Permission API name (e.g. ModifyAllData)
    pub name: String,

    /// Access page size
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Access page number
    #[arg(long, default_value = "1")]
    pub page: u32,
}

// ── Export ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(subcommand)]
    pub command: ExportCommand,
}

#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    /// Export every permission in the catalog
    Bulk(ExportOpts),

    /// Export only privileged permissions
    Privileged(ExportOpts),

    /// Export a saved template (permissions + pinned users)
    Template(TemplateExportArgs),
}

#[derive(Debug, Args)]
pub struct ExportOpts {
    /// Directory to write the workbook into (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Permissions fetched per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Access page size
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Merge the full active-user roster into the Users sheet
    #[arg(long)]
    pub include_all_active_users: bool,
}

#[derive(Debug, Args)]
pub struct TemplateExportArgs {
    /// Template id
    pub id: String,

    #[command(flatten)]
    pub opts: ExportOpts,
}

// ── Users ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List active users
    #[command(alias = "ls")]
    List(UsersListArgs),
}

#[derive(Debug, Args)]
pub struct UsersListArgs {
    /// Roster page size
    #[arg(long, default_value = "200")]
    pub page_size: u32,

    /// Stop after this many users (0 = no limit)
    #[arg(long, default_value = "0")]
    pub limit: usize,
}

// ── Templates ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    pub command: TemplatesCommand,
}

#[derive(Debug, Subcommand)]
pub enum TemplatesCommand {
    /// List saved templates
    #[command(alias = "ls")]
    List,

    /// Show one template
    Show(TemplateShowArgs),

    /// Create or update a template from a JSON file
    Save(TemplateSaveArgs),
}

#[derive(Debug, Args)]
pub struct TemplateShowArgs {
    /// Template id
    pub id: String,
}

#[derive(Debug, Args)]
pub struct TemplateSaveArgs {
    /// Template id
    pub id: String,

    /// JSON definition file
    #[arg(long, value_name = "FILE")]
    pub from_file: PathBuf,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved configuration (tokens redacted)
    Show,

    /// Print the config file path
    Path,

    /// Store an API token in the system keyring
    SetToken,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
