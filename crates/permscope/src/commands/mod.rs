//! Command dispatch: bridges CLI args -> core calls -> output formatting.

pub mod config_cmd;
pub mod export;
pub mod permissions;
pub mod templates;
pub mod users;
pub mod util;

use permscope_core::ServiceConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    service_config: &ServiceConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Permissions(args) => permissions::handle(service_config, args, global).await,
        Command::Export(args) => export::handle(service_config, args, global).await,
        Command::Users(args) => users::handle(service_config, args, global).await,
        Command::Templates(args) => templates::handle(service_config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
