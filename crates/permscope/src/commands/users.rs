//! Active-user roster command handlers.

use tabled::Tabled;

use permscope_core::{AccessSource, AuditedUser, ServiceConfig};

use crate::cli::{GlobalOpts, UsersArgs, UsersCommand, UsersListArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Display Name")]
    display_name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl From<&AuditedUser> for UserRow {
    fn from(u: &AuditedUser) -> Self {
        Self {
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            email: u.email.clone(),
            profile: u.profile_name.clone(),
            active: if u.is_active { "Yes" } else { "No" }.into(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle(
    service_config: &ServiceConfig,
    args: UsersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        UsersCommand::List(list_args) => list(service_config, list_args, global).await,
    }
}

async fn list(
    service_config: &ServiceConfig,
    args: UsersListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = util::connect(service_config)?;

    let mut users: Vec<AuditedUser> = Vec::new();
    let mut cursor = None;

    loop {
        let page = client
            .source()
            .active_users_page(args.page_size, cursor.as_ref())
            .await?;
        users.extend(page.users);

        let at_limit = args.limit > 0 && users.len() >= args.limit;
        if at_limit || !page.has_more {
            break;
        }
        match page.last_user_id {
            Some(id) => cursor = Some(id),
            None => break,
        }
    }

    if args.limit > 0 {
        users.truncate(args.limit);
    }

    let rendered = output::render_list(&global.output, &users, |u| UserRow::from(u), |u| {
        u.username.clone()
    });
    output::print_output(&rendered, global.quiet);
    Ok(())
}
