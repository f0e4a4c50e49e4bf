//! Permission catalog command handlers.

use tabled::Tabled;

use permscope_core::{AccessResult, AccessSource, PageOptions, Permission, ServiceConfig};

use crate::cli::{GlobalOpts, PermissionsArgs, PermissionsCommand, PermissionsShowArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PermissionRow {
    #[tabled(rename = "API Name")]
    name: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Privileged")]
    privileged: String,
}

impl From<&Permission> for PermissionRow {
    fn from(p: &Permission) -> Self {
        Self {
            name: p.name.clone(),
            label: p.label.clone(),
            privileged: if p.is_privileged { "Yes" } else { "" }.into(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle(
    service_config: &ServiceConfig,
    args: PermissionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PermissionsCommand::List(list_args) => {
            let client = util::connect(service_config)?;
            let mut permissions = client.source().list_permissions().await?;
            if list_args.privileged {
                permissions.retain(|p| p.is_privileged);
            }

            let rendered = output::render_list(
                &global.output,
                &permissions,
                |p| PermissionRow::from(p),
                |p| p.name.clone(),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        PermissionsCommand::Show(show_args) => show(service_config, show_args, global).await,
    }
}

async fn show(
    service_config: &ServiceConfig,
    args: PermissionsShowArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = util::connect(service_config)?;

    // Resolve the catalog entry so the display label is right; an unknown
    // name is an error here (unlike exports, which degrade).
    let catalog = client.source().list_permissions().await?;
    let permission = catalog
        .into_iter()
        .find(|p| p.name == args.name)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "permission".into(),
            identifier: args.name.clone(),
            list_command: "permissions list".into(),
        })?;

    let page = PageOptions {
        page_size: args.page_size.unwrap_or(service_config.effective_page_size()),
        page_number: args.page,
    };
    let result = client.fetch_access(&permission, page).await;

    let rendered = output::render_single(&global.output, &result, detail, |r| {
        r.permission_name.clone()
    });
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn detail(result: &AccessResult) -> String {
    let mut lines = vec![
        format!("Permission:   {}", result.permission_label),
        format!("API Name:     {}", result.permission_name),
        format!("Total Users:  {}", result.total_users),
        String::new(),
        section("Profiles", result.profiles.iter().map(|e| e.label.clone())),
        section(
            "Permission Sets",
            result.permission_sets.iter().map(|e| e.label.clone()),
        ),
        section(
            "Permission Set Groups",
            result.permission_set_groups.iter().map(|e| e.label.clone()),
        ),
        section(
            "Users",
            result.users.iter().map(|u| u.username.clone()),
        ),
    ];

    if let Some(page) = result.page {
        lines.push(format!(
            "Page {} of ~{} (page size {})",
            page.page_number,
            page.total_count.div_ceil(u64::from(page.page_size.max(1))),
            page.page_size
        ));
    }
    if result.is_fallback {
        lines.push("Note: served by a fallback tier; data may be partial.".into());
    }
    if let Some(error) = &result.error {
        lines.push(format!("Error: {error}"));
    }

    lines.join("\n")
}

fn section(title: &str, items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        format!("{title}: (none)")
    } else {
        format!("{title} ({}):\n  {}", items.len(), items.join("\n  "))
    }
}
