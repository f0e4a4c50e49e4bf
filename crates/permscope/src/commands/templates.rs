//! Export-template command handlers.

use serde::Deserialize;
use tabled::Tabled;

use permscope_core::{AccessSource, EntityId, ExportTemplate, ServiceConfig};

use crate::cli::{GlobalOpts, TemplateSaveArgs, TemplateShowArgs, TemplatesArgs, TemplatesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Permissions")]
    permissions: usize,
    #[tabled(rename = "Pinned Users")]
    users: usize,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&ExportTemplate> for TemplateRow {
    fn from(t: &ExportTemplate) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            permissions: t.permission_names.len(),
            users: t.user_ids.len(),
            updated: t
                .updated_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

/// JSON shape accepted by `templates save --from-file`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateFile {
    name: String,
    permission_names: Vec<String>,
    #[serde(default)]
    user_ids: Vec<String>,
    #[serde(default)]
    include_all_active_users: bool,
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle(
    service_config: &ServiceConfig,
    args: TemplatesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        TemplatesCommand::List => list(service_config, global).await,
        TemplatesCommand::Show(show_args) => show(service_config, show_args, global).await,
        TemplatesCommand::Save(save_args) => save(service_config, save_args, global).await,
    }
}

async fn list(service_config: &ServiceConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let client = util::connect(service_config)?;
    let templates = client.source().list_templates().await?;

    let rendered =
        output::render_list(&global.output, &templates, |t| TemplateRow::from(t), |t| t.id.clone());
    output::print_output(&rendered, global.quiet);
    Ok(())
}

async fn show(
    service_config: &ServiceConfig,
    args: TemplateShowArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = util::connect(service_config)?;
    let template = client.source().load_template(&args.id).await?;

    let rendered = output::render_single(&global.output, &template, detail, |t| t.id.clone());
    output::print_output(&rendered, global.quiet);
    Ok(())
}

async fn save(
    service_config: &ServiceConfig,
    args: TemplateSaveArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let raw = util::read_json_file(&args.from_file)?;
    let file: TemplateFile = serde_json::from_value(raw).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: e.to_string(),
    })?;

    let template = ExportTemplate {
        id: args.id,
        name: file.name,
        permission_names: file.permission_names,
        user_ids: file.user_ids.into_iter().map(EntityId::new).collect(),
        include_all_active_users: file.include_all_active_users,
        updated_at: None,
    };

    let client = util::connect(service_config)?;

    // Guard against silent overwrites of an existing template.
    if client.source().load_template(&template.id).await.is_ok()
        && !util::confirm(
            &format!("Template '{}' exists. Overwrite?", template.id),
            global.yes,
        )?
    {
        if !global.quiet {
            println!("Aborted.");
        }
        return Ok(());
    }

    let saved = client.source().save_template(&template).await?;

    if !global.quiet {
        println!("Saved template '{}' ({})", saved.name, saved.id);
    }
    Ok(())
}

fn detail(template: &ExportTemplate) -> String {
    let mut lines = vec![
        format!("ID:           {}", template.id),
        format!("Name:         {}", template.name),
        format!(
            "All users:    {}",
            if template.include_all_active_users {
                "Yes"
            } else {
                "No"
            }
        ),
    ];
    if let Some(updated) = template.updated_at {
        lines.push(format!("Updated:      {updated}"));
    }
    lines.push(format!(
        "Permissions ({}):\n  {}",
        template.permission_names.len(),
        template.permission_names.join("\n  ")
    ));
    if !template.user_ids.is_empty() {
        lines.push(format!(
            "Pinned users ({}):\n  {}",
            template.user_ids.len(),
            template
                .user_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n  ")
        ));
    }
    lines.join("\n")
}
