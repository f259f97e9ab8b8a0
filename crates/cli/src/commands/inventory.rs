//! Resource and project listing commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_state, format_timestamp, print_table, OutputFormat};

/// Row for resources table
#[derive(Tabled, serde::Serialize)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    asset_type: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Created")]
    create_time: String,
}

/// Row for projects table
#[derive(Tabled, serde::Serialize)]
struct ProjectRow {
    #[tabled(rename = "Project ID")]
    project_id: String,
    #[tabled(rename = "Name")]
    display_name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Parent")]
    parent: String,
}

/// Short asset type: `compute.googleapis.com/Instance` -> `Instance`
fn short_asset_type(asset_type: &str) -> &str {
    asset_type.rsplit('/').next().unwrap_or(asset_type)
}

/// List a project's resources
pub async fn list_resources(
    client: &ApiClient,
    project_id: &str,
    zones: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let resources = client.resources(project_id, zones).await?;

    if format == OutputFormat::Json {
        return crate::output::print_json(&resources);
    }

    let rows: Vec<ResourceRow> = resources
        .iter()
        .map(|r| ResourceRow {
            name: r.name.clone(),
            asset_type: short_asset_type(&r.asset_type).to_string(),
            location: r.location.clone(),
            state: color_state(&r.state),
            create_time: format_timestamp(&r.create_time),
        })
        .collect();
    print_table(&rows, format);

    Ok(())
}

/// List accessible projects
pub async fn list_projects(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let projects = client.projects().await?;

    if format == OutputFormat::Json {
        return crate::output::print_json(&projects);
    }

    let rows: Vec<ProjectRow> = projects
        .iter()
        .map(|p| ProjectRow {
            project_id: p.project_id.clone(),
            display_name: p.display_name.clone(),
            state: color_state(&p.state),
            parent: p.parent.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(&rows, format);

    Ok(())
}
