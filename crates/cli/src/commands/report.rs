//! Savings report command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, OptimizationReport};
use crate::output::{
    color_priority, format_currency, format_timestamp, print_info, print_json, print_warning,
    render_table, OutputFormat,
};

/// Row for savings by zone table
#[derive(Tabled)]
struct ZoneSavingRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Savings / month")]
    savings: String,
}

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Type")]
    subtype: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Savings / month")]
    savings: String,
    #[tabled(rename = "Refreshed")]
    refreshed: String,
}

/// Row for waste records table
#[derive(Tabled)]
struct WasteRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Waste / month")]
    waste: String,
}

/// Fetch and print a savings report
pub async fn show_report(
    client: &ApiClient,
    project_id: &str,
    zones: &str,
    format: OutputFormat,
) -> Result<()> {
    let report = client.report(project_id, zones).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &OptimizationReport) {
    let summary = &report.summary;
    let currency = summary.currency.as_str();

    println!("{}", "Savings Report".bold());
    println!("{}", "=".repeat(60));
    println!("Project:                {}", report.project_id.cyan());
    println!("Zones:                  {}", report.zones.join(", "));
    println!("Recommendations:        {}", summary.recommendation_count);
    println!("Zombie resources:       {}", summary.waste_record_count);
    println!(
        "{}  {}",
        "Potential Savings:".bold(),
        format_currency(summary.total_potential_savings, currency)
            .green()
            .bold()
    );
    println!();

    if summary.savings_by_zone.is_empty() {
        print_info("No savings found in the requested zones");
    } else {
        println!("{}", "Savings by Zone".bold());
        let rows: Vec<ZoneSavingRow> = summary
            .savings_by_zone
            .iter()
            .map(|(zone, savings)| ZoneSavingRow {
                zone: zone.clone(),
                savings: format_currency(*savings, currency),
            })
            .collect();
        println!("{}", render_table(&rows));
        println!();
    }

    if !report.recommendations.is_empty() {
        println!("{}", "Recommendations".bold());
        let rows: Vec<RecommendationRow> = report
            .recommendations
            .iter()
            .map(|r| RecommendationRow {
                priority: color_priority(&r.priority),
                subtype: r.subtype.clone(),
                description: r.description.clone(),
                savings: r
                    .cost_savings
                    .as_ref()
                    .map(|s| format_currency(s.amount_per_month, &s.currency))
                    .unwrap_or_else(|| "-".to_string()),
                refreshed: format_timestamp(&r.last_refresh_time),
            })
            .collect();
        println!("{}", render_table(&rows));
        println!();
    }

    if !report.waste_records.is_empty() {
        println!("{}", "Zombie Resources".bold());
        let rows: Vec<WasteRow> = report
            .waste_records
            .iter()
            .map(|w| WasteRow {
                name: w.name.clone(),
                resource_type: w.resource_type.clone(),
                location: w
                    .zone
                    .clone()
                    .or_else(|| w.region.clone())
                    .unwrap_or_default(),
                reason: w.waste_reason.clone(),
                waste: format_currency(w.estimated_monthly_waste, currency),
            })
            .collect();
        println!("{}", render_table(&rows));
        println!();
    }

    for zone in &summary.failed_zones {
        print_warning(&format!("Zone {} could not be scanned", zone));
    }
    for failure in &report.diagnostics {
        print_warning(&format!(
            "{} {}: {}",
            failure.zone, failure.scope, failure.message
        ));
    }
}
