use std::error::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, error::ErrorKind};

use crate::aggregate::AggregationResult;
use crate::cache::CachedStore;
use crate::config::DashboardConfig;
use crate::constants::aggregate::UNDEFINED_RATIO_TEXT;
use crate::constants::fields;
use crate::constants::performance::REPORT_SLOWEST_ROWS;
use crate::display::{format_delta_ms, format_ms, format_optional};
use crate::panels::{
    ActivationPanel, Dashboard, LanguagePanel, LoyaltyPanel, PurchasePanel, RenderTimePanel,
};
use crate::transport::FsDocumentStore;
use crate::types::GroupLabel;

#[derive(Debug, Parser)]
#[command(
    name = "dashboard_report",
    disable_help_subcommand = true,
    about = "Print every dashboard panel as plain text",
    long_about = "Read a document-store JSON export from disk, run every analysis panel, and print the results.",
    after_help = "Config values are resolved in order by explicit flag, --config file, then built-in defaults."
)]
struct ReportCli {
    #[arg(
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Root directory of the document-store export"
    )]
    root: PathBuf,
    #[arg(
        long,
        value_name = "PATH",
        help = "Optional JSON dashboard config file"
    )]
    config: Option<PathBuf>,
    #[arg(
        long = "target-time",
        value_name = "MS",
        help = "Render-time target in milliseconds (50-200)"
    )]
    target_time_ms: Option<f64>,
    #[arg(long = "top-n", help = "Entries shown in top-N tables")]
    top_n: Option<usize>,
    #[arg(long, help = "Emit the dashboard as JSON instead of text")]
    json: bool,
}

/// Run the plain-text dashboard report over a filesystem export.
pub fn run_dashboard_report<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<ReportCli, _>(
        std::iter::once("dashboard_report".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_json_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(target) = cli.target_time_ms {
        config = config.with_target_time(target);
    }
    if let Some(top_n) = cli.top_n {
        config = config.with_top_n(top_n);
    }
    config.validate()?;

    let store = CachedStore::new(FsDocumentStore::new(&cli.root), config.cache_ttl());
    let dashboard = Dashboard::build(&store, &config, Utc::now());

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        print!("{}", render_report(&dashboard));
    }
    Ok(())
}

/// Render every panel as plain text sections.
pub fn render_report(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Dashboard generated at {}",
        dashboard.generated_at.to_rfc3339()
    );
    match &dashboard.render_times {
        Some(panel) => write_render_times(&mut out, panel),
        None => write_no_data(&mut out, "QR Render Time Analysis"),
    }
    match &dashboard.loyalty {
        Some(panel) => write_loyalty(&mut out, panel),
        None => write_no_data(&mut out, "Most Popular Loyalty Programs"),
    }
    write_activation(&mut out, &dashboard.activation);
    match &dashboard.language {
        Some(panel) => write_language(&mut out, panel),
        None => write_no_data(&mut out, "Language Changes"),
    }
    match &dashboard.purchases {
        Some(panel) => write_purchases(&mut out, panel),
        None => write_no_data(&mut out, "Purchase Activity"),
    }
    out
}

fn write_header(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "== {title} ==");
}

fn write_no_data(out: &mut String, title: &str) {
    write_header(out, title);
    let _ = writeln!(out, "No data available");
}

fn write_counts(out: &mut String, counts: &AggregationResult<usize>) {
    for (label, count) in counts.iter() {
        let _ = writeln!(out, "  {label}: {count}");
    }
}

fn write_ranked(out: &mut String, entries: &[(GroupLabel, usize)]) {
    for (rank, (label, count)) in entries.iter().enumerate() {
        let _ = writeln!(out, "  {}. {label}: {count}", rank + 1);
    }
}

fn write_render_times(out: &mut String, panel: &RenderTimePanel) {
    write_header(out, "QR Render Time Analysis");
    let _ = writeln!(
        out,
        "Average Render Time: {} ({} vs target {})",
        format_ms(panel.average_ms),
        format_delta_ms(panel.delta_vs_target_ms),
        format_ms(panel.target_ms)
    );
    let _ = writeln!(out, "Max Render Time: {}", format_ms(panel.max_ms));
    let _ = writeln!(out, "Renders Over Target: {}", panel.over_target);
    let _ = writeln!(out, "Total Measurements: {}", panel.total_measurements);
    if let Some(distribution) = &panel.distribution {
        let _ = writeln!(out, "Performance Distribution:");
        write_counts(out, distribution);
    }
    let _ = writeln!(out, "Statistical Summary:");
    for (name, value) in panel.statistics.rows() {
        let _ = writeln!(out, "  {name}: {}", format_optional(value));
    }
    let _ = writeln!(out, "Slowest Measurements:");
    for record in panel.slowest.iter().take(REPORT_SLOWEST_ROWS) {
        let render_time = record
            .value(fields::RENDER_TIME)
            .as_number()
            .map_or_else(|| UNDEFINED_RATIO_TEXT.to_string(), format_ms);
        let _ = writeln!(
            out,
            "  {}: {render_time} at {}",
            record.value(fields::USER_ID).label(),
            record.value(fields::TIMESTAMP).label()
        );
    }
}

fn write_loyalty(out: &mut String, panel: &LoyaltyPanel) {
    write_header(out, "Most Popular Loyalty Programs");
    let _ = writeln!(out, "Top Stores:");
    write_ranked(out, &panel.top_stores);
    let _ = writeln!(out, "Total Programs: {}", panel.total_programs);
    let _ = writeln!(out, "Total Cards: {}", panel.total_cards);
    let _ = writeln!(
        out,
        "Average Cards per Store: {}",
        format_optional(panel.average_cards_per_store)
    );
    let _ = writeln!(
        out,
        "Max Cards in Store: {}",
        panel
            .max_cards_in_store
            .map_or_else(|| UNDEFINED_RATIO_TEXT.to_string(), |max| max.to_string())
    );
    if panel.unmatched_cards > 0 {
        let _ = writeln!(out, "Cards Without Store: {}", panel.unmatched_cards);
    }
}

fn write_activation(out: &mut String, panel: &ActivationPanel) {
    write_header(out, "Loyalty Card Activation");
    let _ = writeln!(out, "Registered Users: {}", panel.total_users);
    let _ = writeln!(out, "Current Cards: {}", panel.current_cards);
    let _ = writeln!(out, "Users With Current Card: {}", panel.activated_users);
    let _ = writeln!(out, "Activation Rate: {}", panel.activation_rate);
}

fn write_language(out: &mut String, panel: &LanguagePanel) {
    write_header(out, "Language Changes");
    let _ = writeln!(out, "Total Changes: {}", panel.total_events);
    let _ = writeln!(out, "Languages:");
    write_counts(out, &panel.languages);
    let _ = writeln!(out, "Changes by Weekday:");
    write_counts(out, &panel.weekdays);
    let metrics = &panel.metrics;
    let _ = writeln!(
        out,
        "Users With Any Change: {} ({})",
        metrics.users_with_any_change, metrics.any_change_rate
    );
    let _ = writeln!(
        out,
        "Users Switching More Than Once: {} ({})",
        metrics.switchers, metrics.switcher_rate
    );
    for summary in &panel.switchers {
        let span = match (summary.first, summary.last) {
            (Some(first), Some(last)) => format!("{} .. {}", first.to_rfc3339(), last.to_rfc3339()),
            _ => "no timestamps".to_string(),
        };
        let _ = writeln!(out, "  {}: {} changes, {span}", summary.user, summary.count);
    }
}

fn write_purchases(out: &mut String, panel: &PurchasePanel) {
    write_header(out, "Purchase Activity");
    let _ = writeln!(out, "Total Purchases: {}", panel.total_purchases);
    let _ = writeln!(out, "Revenue: {:.2}", panel.revenue);
    let _ = writeln!(out, "Purchases by Weekday:");
    write_counts(out, &panel.weekdays);
    let _ = writeln!(out, "Top Stores:");
    write_ranked(out, &panel.top_stores);
    if let Some(totals) = &panel.totals {
        let _ = writeln!(out, "Purchase Total Summary:");
        for (name, value) in totals.rows() {
            let _ = writeln!(out, "  {name}: {}", format_optional(value));
        }
    }
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawDocument;
    use crate::store::InMemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn parse_cli_handles_help_and_overrides() {
        let help = parse_cli::<ReportCli, _>(["dashboard_report", "--help"]).unwrap();
        assert!(help.is_none());

        let cli = parse_cli::<ReportCli, _>([
            "dashboard_report",
            "--root",
            "/tmp/export",
            "--target-time",
            "150",
            "--top-n",
            "3",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(cli.root, PathBuf::from("/tmp/export"));
        assert_eq!(cli.target_time_ms, Some(150.0));
        assert_eq!(cli.top_n, Some(3));
        assert!(!cli.json);

        assert!(parse_cli::<ReportCli, _>(["dashboard_report", "--bogus"]).is_err());
    }

    #[test]
    fn out_of_range_target_is_rejected_before_reading_the_store() {
        let result = run_dashboard_report(
            ["--root", "/nonexistent", "--target-time", "20"]
                .into_iter()
                .map(String::from),
        );
        assert!(result.is_err());
    }

    #[test]
    fn report_prints_sections_and_no_data_markers() {
        let now = Utc.with_ymd_and_hms(2024, 11, 4, 12, 0, 0).unwrap();
        let store = InMemoryStore::new()
            .with_collection(
                "users",
                (1..=10).map(|n| RawDocument::from_json(format!("u{n}"), json!({}))),
            )
            .with_collection(
                "loyaltyCards",
                vec![
                    RawDocument::from_json("c1", json!({ "user_id": "u1", "isCurrent": true })),
                    RawDocument::from_json("c2", json!({ "user_id": "u2", "isCurrent": true })),
                    RawDocument::from_json("c3", json!({ "user_id": "u3", "isCurrent": true })),
                ],
            );
        let dashboard = Dashboard::build(&store, &DashboardConfig::default(), now);
        let text = render_report(&dashboard);
        assert!(text.contains("== QR Render Time Analysis ==\nNo data available"));
        assert!(text.contains("Activation Rate: 30.0%"));
        assert!(text.contains("Cards Without Store: 3"));
    }

    #[test]
    fn render_time_section_lists_slowest_measurements_first() {
        let now = Utc.with_ymd_and_hms(2024, 11, 4, 12, 0, 0).unwrap();
        let config = DashboardConfig::default();
        let store = InMemoryStore::new().with_collection(
            config.collections.render_times.as_str(),
            (1..=7).map(|n| {
                RawDocument::from_json(
                    format!("q{n}"),
                    json!({
                        "userId": format!("u{n}"),
                        "qr_rtime": 10 * n,
                        "timestamp": "2024-11-04T09:00:00Z"
                    }),
                )
            }),
        );
        let dashboard = Dashboard::build(&store, &config, now);
        let text = render_report(&dashboard);
        let section = text.split("Slowest Measurements:\n").nth(1).unwrap();
        let rows: Vec<&str> = section.lines().take_while(|line| line.starts_with("  ")).collect();
        assert_eq!(rows.len(), REPORT_SLOWEST_ROWS);
        assert_eq!(rows[0], "  u7: 70.00ms at 2024-11-04T09:00:00Z");
        assert!(rows[4].starts_with("  u3: "));
    }
}
