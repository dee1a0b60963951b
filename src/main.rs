// Entry point and high-level CLI flow.
//
// - Option [1] loads the accident CSV once and derives the age ranges.
// - Option [2] picks the State / Accident Severity filters.
// - Option [3] evaluates every dashboard tab against the filters, prints a
//   preview of each chart's table and exports it next to a JSON summary.
// - After generating, the user can go back to the menu or exit.
mod aggregate;
mod config;
mod context;
mod dashboard;
mod dataset;
mod derive;
mod error;
mod filter;
mod loader;
mod output;
mod region;
mod types;
mod util;

#[cfg(test)]
mod fixtures;

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

use config::Args;
use context::AppContext;
use dashboard::{Panel, PanelData, ViewKind};
use error::{DashboardError, Result};
use filter::{filter_options, Selection, FILTERABLE};

const PREVIEW_ROWS: usize = 5;

/// Read a single line of input after printing the common "Enter choice:" prompt.
///
/// The prompt is reused for both the main menu and the filter pickers.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask whether to go back to the menu after generating the dashboard.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]. A failed load ends the session: every view depends
/// on the dataset.
fn handle_load(ctx: &AppContext) -> Result<()> {
    let already = ctx.is_loaded();
    let dataset = ctx.dataset()?;
    if already {
        println!("Dataset already loaded from {}.", ctx.data_path().display());
    }
    println!(
        "Processing dataset... ({} accidents loaded)",
        util::format_int(dataset.len())
    );
    if dataset.is_empty() {
        println!("Warning: {} holds no accident rows.", ctx.data_path().display());
    }
    let states = filter_options(dataset, types::Column::State)?;
    let states = &states[1..];
    let matched = states
        .iter()
        .filter(|s| ctx.regions().resolve(s).is_some())
        .count();
    println!(
        "Info: {} of {} states matched a known boundary.\n",
        util::format_int(matched),
        util::format_int(states.len())
    );
    Ok(())
}

/// Handle option [2]: one numbered picker per filterable column.
fn handle_filters(ctx: &mut AppContext) -> Result<()> {
    let dataset = ctx.dataset()?;
    let mut picks = Vec::new();
    for column in FILTERABLE {
        let options = filter_options(dataset, column)?;
        let current = ctx.filters().selection(column);
        println!("{} (current: {})", column, current);
        for (i, opt) in options.iter().enumerate() {
            println!("[{}] {}", i + 1, opt);
        }
        let choice = read_choice();
        let picked = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| options.get(i));
        match picked {
            Some(value) => picks.push((column, Selection::parse(value))),
            None => println!("Invalid choice. Keeping {}.", current),
        }
        println!();
    }
    for (column, selection) in picks {
        ctx.set_filter(column, selection)?;
    }
    println!("Filters set{}\n", ctx.filters().caption());
    Ok(())
}

fn export_path(ctx: &AppContext, panel: &Panel, ext: &str) -> PathBuf {
    ctx.out_dir()
        .join(format!("{}_{}.{}", panel.view.tab.slug(), panel.view.id, ext))
}

fn report_written(path: &std::path::Path) {
    println!("(Full table exported to {})\n", path.display());
}

fn export_panel(ctx: &AppContext, panel: &Panel) -> Result<()> {
    match &panel.data {
        PanelData::Table(result) => {
            output::preview_shaped(result, PREVIEW_ROWS);
            let path = export_path(ctx, panel, "csv");
            output::write_shaped_csv(&path, result)?;
            report_written(&path);
            if matches!(panel.view.kind, ViewKind::Hierarchy(_)) {
                let path = export_path(ctx, panel, "json");
                output::write_json(&path, &result.to_hierarchy())?;
                println!("(Hierarchy exported to {})\n", path.display());
            }
        }
        PanelData::Pivot(table) => {
            output::preview_pivot(table, PREVIEW_ROWS);
            let path = export_path(ctx, panel, "csv");
            output::write_pivot_csv(&path, table)?;
            report_written(&path);
        }
        PanelData::Regions(completion) => {
            output::preview_regions(completion, PREVIEW_ROWS);
            let path = export_path(ctx, panel, "csv");
            output::write_csv(&path, &completion.entries)?;
            report_written(&path);
            let path = export_path(ctx, panel, "geojson");
            output::write_geojson(&path, completion.to_feature_collection(ctx.regions()))?;
            println!("(Choropleth exported to {})\n", path.display());
        }
        PanelData::Markdown(text) => {
            println!("{}\n", text);
        }
    }
    Ok(())
}

/// Handle option [3]: every tab, every chart, then `summary.json`.
fn handle_generate(ctx: &AppContext) -> Result<()> {
    if !ctx.is_loaded() {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return Ok(());
    }
    std::fs::create_dir_all(ctx.out_dir()).map_err(|source| DashboardError::Io {
        path: ctx.out_dir().to_path_buf(),
        source,
    })?;

    println!("Generating dashboard{}...", ctx.filters().caption());
    println!("Outputs saved to {}\n", ctx.out_dir().display());

    for tab in dashboard::tabs() {
        println!("== {} ==\n", tab);
        for panel in ctx.render(tab)? {
            let chart = panel.view.chart.to_string();
            output::preview_heading(&panel.title, &chart, panel.view.note);
            // One failed export should not hide the remaining charts.
            if let Err(e) = export_panel(ctx, &panel) {
                eprintln!("Write error: {}", e);
            }
        }
    }

    let summary = ctx.summary()?;
    let path = ctx.out_dir().join("summary.json");
    if let Err(e) = output::write_json(&path, &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats ({}):", path.display());
    output::preview_table_rows(std::slice::from_ref(&summary.overview), 1);
    Ok(())
}

fn main() {
    pretty_env_logger::init();
    let args = Args::parse();
    let mut ctx = AppContext::new(&args);

    loop {
        println!("Industrial Accidents Analysis Dashboard");
        println!("[1] Load the file");
        println!("[2] Set filters");
        println!("[3] Generate dashboard\n");
        match read_choice().as_str() {
            "1" => {
                if let Err(e) = handle_load(&ctx) {
                    eprintln!("Failed to load file: {}", e);
                    std::process::exit(1);
                }
            }
            "2" => {
                if !ctx.is_loaded() {
                    println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
                    continue;
                }
                if let Err(e) = handle_filters(&mut ctx) {
                    eprintln!("Error: {}\n", e);
                }
            }
            "3" => {
                println!();
                if let Err(e) = handle_generate(&ctx) {
                    eprintln!("Error: {}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}
