//! Compat command - batch compatibility report

use console::style;
use helmview_core::ChartFilesystem;
use helmview_engine::ChartRenderer;
use miette::Result;

use crate::exit_codes;

pub async fn run(references: &[String], fs: &dyn ChartFilesystem) -> Result<()> {
    if references.is_empty() {
        eprintln!("{} no chart references given", style("✗").red());
        std::process::exit(exit_codes::USAGE_ERROR);
    }

    println!(
        "{} Checking {} chart(s)...",
        style("→").blue(),
        references.len()
    );

    let renderer = ChartRenderer::new(fs);
    let reports = renderer.check_charts(references).await;

    let mut clean = 0;
    for report in &reports {
        if report.compatible {
            println!("  {} {}", style("✓").green(), report.reference);
            clean += 1;
        } else {
            println!("  {} {}", style("✗").red(), report.reference);
            for detail in &report.detail {
                println!("      {detail}");
            }
        }
    }

    println!();
    println!("{clean}/{} charts render cleanly", reports.len());
    if clean < reports.len() {
        std::process::exit(exit_codes::ERROR);
    }
    Ok(())
}
