//! Render command - print a chart's manifests

use console::style;
use helmview_core::ChartFilesystem;
use helmview_engine::ChartRenderer;
use miette::Result;

use crate::exit_codes;

pub async fn run(
    reference: &str,
    fs: &dyn ChartFilesystem,
    show_only: Option<&str>,
) -> Result<()> {
    let renderer = ChartRenderer::new(fs);
    let rendered = renderer.render(reference).await?;

    eprintln!(
        "{} {} v{} - {}",
        style("→").blue(),
        rendered.chart.name,
        rendered.chart.version,
        rendered.chart.description
    );

    if let Some(wanted) = show_only {
        if !rendered.manifests.contains_key(wanted) {
            eprintln!(
                "{} no rendered template named `{wanted}`",
                style("✗").red()
            );
            std::process::exit(exit_codes::ERROR);
        }
    }

    // Manifests go to stdout, everything else to stderr, so the output
    // pipes straight into kubectl or a file.
    for (file, manifest) in &rendered.manifests {
        if show_only.is_some_and(|wanted| wanted != file) {
            continue;
        }
        println!("---");
        println!("# Source: templates/{file}");
        println!("{}", manifest.trim_matches('\n'));
    }

    for (file, error) in &rendered.failures {
        eprintln!("{} {file}: {error}", style("✗").red());
    }
    if !rendered.is_clean() {
        std::process::exit(exit_codes::TEMPLATE_ERROR);
    }
    Ok(())
}
