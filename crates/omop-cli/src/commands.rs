use std::io::{self, IsTerminal};
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use omop_cli::manifest::RunManifest;
use omop_cli::pipeline::{RunOutcome, run_manifest};
use omop_cli::summary::{SummaryStyle, render_catalogue, render_issues, render_summary};

use crate::cli::RunArgs;

pub fn run(args: &RunArgs) -> Result<RunOutcome> {
    let mut manifest = RunManifest::load(&args.config)?;
    if let Some(dir) = &args.output_dir {
        manifest.output_dir.clone_from(dir);
    }
    if args.strict {
        manifest.options.strict_validation = true;
    }

    let spinner = spinner("transforming tables");
    let outcome = run_manifest(&manifest, !args.dry_run);
    spinner.finish_and_clear();
    let outcome = outcome?;

    let style = summary_style();
    println!("Output: {}", outcome.output_dir.display());
    println!("{}", render_summary(&outcome.report.summaries(), style));
    if let Some(issues) = render_issues(&outcome.report.summaries(), style) {
        println!();
        println!("Warnings:");
        println!("{issues}");
    }
    for path in &outcome.written {
        info!(file = %path.display(), "wrote output");
    }
    Ok(outcome)
}

pub fn tables() {
    println!("{}", render_catalogue(summary_style()));
}

fn summary_style() -> SummaryStyle {
    if io::stdout().is_terminal() {
        SummaryStyle::Styled
    } else {
        SummaryStyle::Plain
    }
}

fn spinner(message: &str) -> ProgressBar {
    if !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {elapsed_precise} {msg}")
    {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
