mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use clawguard::config::Config;
use clawguard::scan;
use colored::Colorize;

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            no_llm,
            json,
            output,
            quiet,
            config: config_path,
        } => {
            if !path.exists() {
                eprintln!("Error: path does not exist: {}", path.display());
                std::process::exit(4);
            }

            let mut config = match Config::load(config_path.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(4);
                }
            };
            if no_llm {
                config.analyzers.semantic = false;
            }

            let report = match scan(&path, &config) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(4);
                }
            };

            let formatted = if json {
                serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
                    eprintln!("Error serializing report: {e}");
                    std::process::exit(4);
                })
            } else {
                format_summary(&report)
            };

            if let Some(out_path) = &output {
                if let Err(e) = std::fs::write(out_path, &formatted) {
                    eprintln!("Error writing output: {e}");
                    std::process::exit(4);
                }
                if quiet {
                    println!("{}", minimal_summary(&report));
                } else {
                    eprintln!("Report written to {}", out_path.display());
                }
            } else if quiet {
                println!("{}", minimal_summary(&report));
            } else {
                println!("{formatted}");
            }

            std::process::exit(report.score.recommendation.exit_code());
        }
    }
}

/// The `--quiet` rendering (§6): score and recommendation only, no findings
/// or analyzer list.
fn minimal_summary(report: &clawguard::Report) -> String {
    format!(
        "{} ({}) {}",
        report.score.value, report.score.grade, report.score.recommendation
    )
}

fn format_summary(report: &clawguard::Report) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} — {}\n",
        report.skill_ref.name.bold(),
        report.skill_ref.path.display()
    ));
    out.push_str(&format!(
        "Score: {} ({})  Recommendation: {}\n",
        report.score.value, report.score.grade, report.score.recommendation
    ));
    out.push_str(&format!("{}\n", report.score.summary));
    if !report.score.top_risks.is_empty() {
        out.push_str("\nTop risks:\n");
        for risk in &report.score.top_risks {
            out.push_str(&format!("  - {risk}\n"));
        }
    }
    out.push_str(&format!(
        "\n{} finding(s) from {} analyzer(s): {}\n",
        report.findings.len(),
        report.analyzers_run.len(),
        report.analyzers_run.join(", ")
    ));
    out
}
