use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Search date (YYYY-MM-DD); lines starting with this token are extracted
    #[arg(required_unless_present = "self_test")]
    pub date: Option<String>,

    /// Input log file
    #[arg(short, long, required_unless_present = "self_test")]
    pub input: Option<PathBuf>,

    /// Output directory for the artifact (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Number of worker threads (overrides config; default: one per logical CPU)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Scan and count matches without writing the artifact
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON run summary next to the artifact
    #[arg(long)]
    pub summary: bool,

    /// Run the built-in fixture check and exit
    #[arg(long)]
    pub self_test: bool,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}

#[cfg(test)]
mod tests {
    use super::CliOptions;
    use clap::Parser;

    #[test]
    fn parses_date_and_input() {
        let opts =
            CliOptions::try_parse_from(["logsieve", "2024-12-01", "--input", "app.log"])
                .expect("parse");
        assert_eq!(opts.date.as_deref(), Some("2024-12-01"));
        assert_eq!(opts.input.as_deref(), Some(std::path::Path::new("app.log")));
        assert!(!opts.dry_run);
    }

    #[test]
    fn date_is_required_without_self_test() {
        assert!(CliOptions::try_parse_from(["logsieve"]).is_err());
        assert!(CliOptions::try_parse_from(["logsieve", "--input", "app.log"]).is_err());
    }

    #[test]
    fn self_test_needs_no_date_or_input() {
        let opts = CliOptions::try_parse_from(["logsieve", "--self-test"]).expect("parse");
        assert!(opts.self_test);
        assert!(opts.date.is_none());
    }

    #[test]
    fn parses_worker_override() {
        let opts = CliOptions::try_parse_from([
            "logsieve",
            "2024-12-01",
            "--input",
            "app.log",
            "--workers",
            "6",
        ])
        .expect("parse");
        assert_eq!(opts.workers, Some(6));
    }

    #[test]
    fn parses_dry_run_and_summary_flags() {
        let opts = CliOptions::try_parse_from([
            "logsieve",
            "2024-12-01",
            "--input",
            "app.log",
            "--dry-run",
            "--summary",
        ])
        .expect("parse");
        assert!(opts.dry_run);
        assert!(opts.summary);
    }
}
