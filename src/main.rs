use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use logsieve::{cli, config, logging, pipeline, selftest, sink, source, util};

fn main() -> Result<()> {
    logging::init_logging();

    let cli_opts = cli::parse();

    if cli_opts.self_test {
        selftest::run_self_test()?;
        info!("self-test finished");
        return Ok(());
    }

    let loaded = config::load_config(cli_opts.config_path.as_deref())?;
    let cfg = loaded.config;

    // clap guarantees both are present unless --self-test was given
    let Some(search_date) = cli_opts.date.clone() else {
        bail!("usage: logsieve <YYYY-MM-DD> --input <FILE>");
    };
    let Some(input_path) = cli_opts.input.clone() else {
        bail!("usage: logsieve <YYYY-MM-DD> --input <FILE>");
    };

    if !util::is_valid_search_date(&search_date) {
        bail!("invalid search date {search_date:?}: expected YYYY-MM-DD");
    }

    let workers = config::resolve_workers(&cfg, cli_opts.workers);
    let output_dir = cli_opts.output.clone().unwrap_or_else(|| cfg.output_dir.clone());

    info!(
        "starting run_id={} input={} output={} workers={} date={}",
        cfg.run_id,
        input_path.display(),
        output_dir.display(),
        workers,
        search_date
    );

    let log_source = Arc::new(source::LogFile::open(&input_path)?);

    util::ensure_output_dir(&output_dir)?;
    let artifact_path = sink::output_path(&output_dir, &search_date);
    let match_sink: Box<dyn sink::MatchSink> = if cli_opts.dry_run {
        Box::new(sink::NullSink)
    } else {
        Box::new(sink::TextFileSink::create(&artifact_path)?)
    };

    let cancel_flag = Arc::new(AtomicBool::new(false));
    {
        let flag = cancel_flag.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    let stats = pipeline::run_scan_with_cancel(
        log_source,
        &search_date,
        match_sink,
        workers,
        cancel_flag,
    )?;

    if cli_opts.summary {
        let summary = pipeline::RunSummary {
            run_id: cfg.run_id.clone(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: loaded.config_hash.clone(),
            search_date: search_date.clone(),
            input_path: input_path.display().to_string(),
            output_path: (!cli_opts.dry_run).then(|| artifact_path.display().to_string()),
            bytes_scanned: stats.bytes_scanned,
            chunks_processed: stats.chunks_processed,
            lines_matched: stats.lines_matched,
            lines_written: stats.lines_written,
            failed_chunks: stats.failed_chunks.iter().map(|f| f.chunk_id).collect(),
            elapsed_seconds: stats.elapsed.as_secs_f64(),
            cancelled: stats.cancelled,
        };
        let summary_path = output_dir.join(format!("summary_{search_date}.json"));
        std::fs::write(&summary_path, serde_json::to_vec_pretty(&summary)?)?;
        info!("run summary written to {}", summary_path.display());
    }

    if !stats.failed_chunks.is_empty() || stats.sink_errors > 0 {
        for failure in &stats.failed_chunks {
            warn!("chunk {} failed: {}", failure.chunk_id, failure.cause);
        }
        bail!(
            "scan incomplete: {} chunk failure(s), {} sink error(s); output may be missing lines",
            stats.failed_chunks.len(),
            stats.sink_errors
        );
    }

    if stats.cancelled {
        warn!("scan cancelled before completion; output is incomplete");
        return Ok(());
    }

    if cli_opts.dry_run {
        info!(
            "dry run matched {} lines in {:.3}s",
            stats.lines_matched,
            stats.elapsed.as_secs_f64()
        );
    } else {
        info!(
            "extracted {} lines to {} in {:.3}s",
            stats.lines_written,
            artifact_path.display(),
            stats.elapsed.as_secs_f64()
        );
    }

    Ok(())
}
