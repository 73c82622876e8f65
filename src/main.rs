mod cli;
mod logging;
mod reporter;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use dotenv::dotenv;
use tracing::{debug, error, info};

use cli::{Cli, Commands, MergeArgs, PurgeArgs, PurgeListArgs, RuleArgs, ScanArgs};
use purgetools::config::{self, AppConfig};
use purgetools::merge::{self, UserSort};
use purgetools::notify::{self, Notifier};
use purgetools::purge::{self, PurgeRules, PurgeTarget};
use purgetools::scanner::{self, ScanOrchestrator, ScanParams};
use reporter::CliReporter;

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(logging::level_for(
        args.verbosity.verbose,
        args.verbosity.quiet,
    ));

    let config = config::load_configuration().context("Error loading configuration")?;
    debug!("Configuration: {:?}", config);

    let result = match args.command {
        Some(Commands::Scan(args)) => run_scan(&config, args),
        Some(Commands::Merge(args)) => run_merge(&config, args),
        Some(Commands::Purge(args)) => run_purge(&config, args),
        Some(Commands::PurgeList(args)) => run_purge_list(&config, args),
        Some(Commands::PrintConfig) => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = &result {
        error!("Error: {:#}", err);
    }
    result
}

fn run_scan(config: &AppConfig, args: ScanArgs) -> anyhow::Result<()> {
    let scanident = args
        .scanident
        .unwrap_or_else(purgetools::default_scanident);

    let scan_set = scanner::build_scan_set(
        &args.path,
        &config.scan.ignore_paths,
        args.dontwalk,
        config.scan.ignore_missing,
    )?;

    let mut listing: Vec<_> = scan_set.iter().collect();
    listing.sort();
    info!("Will scan following list: {:#?}", listing);

    let params = ScanParams {
        scanident,
        np: args.np,
        progress: args.progress,
        days: args.days,
        dry_run: args.dryrun,
    };
    let orchestrator = ScanOrchestrator::new(&config.scan, params, args.threads);
    let report = orchestrator.run(&scan_set, &CliReporter::new())?;

    info!(
        "Scanned {} directories in {}, {} with candidates, {} failed",
        format!("{}", report.units.len()).cyan(),
        format!("{:.2}s", report.duration.as_secs_f64()).green(),
        format!("{}", report.candidate_files().len()).yellow(),
        format!("{}", report.failed_count()).red(),
    );

    for (unit, err) in report.failures() {
        error!("{}: {}", unit.display(), err);
    }
    if report.failed_count() > 0 {
        bail!("{} of {} scans failed", report.failed_count(), report.units.len());
    }
    Ok(())
}

fn run_merge(config: &AppConfig, args: MergeArgs) -> anyhow::Result<()> {
    let output_dir = &config.scan.output_dir;
    let paths = merge::find_scan_results(output_dir, &args.scanident)?;
    info!("Merging {} files: {:#?}", paths.len(), paths);

    if args.dryrun {
        info!("--dryrun given exiting");
        return Ok(());
    }

    let cache_limit = args.cachelimit.unwrap_or(config.merge.cache_limit);
    let sorter = UserSort::new(
        output_dir,
        &args.scanident,
        cache_limit,
        config.merge.eviction.policy(),
    );
    let summary = sorter.sort(&paths)?;

    info!(
        "{} records for {} users in {} ({} handle evictions)",
        format!("{}", summary.records).cyan(),
        format!("{}", summary.users).cyan(),
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
        summary.cache.evictions,
    );

    if !args.email && config.notify.notify_path.is_none() {
        return Ok(());
    }

    let notifier = Notifier::new(
        config.notify.notify_path.as_deref(),
        config.notify.mode_bits()?,
    )?;
    let notices = notifier.publish(output_dir, &args.scanident, false)?;
    for notice in &notices {
        debug!("User purge list: {} {}", notice.username, notice.path.display());
    }

    if args.email {
        let notice_file = output_dir.join(format!("{}-notices.csv", args.scanident));
        notify::write_notices(&notice_file, &notices)?;
        info!(
            "Wrote {} notices to {}",
            notices.len(),
            notice_file.display()
        );
    }
    Ok(())
}

fn build_rules(config: &AppConfig, args: &RuleArgs) -> anyhow::Result<PurgeRules> {
    let stage = match (&args.stage, args.purge) {
        (Some(stage), _) => Some(stage.clone()),
        (None, false) => config.purge.stage_path.clone(),
        (None, true) => None,
    };

    let users = args
        .users_ignore
        .as_deref()
        .map(config::split_csv)
        .unwrap_or_default();

    Ok(PurgeRules::new(Some(args.days), args.purge, stage)?
        .with_users_ignore(users)
        .with_ctime_check(config.purge.check_ctime && !args.ignore_ctime))
}

fn run_purge(config: &AppConfig, args: PurgeArgs) -> anyhow::Result<()> {
    let rules = build_rules(config, &args.rules)?;

    let result = PurgeTarget::open(&args.file).and_then(|t| t.apply(&rules, args.rules.dryrun));
    match result {
        Ok(outcome) => {
            debug!("{}: {:?}", args.file.display(), outcome);
            Ok(())
        }
        // Expected outcomes: already handled, or not old enough yet.
        Err(e) if e.is_not_found() || e.is_under_age() => {
            info!("{}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_purge_list(config: &AppConfig, args: PurgeListArgs) -> anyhow::Result<()> {
    let rules = build_rules(config, &args.rules)?;
    let tally = purge::purge_list(&args.list, &rules, args.rules.dryrun)?;

    info!(
        "{} records: {} purged, {} staged, {} exempt, {} under age, {} already handled, {} failed",
        tally.total(),
        format!("{}", tally.purged).red(),
        format!("{}", tally.staged).yellow(),
        tally.exempt,
        tally.under_age,
        tally.missing,
        format!("{}", tally.failed).red(),
    );

    if tally.failed > 0 {
        bail!("{} files could not be handled", tally.failed);
    }
    Ok(())
}
