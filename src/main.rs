//! # ddump CLI
//!
//! Command-line interface for the ddump library.

use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use ddump::DumpError;
use ddump::archiver::{RunReport, run};
use ddump::channel::ChannelReport;
use ddump::cli::Args;
use ddump::guild::GuildReport;
use ddump::progress::stderr_progress;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = match <Args as ClapParser>::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = execute(args) {
        eprintln!();
        eprintln!("❌ Error: {}", e);
        if e.is_configuration() {
            eprintln!("Run `ddump --help` for usage.");
        }
        process::exit(1);
    }
}

fn execute(args: Args) -> Result<(), DumpError> {
    let start = Instant::now();
    let config = args.into_config()?;

    println!("📦 ddump v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎯 Target:  {}", config.target);
    println!("💾 Output:  {}", config.output_dir.display());
    if config.download_attachments {
        println!("📎 Attachments: on");
    }
    println!();

    let report = run(&config, stderr_progress())?;
    eprintln!();

    match &report {
        RunReport::Channel(channel) => print_channel(channel),
        RunReport::Guild(guild) => print_guild(guild),
    }

    println!();
    println!("✅ Done in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn print_channel(report: &ChannelReport) {
    println!(
        "📄 #{} ({}): {} messages dumped",
        report.channel.name, report.channel.id, report.records_written
    );
    println!("   {}", report.paths.text.display());
    println!("   {}", report.paths.csv.display());
    if !report.record_failures.is_empty() {
        println!("   ⚠️  {} messages skipped", report.record_failures.len());
    }
    if let Some(dir) = &report.attachment_dir {
        println!(
            "   📎 {} attachments saved to {}",
            report.attachments_downloaded,
            dir.display()
        );
    }
    for failure in &report.attachment_failures {
        println!(
            "   ⚠️  attachment of message {} not saved ({}): {}",
            failure.message_id, failure.url, failure.reason
        );
    }
    if report.stats.rate_limited > 0 {
        println!("   ⏳ rate limited {} times", report.stats.rate_limited);
    }
}

fn print_guild(report: &GuildReport) {
    println!(
        "🏰 Guild {} ({}) → {}",
        report.guild.name,
        report.guild.id,
        report.dir.display()
    );
    println!();
    for outcome in &report.channels {
        match &outcome.result {
            Ok(channel) => print_channel(channel),
            Err(e) => println!(
                "❌ #{} ({}): {}",
                outcome.channel_name, outcome.channel_id, e
            ),
        }
    }
    println!();
    println!("📊 Summary:");
    println!("   Channels dumped: {}", report.succeeded());
    println!("   Channels failed: {}", report.failed());
    println!("   Non-text channels skipped: {}", report.skipped_channels);
}
