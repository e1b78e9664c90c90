use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use statement_summary::{
    load_accounts_csv, open_database, Config, CsvStatementParser, Pipeline, SmtpSender,
};

/// Import a single-account statement and email its summary
#[derive(Parser, Debug)]
#[command(name = "statement-summary", version)]
struct Cli {
    /// JSON configuration (SMTP settings, sender, logo)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Accounts file: account id, name, email
    #[arg(long, default_value = "accounts.csv")]
    accounts: PathBuf,

    /// Statement to import
    #[arg(long, default_value = "transactions.csv")]
    transactions: PathBuf,

    /// SQLite database file
    #[arg(long, env = "STATEMENT_DB", default_value = "stori.db")]
    db: PathBuf,

    /// Logo attached inline when the config has no logo_value
    #[arg(long, default_value = "stori_logo.png")]
    logo: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    println!("🧾 Statement Summary v{}", statement_summary::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Config
    let config = Config::from_file(&cli.config)?;
    println!("✓ Config loaded from {}", cli.config.display());

    // 2. Database + accounts
    let conn = open_database(&cli.db)
        .with_context(|| format!("Failed to open database: {}", cli.db.display()))?;
    println!("✓ Database ready: {}", cli.db.display());

    let loaded = load_accounts_csv(&conn, &cli.accounts).context("Failed to load accounts")?;
    println!("✓ Accounts loaded: {}", loaded);

    // 3. Statement → summary email
    let pipeline = Pipeline::new(&conn, CsvStatementParser::new(), SmtpSender::new(config.clone()))
        .with_logo(config.logo(Some(&cli.logo)))
        .with_fallback_recipient(config.fallback_recipient());

    let report = pipeline
        .run(&cli.transactions)
        .with_context(|| format!("Failed to process {}", cli.transactions.display()))?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Account: {}", report.account_id);
    println!(
        "✓ Inserted: {} transactions ({} duplicates skipped)",
        report.import.inserted, report.import.duplicates
    );
    println!("🎉 Summary email sent to {}!", report.recipient);

    Ok(())
}
