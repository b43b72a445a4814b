use std::fs::File;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::application::BankService;
use crate::config::StoreConfig;
use crate::domain::{Account, AccountId, format_cents, parse_cents};
use crate::io::Exporter;
use crate::storage::{ListParams, TransferTxResult};
use crate::util::RandomGen;

/// simple-bank - atomic transfers over a SQLite ledger
#[derive(Parser)]
#[command(name = "simple-bank")]
#[command(about = "Accounts, entries and atomic transfers on a local SQLite ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SIMPLE_BANK_DB", default_value = "simple_bank.db")]
    pub database: String,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Maximum number of pooled connections
    #[arg(long, env = "SIMPLE_BANK_MAX_CONNECTIONS", default_value = "10")]
    pub max_connections: u32,

    /// How long to wait for a locked database, in milliseconds
    #[arg(long, env = "SIMPLE_BANK_BUSY_TIMEOUT_MS", default_value = "5000")]
    pub busy_timeout_ms: u64,

    /// Abandon and roll back a transaction running longer than this, in milliseconds
    #[arg(long, env = "SIMPLE_BANK_TX_TIMEOUT_MS")]
    pub tx_timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Move money from one account to another
    Transfer {
        /// Amount to transfer (e.g., "30.00" or "30")
        amount: String,

        /// Source account id
        #[arg(long)]
        from: i64,

        /// Destination account id
        #[arg(long)]
        to: i64,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the entries of an account
    Entries {
        /// Account id
        account: i64,

        #[arg(short, long, default_value = "100")]
        limit: i64,

        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// List transfers sent or received by an account
    Transfers {
        /// Account id
        account: i64,

        #[arg(short, long, default_value = "100")]
        limit: i64,

        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Show a single transfer
    #[command(name = "show")]
    ShowTransfer {
        /// Transfer id
        id: i64,
    },

    /// Verify ledger integrity
    Check {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create accounts with random owners, balances and currencies
    Seed {
        /// Number of accounts to create
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Seed for the random generator (random if omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: accounts, statement
        export_type: String,

        /// Account id (required for statement)
        #[arg(long)]
        account: Option<i64>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (default: csv)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Owner name
        owner: String,

        /// Currency code: EUR, KSH or USD
        #[arg(short, long, default_value = "EUR")]
        currency: String,

        /// Opening balance (e.g., "100.00")
        #[arg(short, long, default_value = "0")]
        balance: String,
    },

    /// Show an account
    Show {
        /// Account id
        id: i64,
    },

    /// List accounts
    List {
        #[arg(short, long, default_value = "100")]
        limit: i64,

        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Delete an account without ledger history
    Delete {
        /// Account id
        id: i64,
    },
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        StoreConfig::for_path(&self.database)
            .with_max_connections(self.max_connections)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .with_tx_timeout(self.tx_timeout_ms.map(Duration::from_millis))
    }

    pub async fn run(self) -> Result<()> {
        let config = self.store_config();

        let service = if matches!(self.command, Commands::Init) {
            BankService::init(config).await?
        } else {
            BankService::connect(config).await.with_context(|| {
                format!("Cannot open database '{}'. Run `init` first?", self.database)
            })?
        };

        match self.command {
            Commands::Init => println!("Database initialized: {}", self.database),

            Commands::Account(account_cmd) => run_account_command(&service, account_cmd).await?,

            Commands::Transfer {
                amount,
                from,
                to,
                json,
            } => {
                let amount =
                    parse_cents(&amount).context("Invalid amount format. Use '30.00' or '30'")?;
                let result = service.transfer(from, to, amount).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    print_transfer_result(&result);
                }
            }

            Commands::Entries {
                account,
                limit,
                offset,
            } => {
                let entries = service
                    .list_entries(account, ListParams { limit, offset })
                    .await?;
                if entries.is_empty() {
                    println!("No entries found.");
                } else {
                    println!("{:<8} {:>14}  {}", "ID", "AMOUNT", "CREATED");
                    println!("{}", "-".repeat(50));
                    for entry in entries {
                        println!(
                            "{:<8} {:>14}  {}",
                            entry.id,
                            format_cents(entry.amount),
                            entry.created_at.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }
            }

            Commands::Transfers {
                account,
                limit,
                offset,
            } => {
                let transfers = service
                    .list_transfers(account, account, ListParams { limit, offset })
                    .await?;
                if transfers.is_empty() {
                    println!("No transfers found.");
                } else {
                    println!(
                        "{:<8} {:>6} {:>6} {:>14} {:>14}  {}",
                        "ID", "FROM", "TO", "AMOUNT", "NET", "CREATED"
                    );
                    println!("{}", "-".repeat(75));
                    for t in transfers {
                        println!(
                            "{:<8} {:>6} {:>6} {:>14} {:>14}  {}",
                            t.id,
                            t.from_account_id,
                            t.to_account_id,
                            format_cents(t.amount),
                            format_cents(t.effect_on(account)),
                            t.created_at.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }
            }

            Commands::ShowTransfer { id } => {
                let transfer = service.get_transfer(id).await?;
                println!("Transfer: {}", transfer.id);
                println!("  From:    {}", transfer.from_account_id);
                println!("  To:      {}", transfer.to_account_id);
                println!("  Amount:  {}", format_cents(transfer.amount));
                println!(
                    "  Created: {}",
                    transfer.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }

            Commands::Check { json } => {
                let report = service.check_integrity().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("Accounts:  {}", report.stats.account_count);
                    println!("Transfers: {}", report.stats.transfer_count);
                    println!("Entries:   {}", report.stats.entry_count);
                    if report.is_ok() {
                        println!("Ledger OK");
                    } else {
                        println!("Ledger has {} issue(s):", report.issues.len());
                        for issue in &report.issues {
                            println!("  - {}", issue);
                        }
                    }
                }
                if !report.is_ok() {
                    bail!("integrity check failed");
                }
            }

            Commands::Seed { count, seed } => {
                let mut random = match seed {
                    Some(seed) => RandomGen::seeded(seed),
                    None => RandomGen::from_entropy(),
                };
                let accounts = service.seed_accounts(&mut random, count).await?;
                for account in &accounts {
                    print_account_line(account);
                }
                eprintln!("Created {} accounts", accounts.len());
            }

            Commands::Export {
                export_type,
                account,
                output,
                format,
            } => {
                let job = ExportJob::parse(&export_type, &format, account)?;
                let writer: Box<dyn Write> = match &output {
                    Some(path) => Box::new(
                        File::create(path).with_context(|| format!("Cannot create '{}'", path))?,
                    ),
                    None => Box::new(io::stdout()),
                };
                let exporter = Exporter::new(&service);

                let count = match job {
                    ExportJob::AccountsCsv => exporter.export_accounts_csv(writer).await?,
                    ExportJob::StatementCsv(id) => exporter.export_statement_csv(id, writer).await?,
                    ExportJob::StatementJson(id) => {
                        exporter.export_statement_json(id, writer).await?
                    }
                };
                eprintln!("Exported {} rows", count);
            }
        }

        Ok(())
    }
}

/// A validated export request, checked before any output file is opened.
#[derive(Debug, PartialEq, Eq)]
enum ExportJob {
    AccountsCsv,
    StatementCsv(AccountId),
    StatementJson(AccountId),
}

impl ExportJob {
    fn parse(kind: &str, format: &str, account: Option<AccountId>) -> Result<Self> {
        match (kind, format) {
            ("accounts", "csv") => Ok(Self::AccountsCsv),
            ("statement", "csv" | "json") => {
                let id = account.context("--account is required for statement")?;
                Ok(if format == "csv" {
                    Self::StatementCsv(id)
                } else {
                    Self::StatementJson(id)
                })
            }
            (kind, format) => bail!("Cannot export '{}' as '{}'", kind, format),
        }
    }
}

async fn run_account_command(service: &BankService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            owner,
            currency,
            balance,
        } => {
            let balance =
                parse_cents(&balance).context("Invalid balance format. Use '100.00' or '100'")?;
            let account = service
                .create_account(owner, currency.to_uppercase(), balance)
                .await?;
            println!(
                "Created account {} for {} ({} {})",
                account.id,
                account.owner,
                format_cents(account.balance),
                account.currency
            );
        }

        AccountCommands::Show { id } => {
            let account = service.get_account(id).await?;
            println!("Account: {}", account.id);
            println!("  Owner:    {}", account.owner);
            println!("  Currency: {}", account.currency);
            println!("  Balance:  {}", format_cents(account.balance));
            println!(
                "  Created:  {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        AccountCommands::List { limit, offset } => {
            let accounts = service.list_accounts(ListParams { limit, offset }).await?;
            if accounts.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }
            println!("{:<8} {:<20} {:<8} {:>14}", "ID", "OWNER", "CURRENCY", "BALANCE");
            println!("{}", "-".repeat(53));
            for account in &accounts {
                print_account_line(account);
            }
        }

        AccountCommands::Delete { id } => {
            service.delete_account(id).await?;
            println!("Deleted account {}", id);
        }
    }
    Ok(())
}

fn print_account_line(account: &Account) {
    println!(
        "{:<8} {:<20} {:<8} {:>14}",
        account.id,
        account.owner,
        account.currency,
        format_cents(account.balance)
    );
}

fn print_transfer_result(result: &TransferTxResult) {
    println!(
        "Transfer {}: {} from account {} to account {}",
        result.transfer.id,
        format_cents(result.transfer.amount),
        result.from_account.id,
        result.to_account.id
    );
    println!(
        "  Account {} balance: {}",
        result.from_account.id,
        format_cents(result.from_account.balance)
    );
    println!(
        "  Account {} balance: {}",
        result.to_account.id,
        format_cents(result.to_account.balance)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_job_accepts_known_combinations() {
        assert_eq!(
            ExportJob::parse("accounts", "csv", None).unwrap(),
            ExportJob::AccountsCsv
        );
        assert_eq!(
            ExportJob::parse("statement", "csv", Some(3)).unwrap(),
            ExportJob::StatementCsv(3)
        );
        assert_eq!(
            ExportJob::parse("statement", "json", Some(3)).unwrap(),
            ExportJob::StatementJson(3)
        );
    }

    #[test]
    fn test_export_job_rejects_bad_requests() {
        assert!(ExportJob::parse("foo", "csv", None).is_err());
        assert!(ExportJob::parse("accounts", "json", None).is_err());
        assert!(ExportJob::parse("statement", "xml", Some(1)).is_err());
        assert!(ExportJob::parse("statement", "csv", None).is_err());
    }

    #[tokio::test]
    async fn test_bad_export_leaves_existing_output_untouched() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let db = dir.path().join("bank.db");
        let out = dir.path().join("out.csv");
        std::fs::write(&out, "keep me")?;

        let cli = Cli::try_parse_from([
            "simple-bank",
            "--database",
            db.to_str().unwrap(),
            "export",
            "foo",
            "--output",
            out.to_str().unwrap(),
        ])?;
        BankService::init(cli.store_config()).await?;

        assert!(cli.run().await.is_err());
        assert_eq!(std::fs::read_to_string(&out)?, "keep me");

        Ok(())
    }
}
