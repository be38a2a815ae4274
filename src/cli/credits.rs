use console::style;

use crate::cli::commands::{CreditsArgs, CreditsCommands};
use crate::db::Database;
use crate::errors::LinkshieldError;
use crate::ledger::WalletLedger;
use crate::models::TransactionType;

pub async fn handle_credits(args: CreditsArgs) -> Result<(), LinkshieldError> {
    match args.command {
        CreditsCommands::Add { user, amount, description, db } => {
            let ledger = WalletLedger::new(Database::new(&db)?);
            let txn = ledger.credit(
                &user,
                amount,
                TransactionType::Purchase,
                description.as_deref(),
                None,
            )?;
            println!(
                "Added {} credits to {} (balance: {})",
                style(amount).green(),
                user,
                txn.balance_after
            );
        }
        CreditsCommands::Balance { user, db } => {
            let ledger = WalletLedger::new(Database::new(&db)?);
            println!("{}", ledger.balance(&user)?);
        }
        CreditsCommands::History { user, db } => {
            let ledger = WalletLedger::new(Database::new(&db)?);
            let transactions = ledger.transactions(&user, 100, 0)?;
            if transactions.is_empty() {
                println!("No transactions for {}", user);
                return Ok(());
            }
            for txn in transactions {
                println!(
                    "{}  {:>4}  {:<10}  balance {:>4}  {}",
                    txn.created_at.format("%Y-%m-%d %H:%M:%S"),
                    txn.amount,
                    txn.transaction_type.as_str(),
                    txn.balance_after,
                    txn.description.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}
