//! Interactive client for a running Noobcash node.
//!
//! Queries balance and transactions, or submits a transfer, against the
//! node given with `--node`. Responses are pretty-printed JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

/// Noobcash query client.
#[derive(Parser, Debug)]
#[command(name = "noobcash-client", version, about = "Noobcash query client")]
struct Cli {
    /// Which node to contact
    #[arg(short, long, default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the node's wallet balance
    Balance,
    /// Inspect or create transactions
    #[command(subcommand)]
    Transactions(TransactionsCommand),
}

#[derive(Subcommand, Debug)]
enum TransactionsCommand {
    /// Show the transactions of the last sealed block
    View,
    /// Create a transaction on the node
    Create {
        /// The address (public key) of the recipient
        #[arg(short, long)]
        recipient: String,
        /// The amount of Noobcash to transfer
        #[arg(short, long)]
        amount: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let http = reqwest::Client::new();

    let response = match &cli.command {
        Command::Balance => http.get(format!("{}/wallet/balance", cli.node)).send().await,
        Command::Transactions(TransactionsCommand::View) => {
            http.get(format!("{}/transactions/", cli.node)).send().await
        }
        Command::Transactions(TransactionsCommand::Create { recipient, amount }) => {
            http.post(format!("{}/transactions/create", cli.node))
                .json(&json!({ "recipient_address": recipient, "amount": amount }))
                .send()
                .await
        }
    }
    .with_context(|| format!("request to {} failed", cli.node))?;

    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .unwrap_or_else(|_| json!({ "message": "<no body>" }));

    if status.is_success() {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        Ok(())
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "status": status.as_u16(),
                "error": payload,
            }))?
        );
        anyhow::bail!("node answered {status}");
    }
}
