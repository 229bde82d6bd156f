use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "opibot")]
#[command(author, version, about = "Telegram bot for the shared oil well register", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (webhook mode unless --polling is given)
    Run {
        /// Use long polling instead of the webhook endpoint
        #[arg(long)]
        polling: bool,
    },

    /// Write all well records to a CSV file and exit
    Export {
        /// Output file
        #[arg(short, long, default_value = "wells.csv")]
        output: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults_to_webhook() {
        let cli = Cli::try_parse_from(["opibot", "run"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { polling: false })));
    }

    #[test]
    fn test_run_polling_and_export() {
        let cli = Cli::try_parse_from(["opibot", "run", "--polling"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { polling: true })));

        let cli = Cli::try_parse_from(["opibot", "export", "--output", "out.csv"]).unwrap();
        match cli.command {
            Some(Commands::Export { output }) => assert_eq!(output, "out.csv"),
            _ => panic!("expected export"),
        }
    }
}
