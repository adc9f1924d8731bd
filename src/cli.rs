use clap::{Args, Parser, Subcommand};

use crate::sandbox::Language;

#[derive(Parser, Debug, Clone)]
#[command(name = "kisan", about = "Project Kisan farmer assistant", version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Look up mandi prices for a crop.
    Prices {
        /// Crop name, e.g. "tomato".
        #[arg(value_name = "CROP")]
        crop: String,

        /// Restrict to a state.
        #[arg(long)]
        state: Option<String>,

        #[command(flatten)]
        output: LookupFlags,
    },

    /// List government schemes for farmers.
    Schemes {
        /// Restrict to a category, e.g. "insurance".
        #[arg(long)]
        category: Option<String>,

        #[command(flatten)]
        output: LookupFlags,
    },

    /// Run a short snippet in the sandbox.
    Run {
        /// Snippet language.
        #[arg(long, short = 'l', default_value = "python", value_parser = clap::value_parser!(Language))]
        lang: Language,

        /// Wall-clock limit in milliseconds (defaults to CODE_EXECUTION_TIMEOUT_MS).
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,

        /// Code to run; read from stdin when omitted.
        #[arg(value_name = "CODE")]
        code: Option<String>,
    },

    /// Read or update the assistant's key/value memory.
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct LookupFlags {
    /// Skip the AI model and go straight to the database.
    #[arg(long = "no-ai")]
    pub no_ai: bool,

    /// Print the raw result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MemoryAction {
    /// Print one value.
    Get { key: String },
    /// Store a value (parsed as JSON when possible, else kept as text).
    Set { key: String, value: String },
    /// Delete a key.
    Rm { key: String },
    /// Print every entry.
    List,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
