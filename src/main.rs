use std::{
    io::{self, Read},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use kisan::{
    advisor::{Advisor, PriceQuery},
    cli::{Cli, Command, MemoryAction},
    config::Config,
    printer,
    sandbox::SandboxedExecutor,
    store::MemoryStore,
};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Load config
    let cfg = Config::load();
    kisan::logging::init(&cfg, args.verbose);

    let stdout_is_tty = io::stdout().is_terminal();

    match args.command {
        Command::Prices { crop, state, output } => {
            let mut advisor = Advisor::from_config(&cfg)?;
            if output.no_ai {
                advisor = advisor.without_ai();
            }
            let mut query = PriceQuery::new(crop);
            if let Some(state) = state {
                query = query.in_state(state);
            }
            let result = advisor.market_prices(&query).await;
            let title = match &query.state {
                Some(s) => format!("Mandi prices: {} ({})", query.crop, s),
                None => format!("Mandi prices: {}", query.crop),
            };
            printer::print_resolution(&title, &result, stdout_is_tty && !output.json);
        }
        Command::Schemes { category, output } => {
            let mut advisor = Advisor::from_config(&cfg)?;
            if output.no_ai {
                advisor = advisor.without_ai();
            }
            let result = advisor.schemes(category.as_deref()).await;
            let title = match &category {
                Some(c) => format!("Government schemes: {c}"),
                None => "Government schemes".to_string(),
            };
            printer::print_resolution(&title, &result, stdout_is_tty && !output.json);
        }
        Command::Run { lang, timeout_ms, code } => {
            let source = match code {
                Some(code) => code,
                None if !io::stdin().is_terminal() => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
                None => bail!("Provide code as an argument or via stdin"),
            };
            let executor = SandboxedExecutor::from_config(&cfg);
            let mut request = executor.request(lang, source);
            if let Some(ms) = timeout_ms {
                request = request.with_timeout(Duration::from_millis(ms));
            }
            let result = executor.execute(&request).await;
            printer::print_execution(&result);
            if result.truncated_or_failed() {
                std::process::exit(1);
            }
        }
        Command::Memory { action } => {
            let memory = MemoryStore::from_config(&cfg);
            match action {
                MemoryAction::Get { key } => match memory.get(&key)? {
                    Some(value) => println!("{}", display_value(&value)),
                    None => bail!("no memory entry for {key}"),
                },
                MemoryAction::Set { key, value } => {
                    let parsed = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
                    memory.set(&key, parsed).with_context(|| format!("saving {key}"))?;
                }
                MemoryAction::Rm { key } => {
                    if !memory.remove(&key)? {
                        bail!("no memory entry for {key}");
                    }
                }
                MemoryAction::List => {
                    for (k, v) in memory.entries()? {
                        println!("{k}={}", display_value(&v));
                    }
                }
            }
        }
    }

    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
