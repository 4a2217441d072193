use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use factored::FactoredInteger;
use factored::partition::{Mode, Partitions};
use itertools::Itertools;
use log::{info, warn};
use serde_json::json;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Prime factorizations, divisor functions and integer partitions.
#[derive(Parser, Debug)]
#[command(name = "factored", version, about, long_about = None)]
struct Cli {
    /// Log level passed to the console logger
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    /// Print results as JSON, one document per line
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the prime factorization of each number
    Factor {
        #[arg(required = true)]
        numbers: Vec<String>,
    },

    /// Print the divisors and multiplicative functions of a number
    Divisors {
        number: String,

        /// Power of the divisors to sum
        #[arg(short, long, default_value_t = 1)]
        k: u32,
    },

    /// Print every partition of a number, then how many there were
    Partitions {
        n: u32,

        /// Smallest part allowed
        #[arg(long, default_value_t = 1)]
        min: u32,

        /// Largest part allowed; defaults to n
        #[arg(long)]
        max: Option<u32>,

        /// Enumerate compositions (ordered) instead of partitions
        #[arg(short, long)]
        compositions: bool,
    },
}

fn parse(number: &str) -> anyhow::Result<FactoredInteger> {
    number
        .parse()
        .with_context(|| format!("Invalid argument {number}"))
}

fn factor(numbers: &[String], json: bool) -> anyhow::Result<()> {
    for number in numbers {
        let factored = parse(number)?;
        if json {
            println!("{}", serde_json::to_string(&factored)?);
        } else {
            println!("{factored}");
        }
    }
    Ok(())
}

fn divisors(number: &str, k: u32, json: bool) -> anyhow::Result<()> {
    let factored = parse(number)?;
    let divisors = factored.divisors();
    let sigma = factored.sigma_k(k);
    if json {
        let report = json!({
            "number": factored,
            "divisors": divisors.iter().map(ToString::to_string).collect_vec(),
            "sigma": { "k": k, "value": sigma },
            "moebius": factored.moebius(),
            "core": factored.core(),
            "omega": factored.omega(),
            "big_omega": factored.big_omega(),
            "is_square": factored.is_square(),
        });
        println!("{report}");
    } else {
        println!("{factored}");
        println!("divisors: {}", divisors.iter().join(" "));
        println!("sigma_{k}: {sigma}");
        println!("moebius: {}", factored.moebius());
        println!("core: {}", factored.core());
        println!(
            "omega: {}, big omega: {}",
            factored.omega(),
            factored.big_omega()
        );
        println!("square: {}", factored.is_square());
    }
    Ok(())
}

fn partitions(n: u32, min: u32, max: Option<u32>, mode: Mode, json: bool) {
    let max = max.unwrap_or(n);
    let generator = Partitions::with_bounds(n, min, max, mode);
    if !generator.has_next() {
        warn!("No {mode:?} of {n} with parts in [{min}, {max}]");
    }
    let mut count: usize = 0;
    for parts in generator {
        count += 1;
        if json {
            println!("{}", json!(parts));
        } else {
            println!(" {}", parts.iter().join(" "));
        }
    }
    info!("{count} tuples of mode {mode:?} for {n}");
    if !json {
        println!("# {count}");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    simple_log::console(cli.log_level.as_str()).map_err(|e| anyhow!("{e}"))?;
    match cli.command {
        Command::Factor { numbers } => factor(&numbers, cli.json)?,
        Command::Divisors { number, k } => divisors(&number, k, cli.json)?,
        Command::Partitions {
            n,
            min,
            max,
            compositions,
        } => {
            let mode = if compositions {
                Mode::Composition
            } else {
                Mode::Partition
            };
            partitions(n, min, max, mode, cli.json);
        }
    }
    Ok(())
}
