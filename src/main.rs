use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use snowflake_alloc::{SnowflakeConfig, SnowflakeId};
use tracing_subscriber::EnvFilter;

/// Allocate and inspect snowflake ids.
#[derive(Parser, Debug)]
#[command(name = "snowflake-alloc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: SnowflakeConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print freshly allocated ids
    Generate {
        /// Number of ids to allocate
        #[arg(short, long, default_value_t = 10)]
        count: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Decimal)]
        format: Format,
    },
    /// Print the fields encoded in an id
    Decode {
        /// Decimal id
        id: SnowflakeId,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Decimal,
    Parts,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Generate { count, format } => {
            let generator = cli.config.build().context("invalid generator configuration")?;
            let ids = generator
                .next_id_bulk(count)
                .context("failed to allocate ids")?;
            for id in ids {
                match format {
                    Format::Decimal => println!("{id}"),
                    Format::Parts => print_parts(id, cli.config.epoch),
                }
            }
        }
        Command::Decode { id } => print_parts(id, cli.config.epoch),
    }

    Ok(())
}

fn print_parts(id: SnowflakeId, epoch: i64) {
    let parts = id.parts();
    let issued = id
        .datetime(epoch)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{id} timestamp={} datacenter={} worker={} sequence={} issued={issued}",
        parts.timestamp, parts.datacenter_id, parts.worker_id, parts.sequence
    );
}
