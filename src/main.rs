use route_resolver::config::{Command, Config};
use route_resolver::routes::{self, AddressFamily, Route};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // RUST_LOG directives refine the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(path) = &config.config_path {
        tracing::info!("Loaded configuration from: {}", path.display());
    }

    match config.command {
        Command::Resolve { addresses } => {
            let resolver = route_resolver::create_with_config(&config.resolver);
            for address in addresses {
                match resolver.resolve(address) {
                    Some(index) => {
                        println!("{} -> {} ({})", address, routes::interface_name(index), index)
                    }
                    None => println!("{} -> no route", address),
                }
            }
        }
        Command::Table { ipv6, json } => {
            let family = if ipv6 {
                AddressFamily::Inet6
            } else {
                AddressFamily::Inet
            };
            let table = routes::read_system_table(family, &config.resolver)?;
            let rows: Vec<Route> = table.entries().iter().map(|e| e.describe(family)).collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                tracing::info!("{} routing table: {} routes", family, rows.len());
                for row in rows {
                    println!("{:<44} {} ({})", row.destination, row.interface, row.interface_index);
                }
            }
        }
    }

    Ok(())
}
