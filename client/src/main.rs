use clap::{Parser, Subcommand};
use serde::Serialize;
use time::macros::format_description;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use busline_client::{
    api,
    config::{Config, LogFormat},
    fetch::FetchHook,
    models::{
        bus::{SeatQuery, SearchQuery},
        user::{LoginRequest, RegisterRequest},
    },
    ClientContext,
};

#[derive(Parser)]
#[command(name = "busline", about = "Command-line client for the bus reservation API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List cities served
    Cities,
    /// Search buses between two cities
    Search {
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
        #[arg(long, value_parser = parse_date)]
        date: time::Date,
        #[arg(long, default_value_t = 1)]
        seats: u32,
    },
    /// Show one bus with its stops
    Bus { id: i64 },
    /// Seat map for a bus between two stops
    Seats {
        bus_id: i64,
        #[arg(long)]
        from_stop: i64,
        #[arg(long)]
        to_stop: i64,
        #[arg(long, value_parser = parse_date)]
        date: time::Date,
    },
    Login {
        #[arg(long, env = "BUSLINE_EMAIL")]
        email: String,
        #[arg(long, env = "BUSLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BUSLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Print the stored user profile
    Whoami,
    /// List the signed-in user's bookings
    Bookings,
    /// Look up a booking by PNR
    Booking { pnr: String },
}

fn parse_date(s: &str) -> Result<time::Date, String> {
    time::Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn show<T>(hook: FetchHook<T>) -> anyhow::Result<()>
where
    T: serde::de::DeserializeOwned + Serialize + Clone + Send + Sync + 'static,
{
    let state = hook.wait_settled().await;
    if let Some(e) = state.error {
        anyhow::bail!("{}", e.message());
    }
    match state.data {
        Some(data) => print_json(&data),
        None => anyhow::bail!("No data returned"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (dev convenience)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let cfg = Config::from_env()?;

    // Tracing goes to stderr; stdout carries command output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    match cfg.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    let ctx = ClientContext::from_config(&cfg).map_err(|e| anyhow::anyhow!(e.message()))?;
    tracing::debug!(base_url = %cfg.api_base_url, "Client ready");

    match cli.command {
        Command::Cities => show(api::cities::list(&ctx)).await,
        Command::Search { from, to, date, seats } => {
            let query = SearchQuery {
                from_city_id: from,
                to_city_id: to,
                date,
                seats,
            };
            show(api::buses::search(&ctx, &query)).await
        }
        Command::Bus { id } => show(api::buses::details(&ctx, id)).await,
        Command::Seats {
            bus_id,
            from_stop,
            to_stop,
            date,
        } => {
            let query = SeatQuery {
                bus_id,
                from_stop_id: from_stop,
                to_stop_id: to_stop,
                date,
            };
            let hook = api::buses::seats(&ctx, &query);
            let seats = api::buses::select_stops(&hook, &query)
                .await
                .map_err(|e| anyhow::anyhow!(e.message()))?;
            match seats {
                Some(seats) => print_json(&seats),
                None => anyhow::bail!("Seat request was cancelled"),
            }
        }
        Command::Login { email, password } => {
            let req = LoginRequest { email, password };
            let user = api::auth::login(&ctx, &req)
                .await
                .map_err(|e| anyhow::anyhow!(e.message()))?;
            print_json(&user)
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let req = RegisterRequest {
                name,
                email,
                password,
            };
            let user = api::auth::register(&ctx, &req)
                .await
                .map_err(|e| anyhow::anyhow!(e.message()))?;
            print_json(&user)
        }
        Command::Logout => {
            api::auth::logout(&ctx).map_err(|e| anyhow::anyhow!(e.message()))?;
            Ok(())
        }
        Command::Whoami => match ctx.session.user() {
            Some(user) => print_json(&user),
            None => anyhow::bail!("Not logged in"),
        },
        Command::Bookings => show(api::bookings::mine(&ctx)).await,
        Command::Booking { pnr } => show(api::bookings::by_pnr(&ctx, &pnr)).await,
    }
}
