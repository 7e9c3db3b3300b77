//! waitlist CLI: host-stand operator interface to the queue.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::warn;
use waitlist::config::Config;
use waitlist::export::DEFAULT_FILE_NAME;
use waitlist::model::{CustomerId, CustomerRecord, NewCustomer, State};
use waitlist::service::Waitlist;
use waitlist::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "waitlist", about = "Walk-in waitlist for a single-location queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a party to the end of the waitlist
    Register {
        name: String,
        party_size: u32,
        /// Must start with the configured prefix (default +971)
        mobile_number: String,
    },
    /// Seat a waiting party at a table
    Seat {
        /// Customer ID (full UUID or prefix)
        id: String,
        table: u32,
    },
    /// Mark a seated party as finished
    Finish { id: String },
    /// Remove a waiting party from the line
    Cancel { id: String },
    /// Text a waiting or seated party
    Call { id: String },
    /// List parties
    List {
        /// waiting | seated | finished | canceled (default: all)
        #[arg(long)]
        state: Option<State>,
    },
    /// Show one party
    Show { id: String },
    /// Queue summary
    Stats,
    /// Write the activity log as CSV
    Export {
        #[arg(long, default_value = DEFAULT_FILE_NAME)]
        out: PathBuf,
        /// Print to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
    /// Print the audit trail
    Events {
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "waitlist".to_string(),
        log_level: config.log_level.clone(),
    })?;

    if config.db_path.is_none() {
        warn!("WAITLIST_DB_PATH is not set; changes will not outlive this command");
    }

    let waitlist = Waitlist::from_config(&config)?;
    let operator = config.operator.as_ref().ok_or_else(|| {
        anyhow::anyhow!("WAITLIST_OPERATOR_EMAIL and WAITLIST_OPERATOR_PASSWORD are required")
    })?;
    waitlist.login(&operator.email, &operator.password).await?;

    let result = run(&waitlist, cli.command).await;

    waitlist.logout().await.ok();
    guard.force_flush();
    result
}

async fn run(waitlist: &Waitlist, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Register {
            name,
            party_size,
            mobile_number,
        } => {
            let record = waitlist
                .register(NewCustomer::new(name, party_size, mobile_number))
                .await?;
            let board = waitlist.board().await?;
            let position = board
                .waiting
                .iter()
                .find(|e| e.record.id == record.id)
                .map(|e| e.position + 1)
                .unwrap_or_default();
            println!("Registered: {} (queue position {position})", record.id);
        }
        Command::Seat { id, table } => {
            let id = resolve_id(waitlist, &id).await?;
            let seated = waitlist.seat(id, table).await?;
            println!("Seated: {} at table {table}", seated.record.name);
            if let Some(notice) = seated.notice {
                notice.await.ok();
            }
        }
        Command::Finish { id } => {
            let id = resolve_id(waitlist, &id).await?;
            let record = waitlist.finish(id).await?;
            println!(
                "Finished: {} (seated {} min)",
                record.name,
                record.seated_duration_minutes().unwrap_or_default()
            );
        }
        Command::Cancel { id } => {
            let id = resolve_id(waitlist, &id).await?;
            let record = waitlist.cancel(id).await?;
            println!("Canceled: {}", record.name);
        }
        Command::Call { id } => {
            let id = resolve_id(waitlist, &id).await?;
            let receipt = waitlist.call(id).await?;
            println!("Message sent: {}", receipt.provider_id);
        }
        Command::List { state } => cmd_list(waitlist, state).await?,
        Command::Show { id } => {
            let id = resolve_id(waitlist, &id).await?;
            let record = waitlist
                .get(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no customer {id}"))?;
            print_record(&record);
        }
        Command::Stats => {
            let stats = waitlist.stats().await?;
            let minutes = |m: Option<i64>| m.map(|m| format!("{m} min")).unwrap_or("-".into());
            println!("Waiting:         {}", stats.waiting);
            println!("Seated:          {}", stats.seated);
            println!("Finished:        {}", stats.finished);
            println!("Canceled:        {}", stats.canceled);
            println!("Average wait:    {}", minutes(stats.average_wait_minutes));
            println!("Longest wait:    {}", minutes(stats.longest_wait_minutes));
            println!("Average seated:  {}", minutes(stats.average_seated_minutes));
        }
        Command::Export { out, stdout } => {
            let log = waitlist.export_log().await?;
            if stdout {
                println!("{}", log.to_csv());
            } else {
                log.write_csv(&out)?;
                println!("Wrote {} row(s) to {}", log.len(), out.display());
            }
        }
        Command::Events { since } => {
            for event in waitlist.events_since(since).await? {
                println!(
                    "{:>5}  {}  {}",
                    event.seq,
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    serde_json::to_string(&event.kind).unwrap_or_else(|_| format!("{:?}", event.kind))
                );
            }
        }
    }
    Ok(())
}

async fn cmd_list(waitlist: &Waitlist, state: Option<State>) -> anyhow::Result<()> {
    let board = waitlist.board().await?;
    let show = |s: State| state.is_none_or(|wanted| wanted == s);

    if show(State::Waiting) {
        println!("WAITING");
        for entry in &board.waiting {
            let next = if entry.is_next() { "  <- next" } else { "" };
            println!(
                "  {:>3}. {:<8}  {:<20}  party of {:<3}  {:<15}  waiting {} min{next}",
                entry.position + 1,
                entry.record.id,
                entry.record.name,
                entry.record.party_size,
                entry.record.mobile_number,
                entry.wait_minutes,
            );
        }
    }
    if show(State::Seated) {
        println!("SEATED");
        for entry in &board.seated {
            println!(
                "       {:<8}  {:<20}  table {:<4}  since {}",
                entry.record.id,
                entry.record.name,
                entry.record.table_number.unwrap_or_default(),
                entry
                    .record
                    .seated_time
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_default(),
            );
        }
    }
    if show(State::Finished) {
        println!("FINISHED");
        for entry in &board.finished {
            let seated = entry
                .seated_minutes
                .map(|m| format!("{m} min"))
                .unwrap_or_else(|| "N/A".to_string());
            println!(
                "       {:<8}  {:<20}  time seated {seated}",
                entry.record.id, entry.record.name
            );
        }
    }
    if show(State::Canceled) {
        println!("CANCELED");
        for record in &board.canceled {
            println!(
                "       {:<8}  {:<20}  canceled {}",
                record.id,
                record.name,
                record
                    .canceled_time
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_default(),
            );
        }
    }
    Ok(())
}

/// Accept a full UUID or an unambiguous prefix of one.
async fn resolve_id(waitlist: &Waitlist, id_str: &str) -> anyhow::Result<CustomerId> {
    if let Ok(id) = id_str.parse::<CustomerId>() {
        return Ok(id);
    }

    let board = waitlist.board().await?;
    let all = board
        .waiting
        .iter()
        .map(|e| &e.record)
        .chain(board.seated.iter().map(|e| &e.record))
        .chain(board.finished.iter().map(|e| &e.record))
        .chain(board.canceled.iter());

    let matches: Vec<CustomerId> = all
        .filter(|r| r.id.0.to_string().starts_with(id_str))
        .map(|r| r.id)
        .collect();

    match matches.as_slice() {
        [] => anyhow::bail!("no customer matching '{id_str}'"),
        [id] => Ok(*id),
        many => anyhow::bail!(
            "{} customers match '{id_str}'; use more characters",
            many.len()
        ),
    }
}

fn print_record(record: &CustomerRecord) {
    let time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.with_timezone(&chrono::Local).to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    println!("ID:          {}", record.id.0);
    println!("Name:        {}", record.name);
    println!("State:       {}", record.state());
    println!("Party Size:  {}", record.party_size);
    println!("Mobile:      {} ({})", record.mobile_number, record.dial_uri());
    println!("Arrived:     {}", time(Some(record.arrival_time)));
    if let Some(table) = record.table_number {
        println!("Table:       {table}");
    }
    println!("Seated:      {}", time(record.seated_time));
    println!("Finished:    {}", time(record.finished_time));
    println!("Canceled:    {}", time(record.canceled_time));
    if let Some(minutes) = record.seated_duration_minutes() {
        println!("Time Seated: {minutes} min");
    }
}
