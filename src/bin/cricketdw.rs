use clap::{Args, Parser, Subcommand};

use cricketdw::{CricketDW, EngineConfig, MatchFilter, Season, Table};

#[derive(Parser)]
#[command(name = "cricketdw", about = "Cricket analytics warehouse CLI")]
struct Cli {
    /// Database path (default: ~/.cricketdw/cricket.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Result cache TTL in seconds (default 3600)
    #[arg(long)]
    cache_ttl: Option<u64>,

    /// Store call timeout in seconds (default 5)
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by the analytics subcommands.
#[derive(Args)]
struct FilterArgs {
    /// Filter by season (e.g. 2024 or 2007/08)
    #[arg(long)]
    season: Option<String>,
    /// Filter by venue name
    #[arg(long)]
    venue: Option<String>,
    /// Matches on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,
    /// Matches on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
    /// Output as CSV
    #[arg(long)]
    csv: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Net run rate for a team
    Nrr {
        /// Team name
        team: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Powerplay scoring (overs 1-6 by default)
    Powerplay {
        /// Restrict to one batting team
        #[arg(long)]
        team: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Death-overs scoring (overs 16-20 by default)
    Death {
        /// Restrict to one batting team
        #[arg(long)]
        team: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Win rates batting first vs batting second
    ChaseDefend {
        /// Team name
        team: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Overall win/loss record for a team
    Summary {
        /// Team name
        team: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Win-percentage leaderboard across teams
    Leaderboard {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Head-to-head record for two teams
    HeadToHead {
        team1: String,
        team2: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// One season's shape: matches, teams, venues, margins
    Season {
        /// Season key (e.g. 2024 or 2007/08)
        season: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// How often the toss winner went on to win
    Toss {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Dataset completeness report with quality score
    Quality {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List matches with filters
    Matches {
        /// Filter by team name
        #[arg(long)]
        team: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Maximum results
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show warehouse status
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

impl FilterArgs {
    fn to_filter(&self) -> anyhow::Result<MatchFilter> {
        let mut filter = MatchFilter::new();
        if let Some(ref s) = self.season {
            filter = filter.season(&Season::parse(s)?);
        }
        if let Some(ref v) = self.venue {
            filter = filter.venue(v);
        }
        if let Some(ref d) = self.from {
            filter = filter.date_from(parse_date(d)?);
        }
        if let Some(ref d) = self.to {
            filter = filter.date_to(parse_date(d)?);
        }
        Ok(filter)
    }
}

fn parse_date(s: &str) -> anyhow::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid date (expected YYYY-MM-DD): {s}"))
}

fn print_table(table: &Table, output: &OutputArgs) -> anyhow::Result<()> {
    if output.json {
        println!("{}", table.to_json()?);
    } else if output.csv {
        print!("{}", table.to_csv());
    } else {
        println!("{}", table.calculator);
        for row in &table.rows {
            println!("  {:<26} {}", row.metric, row.value);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => cricketdw::Database::open_at(path).await?,
        None => cricketdw::Database::open().await?,
    };

    let mut config = EngineConfig::default();
    if let Some(ttl) = cli.cache_ttl {
        config = config.with_cache_ttl(ttl);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_query_timeout(secs);
    }
    let engine = CricketDW::new(db, config);

    match cli.command {
        Commands::Nrr {
            team,
            filter,
            output,
        } => {
            let table = engine.net_run_rate(&team, &filter.to_filter()?).await?;
            print_table(&table, &output)?;
        }
        Commands::Powerplay {
            team,
            filter,
            output,
        } => {
            let mut f = filter.to_filter()?;
            if let Some(ref t) = team {
                f = f.team(t);
            }
            let table = engine.powerplay_stats(&f).await?;
            print_table(&table, &output)?;
        }
        Commands::Death {
            team,
            filter,
            output,
        } => {
            let mut f = filter.to_filter()?;
            if let Some(ref t) = team {
                f = f.team(t);
            }
            let table = engine.death_overs_stats(&f).await?;
            print_table(&table, &output)?;
        }
        Commands::ChaseDefend {
            team,
            filter,
            output,
        } => {
            let table = engine.chase_vs_defend(&team, &filter.to_filter()?).await?;
            print_table(&table, &output)?;
        }
        Commands::Summary {
            team,
            filter,
            output,
        } => {
            let table = engine.team_summary(&team, &filter.to_filter()?).await?;
            print_table(&table, &output)?;
        }
        Commands::Leaderboard { filter, output } => {
            let table = engine.team_leaderboard(&filter.to_filter()?).await?;
            print_table(&table, &output)?;
        }
        Commands::HeadToHead {
            team1,
            team2,
            filter,
            output,
        } => {
            let table = engine
                .head_to_head(&team1, &team2, &filter.to_filter()?)
                .await?;
            print_table(&table, &output)?;
        }
        Commands::Season { season, output } => {
            let season = Season::parse(&season)?;
            let table = engine.season_summary(&season).await?;
            print_table(&table, &output)?;
        }
        Commands::Toss { filter, output } => {
            let table = engine.toss_impact(&filter.to_filter()?).await?;
            print_table(&table, &output)?;
        }
        Commands::Quality { output } => {
            let table = engine.quality_table().await?;
            print_table(&table, &output)?;
        }
        Commands::Matches {
            team,
            filter,
            limit,
            json,
        } => {
            let mut f = filter.to_filter()?.limit(limit);
            if let Some(ref t) = team {
                f = f.team(t);
            }
            let rows = engine.matches(&f).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No matches found.");
            } else {
                for row in &rows {
                    let winner = row.winner.as_deref().unwrap_or("no result");
                    println!(
                        "{}  {} vs {}  winner: {}  [{}]",
                        row.match_date.as_deref().unwrap_or("????-??-??"),
                        row.team1,
                        row.team2,
                        winner,
                        row.venue.as_deref().unwrap_or("unknown venue"),
                    );
                }
            }
        }
        Commands::Status => {
            print_status(&engine).await?;
        }
        Commands::Config { action } => {
            handle_config(&engine, action).await?;
        }
    }

    Ok(())
}

async fn print_status(engine: &CricketDW) -> anyhow::Result<()> {
    let (matches, deliveries, seasons) = engine
        .db()
        .reader()
        .call(|conn| {
            let matches = cricketdw::storage::repository::match_count(conn)?;
            let deliveries = cricketdw::storage::repository::delivery_count(conn)?;
            let seasons = cricketdw::storage::repository::list_seasons(conn)?;
            Ok::<_, rusqlite::Error>((matches, deliveries, seasons))
        })
        .await?;

    println!("Warehouse Status");
    println!("  Matches:    {matches}");
    println!("  Deliveries: {deliveries}");
    println!("  Seasons:    {}", seasons.len());
    if let (Some(first), Some(last)) = (seasons.first(), seasons.last()) {
        println!("  Range:      {first} .. {last}");
    }
    Ok(())
}

async fn handle_config(engine: &CricketDW, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let val: Option<String> = engine
                .db()
                .reader()
                .call({
                    let key = key.clone();
                    move |conn| cricketdw::storage::repository::get_config(conn, &key)
                })
                .await?;
            match val {
                Some(v) => println!("{key} = {v}"),
                None => println!("{key} is not set"),
            }
        }
        ConfigAction::Set { key, value } => {
            engine
                .db()
                .writer()
                .call(move |conn| {
                    cricketdw::storage::repository::set_config(conn, &key, &value)?;
                    Ok::<(), rusqlite::Error>(())
                })
                .await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items: Vec<(String, String)> = engine
                .db()
                .reader()
                .call(|conn| cricketdw::storage::repository::list_config(conn))
                .await?;
            if items.is_empty() {
                println!("No config values set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}
