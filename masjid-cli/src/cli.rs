use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, Text};
use masjid_core::{
    BackendConfig, Config, Coordinate, EntryEditor, GeocoderId, ListState, ListView,
    LocationResolver, ManualLocation, Permission, Prayer, SupabaseClient,
    config::DEFAULT_TABLE,
    geocoder::geocoder_from_config,
    wire_time::parse_clock,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "masjid", version, about = "Find your location and manage masjid prayer times")]
pub struct Cli {
    /// Log diagnostics to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure backend and geocoder credentials.
    Configure,

    /// Show the current position and its address.
    Locate {
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,

        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,

        /// Grant location access without asking.
        #[arg(long)]
        yes: bool,
    },

    /// List masjids and their prayer times.
    List,

    /// Change prayer times for one masjid. Times are HH:MM.
    Edit {
        id: i64,

        #[arg(long)]
        fajar: Option<String>,
        #[arg(long)]
        zuhr: Option<String>,
        #[arg(long)]
        asar: Option<String>,
        #[arg(long)]
        magribh: Option<String>,
        #[arg(long)]
        isha: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Locate { lat, lon, yes } => locate(lat.zip(lon), yes).await,
            Command::List => list().await,
            Command::Edit { id, fajar, zuhr, asar, magribh, isha } => {
                let changes = [
                    (Prayer::Fajar, fajar),
                    (Prayer::Zuhr, zuhr),
                    (Prayer::Asar, asar),
                    (Prayer::Magribh, magribh),
                    (Prayer::Isha, isha),
                ];
                edit(id, &changes).await
            }
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    Ok(Config::load()?.with_env_overrides())
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;
    let current = cfg.backend.clone();

    let url = Text::new("Supabase project URL:")
        .with_initial_value(current.as_ref().map_or("", |b| b.url.as_str()))
        .prompt()
        .context("Failed to read project URL")?;

    let anon_key = Password::new("Supabase anon key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read anon key")?;

    let table = Text::new("Table name:")
        .with_default(current.as_ref().map_or(DEFAULT_TABLE, |b| b.table.as_str()))
        .prompt()
        .context("Failed to read table name")?;

    cfg.set_backend(BackendConfig { url: url.trim().to_string(), anon_key, table });

    let google_key = Password::new("Google Geocoding API key (leave empty to skip):")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if !google_key.trim().is_empty() {
        cfg.upsert_geocoder_api_key(GeocoderId::Google, google_key.trim().to_string());
    }

    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn locate(position: Option<(f64, f64)>, yes: bool) -> anyhow::Result<()> {
    let cfg = load_config()?;

    let coordinate = match position {
        Some((lat, lon)) => Some(Coordinate::new(lat, lon)?),
        None => cfg.home,
    };

    let consent = if yes {
        Permission::Granted
    } else {
        let allowed = Confirm::new("Allow masjid to use your location?")
            .with_default(true)
            .prompt()
            .context("Failed to read location consent")?;
        if allowed { Permission::Granted } else { Permission::Denied }
    };

    let primary = geocoder_from_config(cfg.primary_geocoder_id()?, &cfg)?;
    let fallback = geocoder_from_config(cfg.fallback_geocoder_id()?, &cfg)?;

    let resolver = LocationResolver::new(
        Arc::new(ManualLocation::new(coordinate, consent)),
        Arc::from(primary),
        Arc::from(fallback),
    );

    println!("Fetching your location...");
    resolver.resolve().await;

    print!("{}", render::location(&resolver.state()));
    for notice in resolver.take_notices() {
        eprintln!("{notice}");
    }

    Ok(())
}

async fn list() -> anyhow::Result<()> {
    let cfg = load_config()?;
    let client = SupabaseClient::connect(cfg.backend_config()?)?;

    let mut view = ListView::new();
    view.load(&client).await;
    client.close();

    println!("{}", view.render());
    Ok(())
}

async fn edit(id: i64, changes: &[(Prayer, Option<String>)]) -> anyhow::Result<()> {
    let picks = changes
        .iter()
        .filter_map(|(prayer, value)| value.as_deref().map(|v| (*prayer, v)))
        .map(|(prayer, value)| Ok((prayer, parse_clock(value)?)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if picks.is_empty() {
        return Err(anyhow!(
            "Nothing to change. Pass at least one of --fajar, --zuhr, --asar, --magribh, --isha."
        ));
    }

    let cfg = load_config()?;
    let client = SupabaseClient::connect(cfg.backend_config()?)?;

    let mut view = ListView::new();
    view.load(&client).await;

    let route = match view.state() {
        ListState::Error(msg) => Err(anyhow!("Error: {msg}")),
        _ => view.open_editor(id).ok_or_else(|| anyhow!("No masjid with id {id}")),
    };
    let route = match route {
        Ok(route) => route,
        Err(err) => {
            client.close();
            return Err(err);
        }
    };

    let mut editor = EntryEditor::from_route(&route)?;
    for (prayer, time) in picks {
        editor.open_picker(prayer);
        editor.confirm_picker(time);
    }

    let outcome = editor.submit(&client).await;
    client.close();

    println!("{}", render::editor(&editor));
    if outcome.navigate_back() {
        println!("{}", outcome.notice());
        Ok(())
    } else {
        Err(anyhow!("{}", outcome.notice()))
    }
}
