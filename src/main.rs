use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use plant_care::{
    CombinedNotifier, Notifier, SystemClock,
    api::PlantApiClient,
    collection::Collection,
    config::AppConfig,
    error::ApiError,
    export,
    library::{self, enrich},
    model::{
        CareDifficulty, Credentials, LightPreference, NewLibraryPlant, NewUserPlant,
        Registration, UserPlantUpdate,
    },
    notification::{Inbox, time_ago},
    reminder::ReminderTracker,
    session::{Session, TokenStore},
    stats,
    watering,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "plant-care")]
#[command(about = "Plant collection tracker - commands or reminder daemon")]
struct Args {
    /// Run in daemon mode (poll plants and notifications, send reminders)
    #[arg(long)]
    daemon: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show the signed-in profile
    Profile,
    /// List your plants and their watering status
    Plants,
    /// Add a library plant to your collection
    Add {
        library_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Rename a plant or change its image (empty value clears it)
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a plant from your collection
    Remove { id: i64 },
    /// Record a watering
    Water { id: i64 },
    /// Browse the plant library
    Library { query: Option<String> },
    /// Add a plant to the library (admin)
    LibraryAdd {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value_t = 7)]
        interval: i64,
        #[arg(long, default_value = "sun")]
        light: String,
        #[arg(long, default_value = "easy")]
        difficulty: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Delete a plant from the library (admin)
    LibraryDelete { id: i64 },
    /// Library statistics (admin)
    Stats,
    /// Show unread notifications
    Notifications,
    /// Export your collection to CSV
    Export {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("plant_care=debug");

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let config = Arc::new(config);

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let store = TokenStore::new(config.storage.token_path());
    let session = store.restore_session()?;
    let mut app = App {
        config,
        store,
        session,
    };

    rt.block_on(async move {
        if args.daemon {
            return app.run_daemon().await;
        }
        match args.command {
            Some(command) => app.run_command(command).await,
            None => bail!("No command given. Run with --help or --daemon"),
        }
    })
}

struct App {
    config: Arc<AppConfig>,
    store: TokenStore,
    session: Session,
}

impl App {
    fn client(&self) -> Result<PlantApiClient> {
        let client = PlantApiClient::new(self.config.api.base_url.clone(), &self.config.network)?;
        Ok(match self.session.token() {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    fn require_login(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not logged in. Run `plant-care login` first");
        }
        Ok(())
    }

    /// Drop the stored token when the service rejects it.
    fn api_error(&mut self, error: ApiError) -> anyhow::Error {
        if self.session.handle_error(&error) {
            if let Err(e) = self.store.clear() {
                tracing::warn!("Failed to clear token file: {}", e);
            }
        }
        error.into()
    }

    async fn ensure_library(&mut self, client: &PlantApiClient) -> Result<()> {
        if self.session.library().is_populated() {
            return Ok(());
        }
        match client.fetch_library().await {
            Ok(plants) => {
                self.session.library_mut().populate(plants);
                Ok(())
            }
            Err(e) => Err(self.api_error(e)),
        }
    }

    async fn ensure_admin(&mut self, client: &PlantApiClient) -> Result<()> {
        if self.session.profile().is_none() {
            match client.profile().await {
                Ok(profile) => self.session.set_profile(profile),
                Err(e) => return Err(self.api_error(e)),
            }
        }
        if !self.session.is_admin() {
            bail!("This command requires an administrator account");
        }
        Ok(())
    }

    async fn refresh(&mut self, client: &PlantApiClient, collection: &mut Collection) -> Result<()> {
        let ticket = collection.begin_refresh();
        match client.fetch_user_plants().await {
            Ok(plants) => {
                collection.apply_refresh(ticket, plants);
                Ok(())
            }
            Err(e) => Err(self.api_error(e)),
        }
    }

    async fn run_command(&mut self, command: Command) -> Result<()> {
        let client = self.client()?;
        let clock = SystemClock;

        match command {
            Command::Register {
                username,
                email,
                password,
                first_name,
                last_name,
            } => {
                let registration = Registration {
                    username,
                    email,
                    password,
                    first_name,
                    last_name,
                };
                client.register(&registration).await?;
                println!("Account created. Run `plant-care login` to sign in.");
            }
            Command::Login { email, password } => {
                let token = client.login(&Credentials { email, password }).await?;
                self.store.save(&token)?;
                self.session.login(token);
                println!("Logged in.");
            }
            Command::Logout => {
                self.session.logout();
                self.store.clear()?;
                println!("Logged out.");
            }
            Command::Profile => {
                self.require_login()?;
                let profile = client.profile().await.map_err(|e| self.api_error(e))?;
                println!(
                    "{} ({} {}) <{}>{}",
                    profile.username,
                    profile.first_name,
                    profile.last_name,
                    profile.email,
                    if profile.is_admin() { " [admin]" } else { "" }
                );
            }
            Command::Plants => {
                self.require_login()?;
                self.ensure_library(&client).await?;
                let mut collection = Collection::new();
                self.refresh(&client, &mut collection).await?;
                self.print_collection(&collection);
            }
            Command::Add {
                library_id,
                name,
                image,
            } => {
                self.require_login()?;
                let request = NewUserPlant::new(library_id, name.as_deref(), image.as_deref());
                let created = client
                    .add_user_plant(&request)
                    .await
                    .map_err(|e| self.api_error(e))?;
                match created {
                    Some(plant) => println!("Added {} (id {})", plant.display_name(), plant.id),
                    None => println!("Added library plant {}", library_id),
                }
            }
            Command::Edit { id, name, image } => {
                self.require_login()?;
                let mut collection = Collection::new();
                self.refresh(&client, &mut collection).await?;
                let current = collection
                    .get(id)
                    .with_context(|| format!("No plant with id {} in your collection", id))?;

                let name = name.unwrap_or_else(|| current.custom_name.clone().unwrap_or_default());
                let image = image.unwrap_or_else(|| current.image_url.clone().unwrap_or_default());
                let Some(update) = UserPlantUpdate::from_edit(current, &name, &image) else {
                    println!("Nothing to change.");
                    return Ok(());
                };

                collection.update(id, &update);
                client
                    .update_user_plant(id, &update)
                    .await
                    .map_err(|e| self.api_error(e))?;
                println!("Updated plant {}", id);
            }
            Command::Remove { id } => {
                self.require_login()?;
                client
                    .delete_user_plant(id)
                    .await
                    .map_err(|e| self.api_error(e))?;
                println!("Removed plant {}", id);
            }
            Command::Water { id } => {
                self.require_login()?;
                self.ensure_library(&client).await?;
                let mut collection = Collection::new();
                self.refresh(&client, &mut collection).await?;

                if collection.mark_watered(id, &clock).is_none() {
                    bail!("No plant with id {} in your collection", id);
                }
                client
                    .record_watering(id)
                    .await
                    .map_err(|e| self.api_error(e))?;

                // Give the service a moment before trusting its schedule
                tokio::time::sleep(Duration::from_millis(self.config.refresh.reconcile_delay_ms))
                    .await;
                self.refresh(&client, &mut collection).await?;

                if let Some(plant) = collection.get(id) {
                    let enriched = enrich(plant, self.session.library());
                    let info = enriched.watering_info(collection.was_just_watered(id), &clock);
                    println!("{} {}: {}", info.icon, enriched.display_name(), info.label);
                }
            }
            Command::Library { query } => {
                self.require_login()?;
                self.ensure_library(&client).await?;
                let plants: Vec<_> = self.session.library().plants().into_iter().cloned().collect();
                let found = library::search(&plants, query.as_deref().unwrap_or(""));
                if found.is_empty() {
                    println!("No plants match.");
                }
                for plant in found {
                    println!(
                        "{:>4}  {:<24} every {:>3} days  {} {:<13} {} {}",
                        plant.id,
                        plant.name,
                        plant.watering_interval_days,
                        plant.light_preference.emoji(),
                        plant.light_preference.label(),
                        plant.care_difficulty.emoji(),
                        plant.care_difficulty.label()
                    );
                }
            }
            Command::LibraryAdd {
                name,
                description,
                interval,
                light,
                difficulty,
                image,
            } => {
                self.require_login()?;
                self.ensure_admin(&client).await?;
                let plant = NewLibraryPlant {
                    name,
                    description,
                    watering_interval_days: interval,
                    light_preference: parse_light(&light),
                    care_difficulty: parse_difficulty(&difficulty),
                    image_url: image,
                };
                client
                    .create_library_plant(&plant)
                    .await
                    .map_err(|e| self.api_error(e))?;
                self.session.library_mut().invalidate();
                println!("Added {} to the library", plant.name.trim());
            }
            Command::LibraryDelete { id } => {
                self.require_login()?;
                self.ensure_admin(&client).await?;
                client
                    .delete_library_plant(id)
                    .await
                    .map_err(|e| self.api_error(e))?;
                self.session.library_mut().invalidate();
                println!("Deleted library plant {}", id);
            }
            Command::Stats => {
                self.require_login()?;
                self.ensure_admin(&client).await?;
                let plants = client.fetch_library().await.map_err(|e| self.api_error(e))?;
                print_stats(&stats::aggregate(&plants));
            }
            Command::Notifications => {
                self.require_login()?;
                let notifications = client
                    .fetch_unread_notifications()
                    .await
                    .map_err(|e| self.api_error(e))?;
                if notifications.is_empty() {
                    println!("No unread notifications.");
                }
                let now = chrono::Utc::now();
                for n in notifications {
                    println!(
                        "{} {}  ({})",
                        n.kind().icon(),
                        n.message,
                        time_ago(n.created_at, now)
                    );
                }
            }
            Command::Export { dir } => {
                self.require_login()?;
                self.ensure_library(&client).await?;
                let mut collection = Collection::new();
                self.refresh(&client, &mut collection).await?;
                let path = export::export_collection_csv(
                    collection.plants(),
                    self.session.library(),
                    &dir,
                    &clock,
                )
                .await?;
                println!("Exported to {}", path.display());
            }
        }
        Ok(())
    }

    fn print_collection(&self, collection: &Collection) {
        let clock = SystemClock;
        let now = Local::now();
        let cache = self.session.library();

        if collection.is_empty() {
            println!("Your collection is empty. Browse with `plant-care library`.");
            return;
        }

        let urgent = collection.needing_water_count(cache, &clock);
        if urgent > 0 {
            println!("{} plant(s) need watering\n", urgent);
        }

        for enriched in collection.enriched(cache) {
            let days = enriched.days_until_water(&clock);
            let info = watering::classify(days, false);
            println!(
                "{:>4}  {} {:<24} {:<28} last: {:<20} next: {}",
                enriched.plant.id,
                info.icon,
                enriched.display_name(),
                info.label,
                watering::last_watered_text(enriched.plant.last_watered_at, &now),
                watering::next_watering_text(days, &now)
            );
        }
    }

    /// Run in daemon mode - poll the service and send reminders
    async fn run_daemon(&mut self) -> Result<()> {
        tracing::info!("Starting plant-care in daemon mode");
        self.require_login()?;

        let client = self.client()?;
        let clock = SystemClock;
        let notifier = CombinedNotifier::new(self.config.notifications.ntfy_topic.clone());
        let mut reminders = ReminderTracker::new(self.config.notifications.enabled);
        let mut inbox = Inbox::new();
        let mut collection = Collection::new();

        self.ensure_library(&client).await?;
        tracing::info!("Library loaded: {} plants", self.session.library().len());

        let mut plant_interval = tokio::time::interval(self.config.refresh.plant_status_period());
        plant_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut notification_interval =
            tokio::time::interval(self.config.refresh.notification_poll_period());
        notification_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = plant_interval.tick() => {
                    if let Err(e) = self.refresh(&client, &mut collection).await {
                        tracing::error!("Failed to refresh plants: {}", e);
                    } else {
                        let plants = collection.enriched(self.session.library());
                        match reminders.check(&plants, &clock, &notifier) {
                            Ok(sent) if sent > 0 => tracing::info!("Sent {} reminder(s)", sent),
                            Ok(_) => {}
                            Err(e) => tracing::error!("Failed to send reminders: {}", e),
                        }
                    }
                }
                _ = notification_interval.tick() => {
                    match client.fetch_unread_notifications().await {
                        Ok(polled) => {
                            for n in inbox.update(polled) {
                                if !reminders.is_enabled() {
                                    continue;
                                }
                                if let Err(e) = notifier.notify("Plant Care", &format!("{} {}", n.kind().icon(), n.message)) {
                                    tracing::warn!("Failed to forward notification {}: {}", n.id, e);
                                }
                            }
                            tracing::debug!("{} unread notification(s)", inbox.unread_count());
                        }
                        Err(e) => {
                            let e = self.api_error(e);
                            tracing::error!("Failed to fetch notifications: {}", e);
                        }
                    }
                }
            }

            if !self.session.is_authenticated() {
                bail!("Session expired. Run `plant-care login` and restart the daemon");
            }
        }
    }
}

fn parse_light(raw: &str) -> LightPreference {
    match raw.trim().to_lowercase().as_str() {
        "sun" => LightPreference::Sun,
        "shade" => LightPreference::Shade,
        _ => LightPreference::Unknown,
    }
}

fn parse_difficulty(raw: &str) -> CareDifficulty {
    match raw.trim().to_lowercase().as_str() {
        "easy" => CareDifficulty::Easy,
        "medium" => CareDifficulty::Medium,
        "hard" => CareDifficulty::Hard,
        _ => CareDifficulty::Unknown,
    }
}

fn print_stats(summary: &stats::StatsSummary) {
    println!("Library plants: {}", summary.total);
    if summary.total == 0 {
        return;
    }

    println!("\nCare difficulty");
    for d in [CareDifficulty::Easy, CareDifficulty::Medium, CareDifficulty::Hard] {
        println!(
            "  {} {:<8} {:>4} ({}%)",
            d.emoji(),
            d.label(),
            summary.difficulty.get(d),
            summary.difficulty_percent.get(d)
        );
    }

    println!("\nLight");
    for l in [LightPreference::Sun, LightPreference::Shade] {
        println!(
            "  {} {:<8} {:>4} ({}%)",
            l.emoji(),
            l.label(),
            summary.light.get(l),
            summary.light_percent.get(l)
        );
    }

    println!("\nWatering");
    for f in stats::WateringFrequency::ALL {
        println!(
            "  {:<24} {:>4} ({}%)",
            f.label(),
            summary.watering.get(f),
            summary.watering_percent.get(f)
        );
    }
    println!(
        "  average every {} days, median {} days",
        summary.average_watering, summary.median_watering
    );

    println!(
        "\nImages: {} with ({}%), {} without ({}%)",
        summary.images.with,
        summary.images_percent.with,
        summary.images.without,
        summary.images_percent.without
    );

    if let Some(d) = summary.predominant_difficulty {
        println!("Most common difficulty: {}", d.label());
    }
    if let Some(l) = summary.predominant_light {
        println!("Most common light: {}", l.label());
    }
    if let Some(f) = summary.predominant_watering {
        println!("Most common watering: {}", f.label());
    }
    if let Some(p) = &summary.newest_plant {
        println!("Newest: {}", p.name);
    }
    if let Some(p) = &summary.oldest_plant {
        println!("Oldest: {}", p.name);
    }
}
