use std::path::PathBuf;

use anyhow::Context;
use autumn_core::{Assembler, Container, DeclarationPolicy};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use autumn_hello::config::{self, AppSettings};
use autumn_hello::eventbus::EventBus;
use autumn_hello::service::{UserService, TEST_EMAIL};

#[derive(Parser)]
#[command(name = "autumn-hello")]
#[command(about = "Assemble the hello application context and exercise it")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Root declaration, overrides `autumn.root`
    #[arg(long)]
    root: Option<String>,

    /// `reject` or `last-wins`, overrides `autumn.declaration-policy`
    #[arg(long)]
    policy: Option<DeclarationPolicy>,

    /// Register a user once the context is up
    #[arg(long, num_args = 3, value_names = ["EMAIL", "NAME", "PASSWORD"])]
    register: Option<Vec<String>>,
}

fn init_logging(settings: &AppSettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.log_level))?;

    if settings.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()?;
    }
    Ok(())
}

fn report(container: &Container) {
    tracing::info!(
        "Context {} assembled from '{}' at {}",
        container.id(),
        container.root(),
        container.assembled_at()
    );
    for name in container.construction_order() {
        if let Some(definition) = container.lookup(name) {
            tracing::info!(
                "  {} <- {} ({})",
                name,
                definition.origin().unwrap_or("?"),
                definition.type_name()
            );
        }
    }
    for entity in container.entities() {
        tracing::info!("  entity {} -> table {}", entity.name, entity.table);
    }
    for warning in container.warnings() {
        tracing::warn!("  {}", warning);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let properties = config::load_properties(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let mut settings = AppSettings::from_properties(&properties)?;
    if let Some(root) = cli.root {
        settings.root = root;
    }
    if let Some(policy) = cli.policy {
        settings.policy = policy;
    }

    init_logging(&settings)?;
    tracing::info!(
        "{} {}: root '{}', declaration policy {}",
        autumn_core::name(),
        autumn_core::version(),
        settings.root,
        settings.policy
    );

    let catalog = config::catalog(settings.policy)?;
    let container = Assembler::new(&catalog)
        .with_properties(properties)
        .assemble(&settings.root)
        .with_context(|| format!("assembling context from '{}'", settings.root))?;
    report(&container);

    if let Ok(bus) = container.get_unique::<EventBus>() {
        bus.subscribe(|event| tracing::info!("Event: {:?}", event));
    }

    let users = container.get::<UserService>("userService")?;
    if let Some([email, name, password]) = cli.register.as_deref() {
        let user = users.register(email, name, password)?;
        tracing::info!("Registered {}", user);
    }

    match users.login(TEST_EMAIL, "test")? {
        Some(user) => tracing::info!("Signed in as {}", user),
        None => tracing::warn!("Test account could not sign in"),
    }

    container.close()?;
    Ok(())
}
