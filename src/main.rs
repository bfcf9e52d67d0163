use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::debug;
use proxyswitch::compiler::ProxyPayload;
use proxyswitch::config::Config;
use proxyswitch::controller::ProxyPolicyCompiler;
use proxyswitch::host::FileHost;
use proxyswitch::indicator::LogIndicator;
use proxyswitch::manager::{ProfileManager, RestoreOutcome};
use proxyswitch::profile::{parse_domain_list, PolicyMode, ProfileDraft, ProxyProfile, ProxyProtocol};
use proxyswitch::session::SessionContext;
use proxyswitch::store::JsonFileStore;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "proxyswitch")]
#[command(about = "Switch between named proxy profiles")]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored profiles
    List,
    /// Show the active profile
    Status,
    /// Add a profile
    Add(ProfileArgs),
    /// Edit a profile; omitted fields keep their value
    Edit {
        id: String,
        #[command(flatten)]
        fields: EditArgs,
    },
    /// Delete a profile
    Remove { id: String },
    /// Activate a profile
    Use { id: String },
    /// Switch to direct connection
    Off,
    /// Re-apply the profile that was active last time
    Restore,
    /// Print the payload a profile compiles to
    Compile { id: String },
}

#[derive(ClapArgs)]
struct ProfileArgs {
    #[arg(long)]
    name: String,
    /// all, http, https, socks4 or socks5
    #[arg(long = "type", default_value = "all")]
    protocol: ProxyProtocol,
    #[arg(long)]
    host: String,
    #[arg(long, allow_hyphen_values = true)]
    port: i64,
    /// blacklist or whitelist
    #[arg(long, default_value = "blacklist")]
    policy: PolicyMode,
    /// Comma separated domain list
    #[arg(long)]
    domains: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
}

#[derive(ClapArgs)]
struct EditArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type")]
    protocol: Option<ProxyProtocol>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    port: Option<i64>,
    #[arg(long)]
    policy: Option<PolicyMode>,
    #[arg(long)]
    domains: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
}

impl ProfileArgs {
    fn into_draft(self) -> ProfileDraft {
        let domains = self.domains.as_deref().map(parse_domain_list).unwrap_or_default();
        let mut draft = ProfileDraft::new(&self.name, self.protocol, &self.host, self.port)
            .with_policy(self.policy, domains);
        if let Some(user) = self.username {
            draft = draft.with_credentials(&user, self.password.as_deref().unwrap_or_default());
        }
        draft
    }
}

impl EditArgs {
    fn merge(self, current: ProxyProfile) -> ProfileDraft {
        let domains = match self.domains.as_deref() {
            Some(raw) => parse_domain_list(raw),
            None => current.domain_list,
        };
        let mut draft = ProfileDraft::new(
            self.name.as_deref().unwrap_or(&current.name),
            self.protocol.unwrap_or(current.protocol),
            self.host.as_deref().unwrap_or(&current.host),
            self.port.unwrap_or(current.port),
        )
        .with_policy(self.policy.unwrap_or(current.policy_mode), domains);
        if let Some(user) = self.username {
            let password = self.password.or(current.password).unwrap_or_default();
            draft = draft.with_credentials(&user, &password);
        }
        draft
    }
}

fn print_payload(payload: &ProxyPayload) -> anyhow::Result<()> {
    match payload {
        ProxyPayload::Script(script) => print!("{}", script.render()),
        ProxyPayload::Rules(table) => println!("{}", serde_json::to_string_pretty(table)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        Config::from_file(config_path).with_context(|| format!("loading {}", config_path))?
    } else {
        Config::default()
    };

    // Override config with command line arguments
    if args.debug {
        config.logging.level = "debug".to_string();
    }
    config.validate()?;

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level))
        .init();
    debug!("Store: {}", config.store.path.display());
    debug!("Output: {}", config.host.output_dir.display());

    let compiler = ProxyPolicyCompiler::new(
        Arc::new(FileHost::new(&config.host.output_dir)),
        Arc::new(LogIndicator),
        SessionContext::new(),
    );
    let manager = ProfileManager::new(Arc::new(JsonFileStore::new(&config.store.path)), compiler);

    match args.command {
        Command::List => {
            let status = manager.status().await?;
            let active_id = status.active.as_ref().map(|p| p.id.clone());
            let marker = |on: bool| if on { "*" } else { " " };
            println!("{} {:<14} Direct connection", marker(active_id.is_none()), "-");
            for p in &status.profiles {
                let on = active_id.as_deref() == Some(p.id.as_str());
                println!(
                    "{} {:<14} {} [{}] {} {}",
                    marker(on),
                    p.id,
                    p.name,
                    p.policy_mode.label(),
                    p.protocol,
                    p.summary()
                );
            }
        }
        Command::Status => println!("{}", manager.status().await?),
        Command::Add(fields) => {
            let profile = manager.add(fields.into_draft()).await?;
            println!("Added {} ({})", profile.name, profile.id);
        }
        Command::Edit { id, fields } => {
            let current = manager.get(&id).await?;
            let profile = manager.update(&id, fields.merge(current)).await?;
            println!("Updated {} ({})", profile.name, profile.id);
        }
        Command::Remove { id } => {
            let profile = manager.remove(&id).await?;
            println!("Removed {} ({})", profile.name, profile.id);
        }
        Command::Use { id } => match manager.activate(&id).await? {
            Some(payload) => println!("Active: {} ({})", manager.status().await?, payload.mode()),
            None => bail!("no profile with id {}", id),
        },
        Command::Off => {
            manager.deactivate().await?;
            println!("Direct connection");
        }
        Command::Restore => match manager.restore().await? {
            RestoreOutcome::Applied(id) => println!("Restored {}", id),
            RestoreOutcome::Dangling(id) => println!("Active profile {} is missing, staying direct", id),
            RestoreOutcome::Direct => println!("Direct connection"),
        },
        Command::Compile { id } => {
            let profile = manager.get(&id).await?;
            print_payload(&manager.compiler().compile(&profile))?;
        }
    }

    Ok(())
}
