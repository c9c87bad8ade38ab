use anyhow::{bail, Context};
use clap::Parser;
use flowbridge::cli::{Args, Command};
use flowbridge::{env, BridgeSystem, ConfigDiscovery, Credentials, TaskFilter};
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var(env::vars::LOG_FILTER).unwrap_or_else(|_| "flowbridge=info".to_string()),
        )
        .init();

    let args = Args::parse();

    if matches!(args.command, Command::ShowConfig) {
        ConfigDiscovery::show_discovery_info();
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => ConfigDiscovery::load_from(path)?,
        None => ConfigDiscovery::load()?,
    };
    let bridge = BridgeSystem::new(config)?;

    let credentials = resolve_credentials(&args)?;
    let mut session = bridge.session_for(credentials).await?;

    match args.command {
        Command::Processes { page, count, sort } => {
            let processes = bridge
                .client()
                .list_processes(&mut session, page, count, sort.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&processes)?);
        }
        Command::StartFlow { slug, inputs } => {
            let inputs: Option<Value> = inputs
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("--inputs must be a valid JSON object")?;
            let outcome = bridge
                .start_flow(&mut session, &slug, inputs.as_ref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Tasks {
            state,
            user,
            process,
            page,
            count,
        } => {
            let filter = TaskFilter {
                state: Some(state),
                page,
                count,
                user_id: user,
                process_id: process,
                sort: None,
            };
            let tasks = bridge.client().list_tasks(&mut session, &filter).await?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        Command::Case { id, variables } => {
            if variables {
                let result = bridge
                    .client()
                    .get_case_with_variables(&mut session, &id, true)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let case = bridge.client().get_case(&mut session, &id).await?;
                println!("{}", serde_json::to_string_pretty(&case)?);
            }
        }
        Command::ShowConfig => unreachable!("handled before configuration loading"),
    }

    // The executor may have refreshed the session; keep the registry current.
    bridge.store(&session);
    Ok(())
}

fn resolve_credentials(args: &Args) -> anyhow::Result<Credentials> {
    let username = args
        .username
        .clone()
        .or_else(|| std::env::var(env::vars::USERNAME).ok())
        .filter(|value| !value.is_empty());
    let password = args
        .password
        .clone()
        .or_else(|| std::env::var(env::vars::PASSWORD).ok())
        .filter(|value| !value.is_empty());

    match (username, password) {
        (Some(username), Some(password)) => Ok(Credentials::new(username, password)),
        _ => bail!(
            "engine credentials are required: pass --username/--password or set {}/{}",
            env::vars::USERNAME,
            env::vars::PASSWORD
        ),
    }
}
