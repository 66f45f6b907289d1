use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use jwt_sso::config::{self, Config, TelemetryConfig};
use jwt_sso::observability::init_observability;
use jwt_sso::{CacheKey, InMemoryDirectory, JwtAuthService, JwtVerifier, create_cache, search};

#[derive(Parser, Debug)]
#[command(name = "jwt-sso")]
#[command(about = "JWT single sign-on login core", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with a token and print the resolved user
    Login {
        /// Raw JWT
        #[arg(short, long, env = "JWT_SSO_TOKEN")]
        token: String,

        /// Skip the token cache lookup
        #[arg(long)]
        ignore_cache: bool,
    },

    /// Evaluate an attribute path against a JSON document
    Search {
        /// JMESPath expression
        #[arg(short, long)]
        path: String,

        /// JSON file (reads stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the cache key for a token
    Fingerprint {
        #[arg(short, long)]
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Login {
            ref token,
            ignore_cache,
        } => {
            let config = load_config(&args)?;
            init_observability(&config.telemetry)?;
            login(&config, token, ignore_cache).await
        }
        Command::Search { ref path, ref file } => {
            init_observability(&cli_telemetry(&args))?;
            let input = match file {
                Some(file) => std::fs::read(file)
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?,
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            let value = search::search(path, &input)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Command::Fingerprint { ref token } => {
            println!("{}", CacheKey::auth_jwt_sync(token));
            Ok(())
        }
    }
}

/// Load configuration with precedence: env > file > CLI > defaults
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut builder = if let Some(ref path) = args.config {
        config::load_config_from_path(path)?
    } else {
        config::load_config()?
    };

    if args.verbose {
        builder = builder.log_level("debug".to_string());
    }
    if args.json_logs {
        builder = builder.json_logs(true);
    }

    Ok(builder.build()?)
}

fn cli_telemetry(args: &Args) -> TelemetryConfig {
    TelemetryConfig {
        log_level: if args.verbose { "debug" } else { "warn" }.to_string(),
        json_logs: args.json_logs,
    }
}

async fn login(config: &Config, token: &str, ignore_cache: bool) -> anyhow::Result<()> {
    let directory = Arc::new(InMemoryDirectory::new());
    for org in &config.directory.orgs {
        directory.add_org(org.id, org.name.clone());
    }

    let verifier = JwtVerifier::new(config.verifier.clone())?;
    let service = JwtAuthService::builder(config.jwt.clone())
        .verifier(Arc::new(verifier))
        .directory(&directory)
        .cache(create_cache(config.cache()))
        .build()?;

    tracing::info!(
        "Cache enabled: {}, backend: {:?}",
        config.cache.enabled,
        config.cache.backend
    );

    let login = service.for_token(token);
    let user_id = login.login(ignore_cache).await?;
    let user = login.get_signed_in_user(user_id).await?;

    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}
