use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "config-cli")]
#[command(about = "Operator CLI for the dynamic-config service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key.
    #[arg(short, long, env = "DYNAMIC_CONFIG_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Service status, role and queue depth
    Status,
    /// Values of every section
    Sections,
    /// Values of one section
    Section { name: String },
    /// Notification queue depth
    Queue,
    /// Registered listener URLs
    Listeners,
    /// Compare this environment with peers
    Diff {
        /// Peer base URLs
        #[arg(required_unless_present = "configured_peers")]
        environments: Vec<String>,
        /// Diff against the peers in the service's configuration
        #[arg(long)]
        configured_peers: bool,
        /// Only keys containing this text (case-sensitive)
        #[arg(short, long)]
        filter: Option<String>,
        /// Shared secret of the environments
        #[arg(short, long, env = "DYNAMIC_CONFIG_SHARED_SECRET")]
        secret: String,
    },
    /// Push this environment's sections into a peer
    Export { env_url: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cli.key))?);

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)).headers(headers).send().await?,
        Commands::Queue => client.get(format!("{}/admin/queue", base)).headers(headers).send().await?,
        Commands::Listeners => {
            client
                .get(format!("{}/config/listeners", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Sections => client.get(format!("{}/config/settings", base)).send().await?,
        Commands::Section { name } => {
            client
                .get(format!("{}/config/settings", base))
                .query(&[("name", name)])
                .send()
                .await?
        }
        Commands::Diff {
            environments,
            configured_peers,
            filter,
            secret,
        } => {
            client
                .patch(format!("{}/config/diff", base))
                .json(&json!({
                    "sharedSecret": secret,
                    "environments": environments,
                    "useConfiguredPeers": configured_peers,
                    "filter": filter,
                }))
                .send()
                .await?
        }
        Commands::Export { env_url } => {
            client
                .post(format!("{}/config/export", base))
                .headers(headers)
                .json(&json!({ "envUrl": env_url }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
