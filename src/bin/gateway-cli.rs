use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command line client for the dispatch gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the gateway is running
    Ping,
    /// Show the counters summary
    Metrics,
    /// Send a request through the dispatch route and print the envelope
    Call {
        /// Sub-path after /api/ (e.g. "example.com/v1/users" or "command/Get-User")
        path: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Username for the command executor
        #[arg(long)]
        user: Option<String>,

        /// Secret for the command executor
        #[arg(long)]
        secret: Option<String>,

        /// Request body (JSON object of parameters for commands)
        #[arg(short, long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Ping => {
            let res = client.get(format!("{}/ping", base)).send().await?;
            println!("{}", res.text().await?);
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            println!("{}", res.text().await?);
        }
        Commands::Call {
            path,
            method,
            user,
            secret,
            data,
        } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())?;

            let mut headers = HeaderMap::new();
            if let Some(user) = user {
                headers.insert("X-Auth-User", HeaderValue::from_str(&user)?);
            }
            if let Some(secret) = secret {
                headers.insert("X-Auth-Pass", HeaderValue::from_str(&secret)?);
            }

            let mut request = client
                .request(method, format!("{}/api/{}", base, path.trim_start_matches('/')))
                .headers(headers);
            if let Some(data) = data {
                request = request.header("Content-Type", "application/json").body(data);
            }

            print_response(request.send().await?).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
