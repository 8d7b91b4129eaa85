use std::io::BufRead;

use clap::{Parser, Subcommand};
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::{json, Value};

use gatekeeper::security::cookie::AUTH_COOKIE;
use gatekeeper::security::password::hash_password;

#[derive(Parser)]
#[command(name = "gatekeeper-cli")]
#[command(about = "Management CLI for the request gatekeeper", long_about = None)]
struct Cli {
    #[arg(short, long, env = "GATEKEEPER_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ADMIN_PASSWORD_HASH value for a password (read from stdin if omitted)
    HashPassword { password: Option<String> },
    /// Log in and print the issued credential
    Login {
        #[arg(long, env = "GATEKEEPER_ADMIN_PASSWORD")]
        password: String,
    },
    /// Ask the gatekeeper whether a credential is still valid
    Session {
        #[arg(long, env = "GATEKEEPER_TOKEN")]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::HashPassword { password } => {
            let password = match password {
                Some(p) => p,
                None => {
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line.trim_end_matches(['\r', '\n']).to_string()
                }
            };
            println!("{}", hash_password(&password));
        }
        Commands::Login { password } => {
            let res = client
                .post(format!("{}/api/auth", cli.url))
                .json(&json!({ "password": password }))
                .send()
                .await?;

            let token = res
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(|v| cookie_value(v, AUTH_COOKIE));
            if print_response(res).await? {
                if let Some(token) = token {
                    println!("{}", token);
                }
            }
        }
        Commands::Session { token } => {
            let res = client
                .get(format!("{}/api/auth/session", cli.url))
                .header(COOKIE, format!("{}={}", AUTH_COOKIE, token))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Value of cookie `name` in a `Set-Cookie` header, if that is the cookie set.
fn cookie_value(set_cookie: &str, name: &str) -> Option<String> {
    let (key, value) = set_cookie.split(';').next()?.split_once('=')?;
    (key.trim() == name && !value.is_empty()).then(|| value.to_string())
}

async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gatekeeper returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(false);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(true)
}
