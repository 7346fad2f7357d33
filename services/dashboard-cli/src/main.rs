//! Food-safety dashboard CLI
//!
//! Operator front end for the dashboard REST API:
//! 1. Loads configuration (flags, env, TOML file)
//! 2. Optionally signs in first (`--login`); the session cookie lives in the
//!    client's in-memory store, so it only spans this run
//! 3. Runs one command and prints the result as JSON on stdout
//!
//! Logs are JSON on stderr.

mod config;
mod reports;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use api_client::{ApiClient, CompanyUpdate, Download, RequestOptions};
use auth_session::{Credentials, Session};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::reports::{ReportFormat, ReportKind, ReportRequest};

#[derive(Debug, Parser)]
#[command(name = "foodsafe-dashboard", version, about = "Food-safety dashboard API client")]
struct Cli {
    /// Config file (overrides CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<String>,

    /// API base URL (overrides DASHBOARD_API_URL and the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Sign in before running the command
    #[arg(long, global = true)]
    login: bool,

    /// Account email (overrides the config file)
    #[arg(long, global = true)]
    email: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check whether the session is valid
    Status,
    /// Sign in
    Login,
    /// Sign out
    Logout,
    /// Show the signed-in user
    Me,
    Get(Call),
    Delete(Call),
    Post(CallWithBody),
    Put(CallWithBody),
    Patch(CallWithBody),
    /// Save a binary response into a directory
    Download {
        endpoint: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// File name when the server does not announce one
        #[arg(long, default_value = "download")]
        fallback: String,
        #[arg(long)]
        public: bool,
    },
    /// Generate and save a report
    Report(ReportArgs),
    /// Save a previously generated report
    SavedReport {
        id: String,
        /// Stored file URL, used to name the file
        #[arg(long)]
        file_url: Option<String>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Set the password for an invited account
    CreatePassword { token: String },
    /// Show the company profile, or update it when any field is given
    Company(CompanyArgs),
}

#[derive(Debug, Args)]
struct Call {
    endpoint: String,
    /// Send without session handling
    #[arg(long)]
    public: bool,
}

#[derive(Debug, Args)]
struct CallWithBody {
    endpoint: String,
    /// JSON request body
    body: String,
    #[arg(long)]
    public: bool,
}

#[derive(Debug, Args)]
struct ReportArgs {
    #[arg(value_enum, ignore_case = true)]
    kind: ReportKind,
    #[arg(long, value_enum, default_value_t = ReportFormat::Pdf)]
    format: ReportFormat,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    week: Option<String>,
    #[arg(long)]
    month: Option<String>,
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct CompanyArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    short_name: Option<String>,
    #[arg(long)]
    logo_url: Option<String>,
    #[arg(long)]
    cnpj: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    contact_phone: Option<String>,
    #[arg(long)]
    contact_mail: Option<String>,
}

impl CompanyArgs {
    fn changes(&self) -> CompanyUpdate {
        CompanyUpdate {
            name: self.name.clone(),
            short_name: self.short_name.clone(),
            logo_url: self.logo_url.clone(),
            cnpj: self.cnpj.clone(),
            address: self.address.clone(),
            contact_phone: self.contact_phone.clone(),
            contact_mail: self.contact_mail.clone(),
        }
    }
}

impl ReportArgs {
    fn request(&self) -> ReportRequest {
        ReportRequest {
            kind: self.kind,
            format: self.format,
            date: self.date.clone(),
            week: self.week.clone(),
            month: self.month.clone(),
        }
    }
}

/// What a command produced.
#[derive(Debug)]
enum Outcome {
    Json(Value),
    Saved(PathBuf),
}

fn options(public: bool) -> RequestOptions {
    if public {
        RequestOptions::public()
    } else {
        RequestOptions::new()
    }
}

fn parse_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).context("request body is not valid JSON")
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

fn credentials(cli: &Cli, config: &Config) -> Result<Credentials> {
    let email = cli
        .email
        .clone()
        .or_else(|| config.login.email.clone())
        .context("no email configured: pass --email or set login.email")?;
    let password = config
        .login
        .password
        .clone()
        .context("no password configured: set DASHBOARD_PASSWORD or login.password_file")?;
    Ok(Credentials::new(email, password))
}

/// The request-layer error behind a command failure, if any.
fn api_error(err: &anyhow::Error) -> Option<&api_client::Error> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<api_client::Error>()
            .or_else(|| match cause.downcast_ref::<auth_session::Error>() {
                Some(auth_session::Error::Api(inner)) => Some(inner),
                _ => None,
            })
    })
}

async fn save(download: &Download, dir: &Path, fallback: &str) -> Result<Outcome> {
    let path = download
        .save_to(dir, fallback)
        .await
        .with_context(|| format!("failed to write download into {}", dir.display()))?;
    info!(path = %path.display(), bytes = download.body.len(), "download saved");
    Ok(Outcome::Saved(path))
}

/// Run one command against a fresh session and report auth expiry to it.
async fn run(cli: &Cli, config: &Config) -> Result<Outcome> {
    let client = ApiClient::new(config.client_config()).context("failed to build HTTP client")?;
    let session = Session::new(client);

    let result = execute(cli, config, &session).await;
    if let Err(err) = &result
        && let Some(api_err) = api_error(err)
    {
        session.observe(api_err).await;
        if api_err.is_auth_expired() {
            warn!("session expired; sign in again with --login");
        }
    }
    result
}

async fn execute(cli: &Cli, config: &Config, session: &Session) -> Result<Outcome> {
    if cli.login || matches!(cli.command, Command::Login) {
        let credentials = credentials(cli, config)?;
        session.login(&credentials).await.context("login failed")?;
    }

    let client = session.client();
    match &cli.command {
        Command::Status => {
            let authenticated = session.check().await;
            Ok(Outcome::Json(json!({ "authenticated": authenticated })))
        }
        Command::Login => Ok(Outcome::Json(
            json!({ "authenticated": session.is_authenticated().await }),
        )),
        Command::Logout => {
            session.logout().await;
            Ok(Outcome::Json(json!({ "authenticated": false })))
        }
        Command::Me => {
            let user = session.current_user().await?;
            Ok(Outcome::Json(serde_json::to_value(user)?))
        }
        Command::Get(call) => Ok(Outcome::Json(
            client.get(&call.endpoint, options(call.public)).await?,
        )),
        Command::Delete(call) => Ok(Outcome::Json(
            client.delete(&call.endpoint, options(call.public)).await?,
        )),
        Command::Post(call) => {
            let body = parse_body(&call.body)?;
            Ok(Outcome::Json(
                client.post(&call.endpoint, &body, options(call.public)).await?,
            ))
        }
        Command::Put(call) => {
            let body = parse_body(&call.body)?;
            Ok(Outcome::Json(
                client.put(&call.endpoint, &body, options(call.public)).await?,
            ))
        }
        Command::Patch(call) => {
            let body = parse_body(&call.body)?;
            Ok(Outcome::Json(
                client.patch(&call.endpoint, &body, options(call.public)).await?,
            ))
        }
        Command::Download {
            endpoint,
            out,
            fallback,
            public,
        } => {
            let download = client.download(endpoint, options(*public)).await?;
            save(&download, out, fallback).await
        }
        Command::Report(args) => {
            let request = args.request();
            let download = client
                .download(&request.endpoint(), RequestOptions::new())
                .await?;
            save(&download, &args.out, &request.fallback_filename(unix_millis())).await
        }
        Command::SavedReport { id, file_url, out } => {
            let download = client
                .download(&reports::saved_report_endpoint(id), RequestOptions::new())
                .await?;
            let fallback = reports::saved_report_fallback(id, file_url.as_deref());
            save(&download, out, &fallback).await
        }
        Command::CreatePassword { token } => {
            let password = config
                .login
                .password
                .as_ref()
                .context("no password configured: set DASHBOARD_PASSWORD or login.password_file")?;
            session.create_password(token, password).await?;
            Ok(Outcome::Json(json!({ "created": true })))
        }
        Command::Company(args) => {
            let company = client.fetch_company().await?;
            let changes = args.changes();
            let company = if changes.is_empty() {
                company
            } else {
                let updated = client.update_company(&company.id, &changes).await?;
                info!(company_id = %updated.id, "company updated");
                updated
            };
            Ok(Outcome::Json(serde_json::to_value(company)?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr with LOG_LEVEL / RUST_LOG support; stdout carries results
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let mut config = match &config_path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Config::load(Some(path))
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => Config::load(None).context("failed to load configuration")?,
    };
    if let Some(url) = &cli.base_url {
        config.set_base_url(url).context("invalid --base-url")?;
    }

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        "configuration loaded"
    );

    match run(&cli, &config).await? {
        Outcome::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Outcome::Saved(path) => println!("{}", path.display()),
    }
    Ok(())
}
