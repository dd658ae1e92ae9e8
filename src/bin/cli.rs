//! LendBridge CLI
//!
//! Command-line interface for LendBridge operations:
//! - Price loans and print amortization schedules offline
//! - Sign up, log in and check status against a running API server
//! - Browse the marketplace, invest and review applications

use clap::{Parser, Subcommand};
use lendbridge::finance::{quote, AmortizationSchedule, Product, ProductType};
use lendbridge::store::ApplicationStatus;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lendbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Commercial lending marketplace")]
#[command(
    long_about = "LendBridge connects small businesses seeking financing with investors.\n\
                  Price loans offline, or talk to a running lendbridge-api server."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8090", global = true)]
    pub api_url: String,

    /// Bearer token (falls back to $LENDBRIDGE_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List loan products
    Products,

    /// Price a loan
    Quote {
        /// Product type (term_loan, sba_loan, ...)
        product: String,
        /// Loan amount in dollars
        amount: f64,
        /// Term in months
        term: u32,
    },

    /// Print an amortization schedule
    Schedule {
        /// Loan amount in dollars
        amount: f64,
        /// Term in months
        term: u32,
        /// APR in percent (default: priced from the product)
        #[arg(long)]
        apr: Option<f64>,
        /// Product used to price the APR
        #[arg(short, long, default_value = "term_loan")]
        product: String,
        /// Write CSV to this file instead of printing a table
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Create an account and print its token
    Signup {
        email: String,
        /// Full name
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// borrower or investor
        #[arg(long, default_value = "borrower")]
        role: String,
    },

    /// Log in and print a bearer token
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Show server health
    Status,

    /// List approved applications open for funding
    Marketplace,

    /// List applications visible to the caller
    Applications {
        /// Only this status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Commit funds to an application
    Invest {
        application_id: String,
        amount: f64,
    },

    /// Show the caller's portfolio
    Portfolio,

    /// Move an application to a new status (admin)
    Review {
        application_id: String,
        /// under_review, approved, rejected
        status: String,
        /// Note stored with the decision
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Pipeline statistics (admin)
    Stats,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let client = Client::new(&cli);

    match &cli.command {
        Commands::Products => {
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(Product::catalog())?);
                return Ok(());
            }
            println!(
                "{:<24} {:<26} {:>7} {:>22} {:>10}",
                "Type", "Name", "APR", "Amount", "Term"
            );
            println!("{}", "-".repeat(93));
            for product_type in ProductType::all() {
                let product = product_type.product();
                println!(
                    "{:<24} {:<26} {:>6.2}% {:>22} {:>10}",
                    product_type.as_str(),
                    product.name,
                    product.base_apr,
                    format!(
                        "{}-{}",
                        format_money(product.min_amount),
                        format_money(product.max_amount)
                    ),
                    format!("{}-{}mo", product.min_term_months, product.max_term_months),
                );
            }
        }

        Commands::Quote {
            product,
            amount,
            term,
        } => {
            let product_type: ProductType = product.parse()?;
            let offer = quote(product_type, *amount, *term)?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&offer)?);
            } else {
                println!(
                    "{} for {} over {} months",
                    product_type.product().name,
                    format_money(*amount),
                    term
                );
                println!("  APR:             {:.2}%", offer.apr);
                println!("  Monthly payment: {}", format_money(offer.monthly_payment));
                println!("  Total payment:   {}", format_money(offer.total_payment));
                println!("  Total interest:  {}", format_money(offer.total_interest));
            }
        }

        Commands::Schedule {
            amount,
            term,
            apr,
            product,
            csv,
        } => {
            let apr = match apr {
                Some(apr) => *apr,
                None => quote(product.parse()?, *amount, *term)?.apr,
            };
            let schedule = AmortizationSchedule::generate(*amount, apr, *term)?;

            if let Some(path) = csv {
                std::fs::write(path, schedule.to_csv()?)?;
                println!("Schedule written to {:?}", path);
            } else if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&schedule)?);
            } else {
                println!(
                    "{:>5} {:>12} {:>12} {:>12} {:>14}",
                    "Month", "Payment", "Principal", "Interest", "Balance"
                );
                println!("{}", "-".repeat(59));
                for payment in &schedule.payments {
                    println!(
                        "{:>5} {:>12.2} {:>12.2} {:>12.2} {:>14.2}",
                        payment.period,
                        payment.payment,
                        payment.principal_portion,
                        payment.interest_portion,
                        payment.remaining_balance
                    );
                }
                let summary = schedule.summary();
                println!();
                println!(
                    "APR {:.2}%  total paid {}  total interest {}",
                    apr,
                    format_money(summary.total_payment),
                    format_money(summary.total_interest)
                );
            }
        }

        Commands::Signup {
            email,
            name,
            password,
            role,
        } => {
            let session = client
                .post(
                    "/api/v1/auth/signup",
                    json!({
                        "email": email,
                        "full_name": name,
                        "password": password,
                        "role": role,
                    }),
                )
                .await?;
            print_session(&session);
        }

        Commands::Login { email, password } => {
            let session = client
                .post("/api/v1/auth/login", json!({ "email": email, "password": password }))
                .await?;
            print_session(&session);
        }

        Commands::Status => match client.get("/health").await {
            Ok(health) => {
                println!("LendBridge v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("API Status:  {}", health["status"].as_str().unwrap_or("unknown"));
                println!("Database:    {}", health["database"].as_str().unwrap_or("unknown"));
                println!("Open wizards: {}", health["open_wizards"].as_u64().unwrap_or(0));
                println!("WebSockets:  {}", health["websocket_connections"].as_u64().unwrap_or(0));
                if let Some(uptime) = health["uptime_seconds"].as_u64() {
                    println!();
                    println!("Uptime: {}", format_duration(uptime));
                }
            }
            Err(e) => {
                eprintln!("Cannot reach LendBridge API at {}", cli.api_url);
                eprintln!("Error: {}", e);
                eprintln!();
                eprintln!("Make sure the API server is running:");
                eprintln!("  cargo run --bin lendbridge-api");
                std::process::exit(1);
            }
        },

        Commands::Marketplace => {
            let data = client.get("/api/v1/marketplace").await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }
            let listings = data["listings"].as_array().cloned().unwrap_or_default();
            if listings.is_empty() {
                println!("No applications are open for funding.");
                return Ok(());
            }
            println!(
                "{:<36}  {:<24} {:>14} {:>7} {:>8} {:>14}",
                "ID", "Business", "Amount", "APR", "Funded", "Remaining"
            );
            println!("{}", "-".repeat(110));
            for listing in listings {
                println!(
                    "{:<36}  {:<24} {:>14} {:>6.2}% {:>7.1}% {:>14}",
                    listing["application_id"].as_str().unwrap_or("-"),
                    truncate(listing["business_name"].as_str().unwrap_or("-"), 24),
                    format_money(listing["loan_amount"].as_f64().unwrap_or(0.0)),
                    listing["apr"].as_f64().unwrap_or(0.0),
                    listing["percent_funded"].as_f64().unwrap_or(0.0),
                    format_money(listing["remaining_amount"].as_f64().unwrap_or(0.0)),
                );
            }
        }

        Commands::Applications { status } => {
            let path = match status {
                Some(status) => {
                    let status: ApplicationStatus = status.parse()?;
                    format!("/api/v1/applications?status={}", status)
                }
                None => "/api/v1/applications".to_string(),
            };
            let data = client.get(&path).await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }
            let applications = data["applications"].as_array().cloned().unwrap_or_default();
            if applications.is_empty() {
                println!("No applications.");
                return Ok(());
            }
            println!(
                "{:<36}  {:<24} {:<22} {:>14} {:<14}",
                "ID", "Business", "Product", "Amount", "Status"
            );
            println!("{}", "-".repeat(114));
            for app in applications {
                println!(
                    "{:<36}  {:<24} {:<22} {:>14} {:<14}",
                    // Investors receive listings instead of full records
                    app["id"].as_str().or(app["application_id"].as_str()).unwrap_or("-"),
                    truncate(
                        app["business"]["business_name"]
                            .as_str()
                            .or(app["business_name"].as_str())
                            .unwrap_or("-"),
                        24
                    ),
                    app["product_type"].as_str().unwrap_or("-"),
                    format_money(app["loan_amount"].as_f64().unwrap_or(0.0)),
                    app["status"].as_str().unwrap_or("-"),
                );
            }
        }

        Commands::Invest {
            application_id,
            amount,
        } => {
            let receipt = client
                .post(
                    &format!("/api/v1/applications/{}/investments", application_id),
                    json!({ "amount": amount }),
                )
                .await?;
            let listing = &receipt["listing"];
            println!(
                "Invested {} ({:.2}% of the loan)",
                format_money(receipt["investment"]["amount"].as_f64().unwrap_or(0.0)),
                receipt["investment"]["percentage"].as_f64().unwrap_or(0.0)
            );
            println!(
                "{} is now {:.1}% funded ({})",
                listing["business_name"].as_str().unwrap_or("Application"),
                listing["percent_funded"].as_f64().unwrap_or(0.0),
                listing["funding_status"].as_str().unwrap_or("-")
            );
        }

        Commands::Portfolio => {
            let data = client.get("/api/v1/portfolio").await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }
            let summary = &data["summary"];
            println!("Investments:       {}", summary["investment_count"].as_u64().unwrap_or(0));
            println!("Loans backed:      {}", summary["applications_backed"].as_u64().unwrap_or(0));
            let invested = summary["total_invested"].as_f64().unwrap_or(0.0);
            println!("Total invested:    {}", format_money(invested));
            println!(
                "Expected monthly:  {}",
                format_money(summary["expected_monthly_income"].as_f64().unwrap_or(0.0))
            );
        }

        Commands::Review {
            application_id,
            status,
            note,
        } => {
            let status: ApplicationStatus = status.parse()?;
            let result = client
                .post(
                    &format!("/api/v1/admin/applications/{}/status", application_id),
                    json!({ "status": status, "note": note }),
                )
                .await?;
            println!(
                "{}: {} -> {}",
                application_id,
                result["change"]["from_status"].as_str().unwrap_or("-"),
                result["change"]["to_status"].as_str().unwrap_or("-")
            );
        }

        Commands::Stats => {
            let stats = client.get("/api/v1/admin/stats").await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            println!("Applications:    {}", stats["total_applications"].as_u64().unwrap_or(0));
            if let Some(by_status) = stats["by_status"].as_object() {
                for (status, count) in by_status {
                    println!("  {:<14} {}", status, count);
                }
            }
            let requested = stats["total_requested"].as_f64().unwrap_or(0.0);
            let funded = stats["total_funded"].as_f64().unwrap_or(0.0);
            println!("Requested:       {}", format_money(requested));
            println!("Funded:          {}", format_money(funded));
            println!("Investors:       {}", stats["investor_count"].as_u64().unwrap_or(0));
            println!("Investments:     {}", stats["investment_count"].as_u64().unwrap_or(0));
        }

        Commands::Config { output } => {
            let config = lendbridge::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Thin JSON client for the API server
struct Client {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl Client {
    fn new(cli: &Cli) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: cli.api_url.trim_end_matches('/').to_string(),
            token: cli
                .token
                .clone()
                .or_else(|| std::env::var("LENDBRIDGE_TOKEN").ok()),
        }
    }

    async fn get(&self, path: &str) -> CliResult<Value> {
        let request = self.http.get(format!("{}{}", self.base_url, path));
        self.send(request).await
    }

    async fn post(&self, path: &str, body: Value) -> CliResult<Value> {
        let request = self.http.post(format!("{}{}", self.base_url, path)).json(&body);
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> CliResult<Value> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"].as_str().unwrap_or("request failed");
            return Err(format!("{} ({})", message, status).into());
        }
        Ok(response.json().await?)
    }
}

fn print_session(session: &Value) {
    println!(
        "Logged in as {} ({})",
        session["user"]["email"].as_str().unwrap_or("-"),
        session["user"]["role"].as_str().unwrap_or("-")
    );
    println!();
    println!("export LENDBRIDGE_TOKEN={}", session["token"].as_str().unwrap_or(""));
}

fn format_money(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let dollars = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${}.{:02}", grouped, cents % 100)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
