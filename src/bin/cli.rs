//! School Attendance CLI
//!
//! Command-line client for the attendance API:
//! - Sign in and keep the session between runs
//! - Manage students and accounts
//! - Browse and capture attendance
//! - Print reports and download spreadsheets
//! - Seed demo data, edit local preferences

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;

use school_attendance::demo::{demo_attendance, demo_students};
use school_attendance::preferences::{
    load_json, save_json, FileStorage, KeyValueStorage, PreferenceStore,
};
use school_attendance::storage::Student;

/// Storage key of the saved CLI session
const SESSION_KEY: &str = "cli_session";

#[derive(Parser)]
#[command(name = "attendance")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "School attendance dashboard client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8090", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Show server status
    Status,

    /// Manage students
    Students {
        #[command(subcommand)]
        command: StudentCommands,
    },

    /// Browse and capture attendance
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommands,
    },

    /// Print a report for a period
    Report {
        /// week, month or year
        #[arg(short, long, default_value = "week")]
        period: String,
        #[arg(short, long)]
        class: Option<String>,
    },

    /// Download a report spreadsheet
    Export {
        #[arg(short, long, default_value = "week")]
        period: String,
        #[arg(short, long)]
        class: Option<String>,
        /// xlsx or csv
        #[arg(long, default_value = "xlsx")]
        as_format: String,
        /// Output file (default: server-provided name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage accounts (admin)
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Create demo students and a week of attendance
    Seed,

    /// Show or change local preferences
    Prefs {
        #[command(subcommand)]
        command: PrefCommands,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum StudentCommands {
    /// List students
    List {
        #[arg(short, long)]
        class: Option<String>,
    },
    /// Register a student
    Add {
        code: String,
        name: String,
        class: String,
        #[arg(short, long)]
        major: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Delete a student
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum AttendanceCommands {
    /// List records (default: today)
    List {
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        class: Option<String>,
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Record a student's attendance
    Capture {
        student_id: String,
        #[arg(short, long, default_value = "present")]
        status: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        note: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List accounts
    List {
        #[arg(short, long)]
        role: Option<String>,
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Change an account's role
    Role { uid: String, role: String },
    /// Create parent accounts for every student with an email
    FromStudents,
}

#[derive(Subcommand)]
pub enum PrefCommands {
    Show,
    /// light, dark or auto
    Theme { theme: String },
    /// vi or en
    Language { language: String },
    Reset,
}

/// Session kept between CLI runs
#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    api_url: String,
    token: String,
    email: String,
    role: String,
}

/// Thin JSON client over the REST API
struct Api {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl Api {
    fn new(base: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Cannot connect to attendance API at {}", self.base))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body: Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"].as_str().unwrap_or("request failed");
        if status == StatusCode::UNAUTHORIZED {
            bail!("{} ({}). Sign in with `attendance login`", message, status);
        }
        bail!("{} ({})", message, status)
    }

    async fn get(&self, path: &str) -> anyhow::Result<Value> {
        Ok(self.send(self.request(Method::GET, path)).await?.json().await?)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> anyhow::Result<Value> {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, body: &impl Serialize) -> anyhow::Result<Value> {
        Ok(self
            .send(self.request(Method::PUT, path).json(body))
            .await?
            .json()
            .await?)
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let storage = FileStorage::default_location();
    let saved: Option<SavedSession> = load_json(&storage, SESSION_KEY)?;
    let token = saved
        .as_ref()
        .filter(|s| s.api_url == cli.api_url)
        .map(|s| s.token.clone());
    let api = Api::new(&cli.api_url, token);
    let json_output = cli.format == "json";

    match cli.command {
        Commands::Login { email, password } => {
            let session = api
                .post(
                    "/api/v1/auth/sign-in",
                    &json!({"email": email, "password": password}),
                )
                .await?;
            let saved = SavedSession {
                api_url: cli.api_url.clone(),
                token: str_field(&session, "token").to_string(),
                email: str_field(&session["user"], "email").to_string(),
                role: str_field(&session["user"], "role").to_string(),
            };
            save_json(&storage, SESSION_KEY, &saved)?;
            println!("Signed in as {} ({})", saved.email, saved.role);
        }

        Commands::Logout => {
            if api.token.is_some() {
                if let Err(e) = api.post("/api/v1/auth/sign-out", &json!({})).await {
                    eprintln!("Server sign-out failed: {}", e);
                }
            }
            storage.remove(SESSION_KEY)?;
            println!("Signed out");
        }

        Commands::Whoami => {
            let user = api.get("/api/v1/auth/session").await?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("{} ({})", str_field(&user, "email"), str_field(&user, "role"));
                if let Some(name) = user["display_name"].as_str() {
                    println!("Name: {}", name);
                }
            }
        }

        Commands::Status => {
            let health = api.get("/health").await?;
            println!("School Attendance v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("API Status: {}", str_field(&health, "status"));
            println!("Store: {}", str_field(&health, "store"));
            println!(
                "Live connections: {}",
                health["ws_connections"].as_u64().unwrap_or(0)
            );
            if let Some(uptime) = health["uptime_seconds"].as_u64() {
                println!("Uptime: {}", format_duration(uptime));
            }
        }

        Commands::Students { command } => match command {
            StudentCommands::List { class } => {
                let path = match class {
                    Some(c) => format!("/api/v1/students?class={}", urlencoding::encode(&c)),
                    None => "/api/v1/students".to_string(),
                };
                let body = api.get(&path).await?;
                if json_output {
                    println!("{}", serde_json::to_string_pretty(&body)?);
                } else {
                    print_students(&body);
                }
            }
            StudentCommands::Add {
                code,
                name,
                class,
                major,
                email,
            } => {
                let created = api
                    .post(
                        "/api/v1/students",
                        &json!({
                            "student_code": code,
                            "name": name,
                            "class": class,
                            "major": major.unwrap_or_default(),
                            "email": email,
                        }),
                    )
                    .await?;
                println!("Created student {}", str_field(&created, "id"));
            }
            StudentCommands::Remove { id } => {
                api.delete(&format!("/api/v1/students/{}", id)).await?;
                println!("Deleted student {}", id);
            }
        },

        Commands::Attendance { command } => match command {
            AttendanceCommands::List {
                date,
                class,
                status,
                page,
            } => {
                let mut params = vec![format!("page={}", page)];
                if let Some(d) = date {
                    params.push(format!("date={}", d));
                }
                if let Some(c) = class {
                    params.push(format!("class={}", urlencoding::encode(&c)));
                }
                if let Some(s) = status {
                    params.push(format!("status={}", s));
                }
                let body = api
                    .get(&format!("/api/v1/attendance?{}", params.join("&")))
                    .await?;
                if json_output {
                    println!("{}", serde_json::to_string_pretty(&body)?);
                } else {
                    print_attendance(&body);
                }
            }
            AttendanceCommands::Capture {
                student_id,
                status,
                date,
                note,
            } => {
                let record = api
                    .post(
                        "/api/v1/attendance",
                        &json!({
                            "student_id": student_id,
                            "status": status,
                            "date": date,
                            "note": note,
                        }),
                    )
                    .await?;
                println!(
                    "Recorded {} as {} on {}",
                    str_field(&record, "student_name"),
                    str_field(&record, "status"),
                    str_field(&record, "date")
                );
            }
        },

        Commands::Report { period, class } => {
            let path = report_path("/api/v1/reports", &period, class.as_deref(), None);
            let report = api.get(&path).await?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Export {
            period,
            class,
            as_format,
            output,
        } => {
            let path = report_path(
                "/api/v1/reports/export",
                &period,
                class.as_deref(),
                Some(&as_format),
            );
            let response = api.send(api.request(Method::GET, &path)).await?;
            let suggested = response
                .headers()
                .get(reqwest::header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split("filename=").nth(1))
                .map(|name| name.trim_matches('"').to_string());
            let bytes = response.bytes().await?;

            let path = output
                .or_else(|| suggested.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(format!("attendance_report.{}", as_format)));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Exported to {:?} ({} bytes)", path, bytes.len());
        }

        Commands::Users { command } => match command {
            UserCommands::List { role, search } => {
                let mut params = Vec::new();
                if let Some(r) = role {
                    params.push(format!("role={}", r));
                }
                if let Some(s) = search {
                    params.push(format!("search={}", urlencoding::encode(&s)));
                }
                let body = api
                    .get(&format!("/api/v1/users?{}", params.join("&")))
                    .await?;
                if json_output {
                    println!("{}", serde_json::to_string_pretty(&body)?);
                } else {
                    print_users(&body);
                }
            }
            UserCommands::Role { uid, role } => {
                let user = api
                    .put(&format!("/api/v1/users/{}/role", uid), &json!({"role": role}))
                    .await?;
                println!("{} is now {}", str_field(&user, "email"), str_field(&user, "role"));
            }
            UserCommands::FromStudents => {
                let report = api.post("/api/v1/users/from-students", &json!({})).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        },

        Commands::Seed => seed(&api).await?,

        Commands::Prefs { command } => {
            let mut prefs = PreferenceStore::load(storage);
            match command {
                PrefCommands::Show => {}
                PrefCommands::Theme { theme } => {
                    let theme = serde_json::from_value(Value::String(theme.to_lowercase()))
                        .context("Theme must be light, dark or auto")?;
                    prefs.update(|p| p.theme = theme)?;
                }
                PrefCommands::Language { language } => {
                    let language = serde_json::from_value(Value::String(language.to_lowercase()))
                        .context("Language must be vi or en")?;
                    prefs.update(|p| p.language = language)?;
                }
                PrefCommands::Reset => {
                    prefs.reset()?;
                }
            }
            println!("{}", serde_json::to_string_pretty(prefs.get())?);
        }

        Commands::Config { output } => {
            let config = school_attendance::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
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

/// Create the demo roster through the API, then a week of attendance for it
async fn seed(api: &Api) -> anyhow::Result<()> {
    let mut students: Vec<Student> = Vec::new();
    for new in demo_students() {
        let created = api.post("/api/v1/students", &new).await?;
        let student = api
            .get(&format!("/api/v1/students/{}", str_field(&created, "id")))
            .await?;
        students.push(serde_json::from_value(student)?);
    }

    let today = chrono::Local::now().date_naive();
    let records = demo_attendance(&students, today);
    let mut failed = 0;
    for record in &records {
        if let Err(e) = api.post("/api/v1/attendance", record).await {
            eprintln!("  {}: {}", record.student_code, e);
            failed += 1;
        }
    }

    println!("Seeded {} students", students.len());
    println!("  Attendance records: {}", records.len() - failed);
    if failed > 0 {
        println!("  Failed: {}", failed);
    }
    Ok(())
}

fn report_path(base: &str, period: &str, class: Option<&str>, format: Option<&str>) -> String {
    let mut path = format!("{}?period={}", base, period);
    if let Some(c) = class {
        path.push_str(&format!("&class={}", urlencoding::encode(c)));
    }
    if let Some(f) = format {
        path.push_str(&format!("&format={}", f));
    }
    path
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or("-")
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

fn print_students(body: &Value) {
    let students = body["students"].as_array().cloned().unwrap_or_default();
    if students.is_empty() {
        println!("No students registered yet.");
        return;
    }

    println!("{:<10} {:<28} {:<8} {}", "Code", "Name", "Class", "ID");
    println!("{}", "-".repeat(80));
    for s in &students {
        println!(
            "{:<10} {:<28} {:<8} {}",
            str_field(s, "student_code"),
            str_field(s, "name"),
            str_field(s, "class"),
            str_field(s, "id")
        );
    }
    println!();
    println!("Total: {}", body["total"].as_u64().unwrap_or(0));
}

fn print_attendance(body: &Value) {
    let counts = &body["counts"];
    println!(
        "Present {}  Late {}  Absent {}  Excused {}  Rate {:.1}%",
        counts["present"].as_u64().unwrap_or(0),
        counts["late"].as_u64().unwrap_or(0),
        counts["absent"].as_u64().unwrap_or(0),
        counts["excused"].as_u64().unwrap_or(0),
        body["rate"].as_f64().unwrap_or(0.0)
    );
    println!();

    let records = body["records"].as_array().cloned().unwrap_or_default();
    if records.is_empty() {
        println!("No records for the selected filters");
        return;
    }

    println!("{:<12} {:<10} {:<28} {:<8} {}", "Date", "Code", "Name", "Class", "Status");
    println!("{}", "-".repeat(70));
    for r in &records {
        println!(
            "{:<12} {:<10} {:<28} {:<8} {}",
            str_field(r, "date"),
            str_field(r, "student_code"),
            str_field(r, "student_name"),
            str_field(r, "class"),
            str_field(r, "status")
        );
    }
    println!();
    println!(
        "Page {}/{} ({} records)",
        body["page"].as_u64().unwrap_or(1),
        body["total_pages"].as_u64().unwrap_or(1),
        body["total"].as_u64().unwrap_or(0)
    );
}

fn print_report(report: &Value) {
    let summary = &report["summary"];
    println!(
        "Report ({}) {} to {}",
        str_field(report, "period"),
        str_field(report, "start"),
        str_field(report, "end")
    );
    println!(
        "Records: {}  Days: {}  Average rate: {:.1}%",
        summary["total_records"].as_u64().unwrap_or(0),
        summary["total_sessions"].as_u64().unwrap_or(0),
        summary["avg_rate"].as_f64().unwrap_or(0.0)
    );
    println!();

    let daily = report["daily"].as_array().cloned().unwrap_or_default();
    if daily.is_empty() {
        println!("No data for the selected period");
        return;
    }

    println!("{:<8} {:>8} {:>8} {:>8}", "Day", "Present", "Absent", "Late");
    println!("{}", "-".repeat(36));
    for day in &daily {
        println!(
            "{:<8} {:>8} {:>8} {:>8}",
            str_field(day, "label"),
            day["present"].as_u64().unwrap_or(0),
            day["absent"].as_u64().unwrap_or(0),
            day["late"].as_u64().unwrap_or(0)
        );
    }
}

fn print_users(body: &Value) {
    let counts = &body["counts"];
    println!(
        "Total {}  Admin {}  Teacher {}  Parent {}",
        counts["total"].as_u64().unwrap_or(0),
        counts["admin"].as_u64().unwrap_or(0),
        counts["teacher"].as_u64().unwrap_or(0),
        counts["parent"].as_u64().unwrap_or(0)
    );
    println!();

    println!("{:<32} {:<24} {:<8} {}", "Email", "Name", "Role", "UID");
    println!("{}", "-".repeat(90));
    for u in body["users"].as_array().cloned().unwrap_or_default() {
        println!(
            "{:<32} {:<24} {:<8} {}",
            str_field(&u, "email"),
            str_field(&u, "display_name"),
            str_field(&u, "role"),
            str_field(&u, "uid")
        );
    }
}
