use anyhow::{Context, Result, anyhow};
use clap::Parser;
use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use retreq::{Auth, RequestBody, RequestSpec, ResponseBody, send_with_retry};
use std::io::Write;

/// retreq - HTTP requests with exponential backoff
///
/// Sends one HTTP request, retrying on rate limiting (429), server errors
/// (5xx) and transient network failures, then prints the response body.
///
/// Examples:
///   retreq --base-url https://api.example.com -u key /v1/ping
///   retreq -X POST -H "Content-Type: application/json" -d '{"a":1}' -u key https://api.example.com/v1/items
#[derive(Parser, Debug)]
#[command(author, version = env!("RETREQ_VERSION"), about)]
struct Cli {
    /// Path (resolved against --base-url) or absolute URL
    #[arg(value_name = "URI")]
    uri: String,

    /// Base URL the URI is resolved against
    #[arg(long = "base-url", env = "RETREQ_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Basic auth user
    #[arg(short, long, env = "RETREQ_USER")]
    user: String,

    /// Basic auth password
    #[arg(short, long, env = "RETREQ_PASSWORD", default_value = "")]
    password: String,

    /// Extra header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Request body; sent as JSON when it parses as JSON
    #[arg(short = 'd', long = "data")]
    data: Option<String>,

    /// Retries after the first attempt (default 20)
    #[arg(short, long, env = "RETREQ_MAX_RETRIES")]
    retries: Option<u32>,
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Header '{}' must look like 'Name: value'", raw))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .with_context(|| format!("Invalid header name in '{}'", raw))?;
    let value = HeaderValue::from_str(value.trim())
        .with_context(|| format!("Invalid header value in '{}'", raw))?;
    Ok((name, value))
}

fn build_spec(cli: &Cli) -> Result<RequestSpec> {
    let method = Method::from_bytes(cli.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", cli.method))?;

    let mut spec = RequestSpec::new(&cli.uri, Auth::new(&cli.user, &cli.password)).with_method(method);
    if let Some(base_url) = &cli.base_url {
        spec = spec.with_base_url(base_url);
    }
    for raw in &cli.headers {
        let (name, value) = parse_header(raw)?;
        spec.headers.append(name, value);
    }
    if let Some(data) = &cli.data {
        spec.body = match serde_json::from_str(data) {
            Ok(json) => RequestBody::Json(json),
            Err(_) => RequestBody::Text(data.clone()),
        };
    }
    Ok(spec)
}

fn print_body(body: &ResponseBody) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    match body {
        ResponseBody::Empty => {}
        ResponseBody::Json(value) => {
            writeln!(stdout, "{}", serde_json::to_string_pretty(value)?)?;
        }
        ResponseBody::Text(text) => write!(stdout, "{}", text)?,
        ResponseBody::Bytes(bytes) => stdout.write_all(bytes)?,
    }
    stdout.flush().context("Failed to write response body")
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let spec = build_spec(&cli)?;
    let completion = send_with_retry(cli.retries, &spec).await;
    let attempts = completion.attempts;
    let (_, body) = completion
        .into_result()
        .with_context(|| format!("Request failed after {} attempt(s)", attempts))?;

    print_body(&body)
}
