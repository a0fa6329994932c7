use clap::Parser;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

/// Fields every discovery document must carry.
const REQUIRED_DISCOVERY_FIELDS: &[&str] =
    &["issuer", "authorization_endpoint", "token_endpoint", "jwks_uri"];

#[derive(Parser)]
#[command(name = "oidc-smoke")]
#[command(about = "Smoke-test a deployed mock OIDC provider", long_about = None)]
struct Cli {
    /// Deployment origin
    #[arg(short, long, env = "TEST_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Public base path of the provider
    #[arg(short, long, default_value = "/api/oidc")]
    base: String,
}

struct Check {
    name: &'static str,
    path: &'static str,
}

const CHECKS: &[Check] = &[
    Check { name: "Root", path: "/" },
    Check { name: "Discovery", path: "/.well-known/openid-configuration" },
    Check { name: "JWKS", path: "/jwks" },
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let origin = cli.url.trim_end_matches('/');
    let base = cli.base.trim_end_matches('/');

    println!("Testing OIDC endpoints at: {origin}{base}\n");

    let mut failures = 0;
    for check in CHECKS {
        let url = format!("{origin}{base}{}", check.path);
        println!("Testing {}: GET {url}", check.name);
        match run_check(&client, &url, check).await {
            Ok(()) => println!("  OK\n"),
            Err(e) => {
                failures += 1;
                println!("  FAILED: {e}\n");
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} check(s) failed").into());
    }
    println!("All checks passed");
    Ok(())
}

async fn run_check(
    client: &reqwest::Client,
    url: &str,
    check: &Check,
) -> Result<(), Box<dyn std::error::Error>> {
    let res = client.get(url).send().await?;
    let status = res.status();
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string();

    println!("  Status: {status}");
    println!("  Content-Type: {content_type}");

    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        let snippet: String = text.chars().take(200).collect();
        return Err(format!("unexpected status {status}: {snippet}").into());
    }

    if content_type.contains("application/json") {
        let data: Value = res.json().await?;
        if let Value::Object(map) = &data {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            println!("  Response keys: {}", keys.join(", "));
        }
        if check.path.contains("openid-configuration") {
            let missing: Vec<&str> = REQUIRED_DISCOVERY_FIELDS
                .iter()
                .copied()
                .filter(|f| data.get(*f).map_or(true, Value::is_null))
                .collect();
            if !missing.is_empty() {
                return Err(format!("missing required fields: {}", missing.join(", ")).into());
            }
            println!("  All required fields present");
        }
    } else {
        let text = res.text().await?;
        println!("  Body length: {} characters", text.len());
    }

    Ok(())
}
