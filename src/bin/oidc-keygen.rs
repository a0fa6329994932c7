use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use clap::Parser;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "oidc-keygen")]
#[command(about = "Generate signing keys and cookie secrets for the mock OIDC provider", long_about = None)]
struct Cli {
    /// RSA modulus size in bits
    #[arg(long, default_value_t = 2048)]
    bits: usize,

    /// Also print a COOKIE_KEYS value with this many random secrets
    #[arg(long, value_name = "N")]
    cookie_keys: Option<usize>,
}

fn b64(n: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(n.to_bytes_be())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, cli.bits)?;
    let kid = format!("dev-{}", uuid::Uuid::new_v4().simple());

    let [p, q] = match key.primes() {
        [p, q] => [p, q],
        _ => return Err("generated key does not have exactly two primes".into()),
    };
    let dp = key.dp().ok_or("missing CRT exponent dp")?;
    let dq = key.dq().ok_or("missing CRT exponent dq")?;
    let qi = key
        .crt_coefficient()
        .ok_or("missing CRT coefficient qi")?;

    let public = json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": b64(key.n()),
        "e": b64(key.e()),
    });

    let mut private = public.clone();
    if let Value::Object(map) = &mut private {
        map.insert("d".into(), json!(b64(key.d())));
        map.insert("p".into(), json!(b64(p)));
        map.insert("q".into(), json!(b64(q)));
        map.insert("dp".into(), json!(b64(dp)));
        map.insert("dq".into(), json!(b64(dq)));
        map.insert("qi".into(), json!(b64(&qi)));
    }

    let private_set = json!({ "keys": [private] });
    let public_set = json!({ "keys": [public] });

    println!("SIGNING_JWKS (private, put in env SIGNING_JWKS):");
    println!("{}", serde_json::to_string_pretty(&private_set)?);
    println!("\nPUBLIC_JWKS (for reference only):");
    println!("{}", serde_json::to_string_pretty(&public_set)?);
    println!("\nSIGNING_JWKS (single line):");
    println!("{}", serde_json::to_string(&private_set)?);

    if let Some(count) = cli.cookie_keys {
        let secrets: Vec<String> = (0..count.max(1))
            .map(|_| URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>()))
            .collect();
        println!("\nCOOKIE_KEYS:");
        println!("{}", serde_json::to_string(&secrets)?);
    }

    Ok(())
}
