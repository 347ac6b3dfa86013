use std::sync::atomic::{AtomicU64, Ordering};

use arkgate::prelude::*;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Chain stand-in
// ---------------------------------------------------------------------------

/// Deploys "contracts" by counting, and reports a fixed kill count.
#[derive(Default)]
struct LocalChain {
    next: AtomicU64,
}

impl ContractDeployer for LocalChain {
    async fn deploy(&self, owner: Option<&str>) -> Result<String, ChainError> {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(owner = owner.unwrap_or("deployer"), n, "deploying contract");
        Ok(format!("0x{n:040x}"))
    }

    async fn kills(&self, _contract: &str) -> Result<u64, ChainError> {
        Ok(0)
    }
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

fn show(label: &str, value: &impl serde::Serialize) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| e.to_string());
    println!("── {label}\n{json}\n");
}

#[tokio::main]
async fn main() -> Result<(), ArkgateError> {
    init_tracing("info,arkgate_session=debug");

    let remote = MemoryRemote::new("demo-refresh");
    let gateway = Gateway::<MemoryRemote, LocalChain>::builder()
        .remote(RemoteConfig {
            refresh_token: Some("demo-refresh".into()),
            ..RemoteConfig::default()
        })
        .build(remote, LocalChain::default())?;

    // GET /token?username=alice
    let mut data = Map::new();
    data.insert("client".into(), Value::String("walkthrough".into()));
    let token = gateway.issue_token("alice", data)?;
    println!("── token issued: {token}\n");

    // POST /login
    let outcome = gateway
        .login(&LoginRequest {
            username: "alice".into(),
            token,
            address: "0x52908400098527886E0F7030069857D2E4169EE7".into(),
            ip: "1.2.3.4".into(),
        })
        .await?;
    show("login", &outcome);

    // POST /validatesession
    for ip in ["1.2.3.4", "9.9.9.9"] {
        let status = gateway.validate_session("alice", ip).await?;
        show(&format!("validatesession from {ip} → {}", status.http_status()), &status);
    }

    // GET /user/:username
    match gateway.user("alice").await? {
        Some(profile) => show("user", &profile),
        None => println!("── user: not found\n"),
    }

    // A user who never logged in.
    let status = gateway.validate_session("bob", "1.2.3.4").await?;
    show(&format!("validatesession bob → {}", status.http_status()), &status);

    Ok(())
}
