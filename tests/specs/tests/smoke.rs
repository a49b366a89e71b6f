// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `tokengate` binary against a
//! local refresh endpoint and watch the credential store on disk.

use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::routing::post;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::net::TcpListener;

use tokengate::store::{KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_TOKEN_EXPIRY};
use tokengate_specs::TokengateProcess;

const TIMEOUT: Duration = Duration::from_secs(10);
const FAR_FUTURE_EXP_SECS: u64 = 9999999999;

fn make_token(exp_secs: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp": {exp_secs}}}"#));
    format!("{header}.{body}.sig")
}

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Start a refresh endpoint that always issues a far-future token.
async fn refresh_server() -> anyhow::Result<SocketAddr> {
    let app = Router::new().route(
        "/refresh",
        post(|| async {
            axum::Json(serde_json::json!({ "token": make_token(FAR_FUTURE_EXP_SECS) }))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(addr)
}

#[tokio::test]
async fn refreshes_expiring_credential_on_disk() -> anyhow::Result<()> {
    let addr = refresh_server().await?;

    // 100s of validity left — inside the default 300s refresh window.
    let seeded_token = make_token((epoch_ms() + 100_000) / 1000);
    let seed = serde_json::json!({
        KEY_ACCESS_TOKEN: seeded_token,
        KEY_REFRESH_TOKEN: "seed-refresh",
        KEY_TOKEN_EXPIRY: (epoch_ms() + 100_000).to_string(),
    });

    let gate =
        TokengateProcess::spawn(addr, Some(&seed), &["--check-interval-secs", "1"])?;

    let store = gate
        .wait_for_store(TIMEOUT, |s| {
            s.get(KEY_ACCESS_TOKEN).and_then(|v| v.as_str()) != Some(seeded_token.as_str())
        })
        .await?;

    // New token persisted, refresh token untouched, expiry recomputed from
    // the new token's exp claim.
    assert_eq!(
        store.get(KEY_ACCESS_TOKEN).and_then(|v| v.as_str()),
        Some(make_token(FAR_FUTURE_EXP_SECS).as_str()),
    );
    assert_eq!(store.get(KEY_REFRESH_TOKEN).and_then(|v| v.as_str()), Some("seed-refresh"));
    assert_eq!(
        store.get(KEY_TOKEN_EXPIRY).and_then(|v| v.as_str()),
        Some("9999999999000"),
    );

    Ok(())
}

#[tokio::test]
async fn healthy_credential_is_left_alone() -> anyhow::Result<()> {
    let addr = refresh_server().await?;

    // An hour of validity: no refresh should happen.
    let seeded_token = make_token((epoch_ms() + 3_600_000) / 1000);
    let seed = serde_json::json!({
        KEY_ACCESS_TOKEN: seeded_token,
        KEY_REFRESH_TOKEN: "seed-refresh",
        KEY_TOKEN_EXPIRY: (epoch_ms() + 3_600_000).to_string(),
    });

    let mut gate =
        TokengateProcess::spawn(addr, Some(&seed), &["--check-interval-secs", "1"])?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(gate.still_running()?);
    let store = gate.read_store().ok_or_else(|| anyhow::anyhow!("store file missing"))?;
    assert_eq!(
        store.get(KEY_ACCESS_TOKEN).and_then(|v| v.as_str()),
        Some(seeded_token.as_str()),
    );

    Ok(())
}

#[tokio::test]
async fn idles_without_credential() -> anyhow::Result<()> {
    let addr = refresh_server().await?;

    let mut gate = TokengateProcess::spawn(addr, None, &["--check-interval-secs", "1"])?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Credential absence is the logged-out steady state, not an error.
    assert!(gate.still_running()?);
    assert!(gate.read_store().is_none(), "daemon must not invent a store file");

    Ok(())
}
