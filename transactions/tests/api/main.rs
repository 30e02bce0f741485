mod limits;
mod withdrawals;

use reqwest::StatusCode;
use test_helpers::{assert_status_code, spawn_bank};

#[tokio::test]
async fn health_check() -> anyhow::Result<()> {
    let bank = spawn_bank().await;

    bank.transactions_client.health_check().await?;

    Ok(())
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() -> anyhow::Result<()> {
    let bank = spawn_bank().await;

    let result = bank
        .transactions_client
        .transfer_limits(payloads::AccountNumber(1000))
        .await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}
