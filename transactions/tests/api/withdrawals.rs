use payloads::{Amount, EntryKind, requests};
use reqwest::StatusCode;
use test_helpers::{assert_error_code, assert_status_code, spawn_bank};

fn withdraw_req(
    account_number: payloads::AccountNumber,
    amount: &str,
    pin: &str,
) -> requests::Withdraw {
    requests::Withdraw {
        account_number,
        amount: Amount::parse(amount).unwrap(),
        pin: pin.to_string(),
    }
}

#[tokio::test]
async fn withdraw_with_the_correct_pin() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "10000.00").await?;

    let receipt = bank
        .transactions_client
        .withdraw(&withdraw_req(number, "5000.00", "9640"))
        .await?;
    assert_eq!(receipt.kind, EntryKind::Withdraw);
    assert_eq!(receipt.balance.to_string(), "5000.00");

    let account = bank.accounts_client.get_account(number).await?;
    assert_eq!(account.balance.to_string(), "5000.00");

    // Sentinel destination on the journal row.
    let (from, to): (i64, i64) = sqlx::query_as(
        "SELECT from_account, to_account FROM fund_transfers
        WHERE from_account <> 0;",
    )
    .fetch_one(&bank.transactions_db)
    .await?;
    assert_eq!(from, number.0);
    assert_eq!(to, 0);

    Ok(())
}

#[tokio::test]
async fn wrong_pin_is_unauthorized_and_changes_nothing()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "10000.00").await?;

    let result = bank
        .transactions_client
        .withdraw(&withdraw_req(number, "5000.00", "0000"))
        .await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    let account = bank.accounts_client.get_account(number).await?;
    assert_eq!(account.balance.to_string(), "10000.00");
    let entries = bank.transactions_client.transaction_logs(number).await?;
    assert_eq!(entries.len(), 1); // just the deposit

    Ok(())
}

#[tokio::test]
async fn withdrawing_the_whole_balance_reaches_zero() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "100.00").await?;

    let result = bank
        .transactions_client
        .withdraw(&withdraw_req(number, "100.01", "9640"))
        .await;
    assert_error_code(result, "InsufficientFunds");

    let receipt = bank
        .transactions_client
        .withdraw(&withdraw_req(number, "100.00", "9640"))
        .await?;
    assert_eq!(receipt.balance.to_string(), "0.00");

    Ok(())
}

#[tokio::test]
async fn inactive_account_rejects_withdrawals_until_reactivated()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "100.00").await?;

    bank.accounts_client.inactivate(number).await?;
    let result = bank
        .transactions_client
        .withdraw(&withdraw_req(number, "1.00", "9640"))
        .await;
    assert_error_code(result, "AccountInactive");

    bank.accounts_client.activate(number).await?;
    let receipt = bank
        .transactions_client
        .withdraw(&withdraw_req(number, "1.00", "9640"))
        .await?;
    assert_eq!(receipt.balance.to_string(), "99.00");

    Ok(())
}

#[tokio::test]
async fn failed_withdrawals_consume_no_daily_limit() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "100.00").await?;

    let before = bank.transactions_client.transfer_limits(number).await?;
    let result = bank
        .transactions_client
        .withdraw(&withdraw_req(number, "500.00", "9640"))
        .await;
    assert_error_code(result, "InsufficientFunds");

    let after = bank.transactions_client.transfer_limits(number).await?;
    assert_eq!(before.used_count, after.used_count);
    assert_eq!(before.used_amount, after.used_amount);

    Ok(())
}

#[tokio::test]
async fn withdraw_then_deposit_restores_balance_but_counts_once()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "1000.00").await?;

    bank.transactions_client
        .withdraw(&withdraw_req(number, "250.00", "9640"))
        .await?;
    bank.deposit(number, "250.00").await?;

    let account = bank.accounts_client.get_account(number).await?;
    assert_eq!(account.balance.to_string(), "1000.00");

    // Only the withdrawal consumed the daily caps.
    let limits = bank.transactions_client.transfer_limits(number).await?;
    assert_eq!(limits.used_count, 1);
    assert_eq!(limits.used_amount.to_string(), "250.00");

    Ok(())
}
