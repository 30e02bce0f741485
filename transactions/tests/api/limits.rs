use payloads::{Amount, Privilege, TransferMode, requests};
use test_helpers::{assert_error_code, john_savings_details, spawn_bank};

fn withdraw_req(
    account_number: payloads::AccountNumber,
    amount: &str,
) -> requests::Withdraw {
    requests::Withdraw {
        account_number,
        amount: Amount::parse(amount).unwrap(),
        pin: "9640".to_string(),
    }
}

#[tokio::test]
async fn the_count_cap_rejects_the_twenty_first_gold_operation()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let a = bank.create_gold_savings("John Doe").await?;
    let b = bank.create_gold_savings("Jane Doe").await?;
    bank.deposit(a, "1000.00").await?;

    for _ in 0..20 {
        bank.transactions_client
            .transfer(&requests::Transfer {
                from_account: a,
                to_account: b,
                amount: Amount::parse("1.00")?,
                mode: TransferMode::Imps,
                pin: "9640".to_string(),
            })
            .await?;
    }

    // The 21st is rejected on count regardless of amount.
    let result = bank
        .transactions_client
        .transfer(&requests::Transfer {
            from_account: a,
            to_account: b,
            amount: Amount::parse("0.01")?,
            mode: TransferMode::Imps,
            pin: "9640".to_string(),
        })
        .await;
    assert_error_code(result, "DailyCountExceeded");

    // Balance unchanged by the rejected attempt, no new journal rows.
    let account_a = bank.accounts_client.get_account(a).await?;
    assert_eq!(account_a.balance.to_string(), "980.00");
    let journal_rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM fund_transfers
        WHERE from_account <> 0 AND to_account <> 0;",
    )
    .fetch_one(&bank.transactions_db)
    .await?;
    assert_eq!(journal_rows, 20);

    // Receiving 20 transfers consumed nothing of b's own caps.
    let limits_b = bank.transactions_client.transfer_limits(b).await?;
    assert_eq!(limits_b.used_count, 0);
    assert_eq!(limits_b.used_amount.to_string(), "0.00");

    Ok(())
}

#[tokio::test]
async fn receiving_a_transfer_consumes_none_of_the_recipients_cap()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let a = bank.create_gold_savings("John Doe").await?;
    let b = bank.create_gold_savings("Jane Doe").await?;
    bank.deposit(a, "450000.00").await?;

    bank.transactions_client
        .transfer(&requests::Transfer {
            from_account: a,
            to_account: b,
            amount: Amount::parse("400000.00")?,
            mode: TransferMode::Neft,
            pin: "9640".to_string(),
        })
        .await?;

    // Only the source leg counts: a spent 400000, b spent nothing.
    let limits_a = bank.transactions_client.transfer_limits(a).await?;
    assert_eq!(limits_a.used_amount.to_string(), "400000.00");
    assert_eq!(limits_a.used_count, 1);
    let limits_b = bank.transactions_client.transfer_limits(b).await?;
    assert_eq!(limits_b.used_amount.to_string(), "0.00");
    assert_eq!(limits_b.used_count, 0);
    assert_eq!(limits_b.remaining_amount.to_string(), "500000.00");
    assert_eq!(limits_b.remaining_count, 20);

    // b still has its full GOLD headroom for its own spending.
    bank.transactions_client
        .withdraw(&withdraw_req(b, "400000.00"))
        .await?;
    let limits_b = bank.transactions_client.transfer_limits(b).await?;
    assert_eq!(limits_b.used_amount.to_string(), "400000.00");
    assert_eq!(limits_b.used_count, 1);

    Ok(())
}

#[tokio::test]
async fn reaching_the_amount_cap_exactly_is_admissible()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    // SILVER: 100000.00 amount cap, 10 count cap.
    let details = requests::CreateSavingsAccount {
        privilege: Some(Privilege::Silver),
        ..john_savings_details()
    };
    let number = bank
        .accounts_client
        .create_savings(&details)
        .await?
        .account_number;
    bank.deposit(number, "200000.00").await?;

    bank.transactions_client
        .withdraw(&withdraw_req(number, "99999.99"))
        .await?;
    // used + 0.01 == cap: admissible.
    bank.transactions_client
        .withdraw(&withdraw_req(number, "0.01"))
        .await?;

    // One cent past the cap is not.
    let result = bank
        .transactions_client
        .withdraw(&withdraw_req(number, "0.01"))
        .await;
    assert_error_code(result, "DailyLimitExceeded");

    let limits =
        bank.transactions_client.transfer_limits(number).await?;
    assert_eq!(limits.used_amount.to_string(), "100000.00");
    assert_eq!(limits.remaining_amount.to_string(), "0.00");
    assert_eq!(limits.used_count, 2);

    Ok(())
}

#[tokio::test]
async fn withdrawals_and_transfers_share_one_cap() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let a = bank.create_gold_savings("John Doe").await?;
    let b = bank.create_gold_savings("Jane Doe").await?;
    bank.deposit(a, "600000.00").await?;

    bank.transactions_client
        .withdraw(&withdraw_req(a, "300000.00"))
        .await?;
    // 300000 used; another 200001 by transfer overshoots the GOLD cap.
    let result = bank
        .transactions_client
        .transfer(&requests::Transfer {
            from_account: a,
            to_account: b,
            amount: Amount::parse("200000.01")?,
            mode: TransferMode::Neft,
            pin: "9640".to_string(),
        })
        .await;
    assert_error_code(result, "DailyLimitExceeded");

    // A transfer inside the remaining headroom is fine.
    bank.transactions_client
        .transfer(&requests::Transfer {
            from_account: a,
            to_account: b,
            amount: Amount::parse("200000.00")?,
            mode: TransferMode::Neft,
            pin: "9640".to_string(),
        })
        .await?;

    Ok(())
}

#[tokio::test]
async fn limits_reset_at_utc_midnight() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "1000.00").await?;

    bank.transactions_client
        .withdraw(&withdraw_req(number, "400.00"))
        .await?;
    let limits =
        bank.transactions_client.transfer_limits(number).await?;
    assert_eq!(limits.used_count, 1);

    // The test epoch is midday; 13 hours crosses midnight UTC. The bearer
    // token expires with the jump, so mint a fresh one.
    bank.advance(jiff::Span::new().hours(13));
    bank.login_teller();

    let limits =
        bank.transactions_client.transfer_limits(number).await?;
    assert_eq!(limits.used_count, 0);
    assert_eq!(limits.used_amount.to_string(), "0.00");
    bank.transactions_client
        .withdraw(&withdraw_req(number, "400.00"))
        .await?;

    Ok(())
}

#[tokio::test]
async fn transfer_limits_snapshot_reports_the_tier() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "1000.00").await?;
    bank.transactions_client
        .withdraw(&withdraw_req(number, "150.00"))
        .await?;

    let limits =
        bank.transactions_client.transfer_limits(number).await?;
    assert_eq!(limits.privilege, Privilege::Gold);
    assert_eq!(limits.cap_amount.to_string(), "500000.00");
    assert_eq!(limits.cap_count, 20);
    assert_eq!(limits.used_amount.to_string(), "150.00");
    assert_eq!(limits.used_count, 1);
    assert_eq!(limits.remaining_amount.to_string(), "499850.00");
    assert_eq!(limits.remaining_count, 19);

    Ok(())
}
