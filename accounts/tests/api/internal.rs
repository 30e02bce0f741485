use payloads::{Amount, requests};
use reqwest::StatusCode;
use test_helpers::{assert_error_code, assert_status_code, spawn_bank};

fn amount(s: &str) -> Amount {
    Amount::parse(s).unwrap()
}

#[tokio::test]
async fn internal_surface_requires_the_service_key() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;

    let rogue = payloads::InternalAccountsClient::new(
        bank.accounts_client.address.clone(),
        "wrong-key".to_string(),
    );
    let result = rogue.get_account(number).await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn credit_then_debit_round_trips() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let internal = bank.internal_accounts_client();

    let after_credit = internal.credit(number, amount("100.00")).await?;
    assert_eq!(after_credit.balance.to_string(), "100.00");

    let after_debit = internal.debit(number, amount("40.50")).await?;
    assert_eq!(after_debit.balance.to_string(), "59.50");

    // Two balance_update audit rows, one per mutation.
    assert_eq!(
        bank.audit_count(number, Some("balance_update")).await?,
        2
    );

    Ok(())
}

#[tokio::test]
async fn debit_to_exactly_zero_succeeds() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let internal = bank.internal_accounts_client();

    internal.credit(number, amount("100.00")).await?;
    let result = internal.debit(number, amount("100.01")).await;
    assert_error_code(result, "InsufficientFunds");

    let drained = internal.debit(number, amount("100.00")).await?;
    assert_eq!(drained.balance.to_string(), "0.00");

    Ok(())
}

#[tokio::test]
async fn debit_requires_an_open_active_account() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let internal = bank.internal_accounts_client();
    internal.credit(number, amount("100.00")).await?;

    bank.accounts_client.inactivate(number).await?;
    assert_error_code(
        internal.debit(number, amount("1.00")).await,
        "AccountInactive",
    );
    assert_error_code(
        internal.credit(number, amount("1.00")).await,
        "AccountInactive",
    );

    bank.accounts_client.activate(number).await?;
    bank.accounts_client.close(number).await?;
    assert_error_code(
        internal.debit(number, amount("1.00")).await,
        "AccountClosed",
    );

    Ok(())
}

#[tokio::test]
async fn credit_is_capped_at_the_balance_ceiling() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let internal = bank.internal_accounts_client();

    // i64::MAX scaled units is representable...
    let ceiling = format!("{}.07", i64::MAX / 100);
    internal.credit(number, amount(&ceiling)).await?;

    // ...and one cent more is not.
    let result = internal.credit(number, amount("0.01")).await;
    assert_error_code(result, "BalanceOverflow");

    Ok(())
}

#[tokio::test]
async fn concurrent_debits_serialize_on_the_account_row()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let internal = bank.internal_accounts_client();
    internal.credit(number, amount("100.00")).await?;

    // Both debits fit only one at a time: exactly one must succeed and the
    // loser must observe the winner's post-state.
    let (first, second) = tokio::join!(
        internal.debit(number, amount("60.00")),
        internal.debit(number, amount("60.00")),
    );
    let successes =
        [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let survivor = first.or(second)?;
    assert_eq!(survivor.balance.to_string(), "40.00");

    Ok(())
}

#[tokio::test]
async fn internal_verify_pin_has_a_uniform_failure_shape()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let internal = bank.internal_accounts_client();

    let right = internal
        .verify_pin(
            number,
            &requests::VerifyPin {
                pin: "9640".to_string(),
            },
        )
        .await?;
    assert!(right.valid);

    let wrong = internal
        .verify_pin(
            number,
            &requests::VerifyPin {
                pin: "0000".to_string(),
            },
        )
        .await?;
    assert!(!wrong.valid);

    // Unknown account: same 200 + invalid shape, not a 404.
    let unknown = internal
        .verify_pin(
            payloads::AccountNumber(999_999),
            &requests::VerifyPin {
                pin: "9640".to_string(),
            },
        )
        .await?;
    assert!(!unknown.valid);

    Ok(())
}

#[tokio::test]
async fn account_status_tracks_the_lifecycle() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let internal = bank.internal_accounts_client();

    let status = internal.get_active(number).await?;
    assert!(status.exists && status.active && !status.closed);

    bank.accounts_client.inactivate(number).await?;
    let status = internal.get_active(number).await?;
    assert!(status.exists && !status.active && !status.closed);

    bank.accounts_client.activate(number).await?;
    bank.accounts_client.close(number).await?;
    let status = internal.get_active(number).await?;
    assert!(status.exists && !status.active && status.closed);

    let missing = internal
        .get_active(payloads::AccountNumber(999_999))
        .await?;
    assert!(!missing.exists && !missing.active && !missing.closed);

    Ok(())
}

#[tokio::test]
async fn privilege_lookup_follows_updates() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let internal = bank.internal_accounts_client();

    let info = internal.get_privilege(number).await?;
    assert_eq!(info.privilege, payloads::Privilege::Gold);

    bank.accounts_client
        .update_account(
            number,
            &requests::UpdateAccount {
                holder_name: None,
                privilege: Some(payloads::Privilege::Silver),
            },
        )
        .await?;
    let info = internal.get_privilege(number).await?;
    assert_eq!(info.privilege, payloads::Privilege::Silver);

    Ok(())
}
