use payloads::{Privilege, requests};
use reqwest::StatusCode;
use test_helpers::{assert_error_code, assert_status_code, spawn_bank};

#[tokio::test]
async fn inactivate_then_activate_round_trips() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;

    bank.accounts_client.inactivate(number).await?;
    let account = bank.accounts_client.get_account(number).await?;
    assert!(!account.active);

    bank.accounts_client.activate(number).await?;
    let account = bank.accounts_client.get_account(number).await?;
    assert!(account.active);

    assert_eq!(bank.audit_count(number, Some("inactivate")).await?, 1);
    assert_eq!(bank.audit_count(number, Some("activate")).await?, 1);

    Ok(())
}

#[tokio::test]
async fn redundant_transitions_are_rejected_without_audit()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    let audit_rows = bank.audit_count(number, None).await?;

    let result = bank.accounts_client.activate(number).await;
    assert_error_code(result, "AlreadyActive");

    bank.accounts_client.inactivate(number).await?;
    let result = bank.accounts_client.inactivate(number).await;
    assert_error_code(result, "AlreadyInactive");

    // Exactly one audit row landed (the successful inactivate).
    assert_eq!(bank.audit_count(number, None).await?, audit_rows + 1);

    Ok(())
}

#[tokio::test]
async fn close_is_terminal() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;

    bank.accounts_client.close(number).await?;
    let account = bank.accounts_client.get_account(number).await?;
    assert!(account.closed_at.is_some());
    assert!(!account.active);
    assert_eq!(bank.audit_count(number, Some("close")).await?, 1);

    for result in [
        bank.accounts_client.activate(number).await,
        bank.accounts_client.inactivate(number).await,
        bank.accounts_client.close(number).await,
    ] {
        assert_error_code(result, "AccountClosed");
    }

    Ok(())
}

#[tokio::test]
async fn close_with_nonzero_balance_is_permitted() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.deposit(number, "250.00").await?;

    // Permissive close policy: allowed, operator warning only.
    bank.accounts_client.close(number).await?;
    let account = bank.accounts_client.get_account(number).await?;
    assert!(account.closed_at.is_some());
    assert_eq!(account.balance.to_string(), "250.00");

    Ok(())
}

#[tokio::test]
async fn update_edits_name_and_privilege() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;

    bank.accounts_client
        .update_account(
            number,
            &requests::UpdateAccount {
                holder_name: Some("John Q. Doe".to_string()),
                privilege: Some(Privilege::Premium),
            },
        )
        .await?;

    let account = bank.accounts_client.get_account(number).await?;
    assert_eq!(account.holder_name, "John Q. Doe");
    assert_eq!(account.privilege, Privilege::Premium);
    assert_eq!(bank.audit_count(number, Some("edit")).await?, 1);

    Ok(())
}

#[tokio::test]
async fn privilege_only_update_gets_its_own_audit_action()
-> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;

    bank.accounts_client
        .update_account(
            number,
            &requests::UpdateAccount {
                holder_name: None,
                privilege: Some(Privilege::Silver),
            },
        )
        .await?;

    assert_eq!(
        bank.audit_count(number, Some("privilege_update")).await?,
        1
    );
    assert_eq!(bank.audit_count(number, Some("edit")).await?, 0);

    Ok(())
}

#[tokio::test]
async fn empty_update_is_rejected() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;

    let result = bank
        .accounts_client
        .update_account(number, &requests::UpdateAccount::default())
        .await;
    assert_status_code(result, StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
async fn update_on_closed_account_is_rejected() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;
    bank.accounts_client.close(number).await?;

    let result = bank
        .accounts_client
        .update_account(
            number,
            &requests::UpdateAccount {
                holder_name: Some("Renamed".to_string()),
                privilege: None,
            },
        )
        .await;
    assert_error_code(result, "AccountClosed");

    Ok(())
}

#[tokio::test]
async fn lifecycle_transitions_require_admin() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();
    let number = bank.create_gold_savings("John Doe").await?;

    bank.login_teller();
    for result in [
        bank.accounts_client.inactivate(number).await,
        bank.accounts_client.activate(number).await,
        bank.accounts_client.close(number).await,
    ] {
        assert_status_code(result, StatusCode::FORBIDDEN);
    }

    Ok(())
}

#[tokio::test]
async fn unknown_accounts_return_not_found() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    let missing = payloads::AccountNumber(999_999);
    assert_status_code(
        bank.accounts_client.get_account(missing).await,
        StatusCode::NOT_FOUND,
    );
    assert_status_code(
        bank.accounts_client.close(missing).await,
        StatusCode::NOT_FOUND,
    );

    Ok(())
}
