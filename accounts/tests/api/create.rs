use payloads::{Balance, Gender, Privilege, requests, responses};
use reqwest::StatusCode;
use test_helpers::{
    acme_current_details, assert_error_code, assert_status_code,
    john_savings_details, spawn_bank,
};

#[tokio::test]
async fn create_savings_then_get_round_trips() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    let details = john_savings_details();
    let created = bank.accounts_client.create_savings(&details).await?;
    assert!(created.account_number.0 >= 1000);

    let account =
        bank.accounts_client.get_account(created.account_number).await?;
    assert_eq!(account.holder_name, details.holder_name);
    assert_eq!(account.privilege, Privilege::Gold);
    assert_eq!(account.balance, Balance::ZERO);
    assert!(account.active);
    assert!(account.closed_at.is_none());
    match account.details {
        responses::KindDetails::Savings(savings) => {
            assert_eq!(savings.date_of_birth, details.date_of_birth);
            assert_eq!(savings.gender, Gender::Male);
            assert_eq!(savings.phone_number, details.phone_number);
        }
        other => panic!("expected savings details, got {other:?}"),
    }

    assert_eq!(
        bank.audit_count(created.account_number, Some("create")).await?,
        1
    );
    assert_eq!(bank.audit_count(created.account_number, None).await?, 1);

    Ok(())
}

#[tokio::test]
async fn account_numbers_are_monotonic() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    let first = bank.create_gold_savings("John Doe").await?;
    let second = bank.create_gold_savings("Jane Doe").await?;
    let third = bank
        .accounts_client
        .create_current(&acme_current_details())
        .await?
        .account_number;

    assert!(first.0 >= 1000);
    assert!(second > first);
    assert!(third > second);

    Ok(())
}

#[tokio::test]
async fn underage_holder_is_rejected() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    // One day short of 18 at the test epoch (2025-06-15).
    let details = requests::CreateSavingsAccount {
        date_of_birth: jiff::civil::date(2007, 6, 16),
        ..john_savings_details()
    };
    let result = bank.accounts_client.create_savings(&details).await;
    assert_error_code(result, "AgeRestriction");

    // Exactly 18 today is accepted.
    let details = requests::CreateSavingsAccount {
        date_of_birth: jiff::civil::date(2007, 6, 15),
        ..john_savings_details()
    };
    bank.accounts_client.create_savings(&details).await?;

    Ok(())
}

#[tokio::test]
async fn weak_pins_are_rejected() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    for pin in ["1234", "4321", "0000", "1111", "123", "1234567", "12a4"] {
        let details = requests::CreateSavingsAccount {
            pin: pin.to_string(),
            ..john_savings_details()
        };
        let result = bank.accounts_client.create_savings(&details).await;
        assert_status_code(result, StatusCode::UNPROCESSABLE_ENTITY);
    }

    for (holder, pin) in [("A Holder", "9640"), ("B Holder", "5837")] {
        let details = requests::CreateSavingsAccount {
            holder_name: holder.to_string(),
            pin: pin.to_string(),
            ..john_savings_details()
        };
        bank.accounts_client.create_savings(&details).await?;
    }

    Ok(())
}

#[tokio::test]
async fn bad_phone_numbers_are_rejected() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    for phone in ["123456789", "123456789012345678901", "98765abcde"] {
        let details = requests::CreateSavingsAccount {
            phone_number: phone.to_string(),
            ..john_savings_details()
        };
        let result = bank.accounts_client.create_savings(&details).await;
        assert_error_code(result, "InvalidPhone");
    }

    Ok(())
}

#[tokio::test]
async fn duplicate_savings_holder_is_rejected() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    bank.accounts_client
        .create_savings(&john_savings_details())
        .await?;
    let result = bank
        .accounts_client
        .create_savings(&john_savings_details())
        .await;
    assert_error_code(result, "Duplicate");

    // Same name with a different date of birth is a different person.
    let details = requests::CreateSavingsAccount {
        date_of_birth: jiff::civil::date(2000, 1, 1),
        ..john_savings_details()
    };
    bank.accounts_client.create_savings(&details).await?;

    Ok(())
}

#[tokio::test]
async fn create_current_then_get_round_trips() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();

    let details = acme_current_details();
    let created = bank.accounts_client.create_current(&details).await?;

    let account =
        bank.accounts_client.get_account(created.account_number).await?;
    assert_eq!(account.kind, payloads::AccountKind::Current);
    assert_eq!(account.privilege, Privilege::Premium);
    match account.details {
        responses::KindDetails::Current(current) => {
            assert_eq!(current.company_name, details.company_name);
            assert_eq!(current.website, details.website);
            assert_eq!(
                current.registration_number,
                details.registration_number
            );
        }
        other => panic!("expected current details, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn duplicate_registration_number_is_rejected() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    bank.accounts_client
        .create_current(&acme_current_details())
        .await?;
    let details = requests::CreateCurrentAccount {
        holder_name: "Other Company".to_string(),
        company_name: "Other Company Pvt Ltd".to_string(),
        ..acme_current_details()
    };
    let result = bank.accounts_client.create_current(&details).await;
    assert_error_code(result, "Duplicate");

    Ok(())
}

#[tokio::test]
async fn malformed_websites_are_rejected() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_admin();

    let details = requests::CreateCurrentAccount {
        website: Some("not a url".to_string()),
        ..acme_current_details()
    };
    let result = bank.accounts_client.create_current(&details).await;
    assert_error_code(result, "InvalidWebsite");

    // Absent website is fine.
    let details = requests::CreateCurrentAccount {
        website: None,
        ..acme_current_details()
    };
    bank.accounts_client.create_current(&details).await?;

    Ok(())
}

#[tokio::test]
async fn customers_cannot_create_accounts() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_customer(payloads::SubjectId(uuid::Uuid::new_v4()));

    let result = bank
        .accounts_client
        .create_savings(&john_savings_details())
        .await;
    assert_status_code(result, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn customers_see_only_their_own_account() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();

    let owner = payloads::SubjectId(uuid::Uuid::new_v4());
    let details = requests::CreateSavingsAccount {
        owner_subject: Some(owner),
        ..john_savings_details()
    };
    let own = bank
        .accounts_client
        .create_savings(&details)
        .await?
        .account_number;
    let other = bank.create_gold_savings("Jane Doe").await?;

    bank.login_customer(owner);
    let account = bank.accounts_client.get_account(own).await?;
    assert_eq!(account.owner_subject, Some(owner));

    let result = bank.accounts_client.get_account(other).await;
    assert_status_code(result, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn public_verify_pin_reports_validity() -> anyhow::Result<()> {
    let mut bank = spawn_bank().await;
    bank.login_teller();

    let number = bank.create_gold_savings("John Doe").await?;

    let ok = bank
        .accounts_client
        .verify_pin(
            number,
            &requests::VerifyPin {
                pin: "9640".to_string(),
            },
        )
        .await?;
    assert!(ok.valid);

    let wrong = bank
        .accounts_client
        .verify_pin(
            number,
            &requests::VerifyPin {
                pin: "9641".to_string(),
            },
        )
        .await?;
    assert!(!wrong.valid);

    Ok(())
}
