//! HTTP clients for the two core services.
//!
//! The public clients attach a bearer token; the internal client attaches
//! the service-to-service key and carries the per-request deadlines of the
//! privileged Accounts surface.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use crate::{
    AccountNumber, Amount, requests,
    responses::{self, ErrorBody},
};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A non-success response with its parsed error body.
    #[error("{code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("network error")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Network(_) => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            ClientError::Network(_) => None,
        }
    }
}

/// Deserialize a successful response into the desired type, or surface the
/// `{error_code, message}` body.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(into_api_error(response).await);
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is a success.
pub async fn ok_empty(
    response: reqwest::Response,
) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(into_api_error(response).await);
    }
    Ok(())
}

async fn into_api_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return ClientError::Network(e),
    };
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ClientError::Api {
            status,
            code: body.error_code,
            message: body.message,
        },
        Err(_) => ClientError::Api {
            status,
            code: "Unknown".to_string(),
            message: text,
        },
    }
}

/// Client for the public Accounts surface.
pub struct AccountsClient {
    pub address: String,
    pub inner_client: reqwest::Client,
    pub bearer: Option<String>,
}

impl AccountsClient {
    pub fn new(address: String) -> Self {
        AccountsClient {
            address,
            inner_client: reqwest::Client::new(),
            bearer: None,
        }
    }

    pub fn with_bearer(mut self, token: String) -> Self {
        self.bearer = Some(token);
        self
    }

    pub fn set_bearer(&mut self, token: Option<String>) {
        self.bearer = token;
    }

    fn format_url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", &self.address)
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        match &self.bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ReqwestResult {
        self.authorize(
            self.inner_client.post(self.format_url(path)).json(body),
        )
        .send()
        .await
    }

    async fn empty_post(&self, path: &str) -> ReqwestResult {
        self.authorize(self.inner_client.post(self.format_url(path)))
            .send()
            .await
    }

    async fn empty_put(&self, path: &str) -> ReqwestResult {
        self.authorize(self.inner_client.put(self.format_url(path)))
            .send()
            .await
    }

    async fn patch(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ReqwestResult {
        self.authorize(
            self.inner_client.patch(self.format_url(path)).json(body),
        )
        .send()
        .await
    }

    async fn get(&self, path: &str) -> ReqwestResult {
        self.authorize(self.inner_client.get(self.format_url(path)))
            .send()
            .await
    }

    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.get("health_check").await?;
        ok_empty(response).await
    }

    pub async fn create_savings(
        &self,
        details: &requests::CreateSavingsAccount,
    ) -> Result<responses::AccountCreated, ClientError> {
        let response = self.post("accounts/savings", details).await?;
        ok_body(response).await
    }

    pub async fn create_current(
        &self,
        details: &requests::CreateCurrentAccount,
    ) -> Result<responses::AccountCreated, ClientError> {
        let response = self.post("accounts/current", details).await?;
        ok_body(response).await
    }

    pub async fn get_account(
        &self,
        account_number: AccountNumber,
    ) -> Result<responses::Account, ClientError> {
        let response =
            self.get(&format!("accounts/{account_number}")).await?;
        ok_body(response).await
    }

    pub async fn update_account(
        &self,
        account_number: AccountNumber,
        details: &requests::UpdateAccount,
    ) -> Result<responses::Account, ClientError> {
        let response = self
            .patch(&format!("accounts/{account_number}"), details)
            .await?;
        ok_body(response).await
    }

    pub async fn activate(
        &self,
        account_number: AccountNumber,
    ) -> Result<(), ClientError> {
        let response = self
            .empty_put(&format!("accounts/{account_number}/activate"))
            .await?;
        ok_empty(response).await
    }

    pub async fn inactivate(
        &self,
        account_number: AccountNumber,
    ) -> Result<(), ClientError> {
        let response = self
            .empty_put(&format!("accounts/{account_number}/inactivate"))
            .await?;
        ok_empty(response).await
    }

    pub async fn close(
        &self,
        account_number: AccountNumber,
    ) -> Result<(), ClientError> {
        let response = self
            .empty_post(&format!("accounts/{account_number}/close"))
            .await?;
        ok_empty(response).await
    }

    pub async fn verify_pin(
        &self,
        account_number: AccountNumber,
        details: &requests::VerifyPin,
    ) -> Result<responses::PinVerification, ClientError> {
        let response = self
            .post(&format!("accounts/{account_number}/verify-pin"), details)
            .await?;
        ok_body(response).await
    }
}

/// Client for the public Transactions surface.
pub struct TransactionsClient {
    pub address: String,
    pub inner_client: reqwest::Client,
    pub bearer: Option<String>,
}

impl TransactionsClient {
    pub fn new(address: String) -> Self {
        TransactionsClient {
            address,
            inner_client: reqwest::Client::new(),
            bearer: None,
        }
    }

    pub fn set_bearer(&mut self, token: Option<String>) {
        self.bearer = token;
    }

    fn format_url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", &self.address)
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        match &self.bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ReqwestResult {
        self.authorize(
            self.inner_client.post(self.format_url(path)).json(body),
        )
        .send()
        .await
    }

    async fn get(&self, path: &str) -> ReqwestResult {
        self.authorize(self.inner_client.get(self.format_url(path)))
            .send()
            .await
    }

    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.get("health_check").await?;
        ok_empty(response).await
    }

    pub async fn deposit(
        &self,
        details: &requests::Deposit,
    ) -> Result<responses::TransactionReceipt, ClientError> {
        let response = self.post("deposits", details).await?;
        ok_body(response).await
    }

    pub async fn withdraw(
        &self,
        details: &requests::Withdraw,
    ) -> Result<responses::TransactionReceipt, ClientError> {
        let response = self.post("withdrawals", details).await?;
        ok_body(response).await
    }

    pub async fn transfer(
        &self,
        details: &requests::Transfer,
    ) -> Result<responses::TransferReceipt, ClientError> {
        let response = self.post("transfers", details).await?;
        ok_body(response).await
    }

    pub async fn transfer_limits(
        &self,
        account_number: AccountNumber,
    ) -> Result<responses::TransferLimits, ClientError> {
        let response = self
            .get(&format!("transfer-limits/{account_number}"))
            .await?;
        ok_body(response).await
    }

    pub async fn transaction_logs(
        &self,
        account_number: AccountNumber,
    ) -> Result<Vec<responses::TransactionEntry>, ClientError> {
        let response = self
            .get(&format!("transaction-logs/{account_number}"))
            .await?;
        ok_body(response).await
    }
}

pub const INTERNAL_API_KEY_HEADER: &str = "X-Internal-Api-Key";

/// Default deadline for privileged Accounts calls.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for the compensating credit: generous (3x the normal RPC
/// timeout) to maximize recovery.
pub const COMPENSATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the privileged internal Accounts surface. Only the
/// Transactions service holds one.
pub struct InternalAccountsClient {
    pub address: String,
    pub inner_client: reqwest::Client,
    api_key: String,
    rpc_timeout: Duration,
}

impl InternalAccountsClient {
    pub fn new(address: String, api_key: String) -> Self {
        InternalAccountsClient {
            address,
            inner_client: reqwest::Client::new(),
            api_key,
            rpc_timeout: RPC_TIMEOUT,
        }
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    fn format_url(&self, path: &str) -> String {
        format!("{}/api/v1/internal/{path}", &self.address)
    }

    async fn get(&self, path: &str) -> ReqwestResult {
        self.inner_client
            .get(self.format_url(path))
            .header(INTERNAL_API_KEY_HEADER, &self.api_key)
            .timeout(self.rpc_timeout)
            .send()
            .await
    }

    async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
        timeout: Duration,
    ) -> ReqwestResult {
        self.inner_client
            .post(self.format_url(path))
            .header(INTERNAL_API_KEY_HEADER, &self.api_key)
            .timeout(timeout)
            .json(body)
            .send()
            .await
    }

    pub async fn get_account(
        &self,
        account_number: AccountNumber,
    ) -> Result<responses::InternalAccount, ClientError> {
        let response =
            self.get(&format!("accounts/{account_number}")).await?;
        ok_body(response).await
    }

    pub async fn get_privilege(
        &self,
        account_number: AccountNumber,
    ) -> Result<responses::PrivilegeInfo, ClientError> {
        let response = self
            .get(&format!("accounts/{account_number}/privilege"))
            .await?;
        ok_body(response).await
    }

    pub async fn get_active(
        &self,
        account_number: AccountNumber,
    ) -> Result<responses::AccountStatus, ClientError> {
        let response = self
            .get(&format!("accounts/{account_number}/active"))
            .await?;
        ok_body(response).await
    }

    pub async fn verify_pin(
        &self,
        account_number: AccountNumber,
        details: &requests::VerifyPin,
    ) -> Result<responses::PinVerification, ClientError> {
        let response = self
            .post(
                &format!("accounts/{account_number}/verify-pin"),
                details,
                self.rpc_timeout,
            )
            .await?;
        ok_body(response).await
    }

    pub async fn debit(
        &self,
        account_number: AccountNumber,
        amount: Amount,
    ) -> Result<responses::NewBalance, ClientError> {
        let response = self
            .post(
                &format!("accounts/{account_number}/debit"),
                &requests::BalanceChange { amount },
                self.rpc_timeout,
            )
            .await?;
        ok_body(response).await
    }

    pub async fn credit(
        &self,
        account_number: AccountNumber,
        amount: Amount,
    ) -> Result<responses::NewBalance, ClientError> {
        let response = self
            .post(
                &format!("accounts/{account_number}/credit"),
                &requests::BalanceChange { amount },
                self.rpc_timeout,
            )
            .await?;
        ok_body(response).await
    }

    /// The single compensating credit after a failed transfer credit; runs
    /// with the generous deadline.
    pub async fn credit_compensation(
        &self,
        account_number: AccountNumber,
        amount: Amount,
    ) -> Result<responses::NewBalance, ClientError> {
        let response = self
            .post(
                &format!("accounts/{account_number}/credit"),
                &requests::BalanceChange { amount },
                COMPENSATION_TIMEOUT,
            )
            .await?;
        ok_body(response).await
    }
}
