use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use super::gateway_trait::{MobileMoneyGateway, PushAccepted, PushRequest, ReversalRequest};
use super::security_credential::encrypt_security_credential;
use super::token_cache::{AccessToken, TokenCache};
use crate::config::MpesaConfig;
use crate::core::money::format_gateway_amount;
use crate::core::{AppError, Result, TimezoneConverter};

const TOKEN_PATH: &str = "/oauth/v1/generate?grant_type=client_credentials";
const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";
const REVERSAL_PATH: &str = "/mpesa/reversal/v1/request";

/// M-Pesa Daraja API client (STK push and transaction reversal)
pub struct MpesaClient {
    client: Client,
    config: MpesaConfig,
    base_url: String,
    tokens: TokenCache,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    // Daraja sends this as a string ("3599")
    #[serde(deserialize_with = "seconds_from_string_or_number")]
    expires_in: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushBody<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'static str,
    amount: String,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    call_back_url: &'a str,
    account_reference: &'a str,
    transaction_desc: &'static str,
}

#[derive(Deserialize)]
struct StkPushResponse {
    #[serde(rename = "MerchantRequestID", default)]
    merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID", default)]
    checkout_request_id: String,
    #[serde(rename = "ResponseCode", default)]
    response_code: String,
    #[serde(rename = "ResponseDescription", default)]
    response_description: String,
    #[serde(rename = "CustomerMessage", default)]
    customer_message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReversalBody<'a> {
    initiator: &'a str,
    security_credential: String,
    #[serde(rename = "CommandID")]
    command_id: &'static str,
    amount: String,
    receiver_party: &'a str,
    // Field name is misspelled in the Daraja API
    reciever_identifier_type: &'static str,
    #[serde(rename = "ResultURL")]
    result_url: &'a str,
    #[serde(rename = "QueueTimeOutURL")]
    queue_time_out_url: &'a str,
    remarks: String,
    occasion: &'a str,
}

/// Error body Daraja returns for rejected requests
#[derive(Debug, Deserialize)]
struct DarajaError {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: serde_json::Value,
}

fn seconds_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom("expires_in must be a positive integer")),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid expires_in: {}", s))),
        other => Err(D::Error::custom(format!("invalid expires_in: {}", other))),
    }
}

/// `base64(shortCode + passKey + timestamp)`
pub fn generate_password(short_code: &str, pass_key: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{}{}{}", short_code, pass_key, timestamp))
}

fn rejection_message(body: &str) -> Option<String> {
    let error: DarajaError = serde_json::from_str(body).ok()?;
    let message = match error.error_message {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    Some(match error.error_code {
        Some(code) => format!("{} - {}", code, message),
        None => message,
    })
}

impl MpesaClient {
    pub fn new(config: MpesaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = config.base_url();

        Ok(Self {
            client,
            config,
            base_url,
            tokens: TokenCache::new(),
        })
    }

    /// Whether reversal initiator settings are present
    pub fn supports_reversal(&self) -> bool {
        self.config.reversal.is_some()
    }

    /// Current bearer token, refreshed from the authorization endpoint when expired
    pub async fn access_token(&self) -> Result<String> {
        self.tokens.get_or_refresh(|| self.fetch_token()).await
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);

        let response = self
            .client
            .get(&url)
            .basic_auth(
                &self.config.consumer_key,
                Some(self.config.consumer_secret.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| AppError::gateway(format!("M-Pesa token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::gateway(format!("Failed to read M-Pesa token response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::gateway(format!(
                "M-Pesa token request returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::gateway(format!("Failed to parse M-Pesa token response: {}", e)))?;

        if token.access_token.is_empty() {
            return Err(AppError::gateway("M-Pesa token response missing access_token"));
        }

        Ok(AccessToken::new(
            token.access_token,
            Duration::from_secs(token.expires_in),
        ))
    }

    /// POST a JSON body with the bearer token, returning status and raw body
    async fn post_json<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<(StatusCode, String)> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::gateway(format!("M-Pesa request to {} failed: {}", path, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::gateway(format!("Failed to read M-Pesa response: {}", e)))?;

        if status == StatusCode::UNAUTHORIZED {
            // Token revoked early; next call fetches a new one
            self.tokens.invalidate().await;
        }

        tracing::debug!(path = path, status = %status, "M-Pesa response received");

        Ok((status, text))
    }
}

#[async_trait]
impl MobileMoneyGateway for MpesaClient {
    async fn initiate_push(&self, request: PushRequest) -> Result<PushAccepted> {
        let token = self.access_token().await?;

        let timestamp = TimezoneConverter::gateway_timestamp(Utc::now());
        let password = generate_password(
            &self.config.business_short_code,
            self.config.pass_key.expose_secret(),
            &timestamp,
        );

        let body = StkPushBody {
            business_short_code: &self.config.business_short_code,
            password,
            timestamp,
            transaction_type: "CustomerPayBillOnline",
            amount: format_gateway_amount(request.amount),
            party_a: &request.phone,
            party_b: &self.config.business_short_code,
            phone_number: &request.phone,
            call_back_url: &self.config.callback_url,
            account_reference: &request.invoice_id,
            transaction_desc: "Order Payment",
        };

        let (status, text) = self.post_json(STK_PUSH_PATH, &token, &body).await?;

        if !status.is_success() {
            return match rejection_message(&text) {
                Some(message) => {
                    tracing::warn!(
                        invoice_id = %request.invoice_id,
                        status = %status,
                        error = %message,
                        "M-Pesa rejected STK push"
                    );
                    Err(AppError::rejected(format!("STK push failed: {}", message)))
                }
                None => Err(AppError::gateway(format!(
                    "STK push returned {}: {}",
                    status, text
                ))),
            };
        }

        let response: StkPushResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::gateway(format!("Failed to parse STK push response: {}", e)))?;

        if response.response_code != "0" {
            tracing::warn!(
                invoice_id = %request.invoice_id,
                response_code = %response.response_code,
                description = %response.response_description,
                "M-Pesa rejected STK push"
            );
            return Err(AppError::rejected(format!(
                "STK push failed: {} - {}",
                response.response_code, response.response_description
            )));
        }

        tracing::info!(
            invoice_id = %request.invoice_id,
            checkout_request_id = %response.checkout_request_id,
            "STK push accepted"
        );

        Ok(PushAccepted {
            merchant_request_id: response.merchant_request_id,
            checkout_request_id: response.checkout_request_id,
            response_description: response.response_description,
            customer_message: response.customer_message,
        })
    }

    async fn initiate_reversal(&self, request: ReversalRequest) -> Result<()> {
        let reversal = self.config.reversal.as_ref().ok_or_else(|| {
            AppError::configuration("M-Pesa reversal not configured: missing initiator or public key")
        })?;

        let security_credential = encrypt_security_credential(
            &reversal.public_key_path,
            reversal.initiator_password.expose_secret(),
        )
        .await?;

        let token = self.access_token().await?;

        let body = ReversalBody {
            initiator: &reversal.initiator_name,
            security_credential,
            command_id: "TransactionReversal",
            amount: format_gateway_amount(request.amount),
            receiver_party: &self.config.business_short_code,
            reciever_identifier_type: "11",
            result_url: &reversal.result_url,
            queue_time_out_url: &reversal.timeout_url,
            remarks: format!("Reversal for invoice {}", request.invoice_id),
            occasion: &request.invoice_id,
        };

        let (status, text) = self.post_json(REVERSAL_PATH, &token, &body).await?;

        if let Some(message) = rejection_message(&text) {
            tracing::warn!(
                invoice_id = %request.invoice_id,
                status = %status,
                error = %message,
                "M-Pesa rejected reversal"
            );
            return Err(AppError::rejected(format!("Reversal failed: {}", message)));
        }

        if !status.is_success() {
            return Err(AppError::gateway(format!(
                "Reversal returned {}: {}",
                status, text
            )));
        }

        tracing::info!(
            invoice_id = %request.invoice_id,
            amount = %request.amount,
            "M-Pesa reversal requested"
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "mpesa"
    }
}
