use crate::core::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Mobile-money gateway for customer push payments and transaction reversals
#[async_trait]
pub trait MobileMoneyGateway: Send + Sync {
    /// Ask the customer's handset to authorize a payment.
    ///
    /// Success only means the gateway accepted the request; the outcome arrives
    /// later through the callback endpoint.
    async fn initiate_push(&self, request: PushRequest) -> Result<PushAccepted>;

    /// Request a gateway-side reversal of previously collected funds
    async fn initiate_reversal(&self, request: ReversalRequest) -> Result<()>;

    /// Get gateway name
    fn name(&self) -> &str;
}

/// Push payment request data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    /// Payer MSISDN, digits only
    pub phone: String,

    /// Payment amount
    pub amount: Decimal,

    /// Invoice ID, sent as the account reference
    pub invoice_id: String,
}

/// Gateway acknowledgement of an accepted push request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAccepted {
    pub merchant_request_id: String,

    /// Correlates the later callback with the payment record
    pub checkout_request_id: String,

    pub response_description: String,

    /// Text shown to the customer
    pub customer_message: String,
}

/// Reversal request data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalRequest {
    pub phone: String,
    pub amount: Decimal,
    pub invoice_id: String,
}
