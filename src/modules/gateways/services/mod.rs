pub mod gateway_trait;
pub mod mpesa;
pub mod security_credential;
pub mod token_cache;

pub use gateway_trait::{MobileMoneyGateway, PushAccepted, PushRequest, ReversalRequest};
pub use mpesa::{generate_password, MpesaClient};
pub use token_cache::{AccessToken, TokenCache};
