pub mod services;

pub use services::{
    MobileMoneyGateway, MpesaClient, PushAccepted, PushRequest, ReversalRequest, TokenCache,
};
