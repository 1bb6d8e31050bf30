pub mod callback_controller;
pub mod payment_controller;
