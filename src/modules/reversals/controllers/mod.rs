pub mod reversal_controller;
