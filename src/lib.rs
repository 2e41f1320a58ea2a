#![deny(warnings, clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

pub(crate) mod api;
pub mod app;
pub(crate) mod clients;
pub mod config;
pub mod observability;
pub mod pipeline;
pub mod util;
