use crate::cli::run;

pub mod checkout;
pub mod cli;
mod clipboard;
mod config;
pub mod domain;
pub mod http;
pub mod license;
pub mod preview;
pub mod session;
pub mod store;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run()
}
