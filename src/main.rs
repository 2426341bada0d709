#![allow(clippy::enum_variant_names)]

use clap::Parser as _;

use crate::{
    application::{Application, ApplicationError},
    cli::Cli,
};

mod application;
mod cli;
mod comparator;
mod config;
mod ext;
mod filesystem;
mod reconciler;
mod scheduler;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();

    Application::run(cli_args).await?;

    Ok(())
}
