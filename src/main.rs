use anyhow::Result;

#[macro_use]
extern crate serde_derive;

mod cli;
mod client;
mod common;
mod config;
mod mapper;
mod repo;
mod tracker;

fn main() -> Result<()> {
    cli::main()
}
