mod client;
mod commands;
mod error;
mod grid;
mod models;
mod store;

use clap::Parser;
use std::process;

use crate::commands::{run_command, SubCommand};


/// avatar grid builder
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
  #[clap(subcommand)]
  command: SubCommand,
}



fn main() {
  env_logger::init();
  let args = Args::parse();
  if !run_command(args.command) {
    process::exit(1);
  }
}
