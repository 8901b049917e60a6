pub mod args;

use clap::Parser;
pub use args::{Arguments, Technology};

pub fn parse() -> Arguments {
    Arguments::parse()
}
