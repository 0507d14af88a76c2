pub mod app;
pub mod launcher;
pub mod probe;
pub mod registry;
pub mod supervisor;
pub mod surface;

use std::error::Error;

use crate::config::Config;

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    app::run(config)
}
