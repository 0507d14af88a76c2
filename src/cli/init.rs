use crate::config::Config;
use crate::constants::PLAYABLE_EXTENSIONS;
use owo_colors::OwoColorize;
use std::error::Error;

pub fn handle_init() -> Result<(), Box<dyn Error>> {
    // Check if already initialized
    if Config::exists()? {
        return Err(format!(
            "sndpad is already initialized. Edit {} to change key mappings.",
            Config::config_path()?.display()
        )
        .into());
    }

    let config = Config::new();
    config.save()?;

    println!("{} sndpad initialized", "✓".green());
    println!(
        "Configuration saved to: {}",
        Config::config_path()?.display()
    );
    println!();
    println!("Map keys to clips under the [keys] table, e.g.:");
    println!("  {}", "a = \"sounds/kick.wav\"".cyan());
    println!("Supported formats: {}", PLAYABLE_EXTENSIONS.join(", "));

    Ok(())
}
