use std::error::Error;

pub fn handle_play() -> Result<(), Box<dyn Error>> {
    crate::board::run()
}
