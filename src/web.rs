#![cfg(not(tarpaulin_include))]

use scatter3d::app;
use scatter3d::options::SceneOptions;
use std::env;

/// Main entry point for the web host
///
/// Serves `POST /api/scatter3d` and `POST /api/headers`.
///
/// # Arguments
/// * `[addr]` - Listen address, `127.0.0.1:3000` by default
/// * `[options.json]` - Scene options overriding the defaults
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let addr = args.get(1).map(String::as_str).unwrap_or("127.0.0.1:3000");
    let options = match args.get(2) {
        Some(path) => SceneOptions::from_json_file(path)?,
        None => SceneOptions::default(),
    };

    app::run(addr, options).await
}
