#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Result;
use gpui::Application;
use makeup_mirror::{config::ClientConfig, ui};

fn main() -> Result<()> {
    env_logger::init();

    let config = ClientConfig::from_env();
    log::info!("relay at {}, models in {}", config.api_url, config.model_dir.display());

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, config) {
                log::error!("failed to launch ui: {err:?}");
            }
        });

    Ok(())
}
