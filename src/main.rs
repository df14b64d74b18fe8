mod config;
mod error;
mod lifecycle;
mod vk_bootstrap;
mod vk_debug;
mod vk_engine;
mod vk_images;
mod vk_init;
mod vk_loader;
mod vk_pipelines;
mod vk_types;

use config::Config;

fn main() {
    pretty_env_logger::init();
    let config = Config::load();
    if let Err(e) = lifecycle::run(&config) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
