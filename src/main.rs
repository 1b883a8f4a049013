#![windows_subsystem = "windows"]

mod app;
mod classes;
mod config;
mod coords;
mod error;
mod labels;
mod models;
mod session;
mod ui;
mod utils;

use eframe::egui;
use std::panic;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("label_space=info"))
        .init();

    let old_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        log::error!("{}", panic_info);
        old_hook(panic_info);
    }));

    let config = config::load_config();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 700.0])
            .with_title("Label Space"),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "Label Space",
        options,
        Box::new(|_cc| Ok(Box::new(app::AnnotationApp::new(config)))),
    ) {
        log::error!("Failed to start: {}", e);
        std::process::exit(1);
    }
}
