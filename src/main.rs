use adw::Application;
use adw::prelude::*;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Application::builder()
        .application_id("com.example.DuoChat")
        .build();
    app.connect_activate(|app| {
        // warm up the runtime before the first request
        once_cell::sync::Lazy::force(&duochat::utils::RUNTIME);
        duochat::ui::build_ui(app);
    });
    app.run();
}
