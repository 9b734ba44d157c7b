pub mod chat_view;
pub mod login;
pub mod main_window;
pub mod media;
pub mod sidebar;

use crate::utils::RUNTIME;
use adw::Application;
use std::future::Future;

pub fn build_ui(app: &Application) {
    login::show_login_window(app);
}

/// Runs `fut` on the tokio runtime and hands its output to `on_done` on the GTK main loop.
pub fn run_async_to_main<T, Fut, F>(fut: Fut, on_done: F)
where
    T: Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    F: FnOnce(T) + 'static,
{
    let handle = RUNTIME.spawn(fut);
    glib::spawn_future_local(async move {
        match handle.await {
            Ok(value) => on_done(value),
            Err(e) => log::error!("background task failed: {e}"),
        }
    });
}
