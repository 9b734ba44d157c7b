use crate::api::client::ApiClient;
use crate::app::Settings;
use crate::error::ChatError;
use crate::session::Session;
use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use std::rc::Rc;

pub fn show_login_window(app: &Application) {
    let settings = Settings::load();

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("DuoChat Login")
        .default_width(420)
        .default_height(260)
        .resizable(false)
        .build();

    let toast_overlay = adw::ToastOverlay::new();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Sign in to DuoChat"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let server_entry = gtk::Entry::new();
    server_entry.set_placeholder_text(Some("Server URL (e.g. http://localhost:3001)"));
    server_entry.set_text(&settings.base_url);
    server_entry.set_hexpand(true);

    let phone_entry = gtk::Entry::new();
    phone_entry.set_placeholder_text(Some("Phone number"));
    phone_entry.set_input_purpose(gtk::InputPurpose::Phone);
    phone_entry.set_hexpand(true);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&server_entry);
    form.append(&phone_entry);
    root.append(&form);

    let status = gtk::Label::new(None);
    status.add_css_class("dim-label");
    status.set_halign(gtk::Align::Start);
    root.append(&status);

    let login_btn = gtk::Button::with_label("Sign in");
    login_btn.add_css_class("suggested-action");
    login_btn.set_halign(gtk::Align::End);
    root.append(&login_btn);

    toast_overlay.set_child(Some(&root));
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let header_title = gtk::Label::new(Some("DuoChat"));
    header.set_title_widget(Some(&header_title));
    container.append(&header);
    container.append(&toast_overlay);
    window.set_content(Some(&container));

    let on_connect = {
        let app = app.clone();
        let window = window.clone();
        let overlay = toast_overlay.clone();
        let server_entry = server_entry.clone();
        let phone_entry = phone_entry.clone();
        let login_btn = login_btn.clone();
        move || {
            let url = crate::utils::normalize_url(&server_entry.text());
            let phone = phone_entry.text().to_string();
            if url.is_empty() || phone.trim().is_empty() {
                overlay.add_toast(adw::Toast::new("Please enter server URL and phone number."));
                return;
            }

            status.set_label("Signing in…");
            login_btn.set_sensitive(false);

            let mut settings = Settings::load();
            settings.base_url = url;
            if let Err(e) = settings.save() {
                log::warn!("Failed to save settings: {e}");
            }

            let base_url = settings.base_url.clone();
            let timeout = settings.request_timeout();
            let sign_in = async move {
                let client = ApiClient::new(&base_url, timeout).map_err(ChatError::Fetch)?;
                Session::sign_in(&client, &phone).await
            };

            let app = app.clone();
            let window = window.clone();
            let overlay = overlay.clone();
            let status = status.clone();
            let login_btn = login_btn.clone();
            crate::ui::run_async_to_main(sign_in, move |res| {
                login_btn.set_sensitive(true);
                match res {
                    Ok(session) => {
                        status.set_label("Signed in");
                        crate::ui::main_window::show_main_window(&app, settings, session);
                        window.close();
                    }
                    Err(err) => {
                        log::warn!("sign-in failed: {err}");
                        status.set_label("Sign-in failed");
                        let msg = match &err {
                            ChatError::UnknownUser { .. } => "No account with that phone number.".to_string(),
                            _ => "Could not reach the server. Check the URL.".to_string(),
                        };
                        overlay.add_toast(adw::Toast::new(&msg));
                    }
                }
            });
        }
    };

    let on_connect: Rc<dyn Fn()> = Rc::new(on_connect);
    {
        let on_connect = on_connect.clone();
        login_btn.connect_clicked(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        server_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        phone_entry.connect_activate(move |_| (on_connect)());
    }

    window.present();
}
