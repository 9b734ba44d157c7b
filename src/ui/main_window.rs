use crate::app::{ChatApp, Settings};
use crate::session::Session;
use crate::ui::chat_view::ChatView;
use crate::ui::media::avatar;
use crate::ui::run_async_to_main;
use crate::ui::sidebar::Sidebar;
use crate::utils::{RUNTIME, TaskGuard};
use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

pub fn show_main_window(app: &Application, settings: Settings, session: Session) {
    let chat = match ChatApp::connect(&settings, &session) {
        Ok(chat) => Arc::new(chat),
        Err(e) => {
            log::error!("cannot open chat: {e}");
            crate::ui::login::show_login_window(app);
            return;
        }
    };

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title(format!("DuoChat: {}", chat.user().name))
        .default_width(960)
        .default_height(640)
        .build();

    let toast_overlay = adw::ToastOverlay::new();
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Box::new(gtk::Orientation::Horizontal, 8);
    title.append(&avatar(&chat, chat.user(), 24));
    title.append(&gtk::Label::new(Some(&chat.user().name)));
    header.set_title_widget(Some(&title));
    let logout_btn = gtk::Button::from_icon_name("system-log-out-symbolic");
    logout_btn.set_tooltip_text(Some("Sign out"));
    header.pack_end(&logout_btn);
    container.append(&header);

    let sidebar = Rc::new(Sidebar::new(chat.clone()));
    let view = ChatView::new(
        chat.clone(),
        window.clone().upcast::<gtk::Window>(),
        toast_overlay.clone(),
    );

    let paned = gtk::Paned::new(gtk::Orientation::Horizontal);
    paned.set_start_child(Some(&sidebar.widget()));
    paned.set_end_child(Some(&view.widget()));
    paned.set_position(280);
    paned.set_vexpand(true);
    toast_overlay.set_child(Some(&paned));
    container.append(&toast_overlay);
    window.set_content(Some(&container));

    {
        let view = view.clone();
        sidebar.connect_selected(move |user| view.select(user));
    }

    // Dropping the guard stops the poller; it lives as long as the window.
    let poller: Rc<RefCell<Option<TaskGuard>>> = Rc::new(RefCell::new(None));

    {
        let chat_for_load = chat.clone();
        let chat = chat.clone();
        let sidebar = sidebar.clone();
        let view = view.clone();
        let overlay = toast_overlay.clone();
        let poller = poller.clone();
        let interval = settings.poll_interval();
        run_async_to_main(async move { chat_for_load.start().await }, move |startup| {
            let roster = chat.directory().users();
            view.set_roster(&roster);
            sidebar.set_users(roster);
            view.render_transcript();
            if startup.offline {
                overlay.add_toast(adw::Toast::new("Offline: showing cached conversations"));
            }

            let _rt = RUNTIME.enter();
            let Some((guard, mut events)) = chat.start_sync(interval) else {
                log::info!("polling disabled");
                return;
            };
            *poller.borrow_mut() = Some(guard);
            glib::spawn_future_local(async move {
                while let Some(event) = events.recv().await {
                    view.on_sync(event);
                }
            });
        });
    }

    {
        let poller = poller.clone();
        window.connect_close_request(move |_| {
            poller.borrow_mut().take();
            glib::Propagation::Proceed
        });
    }

    {
        let app = app.clone();
        let window = window.clone();
        logout_btn.connect_clicked(move |_| {
            poller.borrow_mut().take();
            let mut session = session.clone();
            session.logout();
            crate::ui::login::show_login_window(&app);
            window.close();
        });
    }

    window.present();
}
