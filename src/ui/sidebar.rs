use crate::api::models::User;
use crate::app::ChatApp;
use crate::ui::media::avatar;
use gtk4 as gtk;
use gtk4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// The roster list on the left.
pub struct Sidebar {
    root: gtk::Box,
    list: gtk::ListBox,
    chat: Arc<ChatApp>,
    users: Rc<RefCell<Vec<User>>>,
}

impl Sidebar {
    pub fn new(chat: Arc<ChatApp>) -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let title = gtk::Label::new(Some("Chats"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let list = gtk::ListBox::new();
        list.add_css_class("navigation-sidebar");
        list.set_selection_mode(gtk::SelectionMode::Single);
        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .child(&list)
            .build();
        root.append(&scroller);

        Self {
            root,
            list,
            chat,
            users: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn set_users(&self, users: Vec<User>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        for user in &users {
            let row = gtk::Box::new(gtk::Orientation::Horizontal, 8);
            row.set_margin_top(6);
            row.set_margin_bottom(6);
            let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
            text.set_valign(gtk::Align::Center);
            let name = gtk::Label::new(Some(&user.name));
            name.set_halign(gtk::Align::Start);
            let phone = gtk::Label::new(Some(&user.phone));
            phone.add_css_class("dim-label");
            phone.add_css_class("caption");
            phone.set_halign(gtk::Align::Start);
            text.append(&name);
            text.append(&phone);
            row.append(&avatar(&self.chat, user, 32));
            row.append(&text);
            self.list.append(&row);
        }
        *self.users.borrow_mut() = users;
    }

    pub fn connect_selected<F: Fn(User) + 'static>(&self, f: F) {
        let users = self.users.clone();
        self.list.connect_row_selected(move |_, row| {
            let Some(row) = row else { return };
            let picked = usize::try_from(row.index())
                .ok()
                .and_then(|idx| users.borrow().get(idx).cloned());
            if let Some(user) = picked {
                f(user);
            }
        });
    }
}
