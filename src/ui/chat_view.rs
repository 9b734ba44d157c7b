use crate::api::events::SyncEvent;
use crate::api::models::{MessageKind, User};
use crate::app::ChatApp;
use crate::composer::{Composer, MediaAttachment};
use crate::error::ChatError;
use crate::render::{self, TranscriptLine};
use crate::selector::ConversationSelector;
use crate::ui::media::{avatar, media_slot};
use crate::ui::run_async_to_main;
use crate::utils::RUNTIME;
use gtk4 as gtk;
use gtk4::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

pub struct ChatView {
    root: gtk::Stack,
    window: gtk::Window,
    overlay: adw::ToastOverlay,
    chat: Arc<ChatApp>,
    selector: RefCell<ConversationSelector>,
    // None while a send is in flight
    composer: RefCell<Option<Composer>>,
    partner_avatar: gtk::Box,
    partner_label: gtk::Label,
    typing_label: gtk::Label,
    messages_box: gtk::Box,
    scroller: gtk::ScrolledWindow,
    preview_row: gtk::Box,
    preview_label: gtk::Label,
    entry: gtk::Entry,
    send_btn: gtk::Button,
    suppress_typing: Cell<bool>,
}

impl ChatView {
    pub fn new(chat: Arc<ChatApp>, window: gtk::Window, overlay: adw::ToastOverlay) -> Rc<Self> {
        let root = gtk::Stack::new();

        let empty = gtk::Label::new(Some("Select a chat to start messaging"));
        empty.add_css_class("dim-label");
        root.add_named(&empty, Some("empty"));

        let page = gtk::Box::new(gtk::Orientation::Vertical, 6);
        page.set_margin_top(8);
        page.set_margin_bottom(8);
        page.set_margin_start(8);
        page.set_margin_end(8);

        // Header row: partner, typing label, clear
        let header = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let partner_avatar = gtk::Box::new(gtk::Orientation::Horizontal, 0);
        let names = gtk::Box::new(gtk::Orientation::Vertical, 0);
        names.set_hexpand(true);
        let partner_label = gtk::Label::new(None);
        partner_label.add_css_class("title-4");
        partner_label.set_halign(gtk::Align::Start);
        let typing_label = gtk::Label::new(Some("typing..."));
        typing_label.add_css_class("dim-label");
        typing_label.add_css_class("caption");
        typing_label.set_halign(gtk::Align::Start);
        typing_label.set_visible(false);
        names.append(&partner_label);
        names.append(&typing_label);
        let clear_btn = gtk::Button::from_icon_name("user-trash-symbolic");
        clear_btn.set_tooltip_text(Some("Clear chat"));
        header.append(&partner_avatar);
        header.append(&names);
        header.append(&clear_btn);
        page.append(&header);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 8);
        scroller.set_child(Some(&messages_box));
        page.append(&scroller);

        let preview_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let preview_label = gtk::Label::new(None);
        preview_label.set_hexpand(true);
        preview_label.set_halign(gtk::Align::Start);
        let cancel_media_btn = gtk::Button::from_icon_name("window-close-symbolic");
        cancel_media_btn.set_tooltip_text(Some("Remove attachment"));
        preview_row.append(&preview_label);
        preview_row.append(&cancel_media_btn);
        preview_row.set_visible(false);
        page.append(&preview_row);

        // Input row
        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Type a message"));
        entry.set_show_emoji_icon(true);
        let attach_btn = gtk::Button::from_icon_name("mail-attachment-symbolic");
        attach_btn.set_tooltip_text(Some("Attach image or video"));
        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        input_row.append(&entry);
        input_row.append(&attach_btn);
        input_row.append(&send_btn);
        page.append(&input_row);

        root.add_named(&page, Some("chat"));
        root.set_visible_child_name("empty");

        let view = Rc::new(Self {
            root,
            window,
            overlay,
            chat,
            selector: RefCell::new(ConversationSelector::new()),
            composer: RefCell::new(Some(Composer::new())),
            partner_avatar,
            partner_label,
            typing_label,
            messages_box,
            scroller,
            preview_row,
            preview_label,
            entry,
            send_btn,
            suppress_typing: Cell::new(false),
        });

        {
            let weak = Rc::downgrade(&view);
            view.send_btn.connect_clicked(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.on_send();
                }
            });
        }
        {
            let weak = Rc::downgrade(&view);
            view.entry.connect_activate(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.on_send();
                }
            });
        }
        {
            let weak = Rc::downgrade(&view);
            view.entry.connect_changed(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.on_keystroke();
                }
            });
        }
        {
            let weak = Rc::downgrade(&view);
            attach_btn.connect_clicked(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.on_attach();
                }
            });
        }
        {
            let weak = Rc::downgrade(&view);
            cancel_media_btn.connect_clicked(move |_| {
                if let Some(this) = weak.upgrade() {
                    if let Some(composer) = this.composer.borrow_mut().as_mut() {
                        composer.cancel_media();
                    }
                    this.show_preview(None);
                }
            });
        }
        {
            let weak = Rc::downgrade(&view);
            clear_btn.connect_clicked(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.on_clear();
                }
            });
        }

        view
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    fn show_partner(&self, partner: &User) {
        if let Some(old) = self.partner_avatar.first_child() {
            self.partner_avatar.remove(&old);
        }
        self.partner_avatar.append(&avatar(&self.chat, partner, 36));
        self.partner_label.set_label(&partner.name);
    }

    pub fn select(&self, partner: User) {
        self.show_partner(&partner);
        self.selector.borrow_mut().select(partner);
        self.root.set_visible_child_name("chat");
        self.render_transcript();
    }

    /// Applies a reloaded roster; a partner who disappeared is deselected.
    pub fn set_roster(&self, roster: &[User]) {
        let mut selector = self.selector.borrow_mut();
        selector.retain(roster);
        match selector.selected() {
            Some(partner) => self.show_partner(partner),
            None => self.root.set_visible_child_name("empty"),
        }
    }

    pub fn on_sync(&self, event: SyncEvent) {
        if event.changes_transcript() {
            self.remember();
            self.render_transcript();
        } else if let SyncEvent::Failed(reason) = event {
            log::debug!("poll failed: {reason}");
        }
    }

    pub fn render_transcript(&self) {
        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }
        let Some(partner) = self.selector.borrow().selected().map(|u| u.id.clone()) else {
            return;
        };
        let messages = self.chat.store().messages();
        for line in render::transcript(&messages, self.chat.self_id(), &partner) {
            self.messages_box.append(&bubble(&self.chat, &line));
        }
        let adj = self.scroller.vadjustment();
        glib::idle_add_local_once(move || adj.set_value(adj.upper()));
    }

    // the snapshot can be large with inline media, so it stays off the main loop
    fn remember(&self) {
        let _rt = RUNTIME.enter();
        self.chat.spawn_snapshot();
    }

    fn toast(&self, text: &str) {
        self.overlay.add_toast(adw::Toast::new(text));
    }

    // fetch failures stay silent; anything the user should act on gets a toast
    fn report(&self, err: &ChatError) {
        if err.is_fetch() {
            log::warn!("{err}");
        } else {
            self.toast(&err.to_string());
        }
    }

    fn set_entry_text(&self, text: &str) {
        self.suppress_typing.set(true);
        self.entry.set_text(text);
        self.suppress_typing.set(false);
    }

    fn set_busy(&self, busy: bool) {
        self.send_btn.set_sensitive(!busy);
        self.entry.set_sensitive(!busy);
    }

    fn show_preview(&self, media: Option<&MediaAttachment>) {
        match media {
            Some(m) => {
                self.preview_label
                    .set_label(&format!("{} ({} KB)", m.name, m.size.div_ceil(1024)));
                self.preview_row.set_visible(true);
            }
            None => self.preview_row.set_visible(false),
        }
    }

    fn on_keystroke(self: &Rc<Self>) {
        if self.suppress_typing.get() {
            return;
        }
        let remaining = {
            let mut composer = self.composer.borrow_mut();
            let Some(composer) = composer.as_mut() else { return };
            composer.keystroke();
            composer.typing().remaining()
        };
        self.typing_label.set_visible(true);

        let Some(remaining) = remaining else { return };
        let weak = Rc::downgrade(self);
        glib::timeout_add_local_once(remaining, move || {
            let Some(this) = weak.upgrade() else { return };
            let typing = this
                .composer
                .borrow()
                .as_ref()
                .is_some_and(|c| c.typing().is_typing());
            if !typing {
                this.typing_label.set_visible(false);
            }
        });
    }

    fn on_attach(self: &Rc<Self>) {
        let filter = gtk::FileFilter::new();
        filter.set_name(Some("Images and videos"));
        filter.add_mime_type("image/*");
        filter.add_mime_type("video/*");
        let dialog = gtk::FileDialog::builder()
            .title("Attach media")
            .modal(true)
            .default_filter(&filter)
            .build();

        let weak = Rc::downgrade(self);
        dialog.open(Some(&self.window), gtk::gio::Cancellable::NONE, move |res| {
            let Some(this) = weak.upgrade() else { return };
            // an error here means the dialog was dismissed
            let Ok(file) = res else { return };
            let Some(path) = file.path() else {
                this.toast("Only local files can be attached.");
                return;
            };

            let weak = Rc::downgrade(&this);
            run_async_to_main(
                async move { MediaAttachment::from_path(&path).await },
                move |res| {
                    let Some(this) = weak.upgrade() else { return };
                    match res {
                        Ok(media) => {
                            this.show_preview(Some(&media));
                            match this.composer.borrow_mut().as_mut() {
                                Some(composer) => composer.attach(media),
                                None => this.toast("Wait for the current message to send."),
                            }
                        }
                        Err(e) => this.report(&e),
                    }
                },
            );
        });
    }

    fn on_send(self: &Rc<Self>) {
        let Some(partner) = self.selector.borrow().selected().map(|u| u.id.clone()) else {
            return;
        };
        let Some(mut composer) = self.composer.borrow_mut().take() else {
            return;
        };
        composer.set_text(self.entry.text().to_string());
        if !composer.has_content() {
            *self.composer.borrow_mut() = Some(composer);
            return;
        }

        self.set_busy(true);
        let chat = self.chat.clone();
        let weak = Rc::downgrade(self);
        run_async_to_main(
            async move {
                let res = composer.send(chat.store(), &partner).await;
                (composer, res)
            },
            move |(composer, res)| {
                let Some(this) = weak.upgrade() else { return };
                this.set_entry_text(composer.text());
                this.show_preview(composer.pending());
                *this.composer.borrow_mut() = Some(composer);
                this.set_busy(false);
                match res {
                    Ok(sent) if !sent.is_empty() => this.remember(),
                    Ok(_) => {}
                    Err(e) => this.report(&e),
                }
                this.render_transcript();
                this.entry.grab_focus();
            },
        );
    }

    fn on_clear(self: &Rc<Self>) {
        let Some(partner) = self.selector.borrow().selected().map(|u| u.id.clone()) else {
            return;
        };
        let chat = self.chat.clone();
        let weak = Rc::downgrade(self);
        run_async_to_main(
            async move { chat.store().clear(&partner).await },
            move |res| {
                let Some(this) = weak.upgrade() else { return };
                this.remember();
                this.render_transcript();
                match res {
                    Ok(0) => {}
                    Ok(n) => this.toast(&format!("Deleted {n} messages")),
                    Err(e) => this.report(&e),
                }
            },
        );
    }
}

fn bubble(chat: &Arc<ChatApp>, line: &TranscriptLine) -> gtk::Widget {
    let bubble = gtk::Box::new(gtk::Orientation::Vertical, 2);
    bubble.add_css_class("card");
    bubble.set_halign(if line.outgoing {
        gtk::Align::End
    } else {
        gtk::Align::Start
    });

    let body: gtk::Widget = match line.kind {
        MessageKind::Text => {
            let label = gtk::Label::new(Some(&line.content));
            label.set_wrap(true);
            label.set_wrap_mode(gtk::pango::WrapMode::WordChar);
            label.set_selectable(true);
            label.set_xalign(0.0);
            label.upcast()
        }
        MessageKind::Image | MessageKind::Video => media_slot(chat, line.kind, &line.content),
    };
    body.set_margin_top(6);
    body.set_margin_start(10);
    body.set_margin_end(10);
    bubble.append(&body);

    let time = gtk::Label::new(Some(&line.time));
    time.add_css_class("dim-label");
    time.add_css_class("caption");
    time.set_halign(gtk::Align::End);
    time.set_margin_bottom(4);
    time.set_margin_end(10);
    bubble.append(&time);

    bubble.upcast()
}
