use crate::api::models::{MessageKind, User};
use crate::app::ChatApp;
use crate::media::MediaBytes;
use crate::ui::run_async_to_main;
use gtk4 as gtk;
use gtk4::prelude::*;
use std::sync::Arc;

fn texture(media: &MediaBytes) -> Option<gtk::gdk::Texture> {
    gtk::gdk::Texture::from_bytes(&glib::Bytes::from_owned(media.bytes.clone())).ok()
}

fn video(media: &MediaBytes) -> gtk::Widget {
    let stream =
        gtk::gio::MemoryInputStream::from_bytes(&glib::Bytes::from_owned(media.bytes.clone()));
    let file = gtk::MediaFile::for_input_stream(&stream);
    let video = gtk::Video::for_media_stream(Some(&file));
    video.set_size_request(320, 180);
    video.upcast()
}

fn picture(media: &MediaBytes) -> Option<gtk::Widget> {
    let picture = gtk::Picture::for_paintable(&texture(media)?);
    picture.set_can_shrink(true);
    picture.set_size_request(240, 180);
    Some(picture.upcast())
}

fn placeholder(text: &str) -> gtk::Widget {
    let label = gtk::Label::new(Some(text));
    label.add_css_class("dim-label");
    label.set_xalign(0.0);
    label.upcast()
}

/// Image or video player for a media message, filled in once its bytes load.
pub fn media_slot(chat: &Arc<ChatApp>, kind: MessageKind, content: &str) -> gtk::Widget {
    let slot = gtk::Box::new(gtk::Orientation::Vertical, 0);
    slot.append(&placeholder("Loading..."));

    let chat = chat.clone();
    let content = content.to_string();
    let target = slot.clone();
    run_async_to_main(
        async move { chat.media().load(&content).await },
        move |res| {
            while let Some(child) = target.first_child() {
                target.remove(&child);
            }
            let shown = match res {
                Ok(media) if kind == MessageKind::Video => Some(video(&media)),
                Ok(media) => picture(&media),
                Err(e) => {
                    log::warn!("media unavailable: {e}");
                    None
                }
            };
            let fallback = || placeholder(&format!("[{}]", kind.as_str()));
            target.append(&shown.unwrap_or_else(fallback));
        },
    );
    slot.upcast()
}

/// Initials until the profile image, if any, has loaded.
pub fn avatar(chat: &Arc<ChatApp>, user: &User, size: i32) -> adw::Avatar {
    let avatar = adw::Avatar::new(size, Some(&user.name), true);
    let Some(source) = user.profile_image.clone().filter(|s| !s.trim().is_empty()) else {
        return avatar;
    };

    let chat = chat.clone();
    let target = avatar.clone();
    run_async_to_main(
        async move { chat.media().load(&source).await },
        move |res| match res.ok().as_ref().and_then(texture) {
            Some(image) => target.set_custom_image(Some(&image)),
            None => log::debug!("profile image unavailable, keeping initials"),
        },
    );
    avatar
}
