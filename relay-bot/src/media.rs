use relay_telegram::{Message, PhotoSize};

/// A file in a message the relay stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub file_id: String,
    pub extension: &'static str,
}

/// Pick the media worth storing: the largest photo resolution, else the video
pub fn capture_for(message: &Message) -> Option<Capture> {
    if let Some(photo) = largest_photo(&message.photo) {
        return Some(Capture {
            file_id: photo.file_id.clone(),
            extension: "jpg",
        });
    }

    message.video.as_ref().map(|video| Capture {
        file_id: video.file_id.clone(),
        extension: video_extension(video.mime_type.as_deref()),
    })
}

/// Largest by pixel count; the first one wins a tie
pub fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes.iter().fold(None, |best: Option<&PhotoSize>, size| match best {
        Some(b) if b.area() >= size.area() => Some(b),
        _ => Some(size),
    })
}

pub fn video_extension(mime_type: Option<&str>) -> &'static str {
    match mime_type.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
        Some("video/quicktime") => "mov",
        Some("video/webm") => "webm",
        Some("video/x-matroska") => "mkv",
        Some("video/mpeg") => "mpeg",
        Some("video/3gpp") => "3gp",
        Some("video/x-msvideo") => "avi",
        _ => "mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_telegram::{Chat, Video};

    fn size(id: &str, width: u32, height: u32) -> PhotoSize {
        PhotoSize {
            file_id: id.into(),
            file_unique_id: format!("u-{}", id),
            width,
            height,
            file_size: None,
        }
    }

    fn message() -> Message {
        Message {
            message_id: 1,
            from: None,
            date: 0,
            chat: Chat {
                id: 9,
                kind: "private".into(),
                title: None,
                username: None,
                first_name: None,
            },
            forward_from: None,
            text: None,
            caption: None,
            reply_to_message: None,
            photo: Vec::new(),
            video: None,
        }
    }

    fn video(mime: Option<&str>) -> Video {
        Video {
            file_id: "vid".into(),
            file_unique_id: "u-vid".into(),
            width: 640,
            height: 480,
            duration: 3,
            thumbnail: None,
            mime_type: mime.map(String::from),
            file_size: None,
        }
    }

    #[test]
    fn largest_photo_by_area_not_position() {
        let sizes = vec![size("m", 320, 240), size("xl", 1280, 960), size("s", 90, 90)];
        assert_eq!(largest_photo(&sizes).unwrap().file_id, "xl");
        assert!(largest_photo(&[]).is_none());
    }

    #[test]
    fn photo_tie_keeps_first() {
        let sizes = vec![size("a", 100, 200), size("b", 200, 100)];
        assert_eq!(largest_photo(&sizes).unwrap().file_id, "a");
    }

    #[test]
    fn photo_is_captured_as_jpg() {
        let mut msg = message();
        msg.photo = vec![size("s", 10, 10), size("l", 100, 100)];
        msg.video = Some(video(None));

        assert_eq!(
            capture_for(&msg),
            Some(Capture {
                file_id: "l".into(),
                extension: "jpg"
            })
        );
    }

    #[test]
    fn video_extension_from_mime() {
        let mut msg = message();
        msg.video = Some(video(Some("video/quicktime")));
        assert_eq!(capture_for(&msg).unwrap().extension, "mov");

        assert_eq!(video_extension(None), "mp4");
        assert_eq!(video_extension(Some("application/octet-stream")), "mp4");
        assert_eq!(video_extension(Some("Video/WebM")), "webm");
    }

    #[test]
    fn text_message_captures_nothing() {
        let mut msg = message();
        msg.text = Some("hi".into());
        assert!(capture_for(&msg).is_none());
    }
}
