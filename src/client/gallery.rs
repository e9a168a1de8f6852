//! Gallery of saved looks plus the activity log and toast shown next to it.
//!
//! [`GalleryState`] is plain data driven by [`GalleryEvent`]s; [`Gallery`]
//! runs the network calls on short-lived threads and feeds their results
//! back through a channel that the UI drains once per tick.

use std::{
    collections::{HashMap, HashSet},
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::{
    api::RelayClient,
    thumbnails::{THUMBNAIL_SIZE, Thumbnail, make_thumbnail},
};
use crate::error::ClientError;

/// How long a finished toast stays visible.
pub const TOAST_TTL: Duration = Duration::from_secs(4);

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

pub fn is_image_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Client-local, append-only log of `[HH:MM:SS] message` lines.
#[derive(Clone, Debug, Default)]
pub struct ActivityLog {
    lines: Vec<String>,
}

impl ActivityLog {
    pub fn push(&mut self, message: impl AsRef<str>) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.lines.push(format!("[{stamp}] {}", message.as_ref()));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Loading,
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub shown_at: Instant,
}

impl Toast {
    /// Loading toasts stay until replaced; the rest fade after [`TOAST_TTL`].
    pub fn is_expired(&self, now: Instant) -> bool {
        self.kind != ToastKind::Loading && now.saturating_duration_since(self.shown_at) > TOAST_TTL
    }
}

pub enum GalleryEvent {
    Listed(Result<Vec<String>, ClientError>),
    Uploaded(Result<String, ClientError>),
    Deleted {
        url: String,
        result: Result<(), ClientError>,
    },
    Thumbnail {
        url: String,
        result: Result<Thumbnail, String>,
    },
}

/// Work the state asks its owner to start next.
#[derive(Debug, PartialEq, Eq)]
pub enum Followup {
    Refresh,
    FetchThumbnails(Vec<String>),
}

#[derive(Default)]
pub struct GalleryState {
    files: Vec<String>,
    preview: Option<String>,
    thumbnails: HashMap<String, Thumbnail>,
    /// Requested but not yet answered; never asked for twice.
    pending_thumbnails: HashSet<String>,
    failed_thumbnails: HashSet<String>,
    log: ActivityLog,
    toast: Option<Toast>,
}

impl GalleryState {
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn thumbnail(&self, url: &str) -> Option<&Thumbnail> {
        self.thumbnails.get(url)
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn notify(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.toast = Some(Toast {
            kind,
            message: message.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn expire_toast(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|t| t.is_expired(now)) {
            self.toast = None;
        }
    }

    pub fn open_preview(&mut self, url: &str) {
        if self.files.iter().any(|f| f == url) {
            self.preview = Some(url.to_string());
        }
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
    }

    pub fn upload_started(&mut self) {
        self.log.push("Uploading image to cloud...");
        self.notify(ToastKind::Loading, "Uploading your look...");
    }

    /// The snapshot could not even be produced.
    pub fn save_failed(&mut self, reason: &str) {
        self.log.push(format!("Upload failed: {reason}"));
        self.notify(ToastKind::Error, format!("Upload failed: {reason}"));
    }

    pub fn fetch_started(&mut self) {
        self.log.push("Fetching images...");
    }

    pub fn delete_started(&mut self) {
        self.log.push("Deleting image...");
        self.notify(ToastKind::Loading, "Deleting...");
    }

    pub fn apply(&mut self, event: GalleryEvent) -> Option<Followup> {
        match event {
            GalleryEvent::Listed(Ok(urls)) => {
                self.files = urls.into_iter().filter(|url| is_image_url(url)).collect();
                self.log.push(format!("Found {} images.", self.files.len()));
                let files = &self.files;
                self.thumbnails.retain(|url, _| files.contains(url));
                self.failed_thumbnails.retain(|url| files.contains(url));
                if self.preview.as_ref().is_some_and(|p| !files.contains(p)) {
                    self.preview = None;
                }
                let missing: Vec<String> = self
                    .files
                    .iter()
                    .filter(|url| {
                        !self.thumbnails.contains_key(*url)
                            && !self.failed_thumbnails.contains(*url)
                            && !self.pending_thumbnails.contains(*url)
                    })
                    .cloned()
                    .collect();
                self.pending_thumbnails.extend(missing.iter().cloned());
                (!missing.is_empty()).then_some(Followup::FetchThumbnails(missing))
            }
            GalleryEvent::Listed(Err(err)) => {
                self.log.push(format!("Fetch files error: {err}"));
                self.notify(ToastKind::Error, "Failed to load gallery");
                None
            }
            GalleryEvent::Uploaded(Ok(url)) => {
                log::info!("snapshot uploaded to {url}");
                self.log.push("Upload successful!");
                self.notify(ToastKind::Success, "Look saved to gallery!");
                Some(Followup::Refresh)
            }
            GalleryEvent::Uploaded(Err(err)) => {
                self.log.push(format!("Upload failed: {err}"));
                self.notify(ToastKind::Error, format!("Upload failed: {err}"));
                None
            }
            GalleryEvent::Deleted { url, result: Ok(()) } => {
                log::info!("deleted {url}");
                self.log.push("Image deleted successfully.");
                self.notify(ToastKind::Success, "Image deleted!");
                self.preview = None;
                Some(Followup::Refresh)
            }
            GalleryEvent::Deleted { url, result: Err(err) } => {
                log::warn!("failed to delete {url}: {err}");
                self.log.push(format!("Delete failed: {err}"));
                self.notify(ToastKind::Error, format!("Delete failed: {err}"));
                None
            }
            GalleryEvent::Thumbnail { url, result } => {
                self.pending_thumbnails.remove(&url);
                match result {
                    Ok(thumb) => {
                        if self.files.contains(&url) {
                            self.thumbnails.insert(url, thumb);
                        }
                    }
                    Err(err) => {
                        log::warn!("thumbnail for {url} failed: {err}");
                        if self.files.contains(&url) {
                            self.failed_thumbnails.insert(url);
                        }
                    }
                }
                None
            }
        }
    }
}

/// Owns the relay client and the worker channel.
pub struct Gallery {
    client: RelayClient,
    event_tx: Sender<GalleryEvent>,
    event_rx: Receiver<GalleryEvent>,
    state: GalleryState,
}

impl Gallery {
    pub fn new(client: RelayClient) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            client,
            event_tx,
            event_rx,
            state: GalleryState::default(),
        }
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GalleryState {
        &mut self.state
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce(RelayClient) -> GalleryEvent + Send + 'static,
    {
        let client = self.client.clone();
        let tx = self.event_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(job(client));
        });
    }

    pub fn refresh(&mut self) {
        self.state.fetch_started();
        self.spawn(|client| GalleryEvent::Listed(client.list()));
    }

    pub fn upload(&mut self, jpeg: Vec<u8>) {
        self.state.upload_started();
        self.spawn(move |client| GalleryEvent::Uploaded(client.upload_snapshot(jpeg)));
    }

    pub fn delete(&mut self, url: String) {
        self.state.delete_started();
        self.spawn(move |client| {
            let result = client.delete_url(&url);
            GalleryEvent::Deleted { url, result }
        });
    }

    fn fetch_thumbnails(&self, urls: Vec<String>) {
        for url in urls {
            self.spawn(move |client| {
                let result = client
                    .fetch(&url)
                    .map_err(|err| err.to_string())
                    .and_then(|bytes| make_thumbnail(&bytes, THUMBNAIL_SIZE).map_err(|err| format!("{err:#}")));
                GalleryEvent::Thumbnail { url, result }
            });
        }
    }

    /// Apply finished jobs; returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.event_rx.try_recv() {
            changed = true;
            match self.state.apply(event) {
                Some(Followup::Refresh) => self.refresh(),
                Some(Followup::FetchThumbnails(urls)) => self.fetch_thumbnails(urls),
                None => {}
            }
        }
        let had_toast = self.state.toast.is_some();
        self.state.expire_toast(Instant::now());
        changed || had_toast != self.state.toast.is_some()
    }
}
