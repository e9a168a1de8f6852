use std::{collections::HashMap, sync::Arc, time::Instant};

use gpui::{
    AnyElement, App, AppContext, Context, Entity, InteractiveElement, IntoElement, MouseButton,
    ObjectFit, ParentElement, Render, RenderImage, SharedString, Styled, StyledImage, Subscription,
    TitlebarOptions, Window, WindowOptions, div, img, px,
};
use gpui::prelude::FluentBuilder;
use gpui_component::{
    ActiveTheme, Root, StyledExt,
    button::{Button, ButtonVariants},
    h_flex,
    slider::{Slider, SliderEvent, SliderState},
    tag::Tag,
    v_flex,
};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{
    client::{Gallery, RelayClient, ToastKind},
    config::ClientConfig,
    makeup::{Category, Intensity, MakeupConfig},
    pipeline::{
        self, CameraDevice, CameraPhase, CameraSession, Canvas, CompositorOptions,
        DetectorBackend, DetectorHandle, DetectorStatus, composite_frame, landmarks_for_frame,
    },
};

mod editor_view;
mod gallery_view;
mod render_util;

const CAMERA_MAX_WIDTH: f32 = 960.0;
const DEFAULT_CAMERA_RATIO: f32 = 4.0 / 3.0;
const GALLERY_PANEL_WIDTH: f32 = 360.0;
const LOG_LINES_SHOWN: usize = 12;

pub fn launch_ui(app: &mut App, config: ClientConfig) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Makeup Mirror".into()),
            appears_transparent: false,
            traffic_light_position: None,
        }),
        ..Default::default()
    };

    let client = RelayClient::new(config.api_url.clone())?;
    app.open_window(window_options, move |window, app| {
        let view = app.new(|cx| AppView::new(&config, client, cx));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    session: CameraSession,
    detector: DetectorHandle,
    detector_announced: bool,
    cameras: Vec<CameraDevice>,
    selected_camera: Option<usize>,
    camera_picker_open: bool,
    canvas: Canvas,
    latest_image: Option<Arc<RenderImage>>,
    makeup: MakeupConfig,
    active_category: Category,
    compositor_options: CompositorOptions,
    /// Shared by every category; re-synced when the tab or the look changes.
    intensity_slider: Entity<SliderState>,
    gallery: Gallery,
    thumbnail_images: HashMap<String, Arc<RenderImage>>,
    _subscriptions: Vec<Subscription>,
}

impl AppView {
    fn new(config: &ClientConfig, client: RelayClient, cx: &mut Context<'_, Self>) -> Self {
        let detector = pipeline::start_detector(DetectorBackend::from_config(config));
        let mut gallery = Gallery::new(client);
        gallery.refresh();

        let makeup = MakeupConfig::default();
        let active_category = Category::Lipstick;
        let initial = makeup.intensity(active_category).percent() as f32;
        let intensity_slider = cx.new(|_| {
            SliderState::new()
                .min(0.0)
                .max(Intensity::MAX as f32)
                .step(1.0)
                .default_value(initial)
        });
        let subscriptions = vec![cx.subscribe(
            &intensity_slider,
            |this: &mut Self, _, event: &SliderEvent, cx| {
                if let SliderEvent::Change(value) = event {
                    let category = this.active_category;
                    this.makeup = this
                        .makeup
                        .with_intensity(category, Intensity::from_fraction_percent(value.start()));
                    cx.notify();
                }
            },
        )];

        let mut view = Self {
            session: CameraSession::new(),
            detector,
            detector_announced: false,
            cameras: Vec::new(),
            selected_camera: None,
            camera_picker_open: false,
            canvas: Canvas::new(),
            latest_image: None,
            makeup,
            active_category,
            compositor_options: CompositorOptions::default(),
            intensity_slider,
            gallery,
            thumbnail_images: HashMap::new(),
            _subscriptions: subscriptions,
        };
        view.discover_cameras();
        if !view.cameras.is_empty() {
            view.switch_camera(0);
        }
        view
    }

    fn discover_cameras(&mut self) {
        match pipeline::available_cameras() {
            Ok(cameras) => {
                log::info!("found {} camera(s)", cameras.len());
                self.cameras = cameras;
            }
            Err(err) => {
                log::error!("failed to enumerate cameras: {err}");
                self.gallery
                    .state_mut()
                    .notify(ToastKind::Error, "Camera access denied or unavailable.");
            }
        }
    }

    fn switch_camera(&mut self, idx: usize) {
        let Some(device) = self.cameras.get(idx).cloned() else {
            return;
        };
        let result = self
            .session
            .start(|frame_tx| pipeline::start_camera_stream(&device.id, frame_tx));
        self.latest_image = None;
        match result {
            Ok(()) => {
                self.selected_camera = Some(idx);
                self.camera_picker_open = false;
                self.gallery
                    .state_mut()
                    .notify(ToastKind::Success, "Camera activated!");
            }
            Err(err) => {
                log::error!("camera {} failed to start: {err}", device.label);
                self.gallery
                    .state_mut()
                    .notify(ToastKind::Error, "Camera access denied or unavailable.");
            }
        }
    }

    fn announce_detector(&mut self) {
        if self.detector_announced {
            return;
        }
        let (kind, message) = match self.detector.status() {
            DetectorStatus::Loading => return,
            DetectorStatus::Ready => (ToastKind::Success, "AI models loaded! Camera starting..."),
            DetectorStatus::Disabled(_) => (ToastKind::Error, "Failed loading AI models."),
        };
        self.detector_announced = true;
        self.gallery.state_mut().notify(kind, message);
    }

    /// Pull the newest frame, composite it and swap the displayed texture.
    fn tick(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let was_streaming = self.session.is_streaming();
        let frame = self.session.tick(&mut self.detector);
        if was_streaming && self.session.error().is_some() {
            if let Some(old_image) = self.latest_image.take() {
                cx.drop_image(old_image, Some(window));
            }
            self.gallery
                .state_mut()
                .notify(ToastKind::Error, "Camera access denied or unavailable.");
        }
        if let Some(frame) = frame {
            let face = self
                .detector
                .current(Instant::now())
                .and_then(|detection| landmarks_for_frame(detection, &frame));
            composite_frame(
                &mut self.canvas,
                &frame,
                face.as_ref(),
                &self.makeup,
                self.compositor_options,
            );
            if let Some(image) = render_util::canvas_to_image(&self.canvas) {
                self.replace_latest_image(image, window, cx);
            }
        }
        self.announce_detector();

        if self.gallery.poll() {
            self.sync_thumbnails(window, cx);
        }
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        // The sprite atlas keeps every texture until it is dropped explicitly.
        if let Some(old_image) = self.latest_image.replace(new_image) {
            cx.drop_image(old_image, Some(window));
        }
    }

    fn sync_thumbnails(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let state = self.gallery.state();
        let stale: Vec<String> = self
            .thumbnail_images
            .keys()
            .filter(|url| !state.files().contains(url))
            .cloned()
            .collect();
        for url in stale {
            if let Some(image) = self.thumbnail_images.remove(&url) {
                cx.drop_image(image, Some(window));
            }
        }

        for url in state.files() {
            if self.thumbnail_images.contains_key(url) {
                continue;
            }
            if let Some(image) = state
                .thumbnail(url)
                .and_then(render_util::thumbnail_to_image)
            {
                self.thumbnail_images.insert(url.clone(), image);
            }
        }
    }

    fn save_look(&mut self) {
        let gallery = &mut self.gallery;
        if let Err(err) = pipeline::export_snapshot(&self.canvas, |jpeg| gallery.upload(jpeg)) {
            log::warn!("snapshot export failed: {err}");
            self.gallery.state_mut().save_failed(&err.to_string());
        }
    }

    fn reset_makeup(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        self.makeup = MakeupConfig::default();
        self.sync_intensity_slider(window, cx);
        self.gallery
            .state_mut()
            .notify(ToastKind::Info, "Makeup reset to defaults");
    }

    fn select_category(&mut self, category: Category, window: &mut Window, cx: &mut Context<'_, Self>) {
        self.active_category = category;
        self.sync_intensity_slider(window, cx);
    }

    /// Move the slider to the active category's stored intensity.
    fn sync_intensity_slider(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let percent = self.makeup.intensity(self.active_category).percent() as f32;
        self.intensity_slider.update(cx, |slider, cx| {
            slider.set_value(percent, window, cx);
        });
    }

    fn select_shade(&mut self, category: Category, idx: usize) {
        if let Some(config) = self.makeup.with_shade(category, idx) {
            self.makeup = config;
        }
    }

    fn camera_aspect_ratio(&self) -> f32 {
        if self.canvas.is_empty() {
            return DEFAULT_CAMERA_RATIO;
        }
        self.canvas.width as f32 / self.canvas.height as f32
    }

    fn render_toast(&self) -> Option<AnyElement> {
        let toast = self.gallery.state().toast()?;
        let tag = match toast.kind {
            ToastKind::Success => Tag::success(),
            ToastKind::Error => Tag::danger(),
            ToastKind::Loading | ToastKind::Info => Tag::secondary(),
        };
        Some(
            div()
                .absolute()
                .bottom(px(16.0))
                .right(px(16.0))
                .child(tag.rounded_full().child(toast.message.clone()))
                .into_any_element(),
        )
    }
}

impl Render for AppView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });
        self.tick(window, cx);

        let editor = self.render_editor(window, cx);
        let gallery = self.render_gallery(cx);
        let toast = self.render_toast();

        div()
            .relative()
            .size_full()
            .bg(gpui::rgb(0x1a1420))
            .child(
                h_flex()
                    .size_full()
                    .gap_3()
                    .p_4()
                    .items_start()
                    .child(div().flex_1().child(editor))
                    .child(div().w(px(GALLERY_PANEL_WIDTH)).h_full().child(gallery)),
            )
            .when_some(toast, |this, toast| this.child(toast))
    }
}
