use super::{
    ActiveTheme, AnyElement, AppView, Button, ButtonVariants, CAMERA_MAX_WIDTH, CameraPhase,
    Category, Context, DetectorStatus, FluentBuilder, GALLERY_PANEL_WIDTH, InteractiveElement,
    IntoElement, MouseButton, ObjectFit, ParentElement, SharedString, Slider, Styled, StyledExt,
    StyledImage, Window, div, h_flex, img, px, v_flex,
};

const CAMERA_MIN_WIDTH: f32 = 320.0;
const PAGE_CHROME: f32 = 64.0;
const SWATCH_SIZE: f32 = 36.0;

impl AppView {
    pub(super) fn render_editor(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let viewport_width = f32::from(window.viewport_size().width);
        let camera_width = (viewport_width - GALLERY_PANEL_WIDTH - PAGE_CHROME)
            .clamp(CAMERA_MIN_WIDTH, CAMERA_MAX_WIDTH);
        let camera_height = camera_width / self.camera_aspect_ratio();

        let frame_view: AnyElement = match &self.latest_image {
            Some(image) => img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element(),
            None => div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0xb8a9c4))
                .child(self.camera_placeholder_text())
                .into_any_element(),
        };

        let mut camera_card = div()
            .relative()
            .w(px(camera_width))
            .h(px(camera_height))
            .overflow_hidden()
            .rounded_lg()
            .bg(gpui::rgb(0x000000))
            .child(frame_view);

        if self.camera_picker_open && !self.cameras.is_empty() {
            camera_card = camera_card.child(
                div()
                    .absolute()
                    .top(px(16.0))
                    .right(px(16.0))
                    .w(px((camera_width * 0.6).min(360.0)))
                    .child(self.render_camera_picker(cx)),
            );
        }

        v_flex()
            .gap_3()
            .w(px(camera_width))
            .child(self.render_status_row(cx))
            .child(camera_card)
            .child(self.render_category_tabs(cx))
            .child(self.render_product_card(cx))
            .child(self.render_actions(cx))
            .into_any_element()
    }

    fn camera_placeholder_text(&self) -> String {
        match self.session.phase() {
            CameraPhase::Idle { error: Some(err) } => format!("Camera unavailable: {err}"),
            CameraPhase::Idle { error: None } if self.cameras.is_empty() => {
                "No camera found".to_string()
            }
            CameraPhase::Stopped => "Camera stopped".to_string(),
            _ => "Starting camera...".to_string(),
        }
    }

    fn render_status_row(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let theme = cx.theme();
        let (camera_text, camera_color) = match self.session.phase() {
            CameraPhase::Detecting => ("● Face tracking", theme.success),
            CameraPhase::Active => ("● Camera on", theme.foreground),
            CameraPhase::Requesting => ("○ Requesting camera", theme.muted_foreground),
            CameraPhase::Idle { error: Some(_) } => ("○ Camera denied", theme.danger),
            CameraPhase::Idle { error: None } | CameraPhase::Stopped => {
                ("○ Camera off", theme.muted_foreground)
            }
        };
        let (model_text, model_color) = match self.detector.status() {
            DetectorStatus::Loading => ("Loading AI models...".to_string(), theme.muted_foreground),
            DetectorStatus::Ready => ("AI models ready".to_string(), theme.success),
            DetectorStatus::Disabled(reason) => (format!("AI models off: {reason}"), theme.danger),
        };

        let mut row = h_flex()
            .justify_between()
            .items_center()
            .gap_2()
            .child(
                h_flex()
                    .gap_3()
                    .items_center()
                    .child(
                        div()
                            .text_lg()
                            .font_semibold()
                            .text_color(gpui::rgb(0xf8bbd0))
                            .child("💄 Makeup Mirror"),
                    )
                    .child(div().text_xs().text_color(camera_color).child(camera_text))
                    .child(
                        div()
                            .text_xs()
                            .text_color(model_color)
                            .overflow_hidden()
                            .text_ellipsis()
                            .whitespace_nowrap()
                            .child(model_text),
                    ),
            );

        if !self.cameras.is_empty() {
            let label = if self.camera_picker_open {
                "◉ Close"
            } else {
                "◉ Camera"
            };
            row = row.child(
                Button::new(SharedString::from("camera-picker-toggle"))
                    .outline()
                    .label(label)
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.camera_picker_open = !this.camera_picker_open;
                        cx.notify();
                    })),
            );
        }

        row.into_any_element()
    }

    fn render_camera_picker(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let mut picker = v_flex()
            .gap_1()
            .p_3()
            .rounded_lg()
            .bg(gpui::rgba(0x1a1420f0))
            .border_1()
            .border_color(gpui::rgba(0x4a3b57ff))
            .shadow_lg();

        for (idx, device) in self.cameras.iter().enumerate() {
            let is_selected = self.selected_camera == Some(idx);
            picker = picker.child(
                h_flex()
                    .w_full()
                    .gap_2()
                    .items_center()
                    .p_2()
                    .rounded_md()
                    .cursor_pointer()
                    .when(is_selected, |this| this.bg(gpui::rgba(0xec407a33)))
                    .on_mouse_down(
                        MouseButton::Left,
                        cx.listener(move |this, _, _, cx| {
                            this.switch_camera(idx);
                            cx.notify();
                        }),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(if is_selected {
                                gpui::rgb(0xf48fb1)
                            } else {
                                gpui::rgb(0x6b5b78)
                            })
                            .child(if is_selected { "●" } else { "○" }),
                    )
                    .child(
                        div()
                            .flex_1()
                            .text_sm()
                            .text_color(gpui::rgb(0xe2e8f0))
                            .overflow_hidden()
                            .text_ellipsis()
                            .whitespace_nowrap()
                            .child(device.label.clone()),
                    ),
            );
        }

        picker.into_any_element()
    }

    fn render_category_tabs(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let mut tabs = h_flex().gap_2().w_full();
        for category in Category::ALL {
            let label = format!("{} {}", category.icon(), category.label());
            let button = Button::new(SharedString::from(format!("tab-{}", category.label())))
                .label(label)
                .on_click(cx.listener(move |this, _, window, cx| {
                    this.select_category(category, window, cx);
                    cx.notify();
                }));
            let button = if category == self.active_category {
                button.primary()
            } else {
                button.ghost()
            };
            tabs = tabs.child(button);
        }
        tabs.into_any_element()
    }

    fn render_product_card(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let category = self.active_category;
        let setting = self.makeup.setting(category);
        let selected_shade = self.makeup.shade(category);

        let mut swatches = h_flex().gap_2().items_center();
        for (idx, shade) in category.shades().iter().enumerate() {
            let is_selected = setting.shade_index() == idx;
            swatches = swatches.child(
                div()
                    .w(px(SWATCH_SIZE))
                    .h(px(SWATCH_SIZE))
                    .rounded_full()
                    .cursor_pointer()
                    .bg(gpui::rgb(shade.color.to_hex()))
                    .border_2()
                    .border_color(if is_selected {
                        gpui::rgb(0xffffff)
                    } else {
                        gpui::rgb(0x2a2130)
                    })
                    .on_mouse_down(
                        MouseButton::Left,
                        cx.listener(move |this, _, _, cx| {
                            this.select_shade(category, idx);
                            cx.notify();
                        }),
                    ),
            );
        }

        let intensity = setting.intensity.percent();
        let intensity_row = h_flex()
            .gap_2()
            .items_center()
            .child(div().text_sm().text_color(gpui::rgb(0xb8a9c4)).child("Intensity"))
            .child(div().flex_1().child(Slider::new(&self.intensity_slider)))
            .child(
                h_flex()
                    .w(px(48.0))
                    .justify_center()
                    .text_sm()
                    .font_semibold()
                    .text_color(gpui::rgb(0xe2e8f0))
                    .child(format!("{intensity}%")),
            )
            .when(setting.intensity.is_off(), |this| {
                this.child(div().text_xs().text_color(gpui::rgb(0x8b7d96)).child("off"))
            });

        v_flex()
            .gap_3()
            .p_3()
            .rounded_lg()
            .bg(gpui::rgb(0x241b2b))
            .child(
                h_flex()
                    .justify_between()
                    .child(
                        div()
                            .text_sm()
                            .font_semibold()
                            .text_color(gpui::rgb(0xe2e8f0))
                            .child(format!("{} {}", category.icon(), category.label())),
                    )
                    .child(
                        div()
                            .text_xs()
                            .text_color(gpui::rgb(0xb8a9c4))
                            .child(selected_shade.name),
                    ),
            )
            .child(swatches)
            .child(intensity_row)
            .into_any_element()
    }

    fn render_actions(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let debug_label = if self.compositor_options.debug_markers {
            "Markers: on"
        } else {
            "Markers: off"
        };

        h_flex()
            .gap_2()
            .items_center()
            .child(
                Button::new(SharedString::from("save-look"))
                    .primary()
                    .label("📸 Save Look")
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.save_look();
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("reset-makeup"))
                    .outline()
                    .label("Reset")
                    .on_click(cx.listener(|this, _, window, cx| {
                        this.reset_makeup(window, cx);
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("debug-markers"))
                    .ghost()
                    .label(debug_label)
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.compositor_options.debug_markers =
                            !this.compositor_options.debug_markers;
                        cx.notify();
                    })),
            )
            .into_any_element()
    }
}
