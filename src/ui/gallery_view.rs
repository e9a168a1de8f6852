use super::{
    AnyElement, AppView, Button, ButtonVariants, Context, FluentBuilder, InteractiveElement,
    IntoElement, LOG_LINES_SHOWN, MouseButton, ObjectFit, ParentElement, SharedString, Styled,
    StyledExt, StyledImage, div, h_flex, img, px, v_flex,
};

const TILE_SIZE: f32 = 96.0;
const PREVIEW_HEIGHT: f32 = 240.0;

impl AppView {
    pub(super) fn render_gallery(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let preview = self.render_preview(cx);

        v_flex()
            .size_full()
            .gap_3()
            .p_3()
            .rounded_lg()
            .bg(gpui::rgb(0x241b2b))
            .child(
                h_flex()
                    .justify_between()
                    .items_center()
                    .child(
                        div()
                            .text_sm()
                            .font_semibold()
                            .text_color(gpui::rgb(0xe2e8f0))
                            .child(format!("Gallery ({})", self.gallery.state().files().len())),
                    )
                    .child(
                        Button::new(SharedString::from("gallery-refresh"))
                            .ghost()
                            .label("⟳ Refresh")
                            .on_click(cx.listener(|this, _, _, cx| {
                                this.gallery.refresh();
                                cx.notify();
                            })),
                    ),
            )
            .when_some(preview, |this, preview| this.child(preview))
            .child(self.render_tiles(cx))
            .child(self.render_activity_log())
            .into_any_element()
    }

    fn render_tiles(&mut self, cx: &mut Context<'_, Self>) -> AnyElement {
        let files = self.gallery.state().files();
        if files.is_empty() {
            return div()
                .text_xs()
                .text_color(gpui::rgb(0x8b7d96))
                .child("No saved looks yet")
                .into_any_element();
        }

        let mut grid = h_flex().flex_wrap().gap_2();
        for url in files {
            let tile_content: AnyElement = match self.thumbnail_images.get(url) {
                Some(image) => img(image.clone())
                    .size_full()
                    .object_fit(ObjectFit::Cover)
                    .into_any_element(),
                None => div()
                    .size_full()
                    .flex()
                    .items_center()
                    .justify_center()
                    .text_xs()
                    .text_color(gpui::rgb(0x8b7d96))
                    .child("…")
                    .into_any_element(),
            };
            let is_selected = self.gallery.state().preview() == Some(url.as_str());
            let target = url.clone();
            grid = grid.child(
                div()
                    .w(px(TILE_SIZE))
                    .h(px(TILE_SIZE))
                    .overflow_hidden()
                    .rounded_md()
                    .cursor_pointer()
                    .bg(gpui::rgb(0x000000))
                    .border_2()
                    .border_color(if is_selected {
                        gpui::rgb(0xf48fb1)
                    } else {
                        gpui::rgb(0x2a2130)
                    })
                    .on_mouse_down(
                        MouseButton::Left,
                        cx.listener(move |this, _, _, cx| {
                            this.gallery.state_mut().open_preview(&target);
                            cx.notify();
                        }),
                    )
                    .child(tile_content),
            );
        }
        grid.into_any_element()
    }

    fn render_preview(&mut self, cx: &mut Context<'_, Self>) -> Option<AnyElement> {
        let url = self.gallery.state().preview()?.to_string();
        let image = self.thumbnail_images.get(&url).cloned();
        let delete_target = url.clone();

        Some(
            v_flex()
                .gap_2()
                .child(
                    div()
                        .w_full()
                        .h(px(PREVIEW_HEIGHT))
                        .overflow_hidden()
                        .rounded_md()
                        .bg(gpui::rgb(0x000000))
                        .when_some(image, |this, image| {
                            this.child(img(image).size_full().object_fit(ObjectFit::Contain))
                        }),
                )
                .child(
                    div()
                        .text_xs()
                        .text_color(gpui::rgb(0xb8a9c4))
                        .overflow_hidden()
                        .text_ellipsis()
                        .whitespace_nowrap()
                        .child(url),
                )
                .child(
                    h_flex()
                        .gap_2()
                        .child(
                            Button::new(SharedString::from("preview-delete"))
                                .danger()
                                .label("🗑 Delete")
                                .on_click(cx.listener(move |this, _, _, cx| {
                                    this.gallery.delete(delete_target.clone());
                                    cx.notify();
                                })),
                        )
                        .child(
                            Button::new(SharedString::from("preview-close"))
                                .outline()
                                .label("Close")
                                .on_click(cx.listener(|this, _, _, cx| {
                                    this.gallery.state_mut().close_preview();
                                    cx.notify();
                                })),
                        ),
                )
                .into_any_element(),
        )
    }

    fn render_activity_log(&self) -> AnyElement {
        let lines = self.gallery.state().log().lines();
        let start = lines.len().saturating_sub(LOG_LINES_SHOWN);

        let mut log = v_flex()
            .gap_1()
            .p_2()
            .rounded_md()
            .bg(gpui::rgb(0x16101b))
            .child(
                div()
                    .text_xs()
                    .font_semibold()
                    .text_color(gpui::rgb(0xb8a9c4))
                    .child("Activity"),
            );
        for line in &lines[start..] {
            log = log.child(
                div()
                    .text_xs()
                    .text_color(gpui::rgb(0x8b95a5))
                    .overflow_hidden()
                    .text_ellipsis()
                    .whitespace_nowrap()
                    .child(line.clone()),
            );
        }
        log.into_any_element()
    }
}
