use eframe::egui::{self, Pos2, Rect, Ui};
use tracing::warn;

use super::ViewModel;
use super::render_utils::circle_visible;

impl ViewModel {
    pub(super) fn handle_graph_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.session
            .zoom_mut()
            .zoom_at((pointer - rect.min).to_pos2(), zoom_factor);
    }

    pub(super) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged() {
            self.session.zoom_mut().pan_by(response.drag_delta());
        }
    }

    pub(super) fn visible_indices_into(
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
        visible: &mut Vec<usize>,
    ) {
        visible.clear();
        visible.extend(
            (0..screen_positions.len())
                .filter(|&index| circle_visible(rect, screen_positions[index], screen_radii[index])),
        );
    }

    /// Closest visible node whose disc contains the pointer.
    pub(super) fn hovered_index(
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        visible_indices
            .iter()
            .filter_map(|&index| {
                let distance = screen_positions[index].distance(pointer);
                (distance <= screen_radii[index]).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// A click on a node selects it and eases the view onto it; a click on empty space
    /// clears the selection.
    pub(super) fn apply_graph_selection(&mut self, clicked: Option<usize>) {
        self.selected = clicked;
        let Some(index) = clicked else {
            return;
        };
        if let Err(error) = self.session.focus_node(index) {
            warn!(%error, "cannot focus node");
        }
    }
}
