use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, vec2};
use orbit_layout::Transform;
use orbit_layout::config::RadiusConfig;
use orbit_layout::graph::Graph;
use orbit_layout::physics::quadtree_cells;
use orbit_layout::simulation::SimulationState;
use orbit_layout::util::brighter;

use super::render_utils::{
    blend_color, dim_color, draw_background, edge_visible, edge_width, to_screen,
};
use super::{ViewModel, ViewScratch};

const EDGE_COLOR: Color32 = Color32::from_rgb(153, 153, 153);
const HIGHLIGHT_EDGE_COLOR: Color32 = Color32::from_rgb(68, 68, 68);
const SEARCH_COLOR: Color32 = Color32::from_rgb(103, 196, 255);
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const NODE_OUTLINE: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 220);

impl ViewModel {
    fn update_screen_space(
        rect: Rect,
        transform: Transform,
        graph: &Graph,
        radii: &RadiusConfig,
        scratch: &mut ViewScratch,
    ) {
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        for node in graph.nodes() {
            scratch
                .screen_positions
                .push(to_screen(rect, transform, node.position));
            scratch
                .screen_radii
                .push((node.radius(radii) * transform.scale).clamp(1.5, 96.0));
        }

        scratch.visible_mask.clear();
        scratch.visible_mask.resize(graph.len(), false);
    }

    /// Leaves first so parents and the root paint on top of them.
    fn draw_order_into(graph: &Graph, visible: &[usize], order: &mut Vec<usize>) {
        order.clear();
        order.extend_from_slice(visible);
        order.sort_by_key(|&index| {
            graph
                .node(index)
                .map(|node| (node.is_root(), node.is_parent()))
                .unwrap_or_default()
        });
    }

    fn refresh_search_mask(&mut self) {
        let graph = self.session.graph();
        self.scratch.search_mask.clear();
        self.scratch.search_mask.resize(graph.len(), false);
        for hit in self.search.matches(graph, &self.query) {
            if let Some(entry) = self.scratch.search_mask.get_mut(hit.index) {
                *entry = true;
            }
        }
    }

    pub(super) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.session.zoom_mut().resize(rect.size());
        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        let frame_delta_ms = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0)
            * 1000.0;
        self.session.tick(frame_delta_ms);

        let transform = self.session.transform();
        draw_background(&painter, rect, transform);

        if self.session.graph().is_empty() {
            ui.label("The graph is empty.");
            return;
        }

        let radii = self.session.config().radii;
        Self::update_screen_space(
            rect,
            transform,
            self.session.graph(),
            &radii,
            &mut self.scratch,
        );
        Self::visible_indices_into(
            rect,
            &self.scratch.screen_positions,
            &self.scratch.screen_radii,
            &mut self.scratch.visible_indices,
        );
        for &index in &self.scratch.visible_indices {
            if let Some(entry) = self.scratch.visible_mask.get_mut(index) {
                *entry = true;
            }
        }
        self.visible_node_count = self.scratch.visible_indices.len();

        let hovered = Self::hovered_index(
            ui,
            &self.scratch.visible_indices,
            &self.scratch.screen_positions,
            &self.scratch.screen_radii,
        );
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }
        self.session.hover_index(hovered);
        self.refresh_search_mask();
        let search_active = self.scratch.search_mask.iter().any(|&hit| hit);

        let graph = self.session.graph();
        let zoom = self.session.zoom();
        let fade = self.session.highlight();
        let fade_value = fade.value();
        let highlight = fade.visible();

        if self.show_quadtree_overlay {
            quadtree_cells(
                graph,
                &mut self.scratch.quadtree_positions,
                &mut self.scratch.quadtree_cells,
            );
            for cell in &self.scratch.quadtree_cells {
                let min = cell.center - vec2(cell.half_extent, cell.half_extent);
                let max = cell.center + vec2(cell.half_extent, cell.half_extent);
                let top_left = to_screen(rect, transform, vec2(min.x, min.y));
                let top_right = to_screen(rect, transform, vec2(max.x, min.y));
                let bottom_right = to_screen(rect, transform, vec2(max.x, max.y));
                let bottom_left = to_screen(rect, transform, vec2(min.x, max.y));

                let alpha = if cell.is_leaf { 110 } else { 55 };
                let line_width = (1.4_f32 - (cell.depth as f32 * 0.09)).clamp(0.45, 1.4);
                let stroke = Stroke::new(
                    line_width,
                    Color32::from_rgba_unmultiplied(106, 198, 255, alpha),
                );

                painter.line_segment([top_left, top_right], stroke);
                painter.line_segment([top_right, bottom_right], stroke);
                painter.line_segment([bottom_right, bottom_left], stroke);
                painter.line_segment([bottom_left, top_left], stroke);
            }
        }

        let mut visible_edge_count = 0usize;
        for (index, edge) in graph.edges().iter().enumerate() {
            let (source, target) = (edge.source(), edge.target());
            let (Some(&start), Some(&end)) = (
                self.scratch.screen_positions.get(source),
                self.scratch.screen_positions.get(target),
            ) else {
                continue;
            };
            let endpoint_visible = self.scratch.visible_mask[source] || self.scratch.visible_mask[target];
            if !endpoint_visible && !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let base = edge.color.unwrap_or(EDGE_COLOR);
            let mut width = edge_width(edge.weight, transform.scale);
            let color = match highlight {
                Some(set) if set.contains_edge(index) => {
                    width *= 1.0 + fade_value * 0.6;
                    blend_color(base, HIGHLIGHT_EDGE_COLOR, fade_value)
                }
                Some(_) => dim_color(base, 1.0 - fade_value * 0.5),
                None => base,
            };
            painter.line_segment([start, end], Stroke::new(width, color));
            visible_edge_count += 1;
        }
        self.visible_edge_count = visible_edge_count;

        Self::draw_order_into(
            graph,
            &self.scratch.visible_indices,
            &mut self.scratch.draw_order,
        );
        for &index in &self.scratch.draw_order {
            let Some(node) = graph.node(index) else {
                continue;
            };
            let position = self.scratch.screen_positions[index];
            let radius = self.scratch.screen_radii[index];
            let is_selected = self.selected == Some(index);
            let is_hovered = hovered == Some(index);
            let is_highlighted = highlight.is_some_and(|set| set.contains_node(index));
            let is_search_match = self.scratch.search_mask.get(index).copied().unwrap_or(false);

            let color = if is_highlighted {
                brighter(node.color, 0.6 * fade_value)
            } else if highlight.is_some() {
                dim_color(node.color, 1.0 - fade_value * 0.45)
            } else if search_active && !is_search_match {
                dim_color(node.color, 0.62)
            } else {
                node.color
            };

            painter.circle_filled(position, radius, color);
            painter.circle_stroke(position, radius, Stroke::new(1.5, NODE_OUTLINE));
            if is_search_match {
                painter.circle_stroke(position, radius + 3.0, Stroke::new(1.8, SEARCH_COLOR));
            }
            if is_selected {
                painter.circle_stroke(position, radius + 5.0, Stroke::new(2.2, SELECTED_COLOR));
            }

            let should_draw_label = is_hovered
                || is_selected
                || is_highlighted
                || is_search_match
                || zoom.labels_visible(transform.scale, node.is_parent());
            if should_draw_label {
                painter.text(
                    position + vec2(radius + 4.0, 0.0),
                    Align2::LEFT_CENTER,
                    &node.name,
                    FontId::proportional(12.0),
                    Color32::from_gray(40),
                );
            }
        }

        if let Some(node) = hovered.and_then(|index| graph.node(index)) {
            let level = node
                .level()
                .map_or_else(|| "-".to_owned(), |level| level.to_string());
            let panel_text = format!(
                "{}  |  id {}  |  children {}  |  level {}",
                node.name,
                node.id(),
                node.child_count(),
                level
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(30),
            );
        }

        let animating = self.session.simulation().state() == SimulationState::Running
            || self.session.zoom().is_animating()
            || self.session.highlight().is_animating();
        if animating || response.dragged() {
            ui.ctx().request_repaint();
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            self.apply_graph_selection(hovered);
        }
    }
}
