use eframe::egui::{self, Key, Response, Ui};
use orbit_layout::simulation::SimulationState;
use tracing::warn;

use super::ViewModel;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;
const MAX_BATCH: usize = 50;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

fn default_slider_key_step(min: f32, max: f32) -> f32 {
    ((max - min) / 200.0).max(0.0005)
}

/// Holding an arrow key on a focused slider moves it faster the longer it is held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    min: f32,
    max: f32,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let step = default_slider_key_step(min, max);
    let old_value = *value;
    *value = (*value + direction as f32 * step * speed * delta_time).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f32::EPSILON
}

fn knob(ui: &mut Ui, value: &mut f32, min: f32, max: f32, label: &str, hint: &str) -> bool {
    let slider = ui
        .add(
            egui::Slider::new(&mut *value, min..=max)
                .text(label)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hint);
    if slider.hovered() {
        slider.request_focus();
    }
    let mut changed = slider.changed();
    changed |= apply_slider_arrow_acceleration(ui, &slider, value, min, max);
    changed
}

impl ViewModel {
    pub(super) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Layout Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search")
            .on_hover_text("Fuzzy-highlight nodes whose name or id matches.");
        ui.text_edit_singleline(&mut self.query);
        if let Some(best) = self.search.best(self.session.graph(), &self.query)
            && ui.button("Focus best match").clicked()
        {
            self.apply_graph_selection(Some(best));
        }

        ui.separator();
        let was_live = self.live_physics;
        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Pause halts the simulation where it is; resuming reheats it.");
        if was_live != self.live_physics {
            if self.live_physics {
                self.session.reheat();
            } else {
                self.session.simulation_mut().halt();
            }
        }
        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay");

        ui.separator();
        ui.label("Forces");
        let mut forces = self.session.config().forces;
        let mut forces_changed = false;
        forces_changed |= knob(
            ui,
            &mut forces.link_distance,
            10.0,
            200.0,
            "Link distance",
            "Rest length of a link before weighting.",
        );
        forces_changed |= knob(
            ui,
            &mut forces.link_strength,
            0.05,
            2.0,
            "Link strength",
            "Spring stiffness, divided by the target's child count.",
        );
        forces_changed |= knob(
            ui,
            &mut forces.charge_strength,
            -600.0,
            -10.0,
            "Charge",
            "Many-body repulsion; parents and the root repel harder.",
        );
        forces_changed |= knob(
            ui,
            &mut forces.collision_strength,
            0.0,
            1.0,
            "Collision",
            "How much of an overlap is resolved per tick.",
        );
        forces_changed |= knob(
            ui,
            &mut forces.gravity_strength,
            0.0,
            0.2,
            "Gravity",
            "Pull of every node toward the center.",
        );
        if forces_changed && let Err(error) = self.session.update_forces(forces) {
            warn!(%error, "rejected force parameters");
            self.status = Some(error.to_string());
        }

        let mut velocity_decay = self.session.config().simulation.velocity_decay;
        if knob(
            ui,
            &mut velocity_decay,
            0.05,
            0.9,
            "Velocity decay",
            "Friction applied to every node each tick.",
        ) {
            self.session.set_velocity_decay(velocity_decay);
        }

        ui.separator();
        ui.label("Grow");
        ui.add(egui::Slider::new(&mut self.batch_size, 1..=MAX_BATCH).text("Batch size"));
        ui.horizontal_wrapped(|ui| {
            let target = if self.selected.is_some() {
                "Add to selected"
            } else {
                "Add nodes"
            };
            if ui
                .button(target)
                .on_hover_text("Without a selection the parent is picked at random.")
                .clicked()
            {
                let parent = self
                    .selected
                    .and_then(|index| self.session.graph().node(index))
                    .map(|node| node.id().clone());
                let result = self.session.add_nodes(parent.as_ref(), self.batch_size);
                self.report(result.map(|added| format!("added {} nodes", added.nodes.len())));
            }
            if ui.button("Add links").clicked() {
                let result = self.session.add_links(self.batch_size);
                self.report(result.map(|added| format!("added {} links", added.edges.len())));
            }
        });

        ui.separator();
        ui.horizontal_wrapped(|ui| {
            if ui.button("Fit graph").clicked() {
                self.session.fit_to_graph(40.0);
            }
            if ui.button("Reheat").clicked() {
                self.live_physics = true;
                self.session.reheat();
            }
        });

        if let Some(status) = &self.status {
            ui.add_space(6.0);
            ui.label(status.as_str());
        }
    }

    fn report(&mut self, result: Result<String, orbit_layout::LayoutError>) {
        match result {
            Ok(message) => {
                self.live_physics = self.session.simulation().state() != SimulationState::Halted;
                self.status = Some(message);
            }
            Err(error) => {
                warn!(%error, "graph update failed");
                self.status = Some(error.to_string());
            }
        }
    }
}
