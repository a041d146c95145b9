use eframe::egui::{self, Align, Context, Layout, Pos2, Vec2};
use orbit_layout::LayoutSession;
use orbit_layout::physics::QuadtreeCell;
use orbit_layout::search::NodeSearch;

mod controls;
mod interaction;
mod render_utils;
mod view;

pub struct OrbitApp {
    model: ViewModel,
}

struct ViewModel {
    session: LayoutSession,
    search: NodeSearch,
    query: String,
    selected: Option<usize>,
    live_physics: bool,
    show_quadtree_overlay: bool,
    batch_size: usize,
    status: Option<String>,
    visible_node_count: usize,
    visible_edge_count: usize,
    scratch: ViewScratch,
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    visible_indices: Vec<usize>,
    visible_mask: Vec<bool>,
    draw_order: Vec<usize>,
    search_mask: Vec<bool>,
    quadtree_positions: Vec<Vec2>,
    quadtree_cells: Vec<QuadtreeCell>,
}

impl OrbitApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, session: LayoutSession) -> Self {
        Self {
            model: ViewModel::new(session),
        }
    }
}

impl ViewModel {
    fn new(session: LayoutSession) -> Self {
        Self {
            session,
            search: NodeSearch::new(),
            query: String::new(),
            selected: None,
            live_physics: true,
            show_quadtree_overlay: false,
            batch_size: 5,
            status: None,
            visible_node_count: 0,
            visible_edge_count: 0,
            scratch: ViewScratch::default(),
        }
    }

    fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("orbit-layout");
                    ui.separator();
                    let graph = self.session.graph();
                    ui.label(format!("nodes: {}", graph.len()));
                    ui.label(format!("edges: {}", graph.edges().len()));
                    let simulation = self.session.simulation();
                    ui.label(format!("state: {:?}", simulation.state()));
                    ui.label(format!("alpha: {:.3}", simulation.alpha()));
                    ui.label(format!("ticks: {}", simulation.ticks()));
                    if let Some(remaining) = simulation
                        .estimated_ticks_remaining()
                        .filter(|&remaining| remaining > 0)
                    {
                        ui.label(format!("settles in ~{remaining} ticks"));
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("zoom {:.2}", self.session.transform().scale));
                        ui.label(format!(
                            "visible: {} nodes / {} edges",
                            self.visible_node_count, self.visible_edge_count
                        ));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }
}

impl eframe::App for OrbitApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.model.show(ctx);
    }
}
