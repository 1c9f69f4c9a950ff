use std::sync::Arc;
use std::time::Duration;

use calculator_core::session::CalculationStatus;
use calculator_core::{BridgeInvoker, CalculationBackend, CalculatorSession, RowId};
use egui::{Color32, Context, RichText, TextEdit, TextStyle};
use tracing::{info, warn};

use crate::config::CalculatorConfig;

const STATUS_OK: Color32 = Color32::from_rgb(40, 150, 80);
const STATUS_WARN: Color32 = Color32::from_rgb(190, 140, 20);
const STATUS_ERR: Color32 = Color32::from_rgb(200, 60, 60);

const NAME_FIELD_WIDTH: f32 = 180.0;
const QUANTITY_FIELD_WIDTH: f32 = 70.0;
const INVENTORY_PANEL_HEIGHT: f32 = 170.0;
const LISTS_PANEL_WIDTH: f32 = 320.0;

/// Rows every session starts with. Inventory is never persisted.
const STARTER_ROWS: &[(&str, &str)] = &[("铁锭", "10"), ("青铜锭", "20")];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StatusKind {
    Ok,
    Warning,
    Error,
}

#[derive(Clone, Debug)]
struct StatusLine {
    kind: StatusKind,
    message: String,
}

impl StatusLine {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Ok,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Warning,
            message: message.into(),
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    fn color(&self) -> Color32 {
        match self.kind {
            StatusKind::Ok => STATUS_OK,
            StatusKind::Warning => STATUS_WARN,
            StatusKind::Error => STATUS_ERR,
        }
    }
}

pub struct CalculatorApp {
    config: CalculatorConfig,
    session: CalculatorSession,
    bridge: Arc<BridgeInvoker>,
    bridge_available: bool,
}

impl CalculatorApp {
    pub fn new(config: CalculatorConfig) -> Self {
        let bridge = Arc::new(BridgeInvoker::resolve(config.bridge_path.as_deref()));
        let bridge_available = bridge.is_available();
        if bridge_available {
            info!(path = %bridge.path().display(), "bridge located");
        } else {
            warn!(path = %bridge.path().display(), "bridge not found");
        }
        let mut session = CalculatorSession::new(
            config.target_item.clone(),
            config.target_quantity.clone(),
        );
        for (name, quantity) in STARTER_ROWS {
            session.add_row(*name, *quantity);
        }
        Self {
            config,
            session,
            bridge,
            bridge_available,
        }
    }

    pub fn save_config(&mut self) {
        self.config.target_item = self.session.target_item.clone();
        self.config.target_quantity = self.session.target_quantity.clone();
        if let Err(err) = self.config.save() {
            warn!("config save failed: {}", err);
        }
    }

    fn calculate(&mut self) {
        let backend: Arc<dyn CalculationBackend> = self.bridge.clone();
        if let Err(err) = self.session.calculate(backend) {
            warn!("calculate ignored: {}", err);
        }
    }

    pub fn ui(&mut self, ctx: &Context) {
        if self.session.poll() {
            self.bridge_available = self.bridge.is_available();
        }
        let modal_open = self.session.dialog().is_some();

        egui::TopBottomPanel::top("target").show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| self.ui_target(ui));
        });
        egui::TopBottomPanel::top("inventory")
            .resizable(true)
            .default_height(INVENTORY_PANEL_HEIGHT)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!modal_open, |ui| self.ui_inventory(ui));
            });
        egui::TopBottomPanel::bottom("bridge").show(ctx, |ui| self.ui_bridge_info(ui));
        egui::SidePanel::right("lists")
            .resizable(true)
            .default_width(LISTS_PANEL_WIDTH)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!modal_open, |ui| self.ui_lists(ui));
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| {
                ui.label("Synthesis tree");
                output_pane(ui, "tree_output", &self.session.panes().tree);
            });
        });

        if modal_open {
            self.ui_dialog(ctx);
        }
    }

    fn ui_target(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.label("Target item:");
            ui.add(TextEdit::singleline(&mut self.session.target_item).desired_width(220.0));
            ui.label("Quantity:");
            ui.add(
                TextEdit::singleline(&mut self.session.target_quantity)
                    .desired_width(QUANTITY_FIELD_WIDTH),
            );
            let calculate = ui.add_enabled(
                self.session.can_calculate(),
                egui::Button::new(RichText::new("Run calculation").strong()),
            );
            if calculate.clicked() {
                self.calculate();
            }
            let status = self.status_line();
            ui.colored_label(status.color(), status.message);
        });
        ui.add_space(4.0);
    }

    fn ui_inventory(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("Current inventory ({} rows)", self.session.inventory().len()));
            if ui.button("+ Add item").clicked() {
                self.session.inventory_mut().add_empty_row();
            }
        });
        ui.separator();
        let mut remove: Option<RowId> = None;
        egui::ScrollArea::vertical()
            .id_source("inventory_rows")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("inventory_grid")
                    .num_columns(3)
                    .spacing([6.0, 4.0])
                    .show(ui, |ui| {
                        for (id, row) in self.session.inventory_mut().iter_mut() {
                            ui.add(
                                TextEdit::singleline(&mut row.name)
                                    .hint_text("item name")
                                    .desired_width(NAME_FIELD_WIDTH),
                            );
                            ui.add(
                                TextEdit::singleline(&mut row.quantity)
                                    .desired_width(QUANTITY_FIELD_WIDTH),
                            );
                            let delete = ui.add(
                                egui::Button::new(RichText::new(" ✖ ").color(STATUS_ERR))
                                    .frame(false),
                            );
                            if delete.on_hover_text("Remove row").clicked() {
                                remove = Some(id);
                            }
                            ui.end_row();
                        }
                    });
            });
        if let Some(id) = remove {
            self.session.remove_row(id);
        }
    }

    fn ui_lists(&self, ui: &mut egui::Ui) {
        let half = (ui.available_height() / 2.0 - 24.0).max(60.0);
        ui.label("Base material shortfall");
        ui.allocate_ui(egui::vec2(ui.available_width(), half), |ui| {
            output_pane(ui, "base_materials_output", &self.session.panes().base_materials);
        });
        ui.separator();
        ui.label("Level production list");
        output_pane(ui, "level_tasks_output", &self.session.panes().level_tasks);
    }

    fn ui_bridge_info(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.bridge_available {
                ui.colored_label(STATUS_OK, "Bridge:");
            } else {
                ui.colored_label(STATUS_ERR, "Bridge missing:");
            }
            ui.small(self.bridge.path().display().to_string());
        });
        if let Some(path) = self.config.bridge_path.as_deref() {
            ui.small(format!("Configured override: {}", path));
        }
    }

    fn ui_dialog(&mut self, ctx: &Context) {
        let Some(dialog) = self.session.dialog().cloned() else {
            return;
        };
        let screen = ctx.screen_rect();
        ctx.layer_painter(egui::LayerId::new(
            egui::Order::Middle,
            egui::Id::new("dialog_backdrop"),
        ))
        .rect_filled(screen, 0.0, Color32::from_black_alpha(110));
        let mut dismissed = false;
        egui::Window::new(dialog.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.set_max_width(420.0);
                ui.label(dialog.message.as_str());
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });
        let confirmed = ctx.input(|input| {
            input.key_pressed(egui::Key::Enter) || input.key_pressed(egui::Key::Escape)
        });
        if dismissed || confirmed {
            self.session.dismiss_dialog();
        }
    }

    fn status_line(&self) -> StatusLine {
        match self.session.status() {
            CalculationStatus::Idle if !self.bridge_available => {
                StatusLine::err("Calculation component not found.")
            }
            CalculationStatus::Idle => StatusLine::ok("Ready."),
            CalculationStatus::Running { started } => StatusLine::warn(format!(
                "Calculating ({}).",
                format_duration(started.elapsed())
            )),
            CalculationStatus::Succeeded { elapsed } => {
                StatusLine::ok(format!("Done in {}.", format_duration(*elapsed)))
            }
            CalculationStatus::Failed { elapsed, .. } => {
                StatusLine::err(format!("Failed after {}.", format_duration(*elapsed)))
            }
        }
    }
}

fn output_pane(ui: &mut egui::Ui, id: &str, text: &str) {
    egui::ScrollArea::both()
        .id_source(id)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let mut view = text;
            ui.add(
                TextEdit::multiline(&mut view)
                    .font(TextStyle::Monospace)
                    .desired_width(f32::INFINITY)
                    .desired_rows(8),
            );
        });
}

fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f32();
    format!("{:.1}s", seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_use_one_decimal() {
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.2s");
        assert_eq!(format_duration(Duration::ZERO), "0.0s");
    }

    #[test]
    fn missing_bridge_shows_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = CalculatorConfig {
            bridge_path: Some(dir.path().join("bridge").display().to_string()),
            ..CalculatorConfig::default()
        };
        let app = CalculatorApp::new(config);
        assert!(!app.bridge_available);
        let status = app.status_line();
        assert_eq!(status.kind, StatusKind::Error);
    }

    #[test]
    fn session_starts_from_config_targets() {
        let config = CalculatorConfig {
            target_item: "Chair".to_string(),
            target_quantity: "4".to_string(),
            ..CalculatorConfig::default()
        };
        let app = CalculatorApp::new(config);
        assert_eq!(app.session.target_item, "Chair");
        assert_eq!(app.session.target_quantity, "4");
    }

    #[test]
    fn session_starts_with_starter_rows() {
        let app = CalculatorApp::new(CalculatorConfig::default());
        let request = app.session.current_request();
        assert_eq!(request.inventory_json(), r#"{"铁锭":10.0,"青铜锭":20.0}"#);
        assert_eq!(app.session.inventory().len(), STARTER_ROWS.len());
    }
}
