use crate::app::AppState;
use egui::Context;

/// Side panel with frame stats and the damping settings. F1 toggles it.
pub fn draw_panel(ctx: &Context, state: &mut AppState) {
    if !state.show_panel {
        return;
    }

    let stats = state.render_loop.stats();
    egui::SidePanel::left("stats")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("glyphfield");
            ui.separator();
            ui.label(format!("Frames: {}", stats.frames));
            ui.label(format!("Meshes: {}", state.scene().len()));
            ui.label(format!(
                "Draw calls: {}  Instances: {}",
                state.last_report.draw_calls, state.last_report.instances
            ));
            let (w, h) = state.viewport.size();
            ui.label(format!(
                "Viewport: {w}x{h} @ {:.1}x",
                state.viewport.pixel_ratio()
            ));
            ui.label(&state.status);
            ui.separator();

            let p = state.camera.position;
            let t = state.controls.target;
            ui.label(format!("Camera: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
            ui.label(format!("Target: ({:.2}, {:.2}, {:.2})", t.x, t.y, t.z));
            ui.checkbox(&mut state.controls.enable_damping, "Damping");
            ui.add_enabled(
                state.controls.enable_damping,
                egui::Slider::new(&mut state.controls.damping_factor, 0.01..=1.0).text("factor"),
            );
            if ui.button("Reset camera").clicked() {
                state.reset_camera();
            }

            ui.separator();
            ui.small("F1: Toggle panel | LMB: Orbit | RMB: Pan | Wheel: Zoom");
        });
}
