use arboard::Clipboard;
use gridsim::config::{Config, CONFIG_PATH};
use gridsim::generation::Algorithm;
use gridsim::grid::{Position, Terrain};
use gridsim::{telemetry, Simulation};
use macroquad::prelude::*;
use tracing::{error, info, warn};

const PANEL_HEIGHT: f32 = 130.0;

/// Visualization state
struct DemoState {
    config: Config,
    sim: Simulation,
    show_fog: bool,
    /// Milliseconds since the last simulation step, for move animation
    since_step_ms: f64,
}

impl DemoState {
    fn new(config: Config) -> Result<Self, gridsim::GridError> {
        let sim = Simulation::new(config.generation_params(), config.simulation_settings())?;
        let show_fog = config.visual.show_fog;
        Ok(DemoState {
            config,
            sim,
            show_fog,
            since_step_ms: 0.0,
        })
    }

    fn cell_size(&self) -> f32 {
        self.config.grid.cell_size
    }

    fn regenerate(&mut self, algorithm: Option<Algorithm>) {
        if let Some(algorithm) = algorithm {
            self.sim.params_mut().algorithm = algorithm;
        }
        if let Err(e) = self.sim.regenerate() {
            error!("regeneration failed: {}", e);
        }
        self.since_step_ms = 0.0;
    }

    fn cell_under_mouse(&self) -> Option<Position> {
        let (mouse_x, mouse_y) = mouse_position();
        let pos = Position::new(
            (mouse_x / self.cell_size()).floor() as i32,
            (mouse_y / self.cell_size()).floor() as i32,
        );
        self.sim.grid().contains(pos).then_some(pos)
    }

    fn handle_input(&mut self) {
        if is_mouse_button_pressed(MouseButton::Left) {
            if let Some(pos) = self.cell_under_mouse() {
                if let Err(e) = self.sim.toggle_wall(pos) {
                    warn!("{}", e);
                }
            }
        } else if is_mouse_button_pressed(MouseButton::Right) {
            if let Some(pos) = self.cell_under_mouse() {
                if let Err(e) = self.sim.move_goal(0, pos) {
                    warn!("{}", e);
                }
            }
        }

        let algorithm_keys = [
            (KeyCode::Key1, Algorithm::RecursiveBacktracker),
            (KeyCode::Key2, Algorithm::Prim),
            (KeyCode::Key3, Algorithm::RecursiveDivision),
            (KeyCode::Key4, Algorithm::DiamondSquare),
            (KeyCode::Key5, Algorithm::Open),
        ];
        for (key, algorithm) in algorithm_keys {
            if is_key_pressed(key) {
                self.regenerate(Some(algorithm));
            }
        }

        if is_key_pressed(KeyCode::G) {
            self.regenerate(None);
        }

        if is_key_pressed(KeyCode::Space) {
            if self.sim.is_running() {
                self.sim.stop();
            } else {
                self.sim.start();
            }
        }

        let speed = self.sim.settings().speed;
        if is_key_pressed(KeyCode::Equal) || is_key_pressed(KeyCode::KpAdd) {
            self.sim.set_speed(speed + 1);
        }
        if is_key_pressed(KeyCode::Minus) || is_key_pressed(KeyCode::KpSubtract) {
            self.sim.set_speed(speed.saturating_sub(1));
        }

        if is_key_pressed(KeyCode::F) {
            self.show_fog = !self.show_fog;
        }

        if is_key_pressed(KeyCode::C) {
            self.copy_to_clipboard();
        }
    }

    fn update(&mut self, frame_ms: f64) {
        let effects = self.sim.step_simulation(frame_ms);
        if effects.is_empty() {
            self.since_step_ms += frame_ms;
        } else {
            self.since_step_ms = 0.0;
        }
    }

    fn copy_to_clipboard(&self) {
        let grid_string = self.sim.render_ascii();
        match Clipboard::new() {
            Ok(mut clipboard) => {
                if let Err(e) = clipboard.set_text(&grid_string) {
                    warn!("failed to copy to clipboard: {}", e);
                } else {
                    info!("grid layout copied to clipboard");
                    // Keep clipboard alive for a moment to ensure clipboard managers can capture it
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
            Err(e) => {
                warn!("failed to access clipboard: {}", e);
            }
        }
    }

    fn cell_color(&self, pos: Position) -> Color {
        let grid = self.sim.grid();
        if grid.is_wall_at(pos) {
            return Color::from_rgba(180, 60, 60, 255);
        }
        let terrain = grid.cell(pos).map(|c| c.terrain).unwrap_or_default();
        match terrain {
            Terrain::Elevation(h) if self.config.visual.shade_terrain => {
                let shade = (40.0 + h * 1.8) as u8;
                Color::from_rgba(shade / 2, shade, shade / 3, 255)
            }
            Terrain::Color([r, g, b]) if self.config.visual.shade_terrain => Color::from_rgba(r, g, b, 255),
            _ => Color::from_rgba(70, 70, 70, 255),
        }
    }

    fn draw(&self) {
        let vis = &self.config.visual;
        clear_background(Color::from_rgba(vis.background_r, vis.background_g, vis.background_b, 255));

        let grid = self.sim.grid();
        let size = self.cell_size();
        let knowledge = self.sim.agent(0).and_then(|c| c.knowledge());

        for y in 0..grid.rows {
            for x in 0..grid.cols {
                let pos = Position::new(x, y);
                let px = x as f32 * size;
                let py = y as f32 * size;
                draw_rectangle(px, py, size - 1.0, size - 1.0, self.cell_color(pos));

                if let (true, Some(k)) = (self.show_fog, knowledge) {
                    if !k.is_seen(pos) {
                        draw_rectangle(px, py, size - 1.0, size - 1.0, Color::from_rgba(0, 0, 0, 200));
                    } else if !k.is_visible(pos) {
                        draw_rectangle(px, py, size - 1.0, size - 1.0, Color::from_rgba(0, 0, 0, 90));
                    }
                }
            }
        }

        for item in self.sim.items().iter() {
            let cx = (item.x as f32 + 0.5) * size;
            let cy = (item.y as f32 + 0.5) * size;
            draw_circle(cx, cy, size * 0.15, GOLD);
        }

        let snapshot: Vec<Position> = self.sim.agents().iter().map(|c| c.agent.position).collect();
        let progress = (self.since_step_ms / self.sim.clock().step_interval_ms()) as f32;

        for controller in self.sim.agents() {
            if let Some(path) = controller.path() {
                for cell in path.remaining() {
                    let cx = (cell.x as f32 + 0.5) * size;
                    let cy = (cell.y as f32 + 0.5) * size;
                    draw_circle(cx, cy, size * 0.12, SKYBLUE);
                }
            }
            if let Some(goal) = controller.current_goal(&snapshot) {
                let gx = goal.x as f32 * size;
                let gy = goal.y as f32 * size;
                draw_rectangle_lines(gx + 2.0, gy + 2.0, size - 5.0, size - 5.0, 3.0, GREEN);
            }

            let (ax, ay) = controller.agent.interpolated(progress);
            draw_circle((ax + 0.5) * size, (ay + 0.5) * size, size * 0.35, BLUE);
        }

        self.draw_panel(grid.rows as f32 * size);
    }

    fn draw_panel(&self, top: f32) {
        let params = self.sim.params();
        let mut lines = vec![format!(
            "{} {}x{}  density {:.2}  speed {}  step {}{}",
            params.algorithm.name(),
            params.cols,
            params.rows,
            params.wall_density,
            self.sim.settings().speed,
            self.sim.steps(),
            if self.sim.is_running() { "" } else { "  [paused]" },
        )];
        if let Some(c) = self.sim.agent(0) {
            let energy = if c.agent.energy.is_finite() {
                format!("{:.1}", c.agent.energy)
            } else {
                "inf".to_string()
            };
            lines.push(format!(
                "agent {:?}  at {}  energy {}  items {}  goals reached {}",
                c.state(),
                c.agent.position,
                energy,
                c.agent.inventory,
                c.reached().len()
            ));
        }
        lines.push("1-5: algorithm  G: regenerate  Space: pause  +/-: speed  F: fog  C: copy".to_string());
        lines.push("Left click: toggle wall  Right click: move goal  Esc: quit".to_string());

        for (i, line) in lines.iter().enumerate() {
            draw_text(line, 10.0, top + 24.0 + i as f32 * 24.0, 20.0, WHITE);
        }
    }
}

fn window_conf() -> Conf {
    // Runs before logging is up; main reports how the file was loaded
    let (config, _) = Config::load_or_default(CONFIG_PATH);
    Conf {
        window_title: config.visual.window_title.clone(),
        window_width: (config.grid.cols as f32 * config.grid.cell_size) as i32,
        window_height: (config.grid.rows as f32 * config.grid.cell_size + PANEL_HEIGHT) as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let (config, source) = Config::load_or_default(CONFIG_PATH);
    telemetry::init(&config.logging.filter);
    source.log();

    let mut state = match DemoState::new(config) {
        Ok(state) => state,
        Err(e) => {
            error!("cannot start demo: {}", e);
            return;
        }
    };

    loop {
        state.handle_input();

        // Close window on Escape
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        state.update(get_frame_time() as f64 * 1000.0);
        state.draw();

        next_frame().await
    }
}
