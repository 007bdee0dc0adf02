//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┬────┐
//! │ SCORE 12  BEST 40  DIST 33  X1.5            GESTURES     │ W  │
//! │                                                          │ R  │
//! │        ▓▓                     ██                         │ I  │
//! │   [runner]   · · particles    ██ obstacle                │ S  │
//! │════════════════════════════════════ ground ══════════════│ T  │
//! │ status / notice                                          │    │
//! │ key legend                                               │    │
//! └──────────────────────────────────────────────────────────┴────┘
//! ```
//!
//! All drawing goes through [`Canvas`], which has no window attached, so a
//! frame can be rendered headless. [`Visualizer`] owns the window, reads the
//! keyboard and forwards the simulated arm posture to the pose source.

use minifb::{Key, KeyRepeat, Window, WindowOptions};
use runner_physics::{ObstacleKind, PLAYER_SIZE, PLAYER_X};

use crate::session::{GameSession, PauseReason, SessionPhase, Snapshot};
use crate::source::{SimArm, SimInput, SimLink};
use gesture_engine::{CalibrationPhase, Gesture};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const METER_W:        usize = 36;
const GROUND_MARGIN:  usize = 70;
const HUD_Y:          isize = 10;
const BG_COLOR:       u32   = 0xFF1A1A2E;
const SLOW_BG:        u32   = 0xFF231A3A;
const GROUND_COLOR:   u32   = 0xFF3A506B;
const PLAYER_COLOR:   u32   = 0xFF5BC0EB;
const HIT_COLOR:      u32   = 0xFFE63946;
const HIGH_COLOR:     u32   = 0xFFF4A261;
const LOW_COLOR:      u32   = 0xFFE9C46A;
const PARTICLE_COLOR: u32   = 0xFFFFD700;
const TEXT_COLOR:     u32   = 0xFFEEEEEE;
const DIM_TEXT:       u32   = 0xFF888888;
const PANEL_BG:       u32   = 0xFF0F3460;
const IDLE_LINE:      u32   = 0xFF2A9D8F;
const JUMP_LINE:      u32   = 0xFFE76F51;
/// How long a fired gesture stays highlighted in the HUD.
const GESTURE_FLASH_MS: f64 = 400.0;

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// ARGB framebuffer with clipped drawing primitives.
pub struct Canvas {
    width:  usize,
    height: usize,
    buf:    Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { width, height, buf: vec![BG_COLOR; width * height] }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    pub fn clear(&mut self, color: u32) { self.buf.fill(color); }

    pub fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    pub fn fill_rect(&mut self, x: isize, y: isize, w: usize, h: usize, color: u32) {
        let x0 = x.clamp(0, self.width as isize) as usize;
        let y0 = y.clamp(0, self.height as isize) as usize;
        let x1 = (x + w as isize).clamp(0, self.width as isize) as usize;
        let y1 = (y + h as isize).clamp(0, self.height as isize) as usize;
        for row in y0..y1 {
            self.buf[row * self.width + x0..row * self.width + x1.max(x0)].fill(color);
        }
    }

    pub fn draw_border(&mut self, x: isize, y: isize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 {
            return;
        }
        let (w, h) = (w as isize, h as isize);
        for col in x..x + w {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..y + h {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    /// Circle outline; the first `progress` of it (clockwise from 12
    /// o'clock) in `color`, the rest in `track`.
    pub fn draw_ring(&mut self, cx: isize, cy: isize, radius: f32, progress: f32, color: u32, track: u32) {
        let steps = (radius * 8.0).max(16.0) as usize;
        let lit = (progress.clamp(0.0, 1.0) * steps as f32).round() as usize;
        for i in 0..steps {
            let a = i as f32 / steps as f32 * std::f32::consts::TAU;
            let c = if i < lit { color } else { track };
            for r in [radius - 1.0, radius, radius + 1.0] {
                let x = cx + (a.sin() * r).round() as isize;
                let y = cy - (a.cos() * r).round() as isize;
                self.set_pixel(x, y, c);
            }
        }
    }

    /// 3×5 bitmap text, each font pixel drawn as a `scale`×`scale` block.
    pub fn draw_text(&mut self, text: &str, x: isize, y: isize, scale: usize, color: u32) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        let px = cx + (col * scale) as isize;
                        let py = y + (row * scale) as isize;
                        self.fill_rect(px, py, scale, scale, color);
                    }
                }
            }
            cx += (4 * scale) as isize;
            if cx >= self.width as isize { break; }
        }
    }

    pub fn text_width(text: &str, scale: usize) -> usize {
        (text.chars().count() * 4 * scale.max(1)).saturating_sub(scale.max(1))
    }

    fn draw_text_centered(&mut self, text: &str, cy: isize, scale: usize, color: u32) {
        let x = (self.width as isize - Canvas::text_width(text, scale) as isize) / 2;
        self.draw_text(text, x, cy, scale, color);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Scene
// ════════════════════════════════════════════════════════════════════════════

/// Maps stage units (x right, y up from the ground) onto the canvas.
#[derive(Clone, Copy, Debug)]
struct StageView {
    scale:    f32,
    ground_y: isize,
    shake_x:  f32,
}

impl StageView {
    fn new(canvas: &Canvas, stage_width: f32, shake_x: f32) -> Self {
        let play_w = canvas.width().saturating_sub(METER_W) as f32;
        StageView {
            scale:    if stage_width > 0.0 { play_w / stage_width } else { 1.0 },
            ground_y: canvas.height().saturating_sub(GROUND_MARGIN) as isize,
            shake_x,
        }
    }

    fn x(&self, x: f32) -> isize { ((x + self.shake_x) * self.scale).round() as isize }

    /// Canvas row of the top edge of something `height` tall standing at `y`.
    fn top(&self, y: f32, height: f32) -> isize {
        self.ground_y - ((y + height) * self.scale).round() as isize
    }

    fn len(&self, v: f32) -> usize { (v * self.scale).round().max(1.0) as usize }
}

/// Render one frame of `session` into `canvas`.
pub fn draw_scene(canvas: &mut Canvas, session: &GameSession, stage_width: f32, now_ms: f64, status: &str) {
    let snap = session.snapshot();
    canvas.clear(if snap.slow_motion { SLOW_BG } else { BG_COLOR });
    let view = StageView::new(canvas, stage_width, snap.shake_x);
    let play_w = canvas.width().saturating_sub(METER_W);

    // ── Ground with scrolling dashes ──────────────────────────────────────
    canvas.fill_rect(0, view.ground_y, play_w, 3, GROUND_COLOR);
    let dash = 40.0;
    let offset = snap.world_x % dash;
    let mut gx = -offset;
    while gx < stage_width {
        canvas.fill_rect(view.x(gx), view.ground_y + 8, view.len(14.0), 2, GROUND_COLOR);
        gx += dash;
    }

    // ── Obstacles ─────────────────────────────────────────────────────────
    for o in session.obstacles() {
        let color = match o.kind {
            ObstacleKind::High => HIGH_COLOR,
            ObstacleKind::Low  => LOW_COLOR,
        };
        let r = o.rect();
        canvas.fill_rect(view.x(r.x), view.top(r.y, r.height), view.len(r.width), view.len(r.height), color);
    }

    // ── Particles ─────────────────────────────────────────────────────────
    for p in session.particles() {
        let c = blend(BG_COLOR, PARTICLE_COLOR, p.life.clamp(0.0, 1.0));
        canvas.fill_rect(view.x(p.x), view.top(p.y, 0.0), 3, 3, c);
    }

    // ── Runner ────────────────────────────────────────────────────────────
    let body = if snap.hit_flash { HIT_COLOR } else { PLAYER_COLOR };
    let (px, py) = (view.x(PLAYER_X), view.top(snap.player.y, PLAYER_SIZE));
    let size = view.len(PLAYER_SIZE);
    canvas.fill_rect(px, py, size, size, body);
    canvas.draw_border(px, py, size, size, blend(body, 0xFF000000, 0.4));

    draw_hud(canvas, &snap, now_ms);
    draw_wrist_meter(canvas, &snap);

    match snap.phase {
        SessionPhase::Calibrating => draw_calibration(canvas, &snap),
        SessionPhase::Paused(reason) => {
            let hint = match reason {
                PauseReason::CameraLost      => "MOVE INTO VIEW OR PRESS P TO RESUME",
                PauseReason::UnexpectedError => "P = RESUME   R = RESTART",
            };
            draw_overlay(canvas, &format!("PAUSED - {}", reason.label()), hint);
        }
        SessionPhase::GameOver => {
            let line = format!("SCORE {}   BEST {}", snap.score.score.floor() as u32, snap.score.high_score);
            draw_overlay(canvas, "GAME OVER", &line);
            canvas.draw_text_centered("R = PLAY AGAIN   C = RECALIBRATE", canvas.height() as isize / 2 + 40, 1, DIM_TEXT);
        }
        SessionPhase::Running => {}
    }

    // ── Status bar + key legend ───────────────────────────────────────────
    let status_y = canvas.height() as isize - 36;
    canvas.fill_rect(0, status_y, play_w, 36, PANEL_BG);
    canvas.draw_text(status, 10, status_y + 8, 1, TEXT_COLOR);
    canvas.draw_text(
        "M=INPUT SPACE=JUMP F=FLAP  J/W/X=ARM UP/WAVE/HIDE Z=STALL  P=RESUME R=REPLAY C=CALIBRATE S=SKIP Q=QUIT",
        10, status_y + 22, 1, DIM_TEXT,
    );
}

fn draw_hud(canvas: &mut Canvas, snap: &Snapshot, now_ms: f64) {
    let hud = format!(
        "SCORE {}  BEST {}  DIST {}  X{:.1}",
        snap.score.score.floor() as u32,
        snap.score.high_score,
        snap.score.distance,
        snap.combo,
    );
    canvas.draw_text(&hud, 10, HUD_Y, 2, TEXT_COLOR);

    let mode = if snap.manual_input { "KEYBOARD" } else { "GESTURES" };
    let mode_x = canvas.width() as isize - METER_W as isize - Canvas::text_width(mode, 1) as isize - 10;
    canvas.draw_text(mode, mode_x, HUD_Y, 1, DIM_TEXT);

    let flashing = snap.last_gesture_ms.map_or(false, |t| now_ms - t < GESTURE_FLASH_MS);
    if flashing && snap.last_gesture != Gesture::Idle {
        let label = snap.last_gesture.name().to_uppercase();
        canvas.draw_text(&label, 10, HUD_Y + 18, 2, PARTICLE_COLOR);
    }

    // confidence bar
    if !snap.manual_input {
        let w = 80usize;
        let y = HUD_Y + 40;
        canvas.fill_rect(10, y, w, 4, PANEL_BG);
        canvas.fill_rect(10, y, (snap.confidence.clamp(0.0, 1.0) * w as f32) as usize, 4, IDLE_LINE);
    }
}

/// Vertical wrist-height meter with the idle/jump lines.
fn draw_wrist_meter(canvas: &mut Canvas, snap: &Snapshot) {
    let x = canvas.width().saturating_sub(METER_W) as isize;
    let h = canvas.height().saturating_sub(36);
    canvas.fill_rect(x, 0, METER_W, h, PANEL_BG);
    let row = |v: f32| (v.clamp(0.0, 1.0) * h as f32) as isize;

    if let Some(t) = snap.thresholds {
        canvas.fill_rect(x + 4, row(t.idle_threshold), METER_W - 8, 2, IDLE_LINE);
        canvas.fill_rect(x + 4, row(t.jump_threshold), METER_W - 8, 2, JUMP_LINE);
    }
    if snap.signals.has_wrist {
        canvas.fill_rect(x + 2, row(snap.signals.filtered_wrist_y) - 1, METER_W - 4, 2, DIM_TEXT);
        canvas.fill_rect(x + 10, row(snap.signals.wrist_y) - 3, METER_W - 20, 6, TEXT_COLOR);
    }
}

fn draw_calibration(canvas: &mut Canvas, snap: &Snapshot) {
    let Some(progress) = snap.calibration else { return };
    let cy = canvas.height() as isize / 2 - 20;
    let cx = (canvas.width() - METER_W) as isize / 2;

    let (title, hint) = match progress.phase {
        CalibrationPhase::Low  => ("LOWER YOUR ARM AND HOLD STILL", "REST YOUR WRIST BY YOUR HIP"),
        _                      => ("RAISE YOUR ARM ABOVE YOUR HEAD", "HOLD IT HIGH"),
    };
    canvas.draw_text_centered("CALIBRATION", cy - 90, 3, TEXT_COLOR);
    canvas.draw_text_centered(title, cy - 60, 2, TEXT_COLOR);
    canvas.draw_ring(cx - 60, cy + 20, 36.0, progress.low, IDLE_LINE, PANEL_BG);
    canvas.draw_ring(cx + 60, cy + 20, 36.0, progress.high, JUMP_LINE, PANEL_BG);
    canvas.draw_text("LOW", cx - 60 - 5, cy + 18, 1, DIM_TEXT);
    canvas.draw_text("HIGH", cx + 60 - 7, cy + 18, 1, DIM_TEXT);
    canvas.draw_text_centered(hint, cy + 70, 1, DIM_TEXT);
    canvas.draw_text_centered("S = USE DEFAULTS   M = KEYBOARD", cy + 84, 1, DIM_TEXT);
}

fn draw_overlay(canvas: &mut Canvas, title: &str, line: &str) {
    let cy = canvas.height() as isize / 2;
    let w = (Canvas::text_width(title, 3) + 60).max(Canvas::text_width(line, 1) + 40);
    let x = (canvas.width() as isize - w as isize) / 2;
    canvas.fill_rect(x, cy - 40, w, 96, PANEL_BG);
    canvas.draw_border(x, cy - 40, w, 96, TEXT_COLOR);
    canvas.draw_text_centered(title, cy - 24, 3, TEXT_COLOR);
    canvas.draw_text_centered(line, cy + 10, 1, TEXT_COLOR);
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

/// Menu and control actions read from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    ToggleInput,
    Jump,
    Flap,
    Resume,
    Replay,
    Recalibrate,
    SkipCalibration,
    Quit,
}

pub struct Visualizer {
    window:      Window,
    canvas:      Canvas,
    link:        SimLink,
    stage_width: f32,
}

impl Visualizer {
    pub fn new(width: usize, height: usize, stage_width: f32, link: SimLink) -> Result<Self, String> {
        let mut window = Window::new(
            "Flap Runner",
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer { window, canvas: Canvas::new(width, height), link, stage_width })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Read the keyboard. Held arm keys go straight to the simulated pose
    /// source; everything else comes back as commands.
    pub fn poll_input(&mut self) -> Vec<UiCommand> {
        let mut cmds = Vec::new();
        if !self.window.is_open() {
            cmds.push(UiCommand::Quit);
            return cmds;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let bindings = [
            (Key::M,      UiCommand::ToggleInput),
            (Key::Space,  UiCommand::Jump),
            (Key::F,      UiCommand::Flap),
            (Key::P,      UiCommand::Resume),
            (Key::Enter,  UiCommand::Resume),
            (Key::R,      UiCommand::Replay),
            (Key::C,      UiCommand::Recalibrate),
            (Key::S,      UiCommand::SkipCalibration),
            (Key::Q,      UiCommand::Quit),
            (Key::Escape, UiCommand::Quit),
        ];
        cmds.extend(bindings.iter().filter(|(k, _)| one_shot(*k)).map(|&(_, c)| c));
        let stall = one_shot(Key::Z);

        let arm = SimArm {
            raised:   self.window.is_key_down(Key::J),
            waving:   self.window.is_key_down(Key::W),
            occluded: self.window.is_key_down(Key::X),
        };
        self.link.send(SimInput::Arm(arm));
        if stall {
            self.link.send(SimInput::Stall);
        }
        cmds
    }

    pub fn render(&mut self, session: &GameSession, now_ms: f64, status: &str) -> Result<(), String> {
        draw_scene(&mut self.canvas, session, self.stage_width, now_ms, status);
        self.window
            .update_with_buffer(self.canvas.pixels(), self.canvas.width(), self.canvas.height())
            .map_err(|e| e.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::store::MemoryStore;

    #[test]
    fn fill_rect_clips_to_canvas() {
        let mut c = Canvas::new(20, 10);
        c.fill_rect(-5, -5, 10, 10, 0xFFFF0000);
        c.fill_rect(15, 5, 50, 50, 0xFF00FF00);
        assert_eq!(c.pixel(0, 0), Some(0xFFFF0000));
        assert_eq!(c.pixel(5, 5), Some(BG_COLOR));
        assert_eq!(c.pixel(19, 9), Some(0xFF00FF00));
        assert_eq!(c.pixel(20, 0), None);
    }

    #[test]
    fn text_scale_multiplies_footprint() {
        assert_eq!(Canvas::text_width("AB", 1), 7);
        assert_eq!(Canvas::text_width("AB", 2), 14);
        let mut c = Canvas::new(40, 20);
        c.draw_text("1", 0, 0, 2, TEXT_COLOR);
        // top row of '1' is 0b010: only the middle column lit
        assert_eq!(c.pixel(0, 0), Some(BG_COLOR));
        assert_eq!(c.pixel(2, 0), Some(TEXT_COLOR));
        assert_eq!(c.pixel(3, 1), Some(TEXT_COLOR));
    }

    #[test]
    fn empty_ring_draws_only_track() {
        let mut c = Canvas::new(60, 60);
        c.draw_ring(30, 30, 10.0, 0.0, 0xFFFF0000, 0xFF0000FF);
        assert!(!c.pixels().contains(&0xFFFF0000));
        assert!(c.pixels().contains(&0xFF0000FF));
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
    }

    #[test]
    fn scene_renders_every_phase() {
        let cfg = RunnerConfig { manual_input: true, ..RunnerConfig::default() };
        let mut session = GameSession::new(&cfg, Box::new(MemoryStore::new()));
        let mut c = Canvas::new(cfg.window_width, cfg.window_height);

        draw_scene(&mut c, &session, cfg.stage_width, 0.0, "calibrating");
        assert!(c.pixels().contains(&TEXT_COLOR));

        session.skip_calibration();
        session.spawn_obstacle(ObstacleKind::High);
        session.manual_intent(Gesture::Jump);
        session.tick(1.0 / 60.0, 0.0);
        draw_scene(&mut c, &session, cfg.stage_width, 10.0, "");
        assert!(c.pixels().contains(&PLAYER_COLOR));
        assert!(c.pixels().contains(&GROUND_COLOR));

        session.tick(f32::NAN, 20.0);
        draw_scene(&mut c, &session, cfg.stage_width, 20.0, "paused");
        assert!(c.pixels().contains(&PANEL_BG));
    }
}
