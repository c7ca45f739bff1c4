/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Glyph)
///   2. Compare each glyph with `back` buffer (previous frame)
///   3. Only emit terminal commands for glyphs that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Each map tile is two terminal columns: the tile glyph and a spacer.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::guard::{GuardKind, GuardState};
use crate::domain::tile::TileKind;
use crate::sim::world::{Phase, WorldState};

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Glyph {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Glyph {
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 28 };

    const BLANK: Glyph = Glyph { ch: ' ', fg: Color::White, bg: Glyph::BASE_BG };

    /// Differs from every real glyph, so the next diff repaints everything.
    const INVALID: Glyph = Glyph { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Glyph { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Glyphs ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Glyph::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Glyph::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, g: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = g;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Glyph::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Glyph::new(' ', Color::White, bg));
        }
    }
}

// ── Renderer ──

const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            enhanced_keys: false,
        }
    }

    /// Raw mode + alternate screen. Returns whether key Release events will be reported.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Glyph::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced_keys = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Glyph::INVALID);

        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState, message: &str) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Glyph::INVALID);
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.compose_hud(world);
        self.compose_map(world);
        self.compose_actors(world);
        self.compose_footer(world, message);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Composition ──

    fn compose_hud(&mut self, w: &WorldState) {
        let p = &w.player;
        let [a, b] = p.gear().item_names();
        let state = match (w.phase, w.paused) {
            (_, true) => "PAUSED",
            (Phase::Spotted, _) => "SPOTTED",
            (Phase::Escaped, _) => "ESCAPED",
            (Phase::Playing, _) if p.is_hidden() => "HIDDEN",
            (Phase::Playing, _) if p.is_near_hideable() => "hide spot nearby",
            _ => "",
        };
        let hud = format!(
            " Level {:<3} Bombs {}/{}  {:?} [{a}, {b}]  {state} ",
            w.level, p.bombs(), p.max_bombs(), p.class(),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, w: &WorldState) {
        for (y, row) in w.map.rows().enumerate() {
            for (x, &kind) in row.iter().enumerate() {
                let (fg, bg) = tile_colors(kind);
                self.put_tile(x, y, Glyph::new(kind.glyph(), fg, bg));
            }
        }
        for d in &w.distractions {
            let c = d.origin().cell();
            if c.x < 0 || c.y < 0 { continue; }
            let fg = if d.progress(w.now_ms) < 0.5 { Color::Rgb { r: 255, g: 90, b: 90 } } else { Color::DarkRed };
            self.put_tile(c.x as usize, c.y as usize, Glyph::new('*', fg, Glyph::BASE_BG));
        }
    }

    fn compose_actors(&mut self, w: &WorldState) {
        for g in &w.guards {
            let c = g.cell();
            if c.x < 0 || c.y < 0 { continue; }
            let fg = match (g.kind(), g.state()) {
                (_, GuardState::Distracted) => Color::Magenta,
                (GuardKind::Standing, _) => Color::Red,
                (GuardKind::Moving, _) => Color::Yellow,
            };
            let fg = if w.spotted_by == Some(g.id) { Color::White } else { fg };
            self.put_tile(c.x as usize, c.y as usize, Glyph::new(facing_arrow(g.facing_deg()), fg, Glyph::BASE_BG));
        }

        let p = &w.player;
        let c = p.cell();
        if c.x >= 0 && c.y >= 0 {
            let fg = if p.is_hidden() { Color::DarkGrey } else { Color::Green };
            self.put_tile(c.x as usize, c.y as usize, Glyph::new('@', fg, Glyph::BASE_BG));
        }
    }

    fn compose_footer(&mut self, w: &WorldState, message: &str) {
        let map_h = w.map.height();
        let msg_row = MAP_ROW + map_h + 1;
        if !message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" {message} "), Color::Black, MSG_BG);
        }
        let help = " WASD/Arrows:Move  H:Hide  Q:Bomb  E:Escape  R:Retry  Enter:Next  P:Pause  Esc:Quit";
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Glyph::BASE_BG);
    }

    fn put_tile(&mut self, x: usize, y: usize, g: Glyph) {
        let col = x * CELL_W;
        let row = MAP_ROW + y;
        self.front.set(col, row, g);
        self.front.set(col + 1, row, Glyph::new(' ', g.fg, g.bg));
    }

    // ── Output ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Glyph::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let g = self.front.get(x, y);
                if g == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if g.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(g.fg))?;
                    last_fg = g.fg;
                }
                if g.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(g.bg))?;
                    last_bg = g.bg;
                }
                queue!(self.writer, Print(g.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

fn tile_colors(kind: TileKind) -> (Color, Color) {
    match kind {
        TileKind::Floor => (Color::DarkGrey, Glyph::BASE_BG),
        TileKind::Wall => (Color::Grey, Color::Rgb { r: 60, g: 60, b: 70 }),
        TileKind::Exit => (Color::Black, Color::Green),
        TileKind::HideSpot => (Color::Cyan, Glyph::BASE_BG),
        TileKind::Platform => (Color::Rgb { r: 150, g: 110, b: 60 }, Glyph::BASE_BG),
        TileKind::GrapplePoint => (Color::Yellow, Glyph::BASE_BG),
        TileKind::Gap => (Color::Black, Color::Black),
    }
}

/// Arrow for a facing in degrees (0° east, 90° down the screen).
fn facing_arrow(deg: f64) -> char {
    let d = deg.rem_euclid(360.0);
    match ((d + 45.0) / 90.0) as u32 % 4 {
        0 => '>',
        1 => 'v',
        2 => '<',
        _ => '^',
    }
}
