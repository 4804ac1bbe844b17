//! Pixel rendering of a [`Level`](crate::level::Level) into an RGB frame.

use crate::{
    Direction, Position,
    entity::{Door, Entity, Quad},
    map::Grid,
};

const BLACK: [u8; 3] = [0, 0, 0];
const GRID_LINE: [u8; 3] = [100, 100, 100];
const WALL: [u8; 3] = [100, 100, 100];
const LAVA: [u8; 3] = [255, 128, 0];
const VICTIM: [u8; 3] = [255, 0, 0];
const AGENT: [u8; 3] = [255, 0, 0];

/// Row-major RGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Frame {
            width,
            height,
            pixels: vec![0; width * height * 3],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 3;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    fn put(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.pixels[i..i + 3].copy_from_slice(&rgb);
    }

    /// Copies the pixel rectangle starting at `(x, y)`. Parts of the window
    /// that fall outside the frame are dropped.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Frame {
        let x_end = (x + width).min(self.width);
        let y_end = (y + height).min(self.height);
        let out_w = x_end.saturating_sub(x);
        let out_h = y_end.saturating_sub(y);
        let mut out = Frame::new(out_w, out_h);
        if out_w == 0 {
            return out;
        }
        for row in 0..out_h {
            let src = ((y + row) * self.width + x) * 3;
            let dst = row * out_w * 3;
            out.pixels[dst..dst + out_w * 3].copy_from_slice(&self.pixels[src..src + out_w * 3]);
        }
        out
    }
}

/// Scratch buffer for one tile; shapes are given in fractional tile space.
struct TileCanvas {
    size: usize,
    pixels: Vec<[u8; 3]>,
}

impl TileCanvas {
    fn new(size: usize) -> Self {
        TileCanvas {
            size,
            pixels: vec![BLACK; size * size],
        }
    }

    fn fill<F>(&mut self, inside: F, rgb: [u8; 3])
    where
        F: Fn(f32, f32) -> bool,
    {
        let n = self.size as f32;
        for y in 0..self.size {
            for x in 0..self.size {
                let fx = (x as f32 + 0.5) / n;
                let fy = (y as f32 + 0.5) / n;
                if inside(fx, fy) {
                    self.pixels[y * self.size + x] = rgb;
                }
            }
        }
    }

    fn fill_quad(&mut self, q: &Quad, rgb: [u8; 3]) {
        self.fill(
            |x, y| x >= q.x_min && x <= q.x_max && y >= q.y_min && y <= q.y_max,
            rgb,
        );
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, rgb: [u8; 3]) {
        self.fill(|x, y| (x - cx).powi(2) + (y - cy).powi(2) <= r * r, rgb);
    }

    fn blit(&self, frame: &mut Frame, tile: Position) {
        let ox = tile.x * self.size;
        let oy = tile.y * self.size;
        for y in 0..self.size {
            for x in 0..self.size {
                frame.put(ox + x, oy + y, self.pixels[y * self.size + x]);
            }
        }
    }
}

fn scaled(rgb: [u8; 3], factor: f32) -> [u8; 3] {
    rgb.map(|c| (c as f32 * factor) as u8)
}

fn draw_entity(canvas: &mut TileCanvas, entity: &Entity) {
    match entity {
        Entity::Wall => canvas.fill(|_, _| true, WALL),
        Entity::Lava => {
            canvas.fill(|_, _| true, LAVA);
            for band in [0.3_f32, 0.5, 0.7] {
                canvas.fill(
                    |x, y| {
                        let wave = band + 0.03 * (x * 12.0).sin();
                        (0.1..=0.9).contains(&x) && (y - wave).abs() <= 0.03
                    },
                    BLACK,
                );
            }
        }
        Entity::Key { color } => {
            let rgb = color.rgb();
            canvas.fill_quad(&Quad { x_min: 0.50, x_max: 0.63, y_min: 0.31, y_max: 0.88 }, rgb);
            canvas.fill_quad(&Quad { x_min: 0.38, x_max: 0.50, y_min: 0.59, y_max: 0.66 }, rgb);
            canvas.fill_quad(&Quad { x_min: 0.38, x_max: 0.50, y_min: 0.81, y_max: 0.88 }, rgb);
            canvas.fill_circle(0.56, 0.28, 0.19, rgb);
            canvas.fill_circle(0.56, 0.28, 0.064, BLACK);
        }
        Entity::Door(door) => draw_door(canvas, door),
        Entity::Victim(victim) => {
            for q in victim.render_quads() {
                canvas.fill_quad(q, VICTIM);
            }
        }
        Entity::FakeVictim(fake) => {
            for q in fake.render_quads() {
                canvas.fill_quad(q, VICTIM);
            }
        }
    }
}

fn draw_door(canvas: &mut TileCanvas, door: &Door) {
    let rgb = door.color.rgb();
    let full = Quad { x_min: 0.0, x_max: 1.0, y_min: 0.0, y_max: 1.0 };
    if door.open {
        canvas.fill_quad(&Quad { x_min: 0.88, x_max: 1.0, y_min: 0.0, y_max: 1.0 }, rgb);
        canvas.fill_quad(&Quad { x_min: 0.92, x_max: 0.96, y_min: 0.04, y_max: 0.96 }, BLACK);
    } else if door.locked {
        canvas.fill_quad(&full, rgb);
        canvas.fill_quad(
            &Quad { x_min: 0.06, x_max: 0.94, y_min: 0.06, y_max: 0.94 },
            scaled(rgb, 0.45),
        );
        canvas.fill_quad(&Quad { x_min: 0.52, x_max: 0.75, y_min: 0.50, y_max: 0.56 }, rgb);
    } else {
        canvas.fill_quad(&full, rgb);
        canvas.fill_quad(&Quad { x_min: 0.04, x_max: 0.96, y_min: 0.04, y_max: 0.96 }, BLACK);
        canvas.fill_quad(&Quad { x_min: 0.08, x_max: 0.92, y_min: 0.08, y_max: 0.92 }, rgb);
        canvas.fill_quad(&Quad { x_min: 0.12, x_max: 0.88, y_min: 0.12, y_max: 0.88 }, BLACK);
        canvas.fill_circle(0.75, 0.50, 0.08, rgb);
    }
}

fn draw_agent(canvas: &mut TileCanvas, direction: Direction) {
    // Triangle pointing right, rotated about the tile centre.
    let angle = direction as usize as f32 * std::f32::consts::FRAC_PI_2;
    let (sin, cos) = angle.sin_cos();
    let rotate = |(x, y): (f32, f32)| {
        let (dx, dy) = (x - 0.5, y - 0.5);
        (0.5 + dx * cos - dy * sin, 0.5 + dx * sin + dy * cos)
    };
    let a = rotate((0.12, 0.19));
    let b = rotate((0.87, 0.50));
    let c = rotate((0.12, 0.81));
    canvas.fill(
        |x, y| {
            let edge = |p: (f32, f32), q: (f32, f32)| (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0);
            let (e1, e2, e3) = (edge(a, b), edge(b, c), edge(c, a));
            (e1 >= 0.0 && e2 >= 0.0 && e3 >= 0.0) || (e1 <= 0.0 && e2 <= 0.0 && e3 <= 0.0)
        },
        AGENT,
    );
}

/// Renders every tile of `tiles` at `tile_size` pixels per side, with the agent
/// drawn on top of its tile.
pub fn render_tiles(
    tiles: &Grid<Option<Entity>>,
    tile_size: usize,
    agent: Option<(Position, Direction)>,
) -> Frame {
    let mut frame = Frame::new(tiles.width() * tile_size, tiles.height() * tile_size);
    for (pos, cell) in tiles.enumerate() {
        let mut canvas = TileCanvas::new(tile_size);
        canvas.fill_quad(&Quad { x_min: 0.0, x_max: 0.031, y_min: 0.0, y_max: 1.0 }, GRID_LINE);
        canvas.fill_quad(&Quad { x_min: 0.0, x_max: 1.0, y_min: 0.0, y_max: 0.031 }, GRID_LINE);
        if let Some(entity) = cell {
            draw_entity(&mut canvas, entity);
        }
        if let Some((agent_pos, direction)) = agent {
            if agent_pos == pos {
                draw_agent(&mut canvas, direction);
            }
        }
        canvas.blit(&mut frame, pos);
    }
    frame
}
