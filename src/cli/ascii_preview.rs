use crate::core::recognition::{FaceEntry, ResultList};
use crossterm::terminal;
use image::DynamicImage;

const ASCII_RAMP: &[char] = &[' ', '.', '·', ':', ';', '+', '=', 'x', 'X', '#', '@'];
const DEFAULT_WIDTH: usize = 80;
const DEFAULT_HEIGHT: usize = 30;

/// A face rectangle in image pixels, `[x, y, w, h]`, with the text drawn above it.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceOverlay {
    pub bbox: [f64; 4],
    pub label: String,
}

impl FaceOverlay {
    /// Overlays for every listed face that came with a box.
    pub fn from_results(results: &ResultList) -> Vec<Self> {
        match results {
            ResultList::NoFaces => Vec::new(),
            ResultList::Faces(entries) => entries.iter().filter_map(Self::from_entry).collect(),
        }
    }

    fn from_entry(entry: &FaceEntry) -> Option<Self> {
        entry.bbox.map(|bbox| Self {
            bbox,
            label: format!("{} {}%", entry.label, entry.confidence),
        })
    }
}

pub struct AsciiRenderer {
    width: usize,
    height: usize,
}

impl AsciiRenderer {
    pub fn new(width: Option<usize>, height: Option<usize>) -> Self {
        let (term_width, term_height) = terminal::size()
            .map(|(w, h)| (w as usize, h as usize))
            .unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));

        // Terminal cells are roughly twice as tall as wide
        Self::with_size(
            width.unwrap_or(term_width.min(DEFAULT_WIDTH)),
            height.unwrap_or((term_height.saturating_sub(8) / 2).min(DEFAULT_HEIGHT)),
        )
    }

    pub fn with_size(width: usize, height: usize) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn render(&self, image: &DynamicImage, faces: &[FaceOverlay]) -> String {
        let mut grid = self.image_to_ascii(image);
        let (img_width, img_height) = (image.width().max(1) as f64, image.height().max(1) as f64);

        for face in faces {
            let [x, y, w, h] = face.bbox;
            let x1 = self.scale(x, img_width, self.width);
            let x2 = self.scale(x + w, img_width, self.width);
            let y1 = self.scale(y, img_height, self.height);
            let y2 = self.scale(y + h, img_height, self.height);

            self.draw_face_box(&mut grid, x1, y1, x2, y2);
            // Label sits on the row above the box, or inside it at the top edge.
            self.overlay_text(&mut grid, &face.label, x1, y1.saturating_sub(1));
        }

        grid_to_string(&grid)
    }

    fn scale(&self, value: f64, source: f64, cells: usize) -> usize {
        let cell = (value / source * cells as f64).floor();
        (cell.max(0.0) as usize).min(cells - 1)
    }

    fn image_to_ascii(&self, image: &DynamicImage) -> Vec<Vec<char>> {
        let mut grid = vec![vec![' '; self.width]; self.height];
        let gray = image.to_luma8();
        let (img_width, img_height) = gray.dimensions();
        if img_width == 0 || img_height == 0 {
            return grid;
        }

        for (term_y, row) in grid.iter_mut().enumerate() {
            for (term_x, cell) in row.iter_mut().enumerate() {
                let img_x = (term_x as f32 / self.width as f32 * img_width as f32) as u32;
                let img_y = (term_y as f32 / self.height as f32 * img_height as f32) as u32;
                let brightness = gray.get_pixel(img_x.min(img_width - 1), img_y.min(img_height - 1))[0];
                *cell = ASCII_RAMP[brightness as usize * (ASCII_RAMP.len() - 1) / 255];
            }
        }

        grid
    }

    fn overlay_text(&self, grid: &mut [Vec<char>], text: &str, start_x: usize, y: usize) {
        let Some(row) = grid.get_mut(y) else {
            return;
        };
        for (cell, ch) in row.iter_mut().skip(start_x).zip(text.chars()) {
            *cell = ch;
        }
    }

    fn draw_face_box(&self, grid: &mut [Vec<char>], x1: usize, y1: usize, x2: usize, y2: usize) {
        if x2 <= x1 || y2 <= y1 {
            grid[y1][x1] = '+';
            return;
        }

        for x in x1 + 1..x2 {
            grid[y1][x] = '─';
            grid[y2][x] = '─';
        }
        for row in grid.iter_mut().take(y2).skip(y1 + 1) {
            row[x1] = '│';
            row[x2] = '│';
        }
        grid[y1][x1] = '┌';
        grid[y1][x2] = '┐';
        grid[y2][x1] = '└';
        grid[y2][x2] = '┘';
    }
}

fn grid_to_string(grid: &[Vec<char>]) -> String {
    grid.iter()
        .map(|row| row.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
    }

    #[test]
    fn test_output_matches_grid_size() {
        let renderer = AsciiRenderer::with_size(20, 8);
        let output = renderer.render(&solid(64, 48, 0), &[]);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines.iter().all(|l| l.chars().count() == 20));
        assert!(output.chars().all(|c| c == ' ' || c == '\n'));
    }

    #[test]
    fn test_bright_image_uses_dense_glyph() {
        let renderer = AsciiRenderer::with_size(4, 2);
        let output = renderer.render(&solid(8, 8, 255), &[]);
        assert_eq!(output, "@@@@\n@@@@");
    }

    #[test]
    fn test_face_box_and_label_drawn_in_scaled_cells() {
        let renderer = AsciiRenderer::with_size(20, 10);
        let face = FaceOverlay {
            bbox: [20.0, 20.0, 40.0, 40.0],
            label: "Lan".to_string(),
        };
        let output = renderer.render(&solid(100, 100, 0), &[face]);
        let lines: Vec<Vec<char>> = output.lines().map(|l| l.chars().collect()).collect();

        assert_eq!(lines[2][4], '┌');
        assert_eq!(lines[2][12], '┐');
        assert_eq!(lines[6][4], '└');
        assert_eq!(lines[6][12], '┘');
        assert_eq!(lines[4][4], '│');
        assert_eq!(lines[1][4..7].iter().collect::<String>(), "Lan");
    }

    #[test]
    fn test_box_outside_frame_is_clamped() {
        let renderer = AsciiRenderer::with_size(10, 5);
        let face = FaceOverlay {
            bbox: [-50.0, 90.0, 500.0, 500.0],
            label: "x".repeat(40),
        };
        let output = renderer.render(&solid(100, 100, 0), &[face]);
        assert_eq!(output.lines().count(), 5);
    }

    #[test]
    fn test_overlays_skip_faces_without_box() {
        let results = ResultList::Faces(vec![
            FaceEntry {
                ordinal: 1,
                label: "Lan".into(),
                confidence: "91.0".into(),
                recognized: true,
                details: Vec::new(),
                bbox: Some([1.0, 2.0, 3.0, 4.0]),
            },
            FaceEntry {
                ordinal: 2,
                label: "Không xác định".into(),
                confidence: "10.0".into(),
                recognized: false,
                details: Vec::new(),
                bbox: None,
            },
        ]);

        let overlays = FaceOverlay::from_results(&results);
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].label, "Lan 91.0%");
        assert!(FaceOverlay::from_results(&ResultList::NoFaces).is_empty());
    }
}
