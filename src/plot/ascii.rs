//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed daily totals: `o`
//! - history line: `-`
//! - forecast daily totals: `*`

use crate::domain::{DailySales, ResultBundle};

/// Render the daily sales history and forecast of a finished run.
pub fn render_bundle_chart(bundle: &ResultBundle, width: usize, height: usize) -> String {
    render_sales_chart(&bundle.daily_sales, &bundle.prediction.daily_totals(), width, height)
}

/// Render observed daily totals as a line with `o` markers plus forecast
/// totals (`(day_index, amount)`) as `*`.
pub fn render_sales_chart(
    history: &[DailySales],
    forecast: &[(u32, f64)],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let history: Vec<(f64, f64)> = history
        .iter()
        .map(|d| (f64::from(d.day_index), d.total))
        .collect();
    let forecast: Vec<(f64, f64)> = forecast
        .iter()
        .map(|&(day, y)| (f64::from(day), y))
        .collect();
    let all: Vec<(f64, f64)> = history.iter().chain(forecast.iter()).copied().collect();

    let (d_min, d_max) = axis_range(all.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = axis_range(all.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Line first so markers overlay it.
    let mut prev = None;
    for &(d, y) in &history {
        let x = map_x(d, d_min, d_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, yy, '-'),
            None => grid[yy][x] = '-',
        }
        prev = Some((x, yy));
    }
    for &(d, y) in &history {
        grid[map_y(y, y_min, y_max, height)][map_x(d, d_min, d_max, width)] = 'o';
    }
    for &(d, y) in &forecast {
        grid[map_y(y, y_min, y_max, height)][map_x(d, d_min, d_max, width)] = '*';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: day=[{d_min:.0}, {d_max:.0}] | sales=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

/// Min/max of finite values; a single value is widened by one unit each side.
fn axis_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if !(min_v.is_finite() && max_v.is_finite()) {
        return None;
    }
    if max_v > min_v {
        Some((min_v, max_v))
    } else {
        Some((min_v - 1.0, max_v + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
