/// Separable 2-D DCT-II over a fixed 32×32 grid.
///
/// Unnormalised: `C[u][v] = Σy Σx f[y][x]·cos((2x+1)vπ/64)·cos((2y+1)uπ/64)`.
/// The hash only compares coefficients against their median, so scale
/// factors do not matter.
use std::f64::consts::PI;
use std::sync::OnceLock;

/// Grid side length.
pub const N: usize = 32;

pub type Grid = [[f64; N]; N];

/// `COS[k][n] = cos((2n+1)kπ / 2N)`, computed once per process.
fn cos_table() -> &'static Grid {
    static TABLE: OnceLock<Grid> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[0.0; N]; N];
        for (k, row) in table.iter_mut().enumerate() {
            for (n, value) in row.iter_mut().enumerate() {
                *value = ((2 * n + 1) as f64 * k as f64 * PI / (2 * N) as f64).cos();
            }
        }
        table
    })
}

/// Transform `input` (row-major `[y][x]`) into frequency space `[u][v]`,
/// where `u` is the vertical and `v` the horizontal frequency.
pub fn dct_2d(input: &Grid) -> Grid {
    let cos = cos_table();

    // Rows: rows[y][v] = Σx f[y][x]·cos[v][x]
    let mut rows = [[0.0; N]; N];
    for (y, out_row) in rows.iter_mut().enumerate() {
        for (v, out) in out_row.iter_mut().enumerate() {
            *out = input[y].iter().zip(&cos[v]).map(|(f, c)| f * c).sum();
        }
    }

    // Columns: out[u][v] = Σy rows[y][v]·cos[u][y]
    let mut out = [[0.0; N]; N];
    for (u, out_row) in out.iter_mut().enumerate() {
        for (v, value) in out_row.iter_mut().enumerate() {
            *value = (0..N).map(|y| rows[y][v] * cos[u][y]).sum();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_has_only_dc_energy() {
        let grid = [[10.0; N]; N];
        let out = dct_2d(&grid);
        assert!((out[0][0] - 10.0 * (N * N) as f64).abs() < 1e-6);
        for (u, row) in out.iter().enumerate() {
            for (v, &c) in row.iter().enumerate() {
                if (u, v) != (0, 0) {
                    assert!(c.abs() < 1e-6, "coefficient ({u},{v}) = {c}");
                }
            }
        }
    }

    #[test]
    fn horizontal_cosine_lands_in_row_zero() {
        let table = cos_table();
        let mut grid = [[0.0; N]; N];
        for row in grid.iter_mut() {
            row.copy_from_slice(&table[3]);
        }
        let out = dct_2d(&grid);
        let peak = out[0][3].abs();
        for (u, row) in out.iter().enumerate() {
            for (v, &c) in row.iter().enumerate() {
                if (u, v) != (0, 3) {
                    assert!(c.abs() < peak * 1e-9 + 1e-9);
                }
            }
        }
    }
}
