//! Binary image masks.

use nalgebra::{DMatrix, Matrix2xX};

/// Value written for foreground pixels when a grid is binarized.
pub const MASK_FOREGROUND: u8 = 255;

/// A grid of `height × width` cells where `0` is background and any positive value
/// marks a pixel to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: DMatrix<u8>,
}

impl Mask {
    /// Wraps a grid indexed as `(row, column)`.
    pub fn new(data: DMatrix<u8>) -> Self {
        Mask { data }
    }

    pub fn from_fn<F>(height: usize, width: usize, f: F) -> Self
    where
        F: FnMut(usize, usize) -> u8,
    {
        Mask::new(DMatrix::from_fn(height, width, f))
    }

    /// A filled disk of `radius` pixels around `(center_u, center_v)`.
    pub fn disk(height: usize, width: usize, center_u: f64, center_v: f64, radius: f64) -> Self {
        Mask::from_fn(height, width, |row, col| {
            let du = col as f64 - center_u;
            let dv = row as f64 - center_v;
            if du * du + dv * dv <= radius * radius {
                MASK_FOREGROUND
            } else {
                0
            }
        })
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    pub fn data(&self) -> &DMatrix<u8> {
        &self.data
    }

    pub fn is_active(&self, row: usize, col: usize) -> bool {
        self.data[(row, col)] > 0
    }

    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[(row, col)] = value;
    }

    pub fn active_count(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0).count()
    }

    /// Sets every positive cell to [`MASK_FOREGROUND`].
    pub fn binarized(&self) -> Mask {
        Mask::new(self.data.map(|v| if v > 0 { MASK_FOREGROUND } else { 0 }))
    }

    /// Pixel coordinates `(u, v) = (column, row)` of every active cell, one per column.
    pub fn active_pixels(&self) -> Matrix2xX<f64> {
        let (height, width) = self.shape();
        let coordinates: Vec<f64> = (0..height)
            .flat_map(|row| (0..width).map(move |col| (row, col)))
            .filter(|&(row, col)| self.is_active(row, col))
            .flat_map(|(row, col)| [col as f64, row as f64])
            .collect();
        Matrix2xX::from_iterator(coordinates.len() / 2, coordinates)
    }
}
