//! Columnar view over a price series.

use serde::Serialize;

use crate::{MarketTime, PricePoint};

/// Price series as parallel `f64` columns indexed by timestamp, ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceFrame {
    pub index: Vec<MarketTime>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl PriceFrame {
    pub const COLUMNS: [&'static str; 5] = ["open", "high", "low", "close", "volume"];

    pub fn from_points(points: &[PricePoint]) -> Self {
        let mut sorted = points.iter().collect::<Vec<_>>();
        sorted.sort_by_key(|point| point.time);

        let mut frame = Self::with_capacity(sorted.len());
        for point in sorted {
            frame.index.push(point.time);
            frame.open.push(point.open);
            frame.high.push(point.high);
            frame.low.push(point.low);
            frame.close.push(point.close);
            frame.volume.push(point.volume as f64);
        }
        frame
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            index: Vec::with_capacity(capacity),
            open: Vec::with_capacity(capacity),
            high: Vec::with_capacity(capacity),
            low: Vec::with_capacity(capacity),
            close: Vec::with_capacity(capacity),
            volume: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            "open" => Some(&self.open),
            "high" => Some(&self.high),
            "low" => Some(&self.low),
            "close" => Some(&self.close),
            "volume" => Some(&self.volume),
            _ => None,
        }
    }

    /// Row `position` as `(timestamp, [open, high, low, close, volume])`.
    pub fn row(&self, position: usize) -> Option<(MarketTime, [f64; 5])> {
        let time = *self.index.get(position)?;
        Some((
            time,
            [
                self.open[position],
                self.high[position],
                self.low[position],
                self.close[position],
                self.volume[position],
            ],
        ))
    }
}
