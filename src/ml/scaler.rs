use serde::{Deserialize, Serialize};

/// Per-dimension standardization fit once on the training matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    /// Population standard deviation; zero-variance dimensions store 1.
    pub scale: Vec<f32>,
    pub n_samples_seen: usize,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f32>]) -> Result<Self, String> {
        let first = rows.first().ok_or_else(|| "Cannot fit scaler on zero rows".to_string())?;
        let d = first.len();
        if rows.iter().any(|row| row.len() != d) {
            return Err("Rows have inconsistent widths".to_string());
        }
        let n = rows.len() as f64;
        let mut mean = vec![0.0_f64; d];
        for row in rows {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v as f64;
            }
        }
        for m in &mut mean {
            *m /= n;
        }
        let mut var = vec![0.0_f64; d];
        for row in rows {
            for ((acc, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                let diff = v as f64 - m;
                *acc += diff * diff;
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std == 0.0 { 1.0 } else { std as f32 }
            })
            .collect();
        Ok(Self {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            scale,
            n_samples_seen: rows.len(),
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn validate(&self, expected_dim: usize) -> Result<(), String> {
        if self.mean.len() != expected_dim {
            return Err(format!(
                "Scaler mean has {} values (expected {expected_dim})",
                self.mean.len()
            ));
        }
        if self.scale.len() != expected_dim {
            return Err(format!(
                "Scaler scale has {} values (expected {expected_dim})",
                self.scale.len()
            ));
        }
        if self
            .mean
            .iter()
            .chain(&self.scale)
            .any(|v| !v.is_finite())
        {
            return Err("Scaler contains non-finite values".to_string());
        }
        if self.scale.iter().any(|&s| s == 0.0) {
            return Err("Scaler contains a zero scale".to_string());
        }
        Ok(())
    }

    pub fn transform(&self, row: &[f32]) -> Result<Vec<f32>, String> {
        if row.len() != self.dim() {
            return Err(format!(
                "Expected {} features, got {}",
                self.dim(),
                row.len()
            ));
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&v, (&m, &s))| (v - m) / s)
            .collect())
    }

    pub fn transform_rows(&self, rows: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, String> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
