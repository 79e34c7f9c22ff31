//! Text-mode waveform plots.
//!
//! Waveforms are bucketed into columns (bucket mean) and each column is
//! drawn as a `*` at the row nearest its value:
//!
//! ```text
//! before #3 (180 samples, min 0.100, max 1.000)
//! |   ****    ****
//! |
//! |***    ****    ****
//! ```

use wiresim_core::cable::{Cable, SignalObserver};

use crate::config::PlotConfig;

/// Render one waveform as text.
pub fn render_waveform(label: &str, samples: &[f64], width: usize, height: usize) -> String {
    if samples.is_empty() || width == 0 || height == 0 {
        return format!("{label} (no samples)\n");
    }

    let columns = downsample(samples, width);
    let lo = columns.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = columns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;

    let levels: Vec<usize> = columns
        .iter()
        .map(|&v| {
            if span > 0.0 {
                ((v - lo) / span * (height - 1) as f64).round() as usize
            } else {
                0
            }
        })
        .collect();

    let mut out = format!(
        "{label} ({} samples, min {lo:.3}, max {hi:.3})\n",
        samples.len()
    );
    for row in (0..height).rev() {
        let line: String = levels
            .iter()
            .map(|&level| if level == row { '*' } else { ' ' })
            .collect();
        out.push('|');
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Render a transmission's input and output one above the other.
///
/// Labels carry the history index when the transmission was recorded.
pub fn render_transmission(
    before: &[f64],
    after: &[f64],
    history_index: Option<usize>,
    config: &PlotConfig,
) -> String {
    let before = &before[..before.len().min(config.max_samples)];
    let after = &after[..after.len().min(config.max_samples)];
    let suffix = history_index.map(|i| format!(" #{i}")).unwrap_or_default();

    let mut out = render_waveform(
        &format!("before{suffix}"),
        before,
        config.width,
        config.height,
    );
    out.push_str(&render_waveform(
        &format!("after {suffix}"),
        after,
        config.width,
        config.height,
    ));
    out
}

/// Render the last `config.recent` transmissions kept by a cable.
pub fn render_history(cable: &Cable, config: &PlotConfig) -> String {
    let recent = cable.recent(config.recent);
    if recent.is_empty() {
        return "No signal data available\n".to_string();
    }

    let first = cable.history_len() - recent.len();
    recent
        .iter()
        .enumerate()
        .map(|(i, record)| render_transmission(&record.input, &record.output, Some(first + i), config))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mean of each of `width` equal buckets (fewer when samples are scarce).
fn downsample(samples: &[f64], width: usize) -> Vec<f64> {
    let columns = width.min(samples.len());
    (0..columns)
        .map(|c| {
            let start = c * samples.len() / columns;
            let end = (c + 1) * samples.len() / columns;
            let bucket = &samples[start..end];
            bucket.iter().sum::<f64>() / bucket.len() as f64
        })
        .collect()
}

/// Prints every transmission as it happens.
///
/// Attach to a cable with `debug_mode` set.
#[derive(Debug, Clone, Copy)]
pub struct TextPlotter {
    config: PlotConfig,
}

impl TextPlotter {
    pub fn new(config: PlotConfig) -> Self {
        Self { config }
    }
}

impl SignalObserver for TextPlotter {
    fn observe(&self, before: &[f64], after: &[f64], history_index: Option<usize>) {
        println!(
            "{}",
            render_transmission(before, after, history_index, &self.config)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiresim_core::cable::CableConfig;

    #[test]
    fn test_square_wave() {
        let text = render_waveform("w", &[0.0, 0.0, 1.0, 1.0], 4, 2);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "w (4 samples, min 0.000, max 1.000)");
        assert_eq!(lines[1], "|  **");
        assert_eq!(lines[2], "|**");
    }

    #[test]
    fn test_downsampling_averages() {
        // Two buckets of four samples each
        let samples = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let text = render_waveform("w", &samples, 2, 3);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "| *");
        assert_eq!(lines[2], "|");
        assert_eq!(lines[3], "|*");
    }

    #[test]
    fn test_flat_and_empty() {
        let flat = render_waveform("flat", &[0.5; 10], 5, 3);
        assert_eq!(flat.lines().last(), Some("|*****"));

        assert_eq!(render_waveform("none", &[], 10, 3), "none (no samples)\n");
    }

    #[test]
    fn test_transmission_truncates() {
        let config = PlotConfig {
            max_samples: 4,
            width: 10,
            height: 2,
            ..PlotConfig::default()
        };
        let text = render_transmission(&[1.0; 100], &[0.9; 100], Some(7), &config);

        assert!(text.contains("before #7 (4 samples"));
        assert!(text.contains("after  #7 (4 samples"));

        let unrecorded = render_transmission(&[1.0; 2], &[0.9; 2], None, &config);
        assert!(!unrecorded.contains('#'));
        assert!(unrecorded.contains("before (2 samples"));
    }

    #[test]
    fn test_history_indices() {
        let mut cable = Cable::seeded(CableConfig::ideal(1.0), 1).unwrap();
        let config = PlotConfig {
            recent: 2,
            ..PlotConfig::default()
        };
        assert_eq!(render_history(&cable, &config), "No signal data available\n");

        for _ in 0..3 {
            cable.transmit(&[1.0, 0.1]);
        }
        let text = render_history(&cable, &config);

        assert!(!text.contains("#0"));
        assert!(text.contains("before #1"));
        assert!(text.contains("before #2"));
    }
}
