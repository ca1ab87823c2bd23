// ============================================================
// Layer 6 - Weight Files
// ============================================================
// Saves and restores network weights, and renders the
// per-epoch checkpoint file name.
//
// Weights are the network's Burn record serialised with the
// named MessagePack recorder. The recorder produces bytes and
// we write them ourselves, so the file lands at exactly the
// path the template renders (file recorders would rewrite the
// extension, which mangles names like `03-0.41`).
//
// Only weights are stored. The architecture comes from
// SiameseNetworkConfig + OutputMode, so the model must be
// built the same way before loading.
//
// Template placeholders:
//   {epoch}      1-based epoch number
//   {loss}       training loss
//   {val_loss}   validation loss (error if there is none)
//   {metric}     training metric
//   {val_metric} validation metric (error if there is none)
// each with an optional spec `:[0][width][.precision][d|f]`.
// For integers `.precision` pads with zeros, so `{epoch:.2d}`
// renders epoch 3 as `03`.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
};

use crate::error::{Result, SiameseError};
use crate::infra::metrics::EpochLogs;
use crate::ml::model::SiameseNetwork;

pub const DEFAULT_WEIGHT_TEMPLATE: &str = "{epoch:02d}-{val_loss:.2f}";

/// Write the network's weights to `path`, creating parent directories.
pub fn save_weights<B: Backend>(model: &SiameseNetwork<B>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let bytes: Vec<u8> = NamedMpkBytesRecorder::<FullPrecisionSettings>::default()
        .record(model.clone().into_record(), ())?;
    fs::write(path, bytes)?;

    tracing::debug!("Saved weights to '{}'", path.display());
    Ok(())
}

/// Load weights from `path` into an already-built network.
///
/// The network must have the same architecture as the one
/// that was saved.
pub fn load_weights<B: Backend>(
    model:  SiameseNetwork<B>,
    path:   impl AsRef<Path>,
    device: &B::Device,
) -> Result<SiameseNetwork<B>> {
    let path  = path.as_ref();
    let bytes = fs::read(path)?;

    let record: <SiameseNetwork<B> as Module<B>>::Record =
        Recorder::<B>::load(&NamedMpkBytesRecorder::<FullPrecisionSettings>::default(), bytes, device)?;

    tracing::info!("Loaded weights from '{}'", path.display());
    Ok(model.load_record(record))
}

// ─── Checkpoint Template ──────────────────────────────────────────────────────

/// Checkpoint path with `{placeholder:spec}` fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointTemplate {
    raw: String,
}

impl CheckpointTemplate {
    /// Parse a template. Unknown placeholders and bad specs are
    /// rejected here, before training starts.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let template = Self { raw: raw.into() };
        for field in template.fields()? {
            let (name, spec) = split_field(field);
            FormatSpec::parse(spec)?;
            if !PLACEHOLDERS.contains(&name) {
                return Err(SiameseError::Template(format!(
                    "unknown placeholder '{{{name}}}' in '{}'",
                    template.raw
                )));
            }
        }
        Ok(template)
    }

    /// Fill in the placeholders from one epoch's logs
    pub fn render(&self, logs: &EpochLogs) -> Result<PathBuf> {
        let mut out  = String::with_capacity(self.raw.len());
        let mut rest = self.raw.as_str();

        while let Some(open) = rest.find(['{', '}']) {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            // doubled braces are literals
            if rest[open..].starts_with("{{") || rest[open..].starts_with("}}") {
                out.push_str(&rest[open..open + 1]);
                rest = &after[1..];
                continue;
            }
            if rest[open..].starts_with('}') {
                return Err(self.unbalanced());
            }

            let close = after.find('}').ok_or_else(|| self.unbalanced())?;
            out.push_str(&render_field(&after[..close], logs)?);
            rest = &after[close + 1..];
        }
        out.push_str(rest);

        Ok(PathBuf::from(out))
    }

    fn fields(&self) -> Result<Vec<&str>> {
        let mut fields = Vec::new();
        let mut rest   = self.raw.as_str();
        while let Some(open) = rest.find(['{', '}']) {
            let after = &rest[open + 1..];
            if rest[open..].starts_with("{{") || rest[open..].starts_with("}}") {
                rest = &after[1..];
                continue;
            }
            if rest[open..].starts_with('}') {
                return Err(self.unbalanced());
            }
            let close = after.find('}').ok_or_else(|| self.unbalanced())?;
            fields.push(&after[..close]);
            rest = &after[close + 1..];
        }
        Ok(fields)
    }

    fn unbalanced(&self) -> SiameseError {
        SiameseError::Template(format!("unbalanced braces in '{}'", self.raw))
    }
}

impl Default for CheckpointTemplate {
    fn default() -> Self {
        Self { raw: DEFAULT_WEIGHT_TEMPLATE.to_string() }
    }
}

const PLACEHOLDERS: [&str; 5] = ["epoch", "loss", "val_loss", "metric", "val_metric"];

fn split_field(field: &str) -> (&str, &str) {
    field.split_once(':').unwrap_or((field, ""))
}

fn render_field(field: &str, logs: &EpochLogs) -> Result<String> {
    let (name, spec) = split_field(field);
    let spec = FormatSpec::parse(spec)?;

    let missing = |what: &str| {
        SiameseError::Template(format!("'{{{what}}}' needs validation data, but this run has none"))
    };

    match name {
        "epoch"      => Ok(spec.format_int(logs.epoch)),
        "loss"       => Ok(spec.format_float(logs.loss)),
        "metric"     => Ok(spec.format_float(logs.metric)),
        "val_loss"   => logs.val_loss.map(|v| spec.format_float(v)).ok_or_else(|| missing(name)),
        "val_metric" => logs.val_metric.map(|v| spec.format_float(v)).ok_or_else(|| missing(name)),
        other => Err(SiameseError::Template(format!("unknown placeholder '{{{other}}}'"))),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FormatSpec {
    zero_pad:  bool,
    width:     Option<usize>,
    precision: Option<usize>,
}

impl FormatSpec {
    /// `[0][width][.precision][d|f]`
    fn parse(spec: &str) -> Result<Self> {
        let bad = || SiameseError::Template(format!("bad format spec '{spec}'"));

        let body = spec.strip_suffix(['d', 'f']).unwrap_or(spec);
        let (width_part, precision_part) = match body.split_once('.') {
            Some((w, p)) => (w, Some(p)),
            None         => (body, None),
        };

        let zero_pad = width_part.starts_with('0');
        let width = match width_part {
            "" => None,
            w  => Some(w.parse::<usize>().map_err(|_| bad())?),
        };
        let precision = match precision_part {
            Some(p) => Some(p.parse::<usize>().map_err(|_| bad())?),
            None    => None,
        };

        Ok(Self { zero_pad, width, precision })
    }

    fn format_int(&self, value: usize) -> String {
        match (self.width, self.precision) {
            (_, Some(p))                   => format!("{value:0p$}"),
            (Some(w), None) if self.zero_pad => format!("{value:0w$}"),
            (Some(w), None)                => format!("{value:w$}"),
            (None, None)                   => value.to_string(),
        }
    }

    fn format_float(&self, value: f64) -> String {
        let p = self.precision.unwrap_or(6);
        match self.width {
            Some(w) if self.zero_pad => format!("{value:0w$.p$}"),
            Some(w)                  => format!("{value:w$.p$}"),
            None                     => format!("{value:.p$}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::modes::OutputMode;
    use crate::ml::model::SiameseNetworkConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn logs(val_loss: Option<f64>) -> EpochLogs {
        EpochLogs::new(3, 0.123456, "mean_squared_error", 0.5, val_loss, val_loss.map(|_| 0.25))
    }

    #[test]
    fn test_default_template() {
        let template = CheckpointTemplate::default();
        assert_eq!(template.render(&logs(Some(0.4567))).unwrap(), PathBuf::from("03-0.46"));
    }

    #[test]
    fn test_integer_precision_pads() {
        let template = CheckpointTemplate::parse("w.{epoch:.2d}-{val_loss:.2f}.mpk").unwrap();
        assert_eq!(
            template.render(&logs(Some(1.5))).unwrap(),
            PathBuf::from("w.03-1.50.mpk")
        );
    }

    #[test]
    fn test_plain_and_literal_braces() {
        let template = CheckpointTemplate::parse("{{run}}/e{epoch}_{loss:.3f}").unwrap();
        assert_eq!(template.render(&logs(None)).unwrap(), PathBuf::from("{run}/e3_0.123"));
    }

    #[test]
    fn test_missing_validation_value() {
        let err = CheckpointTemplate::default().render(&logs(None)).unwrap_err();
        assert!(matches!(err, SiameseError::Template(ref msg) if msg.contains("val_loss")));
    }

    #[test]
    fn test_rejects_bad_templates() {
        assert!(CheckpointTemplate::parse("{acc}").is_err());
        assert!(CheckpointTemplate::parse("{epoch:x}").is_err());
        assert!(CheckpointTemplate::parse("{epoch").is_err());
        assert!(CheckpointTemplate::parse("epoch}").is_err());
    }

    #[test]
    fn test_weights_round_trip_through_file() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("nested").join("01-0.50");
        let device = Default::default();
        let config = SiameseNetworkConfig::new()
            .with_conv1_filters(2)
            .with_conv2_filters(2)
            .with_embedding_dim(3);

        let saved: SiameseNetwork<TestBackend> = config.init(OutputMode::Euclidean, &device);
        save_weights(&saved, &path).unwrap();
        assert!(path.exists(), "weights must land at the exact rendered path");

        let fresh: SiameseNetwork<TestBackend> = config.init(OutputMode::Euclidean, &device);
        let loaded = load_weights(fresh, &path, &device).unwrap();

        let input = || Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device);
        let a = saved.forward(input(), input().mul_scalar(0.5)).into_data().to_vec::<f32>().unwrap();
        let b = loaded.forward(input(), input().mul_scalar(0.5)).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_weight_file() {
        let device = Default::default();
        let model: SiameseNetwork<TestBackend> =
            SiameseNetworkConfig::new().init(OutputMode::Euclidean, &device);
        let err = load_weights(model, "/nonexistent/weights", &device).unwrap_err();
        assert!(matches!(err, SiameseError::Io(_)));
    }
}
