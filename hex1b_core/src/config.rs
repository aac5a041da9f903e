//! Render options: frame ceiling, diff fusion threshold, history coalesce window.
//! Loaded from an optional `toml` document with hard-coded defaults, mirroring the
//! teacher's `defaults.rs` + `envar.rs` pair. No file-watching or hot-reload.

use crate::prelude::{Error, Result};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
  pub frame_ceiling_fps: u32,
  pub diff_fusion_k: usize,
  pub coalesce_timeout: Duration,
}

impl Default for RenderOptions {
  fn default() -> Self {
    RenderOptions {
      frame_ceiling_fps: 60,
      diff_fusion_k: crate::surface::FUSION_GAP,
      coalesce_timeout: crate::doc::COALESCE_TIMEOUT,
    }
  }
}

impl RenderOptions {
  /// Parses `text` as a TOML document, overriding only the keys it sets:
  /// `frame_ceiling_fps`, `diff_fusion_k`, `coalesce_timeout_ms`. Unknown keys are
  /// ignored; out-of-range values are clamped rather than rejected.
  pub fn from_toml(text: &str) -> Result<Self> {
    let value: toml::Value = text.parse().map_err(|e: toml::de::Error| Error::invalid_argument(e.to_string()))?;
    let mut opts = RenderOptions::default();

    if let Some(fps) = value.get("frame_ceiling_fps").and_then(toml::Value::as_integer) {
      opts.frame_ceiling_fps = fps.max(1) as u32;
    }
    if let Some(k) = value.get("diff_fusion_k").and_then(toml::Value::as_integer) {
      opts.diff_fusion_k = k.max(0) as usize;
    }
    if let Some(ms) = value.get("coalesce_timeout_ms").and_then(toml::Value::as_integer) {
      opts.coalesce_timeout = Duration::from_millis(ms.max(0) as u64);
    }
    Ok(opts)
  }

  /// The wall-clock budget one frame must not render faster than.
  pub fn frame_budget(&self) -> Duration {
    Duration::from_secs_f64(1.0 / self.frame_ceiling_fps as f64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_the_documented_schedule() {
    let opts = RenderOptions::default();
    assert_eq!(opts.frame_ceiling_fps, 60);
    assert_eq!(opts.diff_fusion_k, 3);
  }

  #[test]
  fn toml_overrides_only_the_keys_it_sets() {
    let opts = RenderOptions::from_toml("frame_ceiling_fps = 30\n").unwrap();
    assert_eq!(opts.frame_ceiling_fps, 30);
    assert_eq!(opts.diff_fusion_k, RenderOptions::default().diff_fusion_k);
  }

  #[test]
  fn malformed_toml_is_an_invalid_argument_not_a_panic() {
    let err = RenderOptions::from_toml("not valid = = toml").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
  }
}
