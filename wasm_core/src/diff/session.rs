//! "Latest request wins" bookkeeping for debounced diff runs.
//!
//! The page calls `begin` on every keystroke or settings change and hands the
//! returned ticket to `compute` once its debounce timer fires. A ticket that
//! has been overtaken by a newer `begin` yields `null` instead of a result.
use log::debug;
use wasm_bindgen::prelude::*;

use super::{compute_diff, DiffResult, NormalizationSettings};

/// Ticket identifying one diff request.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation {
    value: u64,
}

#[wasm_bindgen]
impl Generation {
    /// Sequence number as a JS number, for logging on the page.
    #[wasm_bindgen(getter)]
    pub fn value(&self) -> f64 {
        self.value as f64
    }
}

/// Owns the monotonic generation counter for one diff view.
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct DiffSession {
    latest: u64,
}

#[wasm_bindgen]
impl DiffSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding every earlier ticket.
    pub fn begin(&mut self) -> Generation {
        self.latest += 1;
        Generation { value: self.latest }
    }

    #[wasm_bindgen(js_name = isCurrent)]
    pub fn is_current(&self, generation: &Generation) -> bool {
        generation.value == self.latest
    }

    /// Runs the diff for `generation`, or returns `null` if it is stale.
    pub fn compute(
        &self,
        generation: &Generation,
        old_text: &str,
        new_text: &str,
        settings: JsValue,
    ) -> Result<JsValue, JsValue> {
        let settings = crate::normalization_from_js(settings)?;
        match self.run(generation, old_text, new_text, &settings) {
            Some(result) => serde_wasm_bindgen::to_value(&result)
                .map_err(|err| JsValue::from_str(&err.to_string())),
            None => Ok(JsValue::NULL),
        }
    }
}

impl DiffSession {
    /// Diffs only when `generation` is still the latest ticket.
    pub fn run(
        &self,
        generation: &Generation,
        old_text: &str,
        new_text: &str,
        settings: &NormalizationSettings,
    ) -> Option<DiffResult> {
        if !self.is_current(generation) {
            debug!(
                "skipping diff generation {} (latest {})",
                generation.value, self.latest
            );
            return None;
        }
        Some(DiffResult::new(compute_diff(old_text, new_text, settings)))
    }
}
