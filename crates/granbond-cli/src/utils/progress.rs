use granbond::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Drives one progress bar from core progress events.
///
/// Formation shows a spinner; evaluation advances a bar by one per step. The
/// number of bonds broken so far is kept in the bar's message.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    broken: Arc<Mutex<u64>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0).with_style(Self::spinner_style());
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
            broken: Arc::new(Mutex::new(0)),
        }
    }

    /// Switches the bar to step counting for a run of `steps` evaluations.
    pub fn begin_steps(&self, steps: u64) {
        let Ok(pb) = self.pb.lock() else {
            warn!("Progress bar mutex was poisoned. Cannot start step bar.");
            return;
        };
        pb.reset();
        pb.set_length(steps);
        pb.set_position(0);
        pb.set_style(Self::bar_style());
        pb.set_message("Evaluating");
    }

    /// Completes the step bar.
    pub fn finish(&self) {
        if let Ok(pb) = self.pb.lock() {
            pb.finish();
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();
        let broken_clone = self.broken.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::FormationStart { candidate_pairs } => {
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(Self::spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb.set_message(format!("Forming bonds over {candidate_pairs} candidate pairs"));
                }
                Progress::FormationFinish { bonds_formed } => {
                    pb.disable_steady_tick();
                    pb.finish_with_message(format!("✓ {bonds_formed} bonds formed"));
                }
                Progress::StepStart { .. } => {}
                Progress::StepFinish => {
                    pb.inc(1);
                }
                Progress::BondBroken { .. } => {
                    let Ok(mut broken) = broken_clone.lock() else {
                        return;
                    };
                    *broken += 1;
                    pb.set_message(format!("Evaluating ({} broken)", *broken));
                }
                Progress::Message(msg) => {
                    if !pb.is_finished() {
                        pb.println(format!("  {msg}"));
                    } else {
                        pb.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<24} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
