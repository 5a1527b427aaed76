use crate::core::contact::bond::{BondKey, FailureMode};

#[derive(Debug, Clone)]
pub enum Progress {
    FormationStart { candidate_pairs: u64 },
    FormationFinish { bonds_formed: u64 },

    StepStart { pairs: u64 },
    StepFinish,

    BondBroken { key: BondKey, mode: FailureMode },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
