/// Events emitted while an alignment batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// A countable task begins; one `TaskIncrement` follows per step.
    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    /// A candidate has been processed and produced `results` placements.
    CandidateAligned { title: String, results: usize },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events to an optional callback.
///
/// The callback may be invoked from several worker threads at once.
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn events_reach_the_callback_in_order() {
        let seen = Mutex::new(Vec::new());
        {
            let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
                seen.lock().unwrap().push(event);
            }));
            reporter.report(Progress::TaskStart { total_steps: 2 });
            reporter.report(Progress::TaskIncrement);
            reporter.report(Progress::TaskFinish);
        }
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![
                Progress::TaskStart { total_steps: 2 },
                Progress::TaskIncrement,
                Progress::TaskFinish
            ]
        );
    }

    #[test]
    fn reporter_without_callback_ignores_events() {
        ProgressReporter::new().report(Progress::Message("ignored".into()));
    }
}
