use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

pub struct ProgressManager {
    mp: MultiProgress,
    _handle: thread::JoinHandle<()>,
}

fn visible(bar: ProgressBar) -> ProgressBar {
    if console::Term::stdout().is_term() {
        bar
    } else {
        ProgressBar::hidden()
    }
}

impl ProgressManager {
    /// Bars for the analysis phases, driven by messages on the returned
    /// sender. The parsing bar learns its length from `Started`.
    pub fn new() -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let mp = MultiProgress::new();
        let parsing = visible(mp.add(ProgressBar::new(0).with_message(ProgressPhase::Parsing.label())));
        let resolving = visible(mp.add(ProgressBar::new_spinner().with_message(ProgressPhase::Resolving.label())));
        let saving = visible(mp.add(ProgressBar::new_spinner().with_message(ProgressPhase::Saving.label())));

        // Indexed by phase
        let bars = [parsing, resolving, saving];

        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started {
                        phase: ProgressPhase::Parsing,
                        total,
                    } => {
                        bars[0].set_length(total as u64);
                    }
                    ProgressMessage::Started { phase, total: _ } => {
                        bars[phase as usize].enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::Progress { phase, current, file } => {
                        let bar = &bars[phase as usize];
                        bar.set_position(current as u64);
                        if let Some(ref f) = file {
                            bar.set_message(format!("{}: {}", phase.label(), f));
                        }
                    }
                    ProgressMessage::Finished { phase } => {
                        bars[phase as usize].finish_with_message(format!("{}: done", phase.label()));
                    }
                    ProgressMessage::Error(message) => {
                        bars[0].println(format!("{} {}", Icons::CROSS, message));
                    }
                }
            }
        });

        (Self { mp, _handle: handle }, tx)
    }

    pub fn clear(&self) {
        self.mp.clear().ok();
    }

    pub fn finish_with_summary(&self, duration: Duration, files: usize, entities: usize, unresolved: usize) {
        self.clear();
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}  {} {}  {} {}",
            Icons::FILE.style(theme().kind.clone()),
            files,
            Icons::PACKAGE.style(theme().kind.clone()),
            entities,
            Icons::LINK.style(theme().kind.clone()),
            unresolved
        );
    }
}
