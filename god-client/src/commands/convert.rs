use god_storage::{Converter, NullProgress, Progress};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Bridges conversion progress into an indicatif bar.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("#>-"));
        Self { bar }
    }
}

impl Progress for BarProgress {
    fn report(&self, fraction: f32, status: &str) {
        self.bar.set_position((fraction * 100.0) as u64);
        self.bar.set_message(status.to_string());
    }
}

pub fn handle(iso: &Path, output: &Path, quiet: bool) -> god_storage::Result<()> {
    let converter = Converter::new(iso, output);

    let summary = if quiet {
        converter.convert(&NullProgress)?
    } else {
        let progress = BarProgress::new();
        let result = converter.convert(&progress);
        progress.bar.finish_and_clear();
        result?
    };

    println!(
        "{} ({}) converted: {} blocks in {} part(s)",
        summary.title_id, summary.media_id, summary.blocks, summary.parts
    );
    println!("Container: {}", summary.content_dir.display());
    Ok(())
}
