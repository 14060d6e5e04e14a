use indicatif::{ProgressBar, ProgressStyle};

// "█▉▊▋▌▍▎▏  ·"
const PROGRES_CHARS: &str =
    "\u{2588}\u{2589}\u{258a}\u{258b}\u{258c}\u{258d}\u{258e}\u{258f}  \u{b7}";

#[derive(Default, Debug)]
pub struct Bar {
    pub progress: Option<ProgressBar>,
}

impl Bar {
    #[must_use]
    pub fn new(file_size: u64, quiet: Option<bool>) -> Self {
        if quiet == Some(true) {
            return Self::default();
        }

        let pb = ProgressBar::new(file_size);

        let style_result = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:50.green/blue} {bytes}/{total_bytes} {msg} ({bytes_per_sec} - {eta})");

        let style = match style_result {
            Ok(style) => style,
            Err(err) => {
                eprintln!("Error creating progress bar style: {err}");
                return Self { progress: None };
            }
        };

        pb.set_style(style.progress_chars(PROGRES_CHARS));

        Self { progress: Some(pb) }
    }

    /// Bytes sent and percentage as reported by the session
    pub fn update(&self, sent: u64, percentage: u8) {
        if let Some(pb) = &self.progress {
            pb.set_position(sent);
            pb.set_message(format!("{percentage}%"));
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress {
            pb.finish();
        }
    }

    pub fn abandon(&self) {
        if let Some(pb) = &self.progress {
            pb.abandon();
        }
    }
}
