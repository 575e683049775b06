// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The process step: scan the settings file, blur, write, rewrite

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::history::{create_entry, History};
use crate::imaging::{self, OutputFormat};
use crate::rewrite::{self, Rewritten};
use crate::settings;
use crate::Result;

/// Why a run ended without blurring anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    ZeroRadius,
    NoImage,
    AlreadyBlurred,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::Disabled => "Blur is disabled",
            SkipReason::ZeroRadius => "Blur radius is 0",
            SkipReason::NoImage => "No background image set",
            SkipReason::AlreadyBlurred => "Background image is already blurred",
        };
        f.write_str(text)
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct BlurReport {
    pub source_image: String,
    pub radius: u32,
    pub format: OutputFormat,
    /// Where the blurred image was written
    pub output_path: PathBuf,
    /// The value now stored under the image key
    pub settings_value: String,
    pub rewritten: Rewritten,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Skipped(SkipReason),
    Blurred(BlurReport),
}

/// Runs the process step against one settings file
pub struct Processor {
    config: AppConfig,
    history: Option<History>,
}

impl Processor {
    pub fn new(config: AppConfig) -> Self {
        let history = config
            .history
            .enabled
            .then(|| History::new(config.history.path.clone()));
        Self { config, history }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Process the settings file once
    pub fn run(&self, path: &Path, dry_run: bool) -> Result<Outcome> {
        info!("Processing: {:?}", path);
        let text = std::fs::read_to_string(path)?;
        let found = settings::scan(&text, &self.config.keys)?;

        info!("blurEnabled: {}", found.blur_enabled);
        info!("blurRadius: {}", found.blur_radius);
        info!(
            "backgroundImage: {}",
            found.background_image.as_ref().map(|i| i.path.as_str()).unwrap_or("")
        );

        let image = match &found.background_image {
            _ if !found.blur_enabled => return Ok(skip(SkipReason::Disabled)),
            _ if found.blur_radius == 0 => return Ok(skip(SkipReason::ZeroRadius)),
            None => return Ok(skip(SkipReason::NoImage)),
            Some(image) if image.path.contains(&self.config.output.prefix) => {
                return Ok(skip(SkipReason::AlreadyBlurred))
            }
            Some(image) => image,
        };
        let radius = found.blur_radius;

        let format = OutputFormat::from_image_path(&image.path)?;
        let file_name = rewrite::blurred_file_name(
            &self.config.output.prefix,
            radius,
            rewrite::file_name_of(&image.path),
        );
        let out_dir = self.config.output.resolve_dir();
        let output_path = out_dir.join(&file_name);
        let settings_value = rewrite::settings_path_text(&out_dir, &file_name);

        let rewritten = rewrite::rewrite(
            &text,
            image,
            &self.config.keys.image,
            &settings_value,
            self.config.output.comment_original,
        )?;

        if dry_run {
            info!("DRY RUN: Would write {:?} and point {:?} at {}", output_path, path, settings_value);
        } else {
            let img = imaging::load_image(Path::new(&image.path))?;
            let blurred = imaging::blur(&img, radius);
            imaging::save_image(&blurred, &output_path, format, self.config.output.jpeg_quality)?;
            write_settings(path, &rewritten.text, &output_path)?;
            info!("Updated {:?}: {}", path, settings_value);
        }

        let report = BlurReport {
            source_image: image.path.clone(),
            radius,
            format,
            output_path,
            settings_value,
            rewritten,
            dry_run,
        };

        if !dry_run {
            self.record(path, &report);
        }

        Ok(Outcome::Blurred(report))
    }

    fn record(&self, path: &Path, report: &BlurReport) {
        let Some(history) = &self.history else {
            return;
        };
        let entry = create_entry(
            uuid::Uuid::new_v4().to_string(),
            path.to_path_buf(),
            report.source_image.clone(),
            report.output_path.clone(),
            report.radius,
            report.rewritten.original_line.clone(),
            report.rewritten.replacement.clone(),
        );
        // The settings file is already rewritten; losing the record only costs undo
        if let Err(e) = history.append(&entry) {
            warn!("Failed to record history: {}", e);
        }
    }
}

/// Write the rewritten settings, discarding `output_path` if that fails
///
/// Nothing points at the blurred image until the settings write lands.
fn write_settings(path: &Path, text: &str, output_path: &Path) -> Result<()> {
    let Err(e) = std::fs::write(path, text) else {
        return Ok(());
    };
    error!("Failed to write {:?}: {}", path, e);
    match std::fs::remove_file(output_path) {
        Ok(()) => warn!("Removed unreferenced {:?}", output_path),
        Err(rm) => warn!("Left unreferenced {:?}: {}", output_path, rm),
    }
    Err(e.into())
}

fn skip(reason: SkipReason) -> Outcome {
    info!("{}", reason);
    Outcome::Skipped(reason)
}
