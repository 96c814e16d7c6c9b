//! `picrew-archive grab <input>` — one-shot scrape with a progress bar.

use crate::archive;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use picrew_archive::Scraper;
use std::path::Path;

pub async fn run(input: &str, out: &Path, batch: usize, zip: bool) -> Result<()> {
    let scraper = Scraper::with_batch_size(batch);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("  {bar:40.cyan/blue} {pos}/{len} files")
            .expect("valid template"),
    );
    let progress = {
        let bar = bar.clone();
        move |done: usize, total: usize| {
            if bar.length() != Some(total as u64) {
                bar.set_length(total as u64);
            }
            bar.set_position(done as u64);
        }
    };

    let outcome = scraper.scrape(input, out, Some(&progress)).await?;
    bar.finish_and_clear();

    println!("  Maker {} → {}", outcome.maker_id, outcome.maker_dir.display());
    println!(
        "  {} downloaded, {} already present, {} failed",
        outcome.report.downloaded,
        outcome.report.skipped,
        outcome.report.failed.len()
    );
    if !outcome.report.is_complete() {
        println!("  Gaps recorded in incomplete.json");
    }

    if zip {
        let zip_path = out.join(format!("Maker_{}.zip", outcome.maker_id));
        archive::zip_directory(&outcome.maker_dir, &zip_path)?;
        println!("  Archived to {}", zip_path.display());
    }

    Ok(())
}
