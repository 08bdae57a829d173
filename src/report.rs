//! Report export for a selection run: CSV summary, HTML gallery, and an
//! optional output directory of ranked copies or symlinks.

use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::db::{Database, ReportRow};
use crate::scanner::thumbnails;

pub struct ExportOptions<'a> {
    pub output_dir: Option<&'a Path>,
    pub copy_files: bool,
    pub link_files: bool,
}

impl Default for ExportOptions<'_> {
    fn default() -> Self {
        Self {
            output_dir: None,
            copy_files: false,
            link_files: false,
        }
    }
}

pub fn export_reports(
    db: &Database,
    run_id: i64,
    report_dir: &Path,
    thumbs_dir: &Path,
    options: &ExportOptions,
) -> Result<()> {
    let rows = db.fetch_run_report(run_id)?;
    std::fs::create_dir_all(report_dir)?;

    write_csv(&rows, &report_dir.join("report.csv"))?;
    write_gallery(&rows, thumbs_dir, &report_dir.join("gallery.html"))?;

    if let Some(output_dir) = options.output_dir {
        if options.copy_files || options.link_files {
            export_files(&rows, output_dir, options.link_files)?;
        }
    }

    info!(run_id, path = %report_dir.display(), "Reports written");
    Ok(())
}

fn write_csv(rows: &[ReportRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["rank", "photo_id", "path", "score"])?;
    for row in rows {
        writer.write_record([
            row.rank.to_string(),
            row.photo_id.to_string(),
            row.path.clone(),
            format!("{:.4}", row.final_score),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_gallery(rows: &[ReportRow], thumbs_dir: &Path, path: &Path) -> Result<()> {
    let mut html = String::new();
    html.push_str("<html><head><meta charset='utf-8'><title>Photo Curator</title>");
    html.push_str(
        "<style>body{font-family:sans-serif;} \
         .grid{display:flex;flex-wrap:wrap;gap:12px;} .card{width:200px;}</style>",
    );
    html.push_str("</head><body><h1>Photo Curator Results</h1><div class='grid'>");

    for row in rows {
        let thumb = thumbnails::thumbnail_path(thumbs_dir, &row.sha256);
        html.push_str("<div class='card'>");
        if thumb.exists() {
            let _ = write!(html, "<img src='{}' width='200' /><br/>", thumb.display());
        }
        let _ = write!(html, "<strong>#{}</strong><br/>", row.rank);
        let _ = write!(html, "<small>{}</small><br/>", row.path);
        let _ = write!(html, "<small>Score: {:.3}</small>", row.final_score);
        html.push_str("</div>");
    }

    html.push_str("</div></body></html>");
    std::fs::write(path, html)?;
    Ok(())
}

/// Copy (or symlink) originals into `output_dir` named by rank, so the
/// directory sorts into the curated order.
fn export_files(rows: &[ReportRow], output_dir: &Path, link_files: bool) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    for row in rows {
        let source = Path::new(&row.path);
        let filename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("photo_{}", row.photo_id));
        let dest = output_dir.join(format!("{:04}_{}", row.rank, filename));

        if link_files {
            if dest.exists() {
                std::fs::remove_file(&dest)?;
            }
            #[cfg(unix)]
            std::os::unix::fs::symlink(source, &dest)?;
            #[cfg(not(unix))]
            std::fs::copy(source, &dest)?;
        } else {
            std::fs::copy(source, &dest)?;
        }
    }
    Ok(())
}
