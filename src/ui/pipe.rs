//! Pipe mode: apply the filter once and write the recolored document to
//! stdout or a file, for scripting.

use crate::document::Document;
use crate::engine::{FilterEngine, MARKER_CLASS};
use crate::settings::Settings;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

/// Apply the filter with `settings` and serialize the whole document,
/// trailing newline included. The persisted enabled flag is ignored here;
/// asking for pipe output means asking for the filtered document.
pub fn write_filtered(
    document: &Rc<Document>,
    settings: &Settings,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let engine = FilterEngine::new(document.clone(), false);
    engine.apply(settings);
    let wrapped = document.elements_with_class(MARKER_CLASS).len();
    tracing::info!(wrapped, "filter applied for pipe output");
    let html = document.to_html()?;
    out.write_all(html.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}

pub fn run(
    document: Rc<Document>,
    settings: &Settings,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            write_filtered(&document, settings, &mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_filtered(&document, settings, &mut lock)?;
        }
    }
    Ok(())
}
