use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::NoticeRecord;

/// Written at the top of a notice file.
pub const HEADER: &str = "\
THIRD-PARTY SOFTWARE NOTICES AND INFORMATION

This software incorporates components from the projects listed below.
The original copyright notices and the licenses under which they were
received are set forth below.

";

const RULE: &str = "======================================================================";

/// Render one notice block.
///
/// Field order is fixed: Package, Version, License, Project URL, then the
/// license text. Tools downstream parse these lines, so keep it stable.
pub fn render(record: &NoticeRecord) -> String {
    format!(
        "{RULE}\n\
         Package: {}\n\
         Version: {}\n\
         License: {}\n\
         Project URL: {}\n\
         {RULE}\n\
         \n\
         {}\n\
         \n",
        record.package_name,
        record.version,
        record.license_identifier,
        record.repository_url,
        record.license_text.trim_end(),
    )
}

/// Write the notice to `output`, or stdout when no path is given. The header
/// only goes into files.
pub fn write_output(output: Option<&Path>, notice: &str, header: bool) -> Result<()> {
    match output {
        Some(path) => {
            let mut content = String::with_capacity(HEADER.len() + notice.len());
            if header {
                content.push_str(HEADER);
            }
            content.push_str(notice);
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(notice.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
