use std::{
    borrow::Cow,
    io::{BufWriter, Write},
    path::Path,
};

use tempfile::NamedTempFile;

use super::{ReportRecord, REPORT_HEADER};
use crate::error::{GithubReportError, Result};

/// Writes the header and `records` to `path`.
///
/// Rows go to a temporary file next to `path` that is renamed into place once
/// complete, so a failed run never leaves a half written report behind.
pub(crate) fn write_csv(path: &Path, records: &[ReportRecord]) -> Result<()> {
    let report_error = |source| GithubReportError::Report {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmpfile = NamedTempFile::new_in(dir).map_err(report_error)?;
    {
        let mut writer = BufWriter::new(tmpfile.as_file_mut());
        write_row(&mut writer, REPORT_HEADER.iter().copied()).map_err(report_error)?;
        for record in records {
            let cells = record.cells();
            write_row(&mut writer, cells.iter().map(String::as_str)).map_err(report_error)?;
        }
        writer.flush().map_err(report_error)?;
    }
    tmpfile.persist(path).map_err(|err| report_error(err.error))?;

    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

fn write_row<'a, W, I>(writer: &mut W, cells: I) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    let line: Vec<Cow<'a, str>> = cells.into_iter().map(escape_cell).collect();
    writeln!(writer, "{}", line.join(","))
}

/// Quotes a cell when it holds a comma, quote or line break, doubling inner quotes.
fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn record(name: &str, description: &str, admins: &str) -> ReportRecord {
        ReportRecord {
            full_name: format!("acme/{name}"),
            name: name.to_owned(),
            description: description.to_owned(),
            private: false,
            fork: true,
            visibility: "public".to_owned(),
            last_update: "2022-06-13T07:59:05Z".to_owned(),
            admins: admins.to_owned(),
        }
    }

    #[test]
    fn cells_are_quoted_only_when_needed() {
        assert_eq!(escape_cell("plain"), "plain");
        assert_eq!(escape_cell("a, b"), "\"a, b\"");
        assert_eq!(escape_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_cell("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn report_has_header_and_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let records = [
            record("one", "first", "alice (Alice), bob"),
            record("two", "", ""),
        ];

        write_csv(&path, &records).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines,
            [
                "Full Name,Name,Short Description,Private,Fork,Visibility,Last Update,Repo Admins",
                "acme/one,one,first,false,true,public,2022-06-13T07:59:05Z,\"alice (Alice), bob\"",
                "acme/two,two,,false,true,public,2022-06-13T07:59:05Z,",
            ]
        );
    }

    #[test]
    fn existing_report_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        fs::write(&path, "stale").unwrap();

        write_csv(&path, &[]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Full Name,"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_is_a_report_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.csv");

        let err = write_csv(&path, &[]).unwrap_err();
        assert_eq!(err.code(), "report");
        assert!(!path.exists());
    }
}
