pub mod analyze;
pub mod baseline;
pub mod build;
pub mod completions;
pub mod filter;
pub mod merge;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::Context;
use comorbnet_core::code::parse_code_list;
use comorbnet_core::provider::CsvDirProvider;
use comorbnet_core::{ComorbError, DiseaseCode, FullContingencyTable};

use crate::output::{OutputMode, fail};

pub(crate) fn open_input(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

pub(crate) fn create_output(path: &Path) -> anyhow::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Read a full contingency table, rendering decode failures.
pub(crate) fn read_full_table(path: &Path, output: OutputMode) -> anyhow::Result<FullContingencyTable> {
    let reader = open_input(path)?;
    FullContingencyTable::read_csv(reader, &path.display().to_string())
        .map_err(|e| fail(output, &e))
}

/// Codes from a `--causes`/`--outcomes` list, or every cohort in the
/// directory when the list is absent.
pub(crate) fn resolve_codes(
    raw: Option<&str>,
    provider: &CsvDirProvider,
    output: OutputMode,
) -> anyhow::Result<Vec<DiseaseCode>> {
    let codes: Result<Vec<DiseaseCode>, ComorbError> = match raw {
        Some(list) => parse_code_list(list),
        None => provider.discover_codes(),
    };
    codes.map_err(|e| fail(output, &e))
}
