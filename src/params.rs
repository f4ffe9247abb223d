use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// A loaded parameter table: one header of parameter names plus one row of
/// categorical values per test scenario. Rows whose first character is `#`
/// are comments and skipped.
#[derive(Debug)]
pub struct ParamTable {
    names: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// One scenario's worth of (parameter name -> categorical value) pairs,
/// borrowed from the table.
#[derive(Debug, Clone, Copy)]
pub struct ParamRow<'a> {
    names: &'a [String],
    values: &'a [String],
}

impl ParamTable {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        let names: Vec<String> = match lines.next() {
            Some(header) => header.split(',').map(|s| s.trim().to_string()).collect(),
            None => bail!("parameter table has no header row"),
        };
        let mut rows = Vec::new();
        for (i, line) in lines.enumerate() {
            let values: Vec<String> = line.split(',').map(|s| s.trim().to_string()).collect();
            if values.len() != names.len() {
                bail!(
                    "row {} has {} values, header has {} names",
                    i + 1,
                    values.len(),
                    names.len()
                );
            }
            rows.push(values);
        }
        Ok(Self { names, rows })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading parameter table {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn rows(&self) -> impl Iterator<Item = ParamRow<'_>> {
        self.rows.iter().map(|values| ParamRow {
            names: &self.names,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a> ParamRow<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i].as_str())
    }

    /// Compact one-line rendering for runner output and filters.
    pub fn summary(&self) -> String {
        self.values.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_rows_and_comments() {
        let table = ParamTable::parse(
            "# comment before header\n\
             input_files,sort_reverse\n\
             one_file,false\n\
             # mid-table comment\n\
             multiple_files,true\n",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("input_files"), Some("one_file"));
        assert_eq!(rows[1].get("sort_reverse"), Some("true"));
        assert_eq!(rows[0].get("missing"), None);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = ParamTable::parse("a,b\none\n").unwrap_err();
        assert!(err.to_string().contains("1 values"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(ParamTable::parse("# only comments\n").is_err());
    }
}
