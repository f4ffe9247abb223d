//! Stages a fully built scenario on disk inside a scenario-owned temporary
//! directory. Partitions the line buffer across existing inputs by floor
//! division, writes with the declared encoding, strips permission bits on
//! read-protected paths and appends the derived CLI arguments in a fixed
//! order. Everything it touches lives under the `TempDir`, so teardown on
//! any exit path is the directory drop.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::scenario::{join_lines, FileMeta, Scenario};

pub struct Fixture {
    dir: TempDir,
    written_lines: Vec<String>,
}

impl Fixture {
    pub fn stage(scenario: &mut Scenario) -> Result<Self> {
        let dir = TempDir::new().context("creating scenario directory")?;
        let mut written_lines = Vec::new();

        let existing: Vec<_> = scenario
            .all_inputs()
            .into_iter()
            .filter(|f| f.meta != FileMeta::NonExistent)
            .cloned()
            .collect();

        if !existing.is_empty() {
            let batch = scenario.input_lines.len() / existing.len();
            for (i, file) in existing.iter().enumerate() {
                let slice = &scenario.input_lines
                    [(i * batch).min(scenario.input_lines.len())
                        ..((i + 1) * batch).min(scenario.input_lines.len())];
                written_lines.extend_from_slice(slice);
                let path = dir.path().join(&file.name);
                fs::write(&path, scenario.encoding.encode(&join_lines(slice)))
                    .with_context(|| format!("writing fixture {}", file.name))?;
                if file.meta == FileMeta::ReadProtected {
                    strip_permissions(&path)?;
                }
            }
        }

        if let Some(source) = &scenario.random_source {
            if source.meta != FileMeta::NonExistent {
                let path = dir.path().join(&source.name);
                fs::write(
                    &path,
                    scenario.encoding.encode(&scenario.random_source_content),
                )
                .with_context(|| format!("writing fixture {}", source.name))?;
                if source.meta == FileMeta::ReadProtected {
                    strip_permissions(&path)?;
                }
            }
        }

        // Derived arguments, in the order a human would pass them: the
        // random source first, then the boolean options, reverse last. The
        // random-source flag is emitted even for a non-existent source; the
        // resulting diagnostic is the scenario's point.
        if let Some(source) = &scenario.random_source {
            let name = source.name.clone();
            scenario.add_arg("--random-source");
            scenario.add_arg(&name);
        }
        if scenario.ignore_leading_blanks {
            scenario.add_arg("--ignore-leading-blanks");
        }
        if scenario.dictionary_order {
            scenario.add_arg("--dictionary-order");
        }
        if scenario.ignore_case {
            scenario.add_arg("--ignore-case");
        }
        if scenario.ignore_non_printable {
            scenario.add_arg("--ignore-nonprinting");
        }
        if scenario.reverse {
            scenario.add_arg("--reverse");
        }

        Ok(Self { dir, written_lines })
    }

    /// Directory the subprocess should run in; fixture names are relative
    /// to it so diagnostics quote the bare names.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Lines actually staged, in write order: the buffer minus any
    /// floor-division remainder.
    pub fn written_lines(&self) -> &[String] {
        &self.written_lines
    }
}

fn strip_permissions(path: &Path) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o000))
        .with_context(|| format!("chmod 0 {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Encoding;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partitions_lines_across_existing_inputs() {
        let mut s = Scenario::new();
        s.add_multiple_files(2);
        s.add_standard_input_file();
        s.input_lines = lines(&["a", "b", "c", "d", "e", "f", "g"]);
        let fixture = Fixture::stage(&mut s).unwrap();

        // 7 lines over 3 inputs: batches of 2, one remainder line dropped.
        assert_eq!(fixture.written_lines().len(), 6);
        let stdin = fs::read_to_string(fixture.path("stdin.txt")).unwrap();
        assert_eq!(stdin, "a\nb\n");
        let first = fs::read_to_string(fixture.path("0.txt")).unwrap();
        assert_eq!(first, "c\nd\n");
        let second = fs::read_to_string(fixture.path("1.txt")).unwrap();
        assert_eq!(second, "e\nf\n");
    }

    #[test]
    fn non_existent_files_are_not_written() {
        let mut s = Scenario::new();
        s.add_multiple_files(2);
        s.input_files[0].meta = FileMeta::NonExistent;
        s.input_lines = lines(&["a", "b"]);
        let fixture = Fixture::stage(&mut s).unwrap();
        assert!(!fixture.path("0.txt").exists());
        // The surviving file absorbs the whole buffer.
        assert_eq!(
            fs::read_to_string(fixture.path("1.txt")).unwrap(),
            "a\nb\n"
        );
        assert_eq!(fixture.written_lines(), s.input_lines.as_slice());
    }

    #[test]
    fn read_protected_files_lose_all_permission_bits() {
        let mut s = Scenario::new();
        s.add_multiple_files(3);
        s.input_files[1].meta = FileMeta::ReadProtected;
        s.input_lines = lines(&["a", "b", "c"]);
        s.ignore_case = true;
        let fixture = Fixture::stage(&mut s).unwrap();

        let mode = |name: &str| {
            fs::metadata(fixture.path(name)).unwrap().permissions().mode() & 0o777
        };
        assert_eq!(mode("1.txt"), 0);
        assert_ne!(mode("0.txt"), 0);
        assert_ne!(mode("2.txt"), 0);
        assert_eq!(s.args, vec!["--ignore-case"]);
    }

    #[test]
    fn empty_inputs_still_accumulate_args() {
        let mut s = Scenario::new();
        s.add_random_source_file(FileMeta::NonExistent, "");
        s.reverse = true;
        let fixture = Fixture::stage(&mut s).unwrap();
        assert!(fixture.written_lines().is_empty());
        assert!(!fixture.path("random_source.txt").exists());
        assert_eq!(
            s.args,
            vec!["--random-source", "random_source.txt", "--reverse"]
        );
    }

    #[test]
    fn random_source_content_is_staged_with_permissions() {
        let mut s = Scenario::new();
        s.add_random_source_file(FileMeta::ReadProtected, "payload");
        let fixture = Fixture::stage(&mut s).unwrap();
        let path = fixture.path("random_source.txt");
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0);
        // Readable again for inspection; the tempdir owns the file.
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "payload");
    }

    #[test]
    fn derived_args_follow_the_declared_order() {
        let mut s = Scenario::new();
        s.add_arg("--month-sort");
        s.add_random_source_file(FileMeta::Readable, "x");
        s.ignore_leading_blanks = true;
        s.dictionary_order = true;
        s.ignore_case = true;
        s.ignore_non_printable = true;
        s.reverse = true;
        let _fixture = Fixture::stage(&mut s).unwrap();
        assert_eq!(
            s.args,
            vec![
                "--month-sort",
                "--random-source",
                "random_source.txt",
                "--ignore-leading-blanks",
                "--dictionary-order",
                "--ignore-case",
                "--ignore-nonprinting",
                "--reverse",
            ]
        );
    }

    #[test]
    fn utf16_fixture_round_trips() {
        let mut s = Scenario::new();
        s.add_one_file();
        s.set_file_encoding(Encoding::Utf16);
        s.input_lines = lines(&["alpha", "bravo"]);
        let fixture = Fixture::stage(&mut s).unwrap();
        let bytes = fs::read(fixture.path("0.txt")).unwrap();
        assert_eq!(s.encoding.decode(&bytes), "alpha\nbravo\n");
    }
}
