//! The ordered dispatch table driving scenario construction: one entry per
//! parameter, each mapping the parameter's legal categorical values to a
//! mutator (or an explicit no-op). Application order is significant: line
//! counts come before content generation, content before blank prefixing,
//! sort options after the content they describe.

use anyhow::{bail, Result};
use rand::rngs::StdRng;

use crate::oracle::SortKey;
use crate::params::ParamRow;
use crate::scenario::{Encoding, FileMeta, Scenario};

type Mutator = Box<dyn Fn(&mut Scenario, &mut StdRng)>;

pub struct Pipeline {
    steps: Vec<(&'static str, Vec<(&'static str, Option<Mutator>)>)>,
}

impl Pipeline {
    /// Applies the mutator registered for the row's value under each
    /// parameter, in declared order. A value with no registered entry is a
    /// configuration error; a registered `None` is a legal no-op.
    pub fn apply(&self, scenario: &mut Scenario, row: &ParamRow, rng: &mut StdRng) -> Result<()> {
        for (name, handlers) in &self.steps {
            let Some(value) = row.get(name) else {
                bail!("row is missing parameter {name:?}");
            };
            let Some((_, handler)) = handlers.iter().find(|(v, _)| *v == value) else {
                bail!("no handler registered for {name}={value}");
            };
            if let Some(handler) = handler {
                handler(scenario, rng);
            }
        }
        Ok(())
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&'static str, Vec<&'static str>)> + '_ {
        self.steps
            .iter()
            .map(|(name, handlers)| (*name, handlers.iter().map(|(v, _)| *v).collect()))
    }
}

fn mutate(f: impl Fn(&mut Scenario, &mut StdRng) + 'static) -> Option<Mutator> {
    Some(Box::new(f))
}

fn noop() -> Option<Mutator> {
    None
}

pub fn build() -> Pipeline {
    let steps = vec![
        (
            "input_files",
            vec![
                ("multiple_files", mutate(|s, _| s.add_multiple_files(3))),
                ("no_file", noop()),
                ("one_file", mutate(|s, _| s.add_one_file())),
            ],
        ),
        (
            "input_file_characteristics",
            vec![
                (
                    "non_existent",
                    mutate(|s, rng| s.set_random_file_meta(FileMeta::NonExistent, rng)),
                ),
                ("not_applicable", noop()),
                (
                    "read_protected",
                    mutate(|s, rng| s.set_random_file_meta(FileMeta::ReadProtected, rng)),
                ),
                ("readable_only", noop()),
            ],
        ),
        (
            "standard_input",
            vec![
                ("has_standard_input", mutate(|s, _| s.add_standard_input_file())),
                ("no_standard_input", noop()),
            ],
        ),
        (
            "input_lines",
            vec![
                ("empty", noop()),
                ("multiple_lines", mutate(|s, _| s.add_lines_per_input(20))),
                ("not_applicable", noop()),
                ("one_line", mutate(|s, _| s.add_lines_per_input(1))),
            ],
        ),
        (
            "input_line_length",
            vec![
                ("more_characters", mutate(|s, _| s.set_input_line_length(10))),
                ("not_applicable", noop()),
                ("one_character", mutate(|s, _| s.set_input_line_length(1))),
            ],
        ),
        (
            "input_content_type",
            vec![
                ("alphanum", mutate(Scenario::fill_with_alphanumerics)),
                ("any", mutate(Scenario::fill_with_printable_ascii)),
                (
                    "human_readable_numbers",
                    mutate(Scenario::fill_with_human_numerics),
                ),
                ("lower", mutate(Scenario::fill_with_lowercase_letters)),
                ("mixed", mutate(Scenario::fill_with_mixedcase_letters)),
                ("months", mutate(Scenario::fill_with_months)),
                ("not_applicable", noop()),
                ("numeric", mutate(Scenario::fill_with_numerics)),
                ("upper", mutate(Scenario::fill_with_uppercase_letters)),
                ("version_numbers", mutate(Scenario::fill_with_version_numbers)),
            ],
        ),
        (
            "input_line_emptiness",
            vec![
                ("all_empty", mutate(|s, _| s.set_all_input_lines_empty())),
                ("never_empty", noop()),
                ("not_applicable", noop()),
                (
                    "some_empty",
                    mutate(|s, rng| s.set_random_input_lines_empty(2, rng)),
                ),
            ],
        ),
        (
            "input_content_blanks",
            vec![
                ("all_leading", mutate(|s, _| s.add_leading_blanks_to_all_lines())),
                ("no_blanks", noop()),
                ("not_applicable", noop()),
                (
                    "some_leading",
                    mutate(|s, rng| s.add_leading_blanks_to_some_lines(rng)),
                ),
            ],
        ),
        (
            "input_character_encoding",
            vec![
                ("ascii", mutate(|s, _| s.set_file_encoding(Encoding::Ascii))),
                ("not_applicable", noop()),
                ("utf16", mutate(|s, _| s.set_file_encoding(Encoding::Utf16))),
                ("utf8", mutate(|s, _| s.set_file_encoding(Encoding::Utf8))),
            ],
        ),
        (
            "input_content_sorting",
            vec![
                ("ascending", mutate(|s, _| s.presort_input_lines(false))),
                ("descending", mutate(|s, _| s.presort_input_lines(true))),
                ("not_applicable", noop()),
                ("unsorted", noop()),
            ],
        ),
        (
            "ignore_leading_blanks",
            vec![
                ("false", noop()),
                ("not_applicable", noop()),
                ("true", mutate(|s, _| s.ignore_leading_blanks = true)),
            ],
        ),
        (
            "dictionary_order",
            vec![
                ("false", noop()),
                ("not_applicable", noop()),
                ("true", mutate(|s, _| s.dictionary_order = true)),
            ],
        ),
        (
            "ignore_case",
            vec![
                ("false", noop()),
                ("not_applicable", noop()),
                ("true", mutate(|s, _| s.ignore_case = true)),
            ],
        ),
        (
            "ignore_non_printable_characters",
            vec![
                ("false", noop()),
                ("not_applicable", noop()),
                ("true", mutate(|s, _| s.ignore_non_printable = true)),
            ],
        ),
        (
            "sort_type",
            vec![
                (
                    "human_numeric",
                    mutate(|s, _| s.set_sort_type("--human-numeric-sort", SortKey::HumanNumeric)),
                ),
                ("lexigraphical", noop()),
                (
                    "month",
                    mutate(|s, _| s.set_sort_type("--month-sort", SortKey::Month)),
                ),
                ("not_applicable", noop()),
                (
                    "numeric",
                    mutate(|s, _| s.set_sort_type("--numeric-sort", SortKey::Numeric)),
                ),
                (
                    "general_numeric",
                    mutate(|s, _| {
                        s.set_sort_type("--general-numeric-sort", SortKey::GeneralNumeric)
                    }),
                ),
                // Random shuffling has no oracle ordering; only the flag.
                ("random", mutate(|s, _| s.add_arg("--random-sort"))),
                (
                    "version",
                    mutate(|s, _| s.set_sort_type("--version-sort", SortKey::Version)),
                ),
            ],
        ),
        (
            "sort_reverse",
            vec![
                ("false", noop()),
                ("not_applicable", noop()),
                ("true", mutate(|s, _| s.reverse = true)),
            ],
        ),
        (
            "random_source",
            vec![
                (
                    "empty_file",
                    mutate(|s, _| s.add_random_source_file(FileMeta::Readable, "")),
                ),
                (
                    "non_empty_file",
                    mutate(|s, _| {
                        s.add_random_source_file(FileMeta::Readable, "Alkdjfelkjefalkjfelakwhfjkl")
                    }),
                ),
                (
                    "non_existent_file",
                    mutate(|s, _| s.add_random_source_file(FileMeta::NonExistent, "")),
                ),
                ("none", noop()),
                (
                    "read_protected_file",
                    mutate(|s, _| s.add_random_source_file(FileMeta::ReadProtected, "")),
                ),
            ],
        ),
    ];
    Pipeline { steps }
}
