//! The mutable aggregate a pipeline row builds up: input file descriptors,
//! the line buffer, option flags and the oracle parameters. Mutators here
//! perform no I/O; staging happens in `fixture`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::oracle::{self, SortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMeta {
    #[default]
    Readable,
    NonExistent,
    ReadProtected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub name: String,
    pub meta: FileMeta,
}

impl FileSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: FileMeta::Readable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    Ascii,
    #[default]
    Utf8,
    Utf16,
}

impl Encoding {
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Ascii | Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Utf16 => {
                // Little-endian with BOM, matching typical text-mode output.
                let mut out = vec![0xFF, 0xFE];
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out
            }
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Ascii | Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Utf16 => {
                let body = bytes.strip_prefix(&[0xFF, 0xFE]).unwrap_or(bytes);
                let units: Vec<u16> = body
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
        }
    }

    pub fn is_byte_oriented(&self) -> bool {
        !matches!(self, Encoding::Utf16)
    }
}

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
// Printable ASCII without line-breaking controls; a generated element must
// stay one physical line.
const PUNCT: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ ";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const LEADING_BLANKS: &str = "          ";

const INCOMPATIBLE_ARGS: &[&[&str]] = &[
    &["--human-numeric-sort", "--dictionary-order"],
    &["--ignore-nonprinting", "--month-sort"],
    &["--ignore-nonprinting", "--general-numeric-sort"],
    &["--ignore-nonprinting", "--human-numeric-sort"],
    &["--dictionary-order", "--ignore-case", "--general-numeric-sort"],
    &["--dictionary-order", "--month-sort"],
];

#[derive(Debug, Default)]
pub struct Scenario {
    pub input_files: Vec<FileSpec>,
    pub stdin_file: Option<FileSpec>,
    pub input_lines: Vec<String>,
    pub max_line_length: usize,
    pub encoding: Encoding,
    pub args: Vec<String>,
    pub random_source: Option<FileSpec>,
    pub random_source_content: String,
    pub sort_key: SortKey,
    pub ignore_leading_blanks: bool,
    pub dictionary_order: bool,
    pub ignore_case: bool,
    pub ignore_non_printable: bool,
    pub reverse: bool,
}

impl Scenario {
    pub fn new() -> Self {
        Self {
            max_line_length: 10,
            ..Self::default()
        }
    }

    // ----- structure -------------------------------------------------------

    pub fn add_one_file(&mut self) {
        let name = format!("{}.txt", self.input_files.len());
        self.input_files.push(FileSpec::new(name));
    }

    pub fn add_multiple_files(&mut self, amount: usize) {
        for _ in 0..amount {
            self.add_one_file();
        }
    }

    pub fn add_standard_input_file(&mut self) {
        self.stdin_file = Some(FileSpec::new("stdin.txt"));
    }

    /// Marks a uniformly random input file with `meta`. A no-op when there
    /// are no input files (rows pairing `no_file` with a characteristic).
    pub fn set_random_file_meta(&mut self, meta: FileMeta, rng: &mut StdRng) {
        if let Some(file) = self.input_files.choose_mut(rng) {
            file.meta = meta;
        }
    }

    pub fn add_random_source_file(&mut self, meta: FileMeta, content: &str) {
        self.random_source = Some(FileSpec {
            name: "random_source.txt".to_string(),
            meta,
        });
        self.random_source_content = content.to_string();
    }

    // ----- line buffer -----------------------------------------------------

    pub fn add_lines_per_input(&mut self, lines_per_input: usize) {
        let total = self.input_count() * lines_per_input;
        self.input_lines
            .extend(std::iter::repeat_with(String::new).take(total));
    }

    pub fn set_input_line_length(&mut self, length: usize) {
        self.max_line_length = length;
    }

    pub fn set_all_input_lines_empty(&mut self) {
        for line in &mut self.input_lines {
            line.clear();
        }
    }

    pub fn set_random_input_lines_empty(&mut self, amount_per_input: usize, rng: &mut StdRng) {
        if self.input_lines.is_empty() {
            return;
        }
        let k = (amount_per_input * self.input_count()).min(self.input_lines.len());
        for index in rand::seq::index::sample(rng, self.input_lines.len(), k) {
            self.input_lines[index].clear();
        }
    }

    fn fill_lines(&mut self, mut generate: impl FnMut(&mut StdRng) -> String, rng: &mut StdRng) {
        for line in &mut self.input_lines {
            *line = generate(rng);
        }
    }

    fn fill_from_charset(&mut self, charset: &str, rng: &mut StdRng) {
        let chars: Vec<char> = charset.chars().collect();
        let max = self.max_line_length;
        self.fill_lines(
            |rng| {
                let len = rng.gen_range(1..=max);
                (0..len).map(|_| *chars.choose(rng).unwrap()).collect()
            },
            rng,
        );
    }

    pub fn fill_with_uppercase_letters(&mut self, rng: &mut StdRng) {
        self.fill_from_charset(UPPER, rng);
    }

    pub fn fill_with_lowercase_letters(&mut self, rng: &mut StdRng) {
        self.fill_from_charset(LOWER, rng);
    }

    pub fn fill_with_mixedcase_letters(&mut self, rng: &mut StdRng) {
        let charset = format!("{UPPER}{LOWER}");
        self.fill_from_charset(&charset, rng);
    }

    pub fn fill_with_alphanumerics(&mut self, rng: &mut StdRng) {
        let charset = format!("{UPPER}{LOWER}{DIGITS}");
        self.fill_from_charset(&charset, rng);
    }

    pub fn fill_with_printable_ascii(&mut self, rng: &mut StdRng) {
        let charset = format!("{UPPER}{LOWER}{DIGITS}{PUNCT}");
        self.fill_from_charset(&charset, rng);
    }

    pub fn fill_with_months(&mut self, rng: &mut StdRng) {
        self.fill_lines(|rng| MONTHS.choose(rng).unwrap().to_string(), rng);
    }

    pub fn fill_with_numerics(&mut self, rng: &mut StdRng) {
        self.fill_lines(
            |rng| {
                if rng.gen_bool(0.5) {
                    let value: f64 = rng.gen_range(-1e10..1e10);
                    match rng.gen_range(0..4) {
                        0 => format!("{value:.5}"),
                        1 => format!("{value:.5e}"),
                        2 => format!("{value:+.5}"),
                        _ => format!("{value:+.5e}"),
                    }
                } else {
                    rng.gen_range(-1000..=1000).to_string()
                }
            },
            rng,
        );
    }

    pub fn fill_with_human_numerics(&mut self, rng: &mut StdRng) {
        const SUFFIXES: [&str; 9] = ["", "K", "M", "G", "T", "P", "E", "Z", "Y"];
        self.fill_lines(
            |rng| {
                let number = if rng.gen_bool(0.5) {
                    rng.gen_range(-1000..=1000).to_string()
                } else {
                    format!("{:.3}", rng.gen_range(-1000.0..1000.0))
                };
                format!("{number}{}", SUFFIXES.choose(rng).unwrap())
            },
            rng,
        );
    }

    pub fn fill_with_version_numbers(&mut self, rng: &mut StdRng) {
        self.fill_lines(
            |rng| {
                let part = |rng: &mut StdRng| rng.gen_range(0..=100).to_string();
                format!("{}.{}.{}", part(rng), part(rng), part(rng))
            },
            rng,
        );
    }

    pub fn add_leading_blanks_to_all_lines(&mut self) {
        for line in &mut self.input_lines {
            line.insert_str(0, LEADING_BLANKS);
        }
    }

    pub fn add_leading_blanks_to_some_lines(&mut self, rng: &mut StdRng) {
        for i in 0..self.input_lines.len() {
            if rng.gen_bool(0.5) {
                self.input_lines[i].insert_str(0, LEADING_BLANKS);
            }
        }
    }

    /// Presort for the `input_content_sorting` parameter. The sort-type
    /// parameter comes later in the pipeline, so this is always byte order.
    pub fn presort_input_lines(&mut self, descending: bool) {
        self.input_lines.sort();
        if descending {
            self.input_lines.reverse();
        }
    }

    // ----- options ---------------------------------------------------------

    pub fn set_file_encoding(&mut self, encoding: Encoding) {
        self.encoding = encoding;
    }

    pub fn add_arg(&mut self, arg: &str) {
        self.args.push(arg.to_string());
    }

    pub fn set_sort_type(&mut self, flag: &str, key: SortKey) {
        self.add_arg(flag);
        self.sort_key = key;
    }

    // ----- accessors -------------------------------------------------------

    /// Stdin fixture first, then input files in index order.
    pub fn all_inputs(&self) -> Vec<&FileSpec> {
        self.stdin_file
            .iter()
            .chain(self.input_files.iter())
            .collect()
    }

    pub fn input_count(&self) -> usize {
        self.input_files.len() + usize::from(self.stdin_file.is_some())
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.input_files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn find_file_with(&self, meta: FileMeta) -> Option<&FileSpec> {
        self.input_files.iter().find(|f| f.meta == meta)
    }

    pub fn has_incompatible_args(&self) -> bool {
        INCOMPATIBLE_ARGS.iter().any(|group| {
            group
                .iter()
                .all(|flag| self.args.iter().any(|arg| arg == flag))
        })
    }

    /// The oracle: expected stdout, computed from the line buffer and the
    /// declared sort key / direction only, never from `args`.
    pub fn expected_output(&self) -> String {
        join_lines(&oracle::sorted(&self.input_lines, self.sort_key, self.reverse))
    }
}

/// One buffer element per physical line, newline-terminated; empty buffers
/// produce empty output.
pub fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}
