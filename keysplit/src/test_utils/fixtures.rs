//! Input files for split tests.

use std::fs;
use std::path::{Path, PathBuf};

/// Header of the generated occurrence files.
pub const OCCURRENCE_HEADER: &str = "gbifID\tscientific name\tcountry\tindividual count";

/// Species names used by [`generate_occurrences`], in rotation.
pub const SPECIES: [&str; 5] = [
    "Passer domesticus",
    "Parus major",
    "Pica pica",
    "Corvus corax",
    "Sturnus vulgaris",
];

/// Writes `lines` to `dir/name`, each terminated by a line feed, and returns the path.
pub fn write_input(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(&path, contents).unwrap();

    path
}

/// Generates a tab separated occurrence file with `rows` records.
///
/// Record `i` has id `i` and the species `SPECIES[i * 7 % 5]`, so species interleave. Every
/// eleventh record lacks the species column and is malformed.
pub fn generate_occurrences(rows: usize) -> String {
    let mut contents = String::with_capacity(rows * 48);
    contents.push_str(OCCURRENCE_HEADER);
    contents.push('\n');

    for id in 0..rows {
        if id % 11 == 10 {
            contents.push_str(&format!("{id}\n"));
            continue;
        }

        let species = SPECIES[id * 7 % SPECIES.len()];
        contents.push_str(&format!("{id}\t{species}\tDK\t{}\n", id % 4 + 1));
    }

    contents
}

/// Returns the records of `contents` whose species column equals `species`, in input order.
pub fn expected_records<'a>(contents: &'a str, species: &str) -> Vec<&'a str> {
    contents
        .lines()
        .skip(1)
        .filter(|line| line.split('\t').nth(1) == Some(species))
        .collect()
}

/// Reads an output file and splits it into its header and its records.
pub fn read_output(path: &Path) -> (String, Vec<String>) {
    let contents = fs::read_to_string(path).unwrap();
    let mut lines = contents.lines().map(str::to_string);
    let header = lines.next().unwrap_or_default();

    (header, lines.collect())
}
