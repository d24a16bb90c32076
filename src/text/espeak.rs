//! espeak-ng phonemizer
//!
//! Runs the espeak-ng executable once per clause and reads IPA phonemes
//! back from stdout. espeak drops punctuation from its IPA output, so the
//! sentence is split on clause punctuation first and each mark is put back
//! after its clause. The program and its data directory are checked when
//! the phonemizer is created so a broken installation fails at
//! construction instead of on the first sentence.

use super::phoneme::{codepoint_phonemes, CLAUSE_PUNCTUATION};
use super::{PhonemeSentence, Phonemizer};
use crate::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Executables tried, in order, when none is configured
const CANDIDATE_PROGRAMS: [&str; 2] = ["espeak-ng", "espeak"];

/// Name of the data directory inside an espeak installation
const DATA_DIR_NAME: &str = "espeak-ng-data";

/// Phonemizer backed by an espeak-ng process
#[derive(Debug, Clone)]
pub struct EspeakPhonemizer {
    program: String,
    data_root: Option<PathBuf>,
}

impl EspeakPhonemizer {
    /// Create a phonemizer
    ///
    /// # Arguments
    /// * `program` - executable to run; `None` searches PATH for espeak-ng, then espeak
    /// * `data_path` - espeak-ng data directory (or its parent); `None` uses the built-in location
    pub fn new(program: Option<&str>, data_path: Option<&Path>) -> Result<Self> {
        let program = match program {
            Some(program) => {
                if !executable_available(program) {
                    return Err(Error::Phonemizer(format!(
                        "phonemizer program '{}' not found",
                        program
                    )));
                }
                program.to_string()
            }
            None => CANDIDATE_PROGRAMS
                .iter()
                .find(|p| executable_in_path(p))
                .map(|p| p.to_string())
                .ok_or_else(|| {
                    Error::Phonemizer(format!(
                        "no espeak phonemizer found on PATH (tried: {})",
                        CANDIDATE_PROGRAMS.join(", ")
                    ))
                })?,
        };

        let data_root = data_path.map(resolve_data_root).transpose()?;

        log::info!(
            "Using phonemizer '{}'{}",
            program,
            data_root
                .as_ref()
                .map(|p| format!(" with data under {}", p.display()))
                .unwrap_or_default()
        );

        Ok(Self { program, data_root })
    }

    /// Program being executed
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, voice: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.args(["-q", "--ipa", "-b", "1", "-v", voice]);
        if let Some(root) = &self.data_root {
            command.arg("--path").arg(root);
        }
        command.arg("--stdin");
        command
    }

    /// Run espeak on one clause and return its raw IPA output
    fn run(&self, clause: &str, voice: &str) -> Result<String> {
        let mut child = self
            .command(voice)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Phonemization(format!("failed to run '{}': {}", self.program, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = stdin
                .write_all(clause.as_bytes())
                .and_then(|_| stdin.write_all(b"\n"));
            if let Err(e) = written {
                // Reap the child so a failed write does not leave a zombie
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Phonemization(format!(
                    "failed to write to '{}': {}",
                    self.program, e
                )));
            }
        }

        let output = child.wait_with_output().map_err(|e| {
            Error::Phonemization(format!("'{}' did not complete: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Phonemization(format!(
                "'{}' failed for {:?}: {}",
                self.program,
                clause,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout).map_err(|_| {
            Error::Phonemization(format!("'{}' emitted non-UTF-8 output", self.program))
        })
    }
}

impl Phonemizer for EspeakPhonemizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn phonemize(&self, text: &str, voice: &str) -> Result<Vec<PhonemeSentence>> {
        phonemize_clauses(text, |clause| self.run(clause, voice))
    }
}

/// Phonemize a sentence clause by clause
///
/// `run` maps clause text to espeak IPA output. The clauses are joined back
/// into a single sentence with each clause's punctuation in place.
fn phonemize_clauses<F>(text: &str, mut run: F) -> Result<Vec<PhonemeSentence>>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut sentence = PhonemeSentence::new();

    for (clause, mark) in split_clauses(text) {
        let phonemes = parse_ipa_output(&run(clause)?, mark);
        if phonemes.is_empty() {
            continue;
        }
        if !sentence.is_empty() {
            sentence.push(" ".to_string());
        }
        sentence.extend(phonemes);
    }

    if sentence.is_empty() {
        Ok(Vec::new())
    } else {
        Ok(vec![sentence])
    }
}

/// Split a sentence into clauses and the punctuation that ends each one
///
/// A mark ends a clause when it is followed by whitespace, another mark, a
/// closing quote or bracket, or nothing. `3.14` and `12:30` stay whole.
/// Clauses without any letters or digits are dropped along with their mark.
pub fn split_clauses(text: &str) -> Vec<(&str, Option<char>)> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if !CLAUSE_PUNCTUATION.contains(&ch) {
            continue;
        }
        let at_boundary = match chars.peek() {
            None => true,
            Some(&(_, next)) => {
                next.is_whitespace()
                    || CLAUSE_PUNCTUATION.contains(&next)
                    || matches!(next, '"' | '\'' | ')' | ']')
            }
        };
        if at_boundary {
            clauses.push((&text[start..i], Some(ch)));
            start = i + ch.len_utf8();
        }
    }
    clauses.push((&text[start..], None));

    clauses
        .into_iter()
        .map(|(clause, mark)| (clause.trim(), mark))
        .filter(|(clause, _)| clause.chars().any(char::is_alphanumeric))
        .collect()
}

/// Turn espeak `--ipa` output for one clause into phonemes
///
/// espeak may wrap a clause over several lines; they are joined with a word
/// separator. `mark` is appended when the clause produced any phonemes.
pub fn parse_ipa_output(output: &str, mark: Option<char>) -> PhonemeSentence {
    let mut phonemes = codepoint_phonemes(&output.lines().collect::<Vec<_>>().join(" "));

    if !phonemes.is_empty() {
        phonemes.extend(mark.map(String::from));
    }

    phonemes
}

/// Accept either the data directory itself or the directory containing it
fn resolve_data_root(path: &Path) -> Result<PathBuf> {
    if path.join("phontab").is_file() {
        // espeak's --path wants the parent of espeak-ng-data
        if path.file_name().map_or(false, |n| n == DATA_DIR_NAME) {
            if let Some(parent) = path.parent() {
                return Ok(parent.to_path_buf());
            }
        }
        return Err(Error::Phonemizer(format!(
            "espeak data directory must be named '{}': {}",
            DATA_DIR_NAME,
            path.display()
        )));
    }

    if path.join(DATA_DIR_NAME).join("phontab").is_file() {
        return Ok(path.to_path_buf());
    }

    Err(Error::Phonemizer(format!(
        "espeak-ng data not found at {}",
        path.display()
    )))
}

fn executable_available(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    executable_in_path(program)
}

fn executable_in_path(command: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };

    std::env::split_paths(&path_var).any(|dir| {
        if dir.join(command).is_file() {
            return true;
        }
        cfg!(windows) && dir.join(format!("{}.exe", command)).is_file()
    })
}
